//! RFC 6238 time-based one-time passwords, used for the admin 2FA login
//! factor and the `Confirmation` step-up header on sensitive writes.
//!
//! SHA-1, 30-second steps, 6 digits, one step of clock drift accepted in
//! both directions. Secrets are stored and provisioned base32-encoded so
//! standard authenticator apps can consume the otpauth URI.

use hmac::{Hmac, Mac};
use jiff::Timestamp;
use rand_core::{OsRng, RngCore};
use sha1::Sha1;

pub const DIGITS: u32 = 6;
pub const STEP_SECONDS: i64 = 30;
/// Accepted clock drift, in steps, on either side of now.
pub const DRIFT_WINDOW: i64 = 1;
const SECRET_BYTES: usize = 20;

/// A freshly generated shared secret plus its provisioning URI.
pub struct GeneratedSecret {
    pub base32: String,
    pub otpauth_url: String,
}

/// Generate a new shared secret for one admin account.
pub fn generate_secret(issuer: &str, account: &str) -> GeneratedSecret {
    let mut secret = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut secret);
    let base32 = base32_encode(&secret);
    let otpauth_url = format!(
        "otpauth://totp/{issuer}:{account}?secret={base32}&issuer={issuer}"
    );
    GeneratedSecret { base32, otpauth_url }
}

/// Check a submitted code against the shared secret at the given time.
/// Returns false for malformed secrets rather than erroring: a garbled
/// secret must never let a code through.
pub fn verify(code: &str, secret_base32: &str, now: Timestamp) -> bool {
    let Some(secret) = base32_decode(secret_base32) else {
        return false;
    };
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit())
    {
        return false;
    }
    let step = now.as_second() / STEP_SECONDS;
    (-DRIFT_WINDOW..=DRIFT_WINDOW).any(|drift| {
        let counter = step + drift;
        counter >= 0 && format_code(hotp(&secret, counter as u64)) == code
    })
}

/// The code currently valid for a secret. Used by tests and internal
/// tooling to produce `Confirmation` headers.
pub fn current_code(secret_base32: &str, now: Timestamp) -> Option<String> {
    let secret = base32_decode(secret_base32)?;
    let counter = (now.as_second() / STEP_SECONDS).max(0) as u64;
    Some(format_code(hotp(&secret, counter)))
}

/// RFC 4226 HMAC-based one-time password with dynamic truncation.
fn hotp(secret: &[u8], counter: u64) -> u32 {
    // HMAC accepts keys of any length
    let mut mac = Hmac::<Sha1>::new_from_slice(secret)
        .expect("HMAC accepts any key length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[19] & 0x0f) as usize;
    let binary = ((digest[offset] & 0x7f) as u32) << 24
        | (digest[offset + 1] as u32) << 16
        | (digest[offset + 2] as u32) << 8
        | digest[offset + 3] as u32;
    binary % 10u32.pow(DIGITS)
}

fn format_code(code: u32) -> String {
    format!("{code:0width$}", width = DIGITS as usize)
}

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// RFC 4648 base32, unpadded, as authenticator apps expect.
fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    for chunk in data.chunks(5) {
        let mut buffer = [0u8; 5];
        buffer[..chunk.len()].copy_from_slice(chunk);
        let bits = u64::from(buffer[0]) << 32
            | u64::from(buffer[1]) << 24
            | u64::from(buffer[2]) << 16
            | u64::from(buffer[3]) << 8
            | u64::from(buffer[4]);
        let symbols = (chunk.len() * 8).div_ceil(5);
        for i in 0..symbols {
            let index = ((bits >> (35 - i * 5)) & 0x1f) as usize;
            out.push(BASE32_ALPHABET[index] as char);
        }
    }
    out
}

fn base32_decode(encoded: &str) -> Option<Vec<u8>> {
    let trimmed = encoded.trim_end_matches('=');
    if trimmed.is_empty() {
        return None;
    }
    let mut bits: u64 = 0;
    let mut bit_count = 0u32;
    let mut out = Vec::with_capacity(trimmed.len() * 5 / 8);
    for symbol in trimmed.bytes() {
        let value = match symbol {
            b'A'..=b'Z' => symbol - b'A',
            b'a'..=b'z' => symbol - b'a',
            b'2'..=b'7' => symbol - b'2' + 26,
            _ => return None,
        };
        bits = bits << 5 | u64::from(value);
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B reference secret ("12345678901234567890")
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn at(second: i64) -> Timestamp {
        Timestamp::from_second(second).unwrap()
    }

    #[test]
    fn base32_round_trips() {
        let secret = b"12345678901234567890";
        let encoded = base32_encode(secret);
        assert_eq!(encoded, RFC_SECRET);
        assert_eq!(base32_decode(&encoded).unwrap(), secret);
    }

    #[test]
    fn base32_rejects_invalid_symbols() {
        assert!(base32_decode("ABC1").is_none()); // '1' is not in the alphabet
        assert!(base32_decode("").is_none());
    }

    #[test]
    fn rfc_6238_reference_codes() {
        // last six digits of the appendix B SHA-1 vectors
        assert_eq!(
            current_code(RFC_SECRET, at(59)).unwrap(),
            "287082"
        );
        assert_eq!(
            current_code(RFC_SECRET, at(1_111_111_109)).unwrap(),
            "081804"
        );
        assert_eq!(
            current_code(RFC_SECRET, at(1_234_567_890)).unwrap(),
            "005924"
        );
    }

    #[test]
    fn verify_accepts_one_step_of_drift() {
        let now = at(1_234_567_890);
        let code = current_code(RFC_SECRET, now).unwrap();

        assert!(verify(&code, RFC_SECRET, now));
        // one step behind and ahead still pass
        assert!(verify(&code, RFC_SECRET, at(1_234_567_890 - 30)));
        assert!(verify(&code, RFC_SECRET, at(1_234_567_890 + 30)));
        // two steps away does not
        assert!(!verify(&code, RFC_SECRET, at(1_234_567_890 + 90)));
    }

    #[test]
    fn verify_rejects_malformed_input() {
        let now = at(59);
        assert!(!verify("28708", RFC_SECRET, now)); // five digits
        assert!(!verify("28708a", RFC_SECRET, now));
        assert!(!verify("287082", "not base32!", now));
    }

    #[test]
    fn generated_secret_is_usable() {
        let generated = generate_secret("backoffice", "ops@example.com");
        assert_eq!(generated.base32.len(), 32); // 20 bytes -> 32 symbols
        assert!(generated.otpauth_url.starts_with("otpauth://totp/"));
        let code = current_code(&generated.base32, at(59)).unwrap();
        assert!(verify(&code, &generated.base32, at(59)));
    }
}
