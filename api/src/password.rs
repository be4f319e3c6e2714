use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher,
    PasswordVerifier, Version,
};
use secrecy::{ExposeSecret, SecretBox};
use sqlx::PgPool;

use crate::store::{self, StoreError};
use crate::telemetry::spawn_blocking_with_tracing;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

/// Validate an admin's email/password pair. Runs the argon2 verify even
/// when the email is unknown so response timing does not leak which
/// emails exist.
#[tracing::instrument(name = "Validate credentials", skip(password, pool))]
pub async fn validate_credentials(
    email: &str,
    password: SecretBox<String>,
    pool: &PgPool,
) -> Result<payloads::AdminId, AuthError> {
    let mut admin_id = None;
    // fallback password hash to prevent timing differences
    let mut expected_password_hash = SecretBox::new(Box::new(
        "$argon2id$v=19$m=15000,t=2,p=1$\
        gZiV/M1gPc22ElAH/Jh1Hw$\
        CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno"
            .to_string(),
    ));

    if let Some((stored_admin_id, stored_password_hash)) =
        get_stored_credentials(email, pool).await?
    {
        admin_id = Some(stored_admin_id);
        expected_password_hash = stored_password_hash;
    }

    spawn_blocking_with_tracing(move || {
        verify_password_hash(expected_password_hash, password)
    })
    .await
    .context("Failed to spawn blocking task.")??;

    admin_id
        .ok_or_else(|| anyhow::anyhow!("Unknown email."))
        .map_err(AuthError::InvalidCredentials)
}

#[tracing::instrument(name = "Get stored credentials", skip(email, pool))]
async fn get_stored_credentials(
    email: &str,
    pool: &PgPool,
) -> Result<Option<(payloads::AdminId, SecretBox<String>)>, anyhow::Error> {
    let admin = sqlx::query_as::<_, (payloads::AdminId, String)>(
        r#"SELECT id, password_hash FROM admins WHERE email = $1;"#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to performed a query to retrieve stored credentials.")?
    .map(|(id, hash)| (id, SecretBox::new(Box::new(hash))));
    Ok(admin)
}

#[tracing::instrument(
    name = "Verify password hash",
    skip(expected_password_hash, password_candidate)
)]
fn verify_password_hash(
    expected_password_hash: SecretBox<String>,
    password_candidate: SecretBox<String>,
) -> Result<(), AuthError> {
    let expected_password_hash =
        PasswordHash::new(expected_password_hash.expose_secret())
            .context("Failed to parse hash in PHC string format.")?;

    Argon2::default()
        .verify_password(
            password_candidate.expose_secret().as_bytes(),
            &expected_password_hash,
        )
        .context("Invalid password.")
        .map_err(AuthError::InvalidCredentials)
}

/// Register a new admin: a one-time password is generated here and
/// returned to the caller so it can be handed over out of band.
#[tracing::instrument(
    name = "Create admin",
    skip(grants, pool, time_source),
    fields(admin_id = tracing::field::Empty)
)]
pub async fn create_admin(
    email: &str,
    grants: &payloads::RoleGrants,
    pool: &PgPool,
    time_source: &crate::time::TimeSource,
) -> Result<(payloads::AdminId, SecretBox<String>), StoreError> {
    let password = generate_one_time_password();
    let password_for_hash = SecretBox::new(Box::new(
        password.expose_secret().clone(),
    ));
    let password_hash = spawn_blocking_with_tracing(move || {
        compute_password_hash(password_for_hash)
    })
    .await
    .map_err(anyhow::Error::from)?
    .context("Failed to hash password")?;

    let admin = store::admins::create(
        email,
        password_hash.expose_secret(),
        grants,
        pool,
        time_source,
    )
    .await?;
    tracing::Span::current()
        .record("admin_id", tracing::field::display(&admin.id));
    Ok((admin.id, password))
}

/// 16 characters over letters, digits and a few symbols.
fn generate_one_time_password() -> SecretBox<String> {
    use rand_core::RngCore;

    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#%+";
    let mut rng = rand_core::OsRng;
    let password: String = (0..16)
        .map(|_| {
            let index = (rng.next_u32() as usize) % CHARSET.len();
            CHARSET[index] as char
        })
        .collect();
    SecretBox::new(Box::new(password))
}

fn compute_password_hash(
    password: SecretBox<String>,
) -> Result<SecretBox<String>, anyhow::Error> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    let password_hash = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(15000, 2, 1, None).unwrap(),
    )
    .hash_password(password.expose_secret().as_bytes(), &salt)?
    .to_string();
    Ok(SecretBox::new(Box::new(password_hash)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_time_passwords_are_long_enough_and_distinct() {
        let a = generate_one_time_password();
        let b = generate_one_time_password();
        assert_eq!(a.expose_secret().len(), 16);
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn password_hash_verifies() {
        let password =
            SecretBox::new(Box::new("correct horse battery".to_string()));
        let hash = compute_password_hash(SecretBox::new(Box::new(
            password.expose_secret().clone(),
        )))
        .unwrap();
        assert!(
            verify_password_hash(
                SecretBox::new(Box::new(hash.expose_secret().clone())),
                password,
            )
            .is_ok()
        );
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = compute_password_hash(SecretBox::new(Box::new(
            "right".to_string(),
        )))
        .unwrap();
        let result = verify_password_hash(
            SecretBox::new(Box::new(hash.expose_secret().clone())),
            SecretBox::new(Box::new("wrong".to_string())),
        );
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }
}
