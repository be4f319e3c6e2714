//! Bearer-token authentication for admin sessions.
//!
//! Login issues an access/refresh JWT pair whose claims carry the
//! `admin_sessions` row id. Every authenticated route extracts
//! [`AuthedAdmin`], which decodes the access token, loads the active
//! session with its admin and role, and exposes the role's per-resource
//! grants. Sensitive writes additionally pass the TOTP step-up check in
//! [`confirm_operation`].

use std::future::Future;
use std::pin::Pin;

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use payloads::responses::JwtPair;
use payloads::{
    AdminId, AdminSessionId, AdminStatus, PermissionLevel, Resource,
    RoleGrants,
};

use crate::AuthConfig;
use crate::routes::{ApiError, ErrorCode};
use crate::store;
use crate::time::TimeSource;
use crate::totp;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// admin session id
    id: AdminSessionId,
    iat: i64,
    exp: i64,
}

/// Sign the access/refresh pair for a session.
pub fn issue_pair(
    session_id: AdminSessionId,
    config: &AuthConfig,
    time_source: &TimeSource,
) -> Result<JwtPair, ApiError> {
    let now = time_source.now().as_second();
    let access = sign(
        session_id,
        now,
        config.access_lifetime,
        &config.access_secret,
    )?;
    let refresh = sign(
        session_id,
        now,
        config.refresh_lifetime,
        &config.refresh_secret,
    )?;
    Ok(JwtPair { access, refresh })
}

fn sign(
    session_id: AdminSessionId,
    now: i64,
    lifetime: i64,
    secret: &SecretString,
) -> Result<String, ApiError> {
    let claims = Claims {
        id: session_id,
        iat: now,
        exp: now + lifetime,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| {
        ApiError::internal(anyhow::Error::from(e).context("signing JWT"))
    })
}

/// Decode a token and return the session id it carries. Expiry and
/// signature failures map to their distinct error codes.
pub fn decode_session_id(
    token: &str,
    secret: &SecretString,
) -> Result<AdminSessionId, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims.id)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ApiError::code(ErrorCode::TokenExpired)
        }
        _ => ApiError::code(ErrorCode::TokenInvalid),
    })
}

/// The `Authorization: Bearer` token of a request, if any.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// The authenticated admin of the current request.
#[derive(Debug, Clone)]
pub struct AuthedAdmin {
    pub admin_id: AdminId,
    pub session_id: AdminSessionId,
    pub email: String,
    pub status: AdminStatus,
    pub totp_secret: Option<String>,
    pub grants: RoleGrants,
}

impl AuthedAdmin {
    pub fn ensure_read(&self, resource: Resource) -> Result<(), ApiError> {
        if self.grants.level(resource) == PermissionLevel::None {
            return Err(ApiError::code(ErrorCode::Forbidden));
        }
        Ok(())
    }

    pub fn ensure_write(&self, resource: Resource) -> Result<(), ApiError> {
        if self.grants.level(resource) != PermissionLevel::Write {
            return Err(ApiError::code(ErrorCode::Forbidden));
        }
        Ok(())
    }
}

impl FromRequest for AuthedAdmin {
    type Error = ApiError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let pool = req
                .app_data::<web::Data<PgPool>>()
                .ok_or_else(|| {
                    ApiError::internal(anyhow::anyhow!("missing pool"))
                })?
                .clone();
            let config = req
                .app_data::<web::Data<AuthConfig>>()
                .ok_or_else(|| {
                    ApiError::internal(anyhow::anyhow!("missing auth config"))
                })?
                .clone();

            let token = bearer_token(&req)
                .ok_or_else(|| ApiError::code(ErrorCode::TokenInvalid))?;
            let session_id =
                decode_session_id(token, &config.access_secret)?;

            let record =
                store::admins::active_session(&session_id, &pool)
                    .await
                    .map_err(ApiError::from)?
                    .ok_or_else(|| {
                        ApiError::code(ErrorCode::SessionNotFound)
                    })?;

            if record.status == AdminStatus::Banned {
                return Err(ApiError::code(ErrorCode::Forbidden));
            }

            // user-facing routes log which admin acted
            tracing::Span::current().record(
                "admin_id",
                tracing::field::display(&record.admin_id),
            );

            Ok(AuthedAdmin {
                admin_id: record.admin_id,
                session_id: record.session_id,
                email: record.email,
                status: record.status,
                totp_secret: record.totp_secret,
                grants: record.grants,
            })
        })
    }
}

/// Step-up check for sensitive writes: the `Confirmation` header must
/// hold a TOTP code that is currently valid for the acting admin.
pub fn confirm_operation(
    req: &HttpRequest,
    admin: &AuthedAdmin,
    time_source: &TimeSource,
) -> Result<(), ApiError> {
    let failed = || ApiError::code(ErrorCode::ConfirmationFailed);

    let code = req
        .headers()
        .get("Confirmation")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(failed)?;
    let secret = admin.totp_secret.as_deref().ok_or_else(failed)?;

    if !totp::verify(code, secret, time_source.now()) {
        return Err(failed());
    }
    Ok(())
}
