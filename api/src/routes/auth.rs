use actix_web::{HttpRequest, HttpResponse, post, web};
use secrecy::{ExposeSecret, SecretBox};
use sqlx::PgPool;

use payloads::requests::{ActivateTotp, LoginAdmin, RegisterAdmin};
use payloads::responses::{TotpSecret, output};
use payloads::{AdminStatus, Resource};

use crate::auth::{
    AuthedAdmin, bearer_token, decode_session_id, issue_pair,
};
use crate::time::TimeSource;
use crate::{AuthConfig, password, store, totp};

use super::{ApiError, ErrorCode, client_ip, user_agent};

/// Email + password, plus a TOTP code once the admin has activated 2FA.
/// Opens a session and returns the access/refresh pair.
#[tracing::instrument(skip(req, details, pool, config, time_source))]
#[post("/auth/login")]
pub async fn login(
    req: HttpRequest,
    details: web::Json<LoginAdmin>,
    pool: web::Data<PgPool>,
    config: web::Data<AuthConfig>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let password =
        SecretBox::new(Box::new(details.password.clone()));
    let admin_id =
        password::validate_credentials(&details.email, password, &pool)
            .await?;
    let admin = store::admins::read(&pool, &admin_id).await?;

    if admin.status == AdminStatus::Banned {
        return Err(ApiError::code(ErrorCode::Forbidden));
    }

    // 2FA applies as soon as the admin has finished setup; fresh
    // accounts may log in with the one-time password alone
    if admin.status == AdminStatus::Active {
        let valid = match (&admin.totp_secret, &details.totp) {
            (Some(secret), Some(code)) => {
                totp::verify(code, secret, time_source.now())
            }
            (None, _) => true,
            _ => false,
        };
        if !valid {
            return Err(ApiError::with_msg(
                ErrorCode::InvalidPayload,
                "Invalid credentials",
            ));
        }
    }

    let session_id = store::admins::create_session(
        &admin.id,
        &client_ip(&req),
        user_agent(&req).as_deref(),
        &pool,
        &time_source,
    )
    .await?;

    let pair = issue_pair(session_id, &config, &time_source)?;
    Ok(HttpResponse::Ok().json(output(pair)))
}

/// Rotate the session: the refresh token finishes the old session and
/// opens a replacement.
#[tracing::instrument(skip(req, pool, config, time_source))]
#[post("/auth/refresh")]
pub async fn refresh(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<AuthConfig>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError::code(ErrorCode::TokenInvalid))?;
    let session_id = decode_session_id(token, &config.refresh_secret)?;

    let session = store::admins::active_session(&session_id, &pool)
        .await?
        .ok_or_else(|| ApiError::code(ErrorCode::SessionNotFound))?;

    let new_session_id = store::admins::rotate_session(
        &session.session_id,
        &session.admin_id,
        &client_ip(&req),
        user_agent(&req).as_deref(),
        &pool,
        &time_source,
    )
    .await?;

    let pair = issue_pair(new_session_id, &config, &time_source)?;
    Ok(HttpResponse::Ok().json(output(pair)))
}

#[tracing::instrument(skip(admin, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/auth/logout")]
pub async fn logout(
    admin: AuthedAdmin,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    store::admins::finish_session(&admin.session_id, &pool, &time_source)
        .await?;
    Ok(HttpResponse::Ok().json(output(())))
}

/// Issue a fresh 2FA secret. Only meaningful while the account is still
/// in its initial state.
#[tracing::instrument(skip(admin, pool, config, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/auth/totp/secret")]
pub async fn totp_secret(
    admin: AuthedAdmin,
    pool: web::Data<PgPool>,
    config: web::Data<AuthConfig>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    if admin.status != AdminStatus::New {
        return Err(ApiError::with_msg(
            ErrorCode::Forbidden,
            "Your account is already activated",
        ));
    }

    let generated =
        totp::generate_secret(&config.totp_issuer, &admin.email);
    store::admins::set_totp_secret(
        &admin.admin_id,
        &generated.base32,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().json(output(TotpSecret {
        secret: generated.base32,
        qr: generated.otpauth_url,
    })))
}

/// Prove the authenticator is set up; flips the account active.
#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/auth/totp/activate")]
pub async fn totp_activate(
    admin: AuthedAdmin,
    details: web::Json<ActivateTotp>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let secret = admin
        .totp_secret
        .as_deref()
        .ok_or_else(|| ApiError::code(ErrorCode::ConfirmationFailed))?;
    if !totp::verify(&details.totp, secret, time_source.now()) {
        return Err(ApiError::code(ErrorCode::ConfirmationFailed));
    }

    store::admins::activate(&admin.admin_id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output(())))
}

/// Register a fellow admin. The generated one-time password is returned
/// to the caller for out-of-band delivery.
#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/auth/register")]
pub async fn register(
    admin: AuthedAdmin,
    details: web::Json<RegisterAdmin>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Admins)?;

    let violations = details.validate();
    if !violations.is_empty() {
        return Err(ApiError::validation(violations));
    }

    let (_, password) = password::create_admin(
        &details.email,
        &details.grants,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().json(output(password.expose_secret().clone())))
}
