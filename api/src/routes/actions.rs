//! Administrative state transitions on users and profiles. All of them
//! are writes against the Users resource; the destructive ones take the
//! TOTP step-up.

use actix_web::{HttpRequest, HttpResponse, delete, post, web};
use sqlx::PgPool;

use payloads::responses::output;
use payloads::{ProfileId, Resource, UserId};

use crate::auth::{AuthedAdmin, confirm_operation};
use crate::store;
use crate::time::TimeSource;

use super::ApiError;

#[tracing::instrument(skip(admin, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/actions/users/{id}/ban")]
pub async fn ban_user(
    admin: AuthedAdmin,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Users)?;
    store::users::ban(&id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output(())))
}

#[tracing::instrument(skip(admin, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/actions/users/{id}/unban")]
pub async fn unban_user(
    admin: AuthedAdmin,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Users)?;
    store::users::unban(&id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output(())))
}

/// Remove a user entirely. Refused while debt or live investments
/// remain; requires step-up confirmation.
#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[delete("/actions/users/{id}")]
pub async fn delete_user(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Users)?;
    confirm_operation(&req, &admin, &time_source)?;
    store::users::delete(&id, &pool).await?;
    Ok(HttpResponse::Ok().json(output(())))
}

/// Approve a profile: fold its staged edits into canonical columns and
/// mark it accepted.
#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/actions/profiles/{id}/confirm")]
pub async fn confirm_profile(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<ProfileId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Users)?;
    confirm_operation(&req, &admin, &time_source)?;
    let details =
        store::users::confirm_profile(&id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output(details)))
}
