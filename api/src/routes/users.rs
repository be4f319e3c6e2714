use actix_web::{HttpRequest, HttpResponse, get, web};
use sqlx::PgPool;

use payloads::responses::{output, output_pagination};
use payloads::{Resource, UserId};

use crate::auth::AuthedAdmin;
use crate::store;
use crate::time::TimeSource;

use super::{ApiError, parse_list};

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/users")]
pub async fn list_users(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::users::list(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/users/stats")]
pub async fn user_stats(
    admin: AuthedAdmin,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let stats = store::users::stats(&pool).await?;
    Ok(HttpResponse::Ok().json(output(stats)))
}

/// One user, overlay-merged, with all non-historical profiles.
#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/users/{id}")]
pub async fn get_user(
    admin: AuthedAdmin,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let details = store::users::details(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(details)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/users/{id}/profiles")]
pub async fn list_user_profiles(
    admin: AuthedAdmin,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    // 404 for unknown users rather than an empty list
    let _ = store::users::read(&pool, &id).await?;
    let profiles = store::users::profiles_of(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(profiles)))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/users/{id}/notifications")]
pub async fn list_user_notifications(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Notifications)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::users::notifications(&id, &query, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}
