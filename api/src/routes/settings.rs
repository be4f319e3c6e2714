//! Key-value platform configuration. Writes are step-up confirmed.

use actix_web::{HttpRequest, HttpResponse, get, put, web};
use sqlx::PgPool;

use payloads::Resource;
use payloads::requests::UpdateSetting;
use payloads::responses::output;

use crate::auth::{AuthedAdmin, confirm_operation};
use crate::store;
use crate::time::TimeSource;

use super::ApiError;

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/settings")]
pub async fn list_settings(
    admin: AuthedAdmin,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Settings)?;
    let settings = store::settings::list(&pool).await?;
    Ok(HttpResponse::Ok().json(output(settings)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/settings/{key}")]
pub async fn get_setting(
    admin: AuthedAdmin,
    key: web::Path<String>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Settings)?;
    let setting = store::settings::read(&pool, &key).await?;
    Ok(HttpResponse::Ok().json(output(setting)))
}

#[tracing::instrument(skip(admin, req, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[put("/settings/{key}")]
pub async fn update_setting(
    admin: AuthedAdmin,
    req: HttpRequest,
    key: web::Path<String>,
    details: web::Json<UpdateSetting>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Settings)?;
    confirm_operation(&req, &admin, &time_source)?;
    let setting = store::settings::upsert(
        &key,
        &details.value,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output(setting)))
}
