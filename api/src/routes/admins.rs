use actix_web::{HttpRequest, HttpResponse, get, post, put, web};
use sqlx::PgPool;

use payloads::requests::UpdateAdminRole;
use payloads::responses::{output, output_pagination};
use payloads::{AdminId, AdminStatus, Resource};

use crate::auth::{AuthedAdmin, confirm_operation};
use crate::store;
use crate::time::TimeSource;

use super::{ApiError, parse_list};

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/admins")]
pub async fn list_admins(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Admins)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::admins::list(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/admins/{id}")]
pub async fn get_admin(
    admin: AuthedAdmin,
    id: web::Path<AdminId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Admins)?;
    let details = store::admins::details(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(details)))
}

/// Replace an admin's per-resource grants. Step-up confirmed.
#[tracing::instrument(skip(admin, req, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[put("/admins/{id}/role")]
pub async fn update_role(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<AdminId>,
    details: web::Json<UpdateAdminRole>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Admins)?;
    confirm_operation(&req, &admin, &time_source)?;
    let details =
        store::admins::update_grants(&id, &details.grants, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output(details)))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/admins/{id}/ban")]
pub async fn ban_admin(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<AdminId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Admins)?;
    confirm_operation(&req, &admin, &time_source)?;
    store::admins::set_status(&id, AdminStatus::Banned, &pool, &time_source)
        .await?;
    Ok(HttpResponse::Ok().json(output(())))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/admins/{id}/unban")]
pub async fn unban_admin(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<AdminId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Admins)?;
    confirm_operation(&req, &admin, &time_source)?;
    store::admins::set_status(&id, AdminStatus::Active, &pool, &time_source)
        .await?;
    Ok(HttpResponse::Ok().json(output(())))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/admins/{id}/sessions")]
pub async fn list_sessions(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<AdminId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Admins)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::admins::list_sessions(&id, &query, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}
