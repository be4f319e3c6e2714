//! Support tickets and back-office notifications.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use sqlx::PgPool;

use payloads::requests::CreateSupportReply;
use payloads::responses::{output, output_pagination};
use payloads::{NotificationId, Resource, SupportRequestId};

use crate::auth::AuthedAdmin;
use crate::store;
use crate::time::TimeSource;

use super::{ApiError, parse_list};

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/support")]
pub async fn list_support(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Support)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::support::list(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/support/{id}")]
pub async fn get_support_request(
    admin: AuthedAdmin,
    id: web::Path<SupportRequestId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Support)?;
    let details = store::support::details(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(details)))
}

#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/support/{id}/replies")]
pub async fn reply_support(
    admin: AuthedAdmin,
    id: web::Path<SupportRequestId>,
    details: web::Json<CreateSupportReply>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Support)?;
    let violations = details.validate();
    if !violations.is_empty() {
        return Err(ApiError::validation(violations));
    }
    let reply = store::support::reply(
        &id,
        &admin.admin_id,
        &details.message,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output(reply)))
}

#[tracing::instrument(skip(admin, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/support/{id}/close")]
pub async fn close_support(
    admin: AuthedAdmin,
    id: web::Path<SupportRequestId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Support)?;
    let request =
        store::support::close(&id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output(request)))
}

/// The acting admin's notifications (own plus broadcast).
#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/notifications")]
pub async fn list_notifications(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Notifications)?;
    let query = parse_list(&req)?;
    let (count, items) = store::notifications::list(
        &admin.admin_id,
        &query,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/notifications/{id}/read")]
pub async fn read_notification(
    admin: AuthedAdmin,
    id: web::Path<NotificationId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Notifications)?;
    store::notifications::mark_read(
        &id,
        &admin.admin_id,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output(())))
}
