//! File metadata (/documents) and the public platform documents.

use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put, web,
};
use sqlx::PgPool;

use payloads::requests::{
    CreatePlatformDocument, UpdatePlatformDocument,
};
use payloads::responses::{output, output_pagination};
use payloads::{FileId, PlatformDocumentId, Resource};

use crate::auth::AuthedAdmin;
use crate::store;
use crate::time::TimeSource;

use super::{ApiError, parse_list};

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/documents")]
pub async fn list_files(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Documents)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::documents::list_files(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/documents/{id}")]
pub async fn get_file(
    admin: AuthedAdmin,
    id: web::Path<FileId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Documents)?;
    let file = store::documents::read_file(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(file)))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/platform-documents")]
pub async fn list_platform_documents(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Documents)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::documents::list_documents(&query, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/platform-documents/{id}")]
pub async fn get_platform_document(
    admin: AuthedAdmin,
    id: web::Path<PlatformDocumentId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Documents)?;
    let document = store::documents::read_document(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(document)))
}

#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/platform-documents")]
pub async fn create_platform_document(
    admin: AuthedAdmin,
    details: web::Json<CreatePlatformDocument>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Documents)?;
    let violations = details.validate();
    if !violations.is_empty() {
        return Err(ApiError::validation(violations));
    }
    let document =
        store::documents::create_document(&details, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output(document)))
}

#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[put("/platform-documents/{id}")]
pub async fn update_platform_document(
    admin: AuthedAdmin,
    id: web::Path<PlatformDocumentId>,
    details: web::Json<UpdatePlatformDocument>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Documents)?;
    let document = store::documents::update_document(
        &id,
        &details,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output(document)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[delete("/platform-documents/{id}")]
pub async fn delete_platform_document(
    admin: AuthedAdmin,
    id: web::Path<PlatformDocumentId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Documents)?;
    store::documents::delete_document(&id, &pool).await?;
    Ok(HttpResponse::Ok().json(output(())))
}
