//! FAQ and news management.

use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put, web,
};
use sqlx::PgPool;

use payloads::requests::{
    CreateNews, CreateQuestion, UpdateNews, UpdateQuestion,
};
use payloads::responses::{output, output_pagination};
use payloads::{NewsId, QuestionId, Resource};

use crate::auth::AuthedAdmin;
use crate::store;
use crate::time::TimeSource;

use super::{ApiError, parse_list};

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/faq")]
pub async fn list_faq(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Faq)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::content::list_questions(&query, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/faq")]
pub async fn create_question(
    admin: AuthedAdmin,
    details: web::Json<CreateQuestion>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Faq)?;
    let violations = details.validate();
    if !violations.is_empty() {
        return Err(ApiError::validation(violations));
    }
    let question =
        store::content::create_question(&details, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output(question)))
}

#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[put("/faq/{id}")]
pub async fn update_question(
    admin: AuthedAdmin,
    id: web::Path<QuestionId>,
    details: web::Json<UpdateQuestion>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Faq)?;
    let question = store::content::update_question(
        &id,
        &details,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output(question)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[delete("/faq/{id}")]
pub async fn delete_question(
    admin: AuthedAdmin,
    id: web::Path<QuestionId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Faq)?;
    store::content::delete_question(&id, &pool).await?;
    Ok(HttpResponse::Ok().json(output(())))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/news")]
pub async fn list_news(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::News)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::content::list_news(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/news/{id}")]
pub async fn get_news(
    admin: AuthedAdmin,
    id: web::Path<NewsId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::News)?;
    let news = store::content::read_news(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(news)))
}

#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/news")]
pub async fn create_news(
    admin: AuthedAdmin,
    details: web::Json<CreateNews>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::News)?;
    let violations = details.validate();
    if !violations.is_empty() {
        return Err(ApiError::validation(violations));
    }
    let news =
        store::content::create_news(&details, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output(news)))
}

#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[put("/news/{id}")]
pub async fn update_news(
    admin: AuthedAdmin,
    id: web::Path<NewsId>,
    details: web::Json<UpdateNews>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::News)?;
    let news =
        store::content::update_news(&id, &details, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output(news)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[delete("/news/{id}")]
pub async fn delete_news(
    admin: AuthedAdmin,
    id: web::Path<NewsId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::News)?;
    store::content::delete_news(&id, &pool).await?;
    Ok(HttpResponse::Ok().json(output(())))
}
