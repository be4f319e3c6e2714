//! The role-scoped profile resources: /borrowers and /investors, plus
//! their per-user ledgers.

use actix_web::{HttpRequest, HttpResponse, get, web};
use sqlx::PgPool;

use payloads::responses::{output, output_pagination};
use payloads::{ProfileId, Resource, UserId, UserRole};

use crate::auth::AuthedAdmin;
use crate::store;
use crate::store::history::Audience;
use crate::time::TimeSource;

use super::{ApiError, ErrorCode, parse_list};

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/borrowers")]
pub async fn list_borrowers(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let query = parse_list(&req)?;
    let (count, items) = store::users::list_profiles(
        UserRole::Borrower,
        &query,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/borrowers/{id}")]
pub async fn get_borrower(
    admin: AuthedAdmin,
    id: web::Path<ProfileId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let details = store::users::profile_details(&pool, &id).await?;
    if details.role != UserRole::Borrower {
        return Err(ApiError::with_msg(
            ErrorCode::NotFound,
            "User profile not found",
        ));
    }
    Ok(HttpResponse::Ok().json(output(details)))
}

/// Loans of one borrower (addressed by user id).
#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/borrowers/{id}/loans")]
pub async fn list_borrower_loans(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Loans)?;
    let query = parse_list(&req)?;
    let (count, items) = store::loans::list_for_borrower(
        &id,
        &query,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

/// Borrower-side ledger of one user: deposits, withdrawals, loan
/// issues, payments made and fees, newest first.
#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/borrowers/{id}/history")]
pub async fn borrower_history(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let query = parse_list(&req)?;
    let (count, items) = store::history::list(
        Audience::Borrower,
        &id,
        &query,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/investors")]
pub async fn list_investors(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let query = parse_list(&req)?;
    let (count, items) = store::users::list_profiles(
        UserRole::Investor,
        &query,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/investors/{id}")]
pub async fn get_investor(
    admin: AuthedAdmin,
    id: web::Path<ProfileId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let details = store::users::profile_details(&pool, &id).await?;
    if details.role != UserRole::Investor {
        return Err(ApiError::with_msg(
            ErrorCode::NotFound,
            "User profile not found",
        ));
    }
    Ok(HttpResponse::Ok().json(output(details)))
}

/// Positions of one investor (addressed by user id).
#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/investors/{id}/investments")]
pub async fn list_investor_investments(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Investments)?;
    let query = parse_list(&req)?;
    let (count, items) = store::investments::list_for_user(
        &id,
        &query,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

/// Investor-side ledger of one user: deposits, withdrawals,
/// investments, payments received and fees, newest first.
#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/investors/{id}/history")]
pub async fn investor_history(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<UserId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Users)?;
    let query = parse_list(&req)?;
    let (count, items) = store::history::list(
        Audience::Investor,
        &id,
        &query,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}
