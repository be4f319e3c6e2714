//! Money-movement resources: /deposits, /withdrawals, the bank
//! /registry and the /revise reconciliation report.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use sqlx::PgPool;

use payloads::requests::DeclineWithdrawal;
use payloads::responses::{output, output_pagination};
use payloads::{BankOperationId, DepositId, Resource, WithdrawalId};

use crate::auth::{AuthedAdmin, confirm_operation};
use crate::store;
use crate::time::TimeSource;

use super::{ApiError, parse_list};

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/deposits")]
pub async fn list_deposits(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Deposits)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::funds::list_deposits(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/deposits/{id}")]
pub async fn get_deposit(
    admin: AuthedAdmin,
    id: web::Path<DepositId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Deposits)?;
    let deposit = store::funds::read_deposit(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(deposit)))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/withdrawals")]
pub async fn list_withdrawals(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Withdrawals)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::funds::list_withdrawals(&query, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/withdrawals/{id}")]
pub async fn get_withdrawal(
    admin: AuthedAdmin,
    id: web::Path<WithdrawalId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Withdrawals)?;
    let details = store::funds::withdrawal_details(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(details)))
}

/// Pay a pending withdrawal out. Step-up confirmed.
#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/withdrawals/{id}/execute")]
pub async fn execute_withdrawal(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<WithdrawalId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Withdrawals)?;
    confirm_operation(&req, &admin, &time_source)?;
    let details =
        store::funds::execute_withdrawal(&id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output(details)))
}

/// Refuse a pending withdrawal. Step-up confirmed.
#[tracing::instrument(skip(admin, req, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/withdrawals/{id}/decline")]
pub async fn decline_withdrawal(
    admin: AuthedAdmin,
    req: HttpRequest,
    id: web::Path<WithdrawalId>,
    details: web::Json<DeclineWithdrawal>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Withdrawals)?;
    confirm_operation(&req, &admin, &time_source)?;
    let details = store::funds::decline_withdrawal(
        &id,
        details.comment.as_deref(),
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output(details)))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/registry")]
pub async fn list_registry(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Registry)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::funds::list_registry(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

/// One bank operation with its raw exchange payloads.
#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/registry/{id}")]
pub async fn get_registry_operation(
    admin: AuthedAdmin,
    id: web::Path<BankOperationId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Registry)?;
    let operation = store::funds::read_bank_operation(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(operation)))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/revise")]
pub async fn list_revise(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Revise)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::funds::list_revise(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}
