use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put, web,
};
use sqlx::PgPool;

use payloads::requests::UpdateLoanStatus;
use payloads::responses::{output, output_pagination};
use payloads::{InvestmentId, LoanId, Resource};

use crate::auth::AuthedAdmin;
use crate::store;
use crate::time::TimeSource;

use super::{ApiError, parse_list};

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/loans")]
pub async fn list_loans(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Loans)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::loans::list(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/loans/stats")]
pub async fn loan_stats(
    admin: AuthedAdmin,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Loans)?;
    let stats = store::loans::stats(&pool).await?;
    Ok(HttpResponse::Ok().json(output(stats)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/loans/{id}")]
pub async fn get_loan(
    admin: AuthedAdmin,
    id: web::Path<LoanId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Loans)?;
    let details = store::loans::details(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(details)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/loans/{id}/payments")]
pub async fn list_loan_payments(
    admin: AuthedAdmin,
    id: web::Path<LoanId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Loans)?;
    // 404 for unknown loans rather than an empty schedule
    let _ = store::loans::read(&pool, &id).await?;
    let payments = store::loans::payments(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(payments)))
}

#[tracing::instrument(skip(admin, details, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[put("/loans/{id}/status")]
pub async fn update_loan_status(
    admin: AuthedAdmin,
    id: web::Path<LoanId>,
    details: web::Json<UpdateLoanStatus>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Loans)?;
    let loan = store::loans::update_status(
        &id,
        details.status,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(output(loan)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[delete("/loans/{id}")]
pub async fn delete_loan(
    admin: AuthedAdmin,
    id: web::Path<LoanId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Loans)?;
    store::loans::delete(&id, &pool).await?;
    Ok(HttpResponse::Ok().json(output(())))
}

#[tracing::instrument(skip(admin, req, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[get("/investments")]
pub async fn list_investments(
    admin: AuthedAdmin,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Investments)?;
    let query = parse_list(&req)?;
    let (count, items) =
        store::investments::list(&query, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output_pagination(count, items)))
}

#[tracing::instrument(skip(admin, pool), fields(admin_id = tracing::field::Empty))]
#[get("/investments/{id}")]
pub async fn get_investment(
    admin: AuthedAdmin,
    id: web::Path<InvestmentId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_read(Resource::Investments)?;
    let investment = store::investments::read(&pool, &id).await?;
    Ok(HttpResponse::Ok().json(output(investment)))
}

#[tracing::instrument(skip(admin, pool, time_source), fields(admin_id = tracing::field::Empty))]
#[post("/investments/{id}/cancel")]
pub async fn cancel_investment(
    admin: AuthedAdmin,
    id: web::Path<InvestmentId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    admin.ensure_write(Resource::Investments)?;
    let investment =
        store::investments::cancel(&id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(output(investment)))
}
