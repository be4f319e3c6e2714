//! Investor positions in loans.

use sqlx::PgPool;

use payloads::responses::InvestmentItem;
use payloads::{InvestmentId, InvestmentStatus, ListQuery, UserId};

use crate::listing::{ListSpec, SortColumns};
use crate::store::StoreError;
use crate::time::TimeSource;

const INVESTMENT_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("value", "value"),
    ("status", "status"),
]);

const INVESTMENT_COLUMNS: &str =
    "SELECT id, loan_id, user_id, value, status, created_at";

pub async fn read(
    pool: &PgPool,
    id: &InvestmentId,
) -> Result<InvestmentItem, StoreError> {
    sqlx::query_as::<_, InvestmentItem>(&format!(
        "{INVESTMENT_COLUMNS} FROM investments WHERE id = $1;"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::InvestmentNotFound))
}

pub async fn list(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<InvestmentItem>), StoreError> {
    let spec = ListSpec::from_query(query, &INVESTMENT_SORT)?
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(INVESTMENT_COLUMNS, "FROM investments", pool)
        .await?)
}

/// Positions held by one investor.
pub async fn list_for_user(
    user_id: &UserId,
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<InvestmentItem>), StoreError> {
    let spec = ListSpec::from_query(query, &INVESTMENT_SORT)?
        .filter_any("user_id", vec![user_id.to_string()])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(INVESTMENT_COLUMNS, "FROM investments", pool)
        .await?)
}

/// Cancel a position that has not been funded into the loan yet.
#[tracing::instrument(skip(pool, time_source))]
pub async fn cancel(
    id: &InvestmentId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<InvestmentItem, StoreError> {
    let investment = read(pool, id).await?;
    if investment.status == InvestmentStatus::Cancelled {
        return Err(StoreError::StatusAlreadyAssigned);
    }

    sqlx::query(
        "UPDATE investments SET status = 'cancelled', updated_at = $2
        WHERE id = $1;",
    )
    .bind(id)
    .bind(time_source.now_sqlx())
    .execute(pool)
    .await?;

    read(pool, id).await
}
