//! Loans, their payment schedules and per-loan stats.

use rust_decimal::Decimal;
use sqlx::PgPool;

use payloads::responses::{
    InvestmentItem, LoanDetails, LoanItem, LoanStats, PaymentItem,
};
use payloads::{ListQuery, LoanId, LoanStatus, UserId};

use crate::listing::{ListSpec, SortColumns};
use crate::store::StoreError;
use crate::time::TimeSource;

const LOAN_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("amount", "amount"),
    ("rate", "rate"),
    ("status", "status"),
    ("name", "name"),
    ("contractNumber", "contract_number"),
]);

const LOAN_COLUMNS: &str =
    "SELECT id, profile_id, borrower_id, name, contract_number,
        conclusion_contract_date, amount, rate, status, arrears, created_at";

pub async fn read(pool: &PgPool, id: &LoanId) -> Result<LoanItem, StoreError> {
    sqlx::query_as::<_, LoanItem>(&format!(
        "{LOAN_COLUMNS} FROM loans WHERE id = $1;"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::LoanNotFound))
}

pub async fn list(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<LoanItem>), StoreError> {
    let spec = ListSpec::from_query(query, &LOAN_SORT)?
        .search(query.query.as_deref(), &["name", "contract_number"])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec.fetch(LOAN_COLUMNS, "FROM loans", pool).await?)
}

/// Loans of one borrower, same convention as the global list.
pub async fn list_for_borrower(
    borrower_id: &UserId,
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<LoanItem>), StoreError> {
    let spec = ListSpec::from_query(query, &LOAN_SORT)?
        .filter_any("borrower_id", vec![borrower_id.to_string()])
        .search(query.query.as_deref(), &["name", "contract_number"])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec.fetch(LOAN_COLUMNS, "FROM loans", pool).await?)
}

pub async fn details(
    pool: &PgPool,
    id: &LoanId,
) -> Result<LoanDetails, StoreError> {
    let loan = read(pool, id).await?;
    let payments = payments(pool, id).await?;
    let investments = sqlx::query_as::<_, InvestmentItem>(
        "SELECT id, loan_id, user_id, value, status, created_at
        FROM investments WHERE loan_id = $1
        ORDER BY created_at DESC;",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(LoanDetails {
        loan,
        payments,
        investments,
    })
}

pub async fn payments(
    pool: &PgPool,
    id: &LoanId,
) -> Result<Vec<PaymentItem>, StoreError> {
    Ok(sqlx::query_as::<_, PaymentItem>(
        "SELECT id, loan_id, investment_id, payment_date, interest,
            principal, status
        FROM payments WHERE loan_id = $1
        ORDER BY payment_date;",
    )
    .bind(id)
    .fetch_all(pool)
    .await?)
}

/// Administrative status transition. The borrower is notified of
/// accept/reject decisions.
#[tracing::instrument(skip(pool, time_source))]
pub async fn update_status(
    id: &LoanId,
    status: LoanStatus,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<LoanItem, StoreError> {
    let loan = read(pool, id).await?;
    if loan.status == status {
        return Err(StoreError::StatusAlreadyAssigned);
    }

    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE loans SET status = $2, updated_at = $3 WHERE id = $1;",
    )
    .bind(id)
    .bind(status)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    let message = match status {
        LoanStatus::Accepted => Some("Your loan application was approved."),
        LoanStatus::Rejected => Some("Your loan application was declined."),
        _ => None,
    };
    if let Some(message) = message {
        sqlx::query(
            "INSERT INTO user_notifications (user_id, message, created_at)
            VALUES ($1, $2, $3);",
        )
        .bind(loan.borrower_id)
        .bind(message)
        .bind(time_source.now_sqlx())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    read(pool, id).await
}

/// Delete a loan application. Refused once money is attached.
#[tracing::instrument(skip(pool))]
pub async fn delete(id: &LoanId, pool: &PgPool) -> Result<(), StoreError> {
    let _ = read(pool, id).await?;

    let has_investments: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM investments
            WHERE loan_id = $1 AND status != 'cancelled'
        );",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if has_investments {
        return Err(StoreError::Conflict);
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM payments WHERE loan_id = $1;")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM loan_issues WHERE loan_id = $1;")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM investments WHERE loan_id = $1;")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM loans WHERE id = $1;")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn stats(pool: &PgPool) -> Result<LoanStats, StoreError> {
    let counts: Vec<(LoanStatus, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM loans GROUP BY status;",
    )
    .fetch_all(pool)
    .await?;

    let mut stats = LoanStats {
        total: 0,
        pending: 0,
        accepted: 0,
        active: 0,
        repaid: 0,
        rejected: 0,
        invested_total: Decimal::ZERO,
    };
    for (status, count) in counts {
        stats.total += count;
        match status {
            LoanStatus::Pending => stats.pending = count,
            LoanStatus::Accepted => stats.accepted = count,
            LoanStatus::Active => stats.active = count,
            LoanStatus::Repaid => stats.repaid = count,
            LoanStatus::Rejected => stats.rejected = count,
        }
    }

    let invested: Option<Decimal> = sqlx::query_scalar(
        "SELECT SUM(value) FROM investments WHERE status != 'cancelled';",
    )
    .fetch_one(pool)
    .await?;
    stats.invested_total = invested.unwrap_or(Decimal::ZERO);

    Ok(stats)
}
