//! Reads over the unified ledger views.
//!
//! `history_investor` and `history_borrower` union the per-operation
//! projections into one homogeneous row shape per audience (see the
//! history-views migration). Rows are returned newest first; identical
//! timestamps order by `operation_id DESC` so pagination is stable
//! regardless of plan.

use jiff::Timestamp;
use sqlx::PgPool;

use payloads::UserId;
use payloads::list::ListQuery;
use payloads::responses::HistoryEntry;

use crate::listing::Page;
use crate::store::StoreError;
use crate::time::TimeSource;

/// Which union view to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Investor,
    Borrower,
}

impl Audience {
    fn view(&self) -> &'static str {
        match self {
            Self::Investor => "history_investor",
            Self::Borrower => "history_borrower",
        }
    }
}

/// One page of a user's ledger, bounded to `[from, to]` (defaulting to
/// all of history up to now).
#[tracing::instrument(skip(query, pool, time_source))]
pub async fn list(
    audience: Audience,
    user_id: &UserId,
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<HistoryEntry>), StoreError> {
    use jiff_sqlx::ToSqlx;

    let page = Page::from_query(query);
    let from = query.from.unwrap_or(Timestamp::UNIX_EPOCH);
    let to = query.to.unwrap_or_else(|| time_source.now());
    let view = audience.view();

    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {view}
        WHERE user_id = $1 AND date >= $2 AND date <= $3;"
    ))
    .bind(user_id)
    .bind(from.to_sqlx())
    .bind(to.to_sqlx())
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, HistoryEntry>(&format!(
        "SELECT user_id, profile_type, operation_id, date, operation_type,
            income, expense, additional_data
        FROM {view}
        WHERE user_id = $1 AND date >= $2 AND date <= $3
        ORDER BY date DESC, operation_id DESC
        LIMIT $4 OFFSET $5;"
    ))
    .bind(user_id)
    .bind(from.to_sqlx())
    .bind(to.to_sqlx())
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok((count, items))
}
