//! Customer support tickets and admin replies.

use sqlx::PgPool;

use payloads::responses::{
    SupportReplyItem, SupportRequestDetails, SupportRequestItem,
};
use payloads::{AdminId, ListQuery, SupportRequestId, SupportStatus};

use crate::listing::{ListSpec, SortColumns};
use crate::store::StoreError;
use crate::time::TimeSource;

const SUPPORT_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("status", "status"),
    ("subject", "subject"),
]);

const REQUEST_COLUMNS: &str =
    "SELECT id, user_id, subject, message, status, created_at";

pub async fn read(
    pool: &PgPool,
    id: &SupportRequestId,
) -> Result<SupportRequestItem, StoreError> {
    sqlx::query_as::<_, SupportRequestItem>(&format!(
        "{REQUEST_COLUMNS} FROM support_requests WHERE id = $1;"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::SupportRequestNotFound))
}

pub async fn list(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<SupportRequestItem>), StoreError> {
    let spec = ListSpec::from_query(query, &SUPPORT_SORT)?
        .search(query.query.as_deref(), &["subject", "message"])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(REQUEST_COLUMNS, "FROM support_requests", pool)
        .await?)
}

pub async fn details(
    pool: &PgPool,
    id: &SupportRequestId,
) -> Result<SupportRequestDetails, StoreError> {
    let request = read(pool, id).await?;
    let replies = sqlx::query_as::<_, SupportReplyItem>(
        "SELECT id, request_id, admin_id, message, created_at
        FROM support_replies WHERE request_id = $1
        ORDER BY created_at;",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(SupportRequestDetails { request, replies })
}

/// Post an admin reply: records the reply, flips an open ticket to
/// answered and notifies the requesting user.
#[tracing::instrument(skip(message, pool, time_source))]
pub async fn reply(
    id: &SupportRequestId,
    admin_id: &AdminId,
    message: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<SupportReplyItem, StoreError> {
    let request = read(pool, id).await?;
    if request.status == SupportStatus::Closed {
        return Err(StoreError::Conflict);
    }

    let mut tx = pool.begin().await?;

    let reply = sqlx::query_as::<_, SupportReplyItem>(
        "INSERT INTO support_replies (request_id, admin_id, message, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, request_id, admin_id, message, created_at;",
    )
    .bind(id)
    .bind(admin_id)
    .bind(message)
    .bind(time_source.now_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE support_requests SET status = 'answered', updated_at = $2
        WHERE id = $1 AND status = 'open';",
    )
    .bind(id)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO user_notifications (user_id, message, created_at)
        VALUES ($1, $2, $3);",
    )
    .bind(request.user_id)
    .bind("Support has replied to your request.")
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(reply)
}

#[tracing::instrument(skip(pool, time_source))]
pub async fn close(
    id: &SupportRequestId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<SupportRequestItem, StoreError> {
    let request = read(pool, id).await?;
    if request.status == SupportStatus::Closed {
        return Err(StoreError::StatusAlreadyAssigned);
    }

    sqlx::query(
        "UPDATE support_requests SET status = 'closed', updated_at = $2
        WHERE id = $1;",
    )
    .bind(id)
    .bind(time_source.now_sqlx())
    .execute(pool)
    .await?;

    read(pool, id).await
}
