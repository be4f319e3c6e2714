//! Back-office notifications addressed to one admin or broadcast to all
//! (`admin_id IS NULL`).

use sqlx::PgPool;

use payloads::responses::NotificationItem;
use payloads::{AdminId, ListQuery, NotificationId};

use crate::listing::{Page, SortColumns, resolve_order_sql};
use crate::store::StoreError;
use crate::time::TimeSource;

const NOTIFICATION_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("read", "read"),
]);

/// Notifications visible to one admin: their own plus broadcasts.
pub async fn list(
    admin_id: &AdminId,
    query: &ListQuery,
    pool: &PgPool,
    _time_source: &TimeSource,
) -> Result<(i64, Vec<NotificationItem>), StoreError> {
    let page = Page::from_query(query);
    let order = resolve_order_sql(query, &NOTIFICATION_SORT)?;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM admin_notifications
        WHERE admin_id = $1 OR admin_id IS NULL;",
    )
    .bind(admin_id)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, NotificationItem>(&format!(
        "SELECT id, message, read, created_at
        FROM admin_notifications
        WHERE admin_id = $1 OR admin_id IS NULL
        ORDER BY {order}
        LIMIT $2 OFFSET $3;"
    ))
    .bind(admin_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok((count, items))
}

/// Mark a notification read. Restricted to rows the admin can see.
pub async fn mark_read(
    id: &NotificationId,
    admin_id: &AdminId,
    pool: &PgPool,
    _time_source: &TimeSource,
) -> Result<(), StoreError> {
    let rows = sqlx::query(
        "UPDATE admin_notifications SET read = true
        WHERE id = $1 AND (admin_id = $2 OR admin_id IS NULL);",
    )
    .bind(id)
    .bind(admin_id)
    .execute(pool)
    .await?
    .rows_affected();
    if rows == 0 {
        return Err(StoreError::NotificationNotFound);
    }
    Ok(())
}

/// Post a notification; `admin_id = None` broadcasts to everyone.
pub async fn create(
    admin_id: Option<&AdminId>,
    message: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<NotificationItem, StoreError> {
    Ok(sqlx::query_as::<_, NotificationItem>(
        "INSERT INTO admin_notifications (admin_id, message, created_at)
        VALUES ($1, $2, $3)
        RETURNING id, message, read, created_at;",
    )
    .bind(admin_id)
    .bind(message)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await?)
}
