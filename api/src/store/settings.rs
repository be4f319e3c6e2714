//! Key-value platform configuration.

use sqlx::PgPool;

use payloads::responses::SettingItem;

use crate::store::StoreError;
use crate::time::TimeSource;

pub async fn list(pool: &PgPool) -> Result<Vec<SettingItem>, StoreError> {
    Ok(sqlx::query_as::<_, SettingItem>(
        "SELECT key, value, updated_at FROM settings ORDER BY key;",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn read(
    pool: &PgPool,
    key: &str,
) -> Result<SettingItem, StoreError> {
    sqlx::query_as::<_, SettingItem>(
        "SELECT key, value, updated_at FROM settings WHERE key = $1;",
    )
    .bind(key)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::SettingNotFound))
}

pub async fn upsert(
    key: &str,
    value: &serde_json::Value,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<SettingItem, StoreError> {
    Ok(sqlx::query_as::<_, SettingItem>(
        "INSERT INTO settings (key, value, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (key)
        DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
        RETURNING key, value, updated_at;",
    )
    .bind(key)
    .bind(value)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await?)
}
