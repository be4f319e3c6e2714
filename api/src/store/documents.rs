//! File metadata and the public platform documents that reference it.
//! Binary storage lives in an external service; only metadata is kept
//! here.

use sqlx::PgPool;

use payloads::responses::{FileItem, PlatformDocumentItem};
use payloads::{FileId, ListQuery, PlatformDocumentId, requests};

use crate::listing::{ListSpec, SortColumns};
use crate::store::StoreError;
use crate::time::TimeSource;

const FILE_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("name", "name"),
    ("size", "size"),
]);

const DOCUMENT_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("name", "name"),
]);

pub async fn list_files(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<FileItem>), StoreError> {
    let spec = ListSpec::from_query(query, &FILE_SORT)?
        .search(query.query.as_deref(), &["name", "content_type"])
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, name, content_type, size, created_at",
            "FROM files",
            pool,
        )
        .await?)
}

pub async fn read_file(
    pool: &PgPool,
    id: &FileId,
) -> Result<FileItem, StoreError> {
    sqlx::query_as::<_, FileItem>(
        "SELECT id, name, content_type, size, created_at
        FROM files WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::DocumentNotFound))
}

const DOCUMENT_COLUMNS: &str =
    "SELECT id, name, description, file_id, created_at, updated_at";

pub async fn list_documents(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<PlatformDocumentItem>), StoreError> {
    let spec = ListSpec::from_query(query, &DOCUMENT_SORT)?
        .search(query.query.as_deref(), &["name", "description"])
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(DOCUMENT_COLUMNS, "FROM platform_documents", pool)
        .await?)
}

pub async fn read_document(
    pool: &PgPool,
    id: &PlatformDocumentId,
) -> Result<PlatformDocumentItem, StoreError> {
    sqlx::query_as::<_, PlatformDocumentItem>(&format!(
        "{DOCUMENT_COLUMNS} FROM platform_documents WHERE id = $1;"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::DocumentNotFound))
}

pub async fn create_document(
    details: &requests::CreatePlatformDocument,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<PlatformDocumentItem, StoreError> {
    if let Some(file_id) = &details.file_id {
        let _ = read_file(pool, file_id).await?;
    }
    Ok(sqlx::query_as::<_, PlatformDocumentItem>(
        "INSERT INTO platform_documents (name, description, file_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4)
        RETURNING id, name, description, file_id, created_at, updated_at;",
    )
    .bind(&details.name)
    .bind(&details.description)
    .bind(details.file_id)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await?)
}

pub async fn update_document(
    id: &PlatformDocumentId,
    details: &requests::UpdatePlatformDocument,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<PlatformDocumentItem, StoreError> {
    if let Some(file_id) = &details.file_id {
        let _ = read_file(pool, file_id).await?;
    }
    sqlx::query_as::<_, PlatformDocumentItem>(
        "UPDATE platform_documents
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            file_id = COALESCE($4, file_id),
            updated_at = $5
        WHERE id = $1
        RETURNING id, name, description, file_id, created_at, updated_at;",
    )
    .bind(id)
    .bind(&details.name)
    .bind(&details.description)
    .bind(details.file_id)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::DocumentNotFound))
}

pub async fn delete_document(
    id: &PlatformDocumentId,
    pool: &PgPool,
) -> Result<(), StoreError> {
    let rows = sqlx::query("DELETE FROM platform_documents WHERE id = $1;")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(StoreError::DocumentNotFound);
    }
    Ok(())
}
