//! FAQ questions and platform news.

use sqlx::PgPool;

use payloads::responses::{NewsItem, QuestionItem};
use payloads::{ListQuery, NewsId, QuestionId, requests};

use crate::listing::{ListSpec, SortColumns};
use crate::store::StoreError;
use crate::time::TimeSource;

const FAQ_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("position", "position"),
]);

const NEWS_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("title", "title"),
]);

pub async fn list_questions(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<QuestionItem>), StoreError> {
    let spec = ListSpec::from_query(query, &FAQ_SORT)?
        .search(query.query.as_deref(), &["question", "answer"])
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, question, answer, position",
            "FROM questions",
            pool,
        )
        .await?)
}

pub async fn read_question(
    pool: &PgPool,
    id: &QuestionId,
) -> Result<QuestionItem, StoreError> {
    sqlx::query_as::<_, QuestionItem>(
        "SELECT id, question, answer, position FROM questions WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::QuestionNotFound))
}

pub async fn create_question(
    details: &requests::CreateQuestion,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<QuestionItem, StoreError> {
    Ok(sqlx::query_as::<_, QuestionItem>(
        "INSERT INTO questions (question, answer, position, created_at, updated_at)
        VALUES ($1, $2,
            (SELECT COALESCE(MAX(position), 0) + 1 FROM questions),
            $3, $3)
        RETURNING id, question, answer, position;",
    )
    .bind(&details.question)
    .bind(&details.answer)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await?)
}

pub async fn update_question(
    id: &QuestionId,
    details: &requests::UpdateQuestion,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<QuestionItem, StoreError> {
    sqlx::query_as::<_, QuestionItem>(
        "UPDATE questions
        SET question = COALESCE($2, question),
            answer = COALESCE($3, answer),
            updated_at = $4
        WHERE id = $1
        RETURNING id, question, answer, position;",
    )
    .bind(id)
    .bind(&details.question)
    .bind(&details.answer)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::QuestionNotFound))
}

pub async fn delete_question(
    id: &QuestionId,
    pool: &PgPool,
) -> Result<(), StoreError> {
    let rows = sqlx::query("DELETE FROM questions WHERE id = $1;")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(StoreError::QuestionNotFound);
    }
    Ok(())
}

pub async fn list_news(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<NewsItem>), StoreError> {
    let spec = ListSpec::from_query(query, &NEWS_SORT)?
        .search(query.query.as_deref(), &["title", "content"])
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, title, content, created_at, updated_at",
            "FROM news",
            pool,
        )
        .await?)
}

pub async fn read_news(
    pool: &PgPool,
    id: &NewsId,
) -> Result<NewsItem, StoreError> {
    sqlx::query_as::<_, NewsItem>(
        "SELECT id, title, content, created_at, updated_at
        FROM news WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::NewsNotFound))
}

pub async fn create_news(
    details: &requests::CreateNews,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<NewsItem, StoreError> {
    Ok(sqlx::query_as::<_, NewsItem>(
        "INSERT INTO news (title, content, created_at, updated_at)
        VALUES ($1, $2, $3, $3)
        RETURNING id, title, content, created_at, updated_at;",
    )
    .bind(&details.title)
    .bind(&details.content)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await?)
}

pub async fn update_news(
    id: &NewsId,
    details: &requests::UpdateNews,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<NewsItem, StoreError> {
    sqlx::query_as::<_, NewsItem>(
        "UPDATE news
        SET title = COALESCE($2, title),
            content = COALESCE($3, content),
            updated_at = $4
        WHERE id = $1
        RETURNING id, title, content, created_at, updated_at;",
    )
    .bind(id)
    .bind(&details.title)
    .bind(&details.content)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::NewsNotFound))
}

pub async fn delete_news(
    id: &NewsId,
    pool: &PgPool,
) -> Result<(), StoreError> {
    let rows = sqlx::query("DELETE FROM news WHERE id = $1;")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(StoreError::NewsNotFound);
    }
    Ok(())
}
