//! Operator accounts, their roles and sessions.

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTs;
use sqlx::{FromRow, PgPool};

use payloads::responses::{AdminDetails, AdminItem, SessionItem};
use payloads::{
    AdminId, AdminRoleId, AdminSessionId, AdminStatus, ListQuery,
    RoleGrants,
};

use crate::listing::{ListSpec, SortColumns};
use crate::store::{StoreError, is_unique_violation};
use crate::time::TimeSource;

const ADMIN_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("email", "email"),
    ("status", "status"),
]);

const SESSION_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("status", "status"),
]);

#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: AdminId,
    pub email: String,
    pub password_hash: String,
    pub status: AdminStatus,
    pub role_id: AdminRoleId,
    pub totp_secret: Option<String>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

/// An active session joined with its admin and role, as loaded by the
/// bearer-token extractor on every authenticated request.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSession {
    pub session_id: AdminSessionId,
    pub admin_id: AdminId,
    pub email: String,
    pub status: AdminStatus,
    pub totp_secret: Option<String>,
    #[sqlx(flatten)]
    pub grants: RoleGrants,
}

/// Create an admin with its role row. Fails with `EmailExists` when the
/// email is already registered.
pub async fn create(
    email: &str,
    password_hash: &str,
    grants: &RoleGrants,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Admin, StoreError> {
    let mut tx = pool.begin().await?;

    let role_id = insert_role(grants, &mut tx).await?;

    let result = sqlx::query_as::<_, Admin>(
        "INSERT INTO admins (email, password_hash, status, role_id, created_at, updated_at)
        VALUES ($1, $2, 'new', $3, $4, $4)
        RETURNING *;",
    )
    .bind(email)
    .bind(password_hash)
    .bind(role_id)
    .bind(time_source.now_sqlx())
    .fetch_one(&mut *tx)
    .await;

    let admin = match result {
        Ok(admin) => admin,
        Err(e) if is_unique_violation(&e) => {
            return Err(StoreError::EmailExists);
        }
        Err(e) => return Err(e.into()),
    };

    tx.commit().await?;
    Ok(admin)
}

async fn insert_role(
    grants: &RoleGrants,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<AdminRoleId, StoreError> {
    let role_id = sqlx::query_as::<_, AdminRoleId>(
        "INSERT INTO admin_roles (
            users, loans, investments, deposits, withdrawals, registry,
            revise, support, notifications, documents, settings, faq,
            news, admins
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING id;",
    )
    .bind(grants.users)
    .bind(grants.loans)
    .bind(grants.investments)
    .bind(grants.deposits)
    .bind(grants.withdrawals)
    .bind(grants.registry)
    .bind(grants.revise)
    .bind(grants.support)
    .bind(grants.notifications)
    .bind(grants.documents)
    .bind(grants.settings)
    .bind(grants.faq)
    .bind(grants.news)
    .bind(grants.admins)
    .fetch_one(&mut **tx)
    .await?;
    Ok(role_id)
}

pub async fn read(pool: &PgPool, id: &AdminId) -> Result<Admin, StoreError> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = $1;")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(StoreError::not_found(StoreError::AdminNotFound))
}

pub async fn read_grants(
    pool: &PgPool,
    role_id: &AdminRoleId,
) -> Result<RoleGrants, StoreError> {
    Ok(sqlx::query_as::<_, RoleGrants>(
        "SELECT users, loans, investments, deposits, withdrawals, registry,
            revise, support, notifications, documents, settings, faq,
            news, admins
        FROM admin_roles WHERE id = $1;",
    )
    .bind(role_id)
    .fetch_one(pool)
    .await?)
}

pub async fn details(
    pool: &PgPool,
    id: &AdminId,
) -> Result<AdminDetails, StoreError> {
    let admin = read(pool, id).await?;
    let grants = read_grants(pool, &admin.role_id).await?;
    Ok(AdminDetails {
        id: admin.id,
        email: admin.email,
        status: admin.status,
        grants,
        created_at: admin.created_at,
        updated_at: admin.updated_at,
    })
}

pub async fn list(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<AdminItem>), StoreError> {
    let spec = ListSpec::from_query(query, &ADMIN_SORT)?
        .search(query.query.as_deref(), &["email", "status"])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, email, status, created_at",
            "FROM admins",
            pool,
        )
        .await?)
}

pub async fn update_grants(
    id: &AdminId,
    grants: &RoleGrants,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<AdminDetails, StoreError> {
    let admin = read(pool, id).await?;
    sqlx::query(
        "UPDATE admin_roles SET
            users = $2, loans = $3, investments = $4, deposits = $5,
            withdrawals = $6, registry = $7, revise = $8, support = $9,
            notifications = $10, documents = $11, settings = $12,
            faq = $13, news = $14, admins = $15
        WHERE id = $1;",
    )
    .bind(admin.role_id)
    .bind(grants.users)
    .bind(grants.loans)
    .bind(grants.investments)
    .bind(grants.deposits)
    .bind(grants.withdrawals)
    .bind(grants.registry)
    .bind(grants.revise)
    .bind(grants.support)
    .bind(grants.notifications)
    .bind(grants.documents)
    .bind(grants.settings)
    .bind(grants.faq)
    .bind(grants.news)
    .bind(grants.admins)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE admins SET updated_at = $2 WHERE id = $1;")
        .bind(id)
        .bind(time_source.now_sqlx())
        .execute(pool)
        .await?;

    details(pool, id).await
}

pub async fn set_status(
    id: &AdminId,
    status: AdminStatus,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Admin, StoreError> {
    let admin = read(pool, id).await?;
    if admin.status == status {
        return Err(StoreError::StatusAlreadyAssigned);
    }
    Ok(sqlx::query_as::<_, Admin>(
        "UPDATE admins SET status = $2, updated_at = $3
        WHERE id = $1 RETURNING *;",
    )
    .bind(id)
    .bind(status)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await?)
}

/// Store the (not yet activated) TOTP secret for a fresh admin.
pub async fn set_totp_secret(
    id: &AdminId,
    secret: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let rows = sqlx::query(
        "UPDATE admins SET totp_secret = $2, updated_at = $3
        WHERE id = $1 AND status = 'new';",
    )
    .bind(id)
    .bind(secret)
    .bind(time_source.now_sqlx())
    .execute(pool)
    .await?
    .rows_affected();
    if rows == 0 {
        return Err(StoreError::Conflict);
    }
    Ok(())
}

/// Flip a fresh admin to active once it has proven it can produce codes.
pub async fn activate(
    id: &AdminId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let rows = sqlx::query(
        "UPDATE admins SET status = 'active', updated_at = $2
        WHERE id = $1 AND status = 'new' AND totp_secret IS NOT NULL;",
    )
    .bind(id)
    .bind(time_source.now_sqlx())
    .execute(pool)
    .await?
    .rows_affected();
    if rows == 0 {
        return Err(StoreError::Conflict);
    }
    Ok(())
}

pub async fn create_session(
    admin_id: &AdminId,
    ip: &str,
    user_agent: Option<&str>,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<AdminSessionId, StoreError> {
    Ok(sqlx::query_as::<_, AdminSessionId>(
        "INSERT INTO admin_sessions (admin_id, status, ip, user_agent, created_at, updated_at)
        VALUES ($1, 'active', $2, $3, $4, $4)
        RETURNING id;",
    )
    .bind(admin_id)
    .bind(ip)
    .bind(user_agent)
    .bind(time_source.now_sqlx())
    .fetch_one(pool)
    .await?)
}

pub async fn finish_session(
    session_id: &AdminSessionId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let rows = sqlx::query(
        "UPDATE admin_sessions SET status = 'finished', updated_at = $2
        WHERE id = $1 AND status = 'active';",
    )
    .bind(session_id)
    .bind(time_source.now_sqlx())
    .execute(pool)
    .await?
    .rows_affected();
    if rows == 0 {
        return Err(StoreError::SessionNotFound);
    }
    Ok(())
}

/// Load an active session with its admin and role grants. `None` when
/// the session does not exist or has been finished.
pub async fn active_session(
    session_id: &AdminSessionId,
    pool: &PgPool,
) -> Result<Option<ActiveSession>, StoreError> {
    Ok(sqlx::query_as::<_, ActiveSession>(
        "SELECT
            s.id AS session_id,
            a.id AS admin_id,
            a.email,
            a.status,
            a.totp_secret,
            r.users, r.loans, r.investments, r.deposits, r.withdrawals,
            r.registry, r.revise, r.support, r.notifications, r.documents,
            r.settings, r.faq, r.news, r.admins
        FROM admin_sessions s
        JOIN admins a ON a.id = s.admin_id
        JOIN admin_roles r ON r.id = a.role_id
        WHERE s.id = $1 AND s.status = 'active';",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn list_sessions(
    admin_id: &AdminId,
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<SessionItem>), StoreError> {
    // verify the admin exists so an unknown id 404s instead of listing
    // an empty page
    let _ = read(pool, admin_id).await?;

    let spec = ListSpec::from_query(query, &SESSION_SORT)?
        .filter_any("admin_id", vec![admin_id.to_string()])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, ip, user_agent, status, created_at",
            "FROM admin_sessions",
            pool,
        )
        .await?)
}

/// Session bookkeeping for refresh: finish the old session and open a
/// replacement in one transaction.
pub async fn rotate_session(
    session_id: &AdminSessionId,
    admin_id: &AdminId,
    ip: &str,
    user_agent: Option<&str>,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<AdminSessionId, StoreError> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE admin_sessions SET status = 'finished', updated_at = $2
        WHERE id = $1 AND status = 'active';",
    )
    .bind(session_id)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if rows == 0 {
        return Err(StoreError::SessionNotFound);
    }

    let new_session_id = sqlx::query_as::<_, AdminSessionId>(
        "INSERT INTO admin_sessions (admin_id, status, ip, user_agent, created_at, updated_at)
        VALUES ($1, 'active', $2, $3, $4, $4)
        RETURNING id;",
    )
    .bind(admin_id)
    .bind(ip)
    .bind(user_agent)
    .bind(time_source.now_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(new_session_id)
}

/// Used at startup and by the test harness: ensure a root admin exists.
pub async fn seed_root_admin(
    email: &str,
    password_hash: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Admin, StoreError> {
    if let Some(admin) =
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = $1;")
            .bind(email)
            .fetch_optional(pool)
            .await?
    {
        return Ok(admin);
    }
    create(email, password_hash, &RoleGrants::root(), pool, time_source)
        .await
}
