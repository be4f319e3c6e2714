//! Platform users and their borrower/investor profiles.
//!
//! Profile edits arrive from the customer platform staged in the
//! `updates` column; reads of unconfirmed profiles go through the
//! overlay merge, and `confirm_profile` folds the staged values into
//! canonical columns.

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTs;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use payloads::overlay::{self, ContactFields, EditState, PendingUpdates};
use payloads::responses::{
    ProfileDetails, ProfileItem, UserDetails, UserItem, UserStats,
    WalletItem,
};
use payloads::{
    ListQuery, ProfileId, ProfileKind, ProfileStatus, UserId, UserRole,
    UserStatus,
};

use crate::listing::{ListSpec, SortColumns};
use crate::store::StoreError;
use crate::time::TimeSource;

const USER_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("email", "email"),
    ("lastName", "last_name"),
    ("status", "status"),
]);

const PROFILE_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("status", "status"),
    ("role", "role"),
    ("type", "kind"),
]);

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub status: UserStatus,
    pub updates: Option<Json<PendingUpdates>>,
    pub settings: Json<serde_json::Value>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl User {
    fn contact(&self) -> ContactFields {
        ContactFields {
            email: self.email.clone(),
            phone: self.phone.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            middle_name: self.middle_name.clone(),
        }
    }

    fn edit_state(&self) -> EditState {
        EditState::from_updates(
            self.updates.as_ref().map(|json| json.0.clone()),
        )
    }

    /// Contact fields as the back office presents them: staged edits
    /// win whenever any are present.
    pub fn merged_contact(&self) -> ContactFields {
        overlay::merged(&self.contact(), &self.edit_state())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub wallet_id: payloads::WalletId,
    pub role: UserRole,
    pub kind: ProfileKind,
    pub status: ProfileStatus,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub updates: Option<Json<PendingUpdates>>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl UserProfile {
    fn contact(&self) -> ContactFields {
        ContactFields {
            email: self.email.clone(),
            phone: self.phone.clone(),
            ..Default::default()
        }
    }

    /// Profiles only merge while their status still reads through the
    /// overlay; an accepted profile presents canonical columns even if
    /// a stale `updates` blob lingers.
    pub fn merged_contact(&self) -> ContactFields {
        if !self.status.reads_through_overlay() {
            return self.contact();
        }
        let state = EditState::from_updates(
            self.updates.as_ref().map(|json| json.0.clone()),
        );
        overlay::merged(&self.contact(), &state)
    }
}

pub async fn read(pool: &PgPool, id: &UserId) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1;")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(StoreError::not_found(StoreError::UserNotFound))
}

pub async fn read_profile(
    pool: &PgPool,
    id: &ProfileId,
) -> Result<UserProfile, StoreError> {
    sqlx::query_as::<_, UserProfile>(
        "SELECT * FROM user_profiles WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::ProfileNotFound))
}

pub async fn list(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<UserItem>), StoreError> {
    // the role filter reaches across to profiles; values are parsed
    // against the closed enum before entering the SQL text
    let roles: Vec<UserRole> = query
        .role_values()
        .iter()
        .filter_map(|value| match value.as_str() {
            "borrower" => Some(UserRole::Borrower),
            "investor" => Some(UserRole::Investor),
            _ => None,
        })
        .collect();
    let from = if roles.is_empty() {
        "FROM users".to_string()
    } else {
        let role_list = roles
            .iter()
            .map(|role| format!("'{}'", role.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "FROM (SELECT * FROM users WHERE id IN
                (SELECT user_id FROM user_profiles
                 WHERE role IN ({role_list}))) users"
        )
    };

    let spec = ListSpec::from_query(query, &USER_SORT)?
        .search(
            query.query.as_deref(),
            &["email", "phone", "first_name", "last_name"],
        )
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, email, phone, first_name, last_name, middle_name,
                status, created_at",
            &from,
            pool,
        )
        .await?)
}

pub async fn stats(pool: &PgPool) -> Result<UserStats, StoreError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users;")
            .fetch_one(pool)
            .await?;
    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE status = 'active';",
    )
    .fetch_one(pool)
    .await?;
    let banned: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE status = 'banned';",
    )
    .fetch_one(pool)
    .await?;
    let investors: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT user_id) FROM user_profiles
        WHERE role = 'investor';",
    )
    .fetch_one(pool)
    .await?;
    let verified: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT user_id) FROM user_profiles
        WHERE status = 'accepted';",
    )
    .fetch_one(pool)
    .await?;

    Ok(UserStats {
        total,
        active,
        banned,
        investors,
        verified,
    })
}

/// A user with the overlay applied and all non-historical profiles.
pub async fn details(
    pool: &PgPool,
    id: &UserId,
) -> Result<UserDetails, StoreError> {
    let user = read(pool, id).await?;
    let profiles = profiles_of(pool, id).await?;
    let contact = user.merged_contact();
    Ok(UserDetails {
        id: user.id,
        full_name: contact.full_name(),
        contact,
        status: user.status,
        created_at: user.created_at,
        updated_at: user.updated_at,
        profiles,
    })
}

pub async fn profiles_of(
    pool: &PgPool,
    user_id: &UserId,
) -> Result<Vec<ProfileItem>, StoreError> {
    Ok(sqlx::query_as::<_, ProfileItem>(
        "SELECT id, user_id, role, kind, status, wallet_id, created_at
        FROM user_profiles
        WHERE user_id = $1 AND status != 'history'
        ORDER BY created_at DESC;",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// List profiles of one role, for the /borrowers and /investors
/// resources.
pub async fn list_profiles(
    role: UserRole,
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<ProfileItem>), StoreError> {
    let spec = ListSpec::from_query(query, &PROFILE_SORT)?
        .filter_any("role", vec![role.as_str().to_string()])
        .filter_any("status", query.status_values())
        .filter_any("kind", query.kind_values())
        .search(query.query.as_deref(), &["email", "phone", "status"])
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, user_id, role, kind, status, wallet_id, created_at",
            "FROM user_profiles",
            pool,
        )
        .await?)
}

pub async fn profile_details(
    pool: &PgPool,
    id: &ProfileId,
) -> Result<ProfileDetails, StoreError> {
    let profile = read_profile(pool, id).await?;
    let user = read(pool, &profile.user_id).await?;
    let wallet = sqlx::query_as::<_, WalletItem>(
        "SELECT id, account_number, balance, blocked_balance
        FROM wallets WHERE id = $1;",
    )
    .bind(profile.wallet_id)
    .fetch_one(pool)
    .await?;

    // profile-level contact wins; names come from the user record
    let user_contact = user.merged_contact();
    let mut contact = profile.merged_contact();
    contact.first_name = user_contact.first_name;
    contact.last_name = user_contact.last_name;
    contact.middle_name = user_contact.middle_name;

    Ok(ProfileDetails {
        id: profile.id,
        user_id: profile.user_id,
        role: profile.role,
        kind: profile.kind,
        status: profile.status,
        contact,
        wallet,
        created_at: profile.created_at,
        updated_at: profile.updated_at,
    })
}

/// Administrative approval of a profile: fold the staged edits of the
/// profile and its user into canonical columns, clear both overlays and
/// mark the profile accepted. One transaction; the profile row is
/// locked so two concurrent confirmations cannot both apply.
#[tracing::instrument(skip(pool, time_source))]
pub async fn confirm_profile(
    id: &ProfileId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<ProfileDetails, StoreError> {
    let mut tx = pool.begin().await?;

    let profile = sqlx::query_as::<_, UserProfile>(
        "SELECT * FROM user_profiles WHERE id = $1 FOR UPDATE;",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::ProfileNotFound)?;

    if !profile.status.reads_through_overlay() {
        return Err(StoreError::StatusAlreadyAssigned);
    }

    let merged = profile.merged_contact();
    sqlx::query(
        "UPDATE user_profiles
        SET email = $2, phone = $3, updates = NULL, status = 'accepted',
            updated_at = $4
        WHERE id = $1;",
    )
    .bind(id)
    .bind(&merged.email)
    .bind(&merged.phone)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id = $1 FOR UPDATE;",
    )
    .bind(profile.user_id)
    .fetch_one(&mut *tx)
    .await?;
    let merged_user = user.merged_contact();
    sqlx::query(
        "UPDATE users
        SET email = $2, phone = $3, first_name = $4, last_name = $5,
            middle_name = $6, updates = NULL, updated_at = $7
        WHERE id = $1;",
    )
    .bind(user.id)
    .bind(&merged_user.email)
    .bind(&merged_user.phone)
    .bind(&merged_user.first_name)
    .bind(&merged_user.last_name)
    .bind(&merged_user.middle_name)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    profile_details(pool, id).await
}

/// Ban a user, remembering the previous status so unban can restore it.
#[tracing::instrument(skip(pool, time_source))]
pub async fn ban(
    id: &UserId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let user = read(pool, id).await?;
    if user.status == UserStatus::Banned {
        return Err(StoreError::StatusAlreadyAssigned);
    }

    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE users
        SET status = 'banned',
            settings = jsonb_set(settings, '{oldStatus}', to_jsonb(status::text)),
            updated_at = $2
        WHERE id = $1;",
    )
    .bind(id)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO user_notifications (user_id, message, created_at)
        VALUES ($1, $2, $3);",
    )
    .bind(id)
    .bind("Your account has been suspended.")
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

#[tracing::instrument(skip(pool, time_source))]
pub async fn unban(
    id: &UserId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let user = read(pool, id).await?;
    if user.status != UserStatus::Banned {
        return Err(StoreError::StatusAlreadyAssigned);
    }

    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE users
        SET status = COALESCE(settings->>'oldStatus', 'active')::user_status,
            settings = settings - 'oldStatus',
            updated_at = $2
        WHERE id = $1;",
    )
    .bind(id)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO user_notifications (user_id, message, created_at)
        VALUES ($1, $2, $3);",
    )
    .bind(id)
    .bind("Your account has been reinstated.")
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Remove a user. Refused while any borrower debt or live investment
/// remains; financial rows that must survive for the ledger block the
/// delete at the constraint level and surface the same error.
#[tracing::instrument(skip(pool))]
pub async fn delete(id: &UserId, pool: &PgPool) -> Result<(), StoreError> {
    let _ = read(pool, id).await?;

    let has_debt: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM loans
            WHERE borrower_id = $1 AND status IN ('accepted', 'active')
        );",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if has_debt {
        return Err(StoreError::OutstandingDebt);
    }

    let has_investments: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM investments
            WHERE user_id = $1 AND status != 'cancelled'
        );",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if has_investments {
        return Err(StoreError::OutstandingDebt);
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1;")
        .bind(id)
        .execute(pool)
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err))
            if db_err.is_foreign_key_violation() =>
        {
            // fees or other ledger rows still reference the user
            Err(StoreError::OutstandingDebt)
        }
        Err(e) => Err(e.into()),
    }
}

/// User-facing notifications of one user, newest first.
pub async fn notifications(
    user_id: &UserId,
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<
    (i64, Vec<payloads::responses::NotificationItem>),
    StoreError,
> {
    let _ = read(pool, user_id).await?;

    const SORT: SortColumns =
        SortColumns(&[("createdAt", "created_at"), ("read", "read")]);
    let spec = ListSpec::from_query(query, &SORT)?
        .filter_any("user_id", vec![user_id.to_string()])
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, message, read, created_at",
            "FROM user_notifications",
            pool,
        )
        .await?)
}
