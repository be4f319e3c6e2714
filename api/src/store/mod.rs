//! SQL store layer. One free function per operation over a `PgPool` (or
//! an explicit transaction for multi-statement writes), typed-id binds
//! throughout, and row structs decoded with `FromRow`. The database is
//! authoritative; nothing is cached in-process.

use crate::listing::ListError;

pub mod admins;
pub mod content;
pub mod documents;
pub mod funds;
pub mod history;
pub mod investments;
pub mod loans;
pub mod notifications;
pub mod settings;
pub mod support;
pub mod users;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
    #[error(transparent)]
    List(#[from] ListError),
    #[error("Admin not found")]
    AdminNotFound,
    #[error("Email exists")]
    EmailExists,
    #[error("User not found")]
    UserNotFound,
    #[error("User profile not found")]
    ProfileNotFound,
    #[error("Loan not found")]
    LoanNotFound,
    #[error("Investment not found")]
    InvestmentNotFound,
    #[error("Deposit not found")]
    DepositNotFound,
    #[error("Withdrawal not found")]
    WithdrawalNotFound,
    #[error("Bank operation not found")]
    BankOperationNotFound,
    #[error("Support request not found")]
    SupportRequestNotFound,
    #[error("Notification not found")]
    NotificationNotFound,
    #[error("Question not found")]
    QuestionNotFound,
    #[error("News not found")]
    NewsNotFound,
    #[error("Document not found")]
    DocumentNotFound,
    #[error("Setting not found")]
    SettingNotFound,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Status already assigned")]
    StatusAlreadyAssigned,
    #[error("User still has outstanding debt")]
    OutstandingDebt,
    #[error("Conflict")]
    Conflict,
}

impl StoreError {
    /// Collapse `RowNotFound` into the given domain error; everything
    /// else stays a database error.
    pub(crate) fn not_found(entity: StoreError) -> impl FnOnce(sqlx::Error) -> StoreError {
        move |e| match e {
            sqlx::Error::RowNotFound => entity,
            e => StoreError::Database(e),
        }
    }
}

/// Whether a database error is a unique-constraint violation.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation()
    )
}
