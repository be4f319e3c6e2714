//! Shared wire types for the back-office API: typed ids, domain enums,
//! request/response bodies, the list-query descriptor and the staged-edit
//! overlay. The `use-sqlx` feature additionally derives sqlx traits so the
//! server can bind and decode these types directly.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod api_client;
pub mod list;
pub mod overlay;
pub mod requests;
pub mod responses;

pub use api_client::{ApiClient, ClientError};
pub use list::{ListQuery, OneOrMany, OrderMap, SortDirection};

macro_rules! define_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
                Display, Serialize, Deserialize,
            )]
            #[cfg_attr(
                feature = "use-sqlx",
                derive(sqlx::Type, sqlx::FromRow),
                sqlx(transparent)
            )]
            pub struct $name(pub Uuid);
        )+
    };
}

define_id!(
    UserId,
    ProfileId,
    WalletId,
    LoanId,
    LoanIssueId,
    InvestmentId,
    PaymentId,
    FeeId,
    DepositId,
    WithdrawalId,
    BankOperationId,
    BankReviseId,
    AdminId,
    AdminRoleId,
    AdminSessionId,
    SupportRequestId,
    SupportReplyId,
    NotificationId,
    FileId,
    PlatformDocumentId,
    QuestionId,
    NewsId,
);

/// Helper for decoding nullable timestamp columns with
/// `#[sqlx(try_from = "OptionalTimestamp")]`.
#[cfg(feature = "use-sqlx")]
#[derive(sqlx::Type)]
#[sqlx(transparent)]
pub struct OptionalTimestamp(pub Option<jiff_sqlx::Timestamp>);

#[cfg(feature = "use-sqlx")]
impl TryFrom<OptionalTimestamp> for Option<jiff::Timestamp> {
    type Error = <jiff::Timestamp as TryFrom<jiff_sqlx::Timestamp>>::Error;

    fn try_from(value: OptionalTimestamp) -> Result<Self, Self::Error> {
        value.0.map(jiff::Timestamp::try_from).transpose()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Borrower,
    Investor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Borrower => "borrower",
            Self::Investor => "investor",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "profile_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Individual,
    Entrepreneur,
    Entity,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Entrepreneur => "entrepreneur",
            Self::Entity => "entity",
        }
    }
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "user_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Banned,
}

/// Lifecycle of a borrower/investor profile. `Created`, `Draft` and
/// `Reviewing` profiles still read through their staged-edit overlay;
/// `History` marks superseded rows kept for the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "profile_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Draft,
    Created,
    Reviewing,
    Accepted,
    Rejected,
    Banned,
    History,
}

impl ProfileStatus {
    /// Whether reads of this profile must apply the staged-edit overlay.
    pub fn reads_through_overlay(&self) -> bool {
        matches!(self, Self::Draft | Self::Created | Self::Reviewing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "loan_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Accepted,
    Active,
    Repaid,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "loan_issue_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LoanIssueStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Scheduled,
    Executed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "investment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Pending,
    Accepted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "deposit_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Executed,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "withdrawal_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Executed,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "bank_operation_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BankOperationType {
    TestDeposit,
    Withdrawal,
    BeneficiaryRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "bank_operation_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BankOperationStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "admin_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminStatus {
    /// Freshly registered, one-time password issued, 2FA not yet set up.
    New,
    Active,
    Banned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "session_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "support_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SupportStatus {
    Open,
    Answered,
    Closed,
}

/// Per-resource access level of an admin role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "permission_level", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    None,
    Read,
    Write,
}

/// Resources an admin role grants access to, one permission column each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Users,
    Loans,
    Investments,
    Deposits,
    Withdrawals,
    Registry,
    Revise,
    Support,
    Notifications,
    Documents,
    Settings,
    Faq,
    News,
    Admins,
}

/// The permission columns of one admin role row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct RoleGrants {
    pub users: PermissionLevel,
    pub loans: PermissionLevel,
    pub investments: PermissionLevel,
    pub deposits: PermissionLevel,
    pub withdrawals: PermissionLevel,
    pub registry: PermissionLevel,
    pub revise: PermissionLevel,
    pub support: PermissionLevel,
    pub notifications: PermissionLevel,
    pub documents: PermissionLevel,
    pub settings: PermissionLevel,
    pub faq: PermissionLevel,
    pub news: PermissionLevel,
    pub admins: PermissionLevel,
}

impl RoleGrants {
    /// A role with no access at all.
    pub fn none() -> Self {
        Self::uniform(PermissionLevel::None)
    }

    /// A role with write access everywhere (the seeded root admin).
    pub fn root() -> Self {
        Self::uniform(PermissionLevel::Write)
    }

    pub fn uniform(level: PermissionLevel) -> Self {
        Self {
            users: level,
            loans: level,
            investments: level,
            deposits: level,
            withdrawals: level,
            registry: level,
            revise: level,
            support: level,
            notifications: level,
            documents: level,
            settings: level,
            faq: level,
            news: level,
            admins: level,
        }
    }

    pub fn level(&self, resource: Resource) -> PermissionLevel {
        match resource {
            Resource::Users => self.users,
            Resource::Loans => self.loans,
            Resource::Investments => self.investments,
            Resource::Deposits => self.deposits,
            Resource::Withdrawals => self.withdrawals,
            Resource::Registry => self.registry,
            Resource::Revise => self.revise,
            Resource::Support => self.support,
            Resource::Notifications => self.notifications,
            Resource::Documents => self.documents,
            Resource::Settings => self.settings,
            Resource::Faq => self.faq,
            Resource::News => self.news,
            Resource::Admins => self.admins,
        }
    }
}

/// Tag of one row in the unified ledger views. The serialized literals
/// are part of the wire contract; `additional_data` payloads are keyed
/// off them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    #[serde(rename = "deposit")]
    Deposit,
    #[serde(rename = "withdraw")]
    Withdraw,
    #[serde(rename = "investment")]
    Investment,
    #[serde(rename = "interestPayment")]
    InterestPayment,
    #[serde(rename = "mainDutyPayment")]
    MainDutyPayment,
    #[serde(rename = "fee")]
    Fee,
    #[serde(rename = "loanIssue")]
    LoanIssue,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Investment => "investment",
            Self::InterestPayment => "interestPayment",
            Self::MainDutyPayment => "mainDutyPayment",
            Self::Fee => "fee",
            Self::LoanIssue => "loanIssue",
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = UnknownOperationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "deposit" => Self::Deposit,
            "withdraw" => Self::Withdraw,
            "investment" => Self::Investment,
            "interestPayment" => Self::InterestPayment,
            "mainDutyPayment" => Self::MainDutyPayment,
            "fee" => Self::Fee,
            "loanIssue" => Self::LoanIssue,
            other => return Err(UnknownOperationKind(other.to_string())),
        })
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown ledger operation type: {0}")]
pub struct UnknownOperationKind(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_kind_literals_round_trip() {
        for kind in [
            OperationKind::Deposit,
            OperationKind::Withdraw,
            OperationKind::Investment,
            OperationKind::InterestPayment,
            OperationKind::MainDutyPayment,
            OperationKind::Fee,
            OperationKind::LoanIssue,
        ] {
            let parsed: OperationKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("loan_issue".parse::<OperationKind>().is_err());
    }

    #[test]
    fn role_grants_lookup_matches_columns() {
        let mut grants = RoleGrants::none();
        grants.withdrawals = PermissionLevel::Write;
        grants.support = PermissionLevel::Read;

        assert_eq!(
            grants.level(Resource::Withdrawals),
            PermissionLevel::Write
        );
        assert_eq!(grants.level(Resource::Support), PermissionLevel::Read);
        assert_eq!(grants.level(Resource::Users), PermissionLevel::None);
    }
}
