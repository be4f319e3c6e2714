//! Response bodies. Everything the API returns is wrapped in the
//! `{ok, result}` envelope; list endpoints wrap a `{count, items}` page.
//! Most list rows derive `FromRow` under `use-sqlx` so the store can
//! select straight into them.

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::overlay::ContactFields;
use crate::{
    AdminId, AdminSessionId, AdminStatus, BankOperationId,
    BankOperationStatus, BankOperationType, BankReviseId, DepositId,
    DepositStatus, FileId, InvestmentId, InvestmentStatus, LoanId,
    LoanStatus, NewsId, NotificationId, OperationKind, PaymentId,
    PaymentStatus, PlatformDocumentId, ProfileId, ProfileKind,
    ProfileStatus, QuestionId, RoleGrants, SessionStatus,
    SupportReplyId, SupportRequestId, SupportStatus,
    UnknownOperationKind, UserId, UserRole, UserStatus, WalletId,
    WithdrawalId, WithdrawalStatus,
};

/// The uniform success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub result: T,
}

/// The uniform failure envelope. `code / 1000` is the HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub code: u32,
    pub data: serde_json::Value,
    pub msg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub items: Vec<T>,
}

pub fn output<T: Serialize>(result: T) -> Envelope<T> {
    Envelope { ok: true, result }
}

pub fn output_pagination<T: Serialize>(
    count: i64,
    items: Vec<T>,
) -> Envelope<Paginated<T>> {
    Envelope {
        ok: true,
        result: Paginated { count, items },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtPair {
    pub access: String,
    pub refresh: String,
}

/// Freshly generated 2FA secret; `qr` is the otpauth provisioning URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpSecret {
    pub secret: String,
    pub qr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct AdminItem {
    pub id: AdminId,
    pub email: String,
    pub status: AdminStatus,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDetails {
    pub id: AdminId,
    pub email: String,
    pub status: AdminStatus,
    pub grants: RoleGrants,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    pub id: AdminSessionId,
    pub ip: String,
    pub user_agent: Option<String>,
    pub status: SessionStatus,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct UserItem {
    pub id: UserId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub status: UserStatus,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

/// A single user with the staged-edit overlay already applied and all
/// non-historical profiles attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub id: UserId,
    #[serde(flatten)]
    pub contact: ContactFields,
    pub full_name: String,
    pub status: UserStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub profiles: Vec<ProfileItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ProfileItem {
    pub id: ProfileId,
    pub user_id: UserId,
    pub role: UserRole,
    pub kind: ProfileKind,
    pub status: ProfileStatus,
    pub wallet_id: WalletId,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

/// A single profile, overlay-merged when its status still reads through
/// staged edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    pub id: ProfileId,
    pub user_id: UserId,
    pub role: UserRole,
    pub kind: ProfileKind,
    pub status: ProfileStatus,
    #[serde(flatten)]
    pub contact: ContactFields,
    pub wallet: WalletItem,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct WalletItem {
    pub id: WalletId,
    pub account_number: String,
    pub balance: Decimal,
    pub blocked_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct LoanItem {
    pub id: LoanId,
    pub profile_id: ProfileId,
    pub borrower_id: UserId,
    pub name: String,
    pub contract_number: String,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "crate::OptionalTimestamp")
    )]
    pub conclusion_contract_date: Option<Timestamp>,
    pub amount: Decimal,
    pub rate: Decimal,
    pub status: LoanStatus,
    pub arrears: bool,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: LoanItem,
    pub payments: Vec<PaymentItem>,
    pub investments: Vec<InvestmentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PaymentItem {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub investment_id: Option<InvestmentId>,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub payment_date: Timestamp,
    pub interest: Decimal,
    pub principal: Decimal,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct InvestmentItem {
    pub id: InvestmentId,
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub value: Decimal,
    pub status: InvestmentStatus,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct DepositItem {
    pub id: DepositId,
    pub wallet_id: WalletId,
    pub amount: Decimal,
    pub status: DepositStatus,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalItem {
    pub id: WithdrawalId,
    pub wallet_id: WalletId,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub comment: Option<String>,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalDetails {
    #[serde(flatten)]
    pub withdrawal: WithdrawalItem,
    pub wallet: WalletItem,
    pub bank_operation: Option<BankOperationItem>,
}

/// List shape of a bank operation; the raw exchange payloads are only
/// exposed on retrieve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct BankOperationItem {
    pub id: BankOperationId,
    #[serde(rename = "type")]
    pub kind: BankOperationType,
    pub status: BankOperationStatus,
    pub amount: Option<Decimal>,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct BankOperationDetails {
    pub id: BankOperationId,
    #[serde(rename = "type")]
    pub kind: BankOperationType,
    pub status: BankOperationStatus,
    pub amount: Option<Decimal>,
    pub request_data: Option<serde_json::Value>,
    pub response_data: Option<serde_json::Value>,
    pub callback_data: Option<serde_json::Value>,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct BankReviseItem {
    pub id: BankReviseId,
    pub account_number: String,
    pub platform_balance: Decimal,
    pub bank_balance: Decimal,
    pub difference: Decimal,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SupportRequestItem {
    pub id: SupportRequestId,
    pub user_id: UserId,
    pub subject: String,
    pub message: String,
    pub status: SupportStatus,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequestDetails {
    #[serde(flatten)]
    pub request: SupportRequestItem,
    pub replies: Vec<SupportReplyItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SupportReplyItem {
    pub id: SupportReplyId,
    pub request_id: SupportRequestId,
    pub admin_id: AdminId,
    pub message: String,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: NotificationId,
    pub message: String,
    pub read: bool,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct QuestionItem {
    pub id: QuestionId,
    pub question: String,
    pub answer: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: NewsId,
    pub title: String,
    pub content: String,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub id: FileId,
    pub name: String,
    pub content_type: String,
    pub size: i64,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PlatformDocumentItem {
    pub id: PlatformDocumentId,
    pub name: String,
    pub description: Option<String>,
    pub file_id: Option<FileId>,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub created_at: Timestamp,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SettingItem {
    pub key: String,
    pub value: serde_json::Value,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub updated_at: Timestamp,
}

/// One row of the unified per-user ledger (`history_investor` /
/// `history_borrower`). Exactly one of `income`/`expense` is set; the
/// shape of `additional_data` depends on `operation_type`, so callers
/// branch on [`HistoryEntry::operation`] before interpreting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub user_id: UserId,
    pub profile_type: String,
    pub operation_id: Uuid,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "jiff_sqlx::Timestamp")
    )]
    pub date: Timestamp,
    pub operation_type: String,
    pub income: Option<Decimal>,
    pub expense: Option<Decimal>,
    pub additional_data: serde_json::Value,
}

impl HistoryEntry {
    pub fn operation(&self) -> Result<OperationKind, UnknownOperationKind> {
        self.operation_type.parse()
    }

    /// The single non-null amount of this row.
    pub fn amount(&self) -> Option<Decimal> {
        self.income.or(self.expense)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub banned: i64,
    pub investors: i64,
    pub verified: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanStats {
    pub total: i64,
    pub pending: i64,
    pub accepted: i64,
    pub active: i64,
    pub repaid: i64,
    pub rejected: i64,
    pub invested_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let envelope = output_pagination(42, vec!["a", "b"]);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ok": true,
                "result": {"count": 42, "items": ["a", "b"]}
            })
        );
    }

    #[test]
    fn failure_envelope_shape() {
        let body = ErrorBody {
            ok: false,
            code: 404000,
            data: serde_json::json!({}),
            msg: "Not found".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["code"], 404000);
    }

    #[test]
    fn history_entry_parses_its_operation_tag() {
        let entry = HistoryEntry {
            user_id: UserId(uuid::Uuid::nil()),
            profile_type: "investor_individual".to_string(),
            operation_id: uuid::Uuid::nil(),
            date: "2026-01-01T00:00:00Z".parse().unwrap(),
            operation_type: "mainDutyPayment".to_string(),
            income: Some(Decimal::new(2500, 2)),
            expense: None,
            additional_data: serde_json::json!({}),
        };
        assert_eq!(entry.operation().unwrap(), OperationKind::MainDutyPayment);
        assert_eq!(entry.amount(), Some(Decimal::new(2500, 2)));
    }
}
