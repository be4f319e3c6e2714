//! HTTP surface. Handlers stay thin: authenticate, check grants, parse
//! the query convention, call the store, wrap the result in the
//! `{ok, result}` envelope. Failures all flow through [`ApiError`] and
//! its numeric taxonomy.

pub mod actions;
pub mod admins;
pub mod auth;
pub mod content;
pub mod documents;
pub mod funds;
pub mod investors;
pub mod loans;
pub mod settings;
pub mod support;
pub mod users;

use actix_web::body::BoxBody;
use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, ResponseError, get, web};

use payloads::ListQuery;
use payloads::requests::FieldViolation;
use payloads::responses::ErrorBody;

use crate::listing::{self, ListError};
use crate::password::AuthError;
use crate::store::StoreError;

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("")
        .service(health_check)
        .service(auth::login)
        .service(auth::refresh)
        .service(auth::logout)
        .service(auth::totp_secret)
        .service(auth::totp_activate)
        .service(auth::register)
        .service(admins::list_admins)
        .service(admins::get_admin)
        .service(admins::update_role)
        .service(admins::ban_admin)
        .service(admins::unban_admin)
        .service(admins::list_sessions)
        .service(users::list_users)
        .service(users::user_stats)
        .service(users::get_user)
        .service(users::list_user_profiles)
        .service(users::list_user_notifications)
        .service(actions::ban_user)
        .service(actions::unban_user)
        .service(actions::delete_user)
        .service(actions::confirm_profile)
        .service(investors::list_borrowers)
        .service(investors::get_borrower)
        .service(investors::list_borrower_loans)
        .service(investors::borrower_history)
        .service(investors::list_investors)
        .service(investors::get_investor)
        .service(investors::list_investor_investments)
        .service(investors::investor_history)
        .service(loans::list_loans)
        .service(loans::loan_stats)
        .service(loans::get_loan)
        .service(loans::list_loan_payments)
        .service(loans::update_loan_status)
        .service(loans::delete_loan)
        .service(loans::list_investments)
        .service(loans::get_investment)
        .service(loans::cancel_investment)
        .service(funds::list_deposits)
        .service(funds::get_deposit)
        .service(funds::list_withdrawals)
        .service(funds::get_withdrawal)
        .service(funds::execute_withdrawal)
        .service(funds::decline_withdrawal)
        .service(funds::list_registry)
        .service(funds::get_registry_operation)
        .service(funds::list_revise)
        .service(support::list_support)
        .service(support::get_support_request)
        .service(support::reply_support)
        .service(support::close_support)
        .service(support::list_notifications)
        .service(support::read_notification)
        .service(content::list_faq)
        .service(content::create_question)
        .service(content::update_question)
        .service(content::delete_question)
        .service(content::list_news)
        .service(content::get_news)
        .service(content::create_news)
        .service(content::update_news)
        .service(content::delete_news)
        .service(documents::list_files)
        .service(documents::get_file)
        .service(documents::list_platform_documents)
        .service(documents::get_platform_document)
        .service(documents::create_platform_document)
        .service(documents::update_platform_document)
        .service(documents::delete_platform_document)
        .service(settings::list_settings)
        .service(settings::get_setting)
        .service(settings::update_setting)
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

/// Numeric error taxonomy. Codes group by HTTP status class; the status
/// is always `code / 1000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidPayload = 400000,
    AlreadyExists = 400001,
    TokenExpired = 401001,
    TokenInvalid = 401002,
    SessionNotFound = 401003,
    Forbidden = 403000,
    ConfirmationFailed = 403006,
    NotFound = 404000,
    Conflict = 409000,
    EmailExists = 409001,
    StatusAlreadyAssigned = 409002,
    TooManyRequests = 429000,
    InternalServerError = 500000,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn http_status(self) -> StatusCode {
        StatusCode::from_u16((self.as_u32() / 1000) as u16)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Self::InvalidPayload => "Bad Request",
            Self::AlreadyExists => "Already Exists",
            Self::TokenExpired => "Token expired",
            Self::TokenInvalid => "Invalid token",
            Self::SessionNotFound => "Session not found",
            Self::Forbidden => "Forbidden",
            Self::ConfirmationFailed => "Failed to confirm operation",
            Self::NotFound => "Not found",
            Self::Conflict => "Conflict",
            Self::EmailExists => "Email exists",
            Self::StatusAlreadyAssigned => "Status already assigned",
            Self::TooManyRequests => "Too many requests",
            Self::InternalServerError => "Internal server error",
        }
    }
}

/// The one error type handlers return. Serializes as
/// `{ok: false, code, data, msg}` with the status from the code.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    msg: String,
    data: serde_json::Value,
    source: Option<anyhow::Error>,
}

impl ApiError {
    pub fn code(code: ErrorCode) -> Self {
        Self {
            code,
            msg: code.default_message().to_string(),
            data: serde_json::json!({}),
            source: None,
        }
    }

    pub fn with_msg(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: serde_json::json!({}),
            source: None,
        }
    }

    pub fn internal(source: anyhow::Error) -> Self {
        Self {
            code: ErrorCode::InternalServerError,
            msg: ErrorCode::InternalServerError.default_message().to_string(),
            data: serde_json::json!({}),
            source: Some(source),
        }
    }

    /// All collected field violations travel in `data`, mirroring the
    /// payload validation contract.
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        Self {
            code: ErrorCode::InvalidPayload,
            msg: "Validation error".to_string(),
            data: serde_json::to_value(violations)
                .unwrap_or_else(|_| serde_json::json!([])),
            source: None,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        self.code
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.msg, self.code.as_u32())
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.code.http_status()
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        if self.code == ErrorCode::InternalServerError {
            // the caller only sees the generic message; keep the cause
            // in the server log
            tracing::error!(error = ?self.source, "internal error");
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            ok: false,
            code: self.code.as_u32(),
            data: self.data.clone(),
            msg: self.msg.clone(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(_) | StoreError::Unexpected(_) => {
                ApiError::internal(e.into())
            }
            StoreError::List(list) => ApiError::from(list),
            StoreError::AdminNotFound
            | StoreError::UserNotFound
            | StoreError::ProfileNotFound
            | StoreError::LoanNotFound
            | StoreError::InvestmentNotFound
            | StoreError::DepositNotFound
            | StoreError::WithdrawalNotFound
            | StoreError::BankOperationNotFound
            | StoreError::SupportRequestNotFound
            | StoreError::NotificationNotFound
            | StoreError::QuestionNotFound
            | StoreError::NewsNotFound
            | StoreError::DocumentNotFound
            | StoreError::SettingNotFound => {
                ApiError::with_msg(ErrorCode::NotFound, e.to_string())
            }
            StoreError::SessionNotFound => {
                ApiError::code(ErrorCode::SessionNotFound)
            }
            StoreError::EmailExists => ApiError::code(ErrorCode::EmailExists),
            StoreError::StatusAlreadyAssigned => {
                ApiError::code(ErrorCode::StatusAlreadyAssigned)
            }
            StoreError::OutstandingDebt => {
                ApiError::with_msg(ErrorCode::Conflict, e.to_string())
            }
            StoreError::Conflict => ApiError::code(ErrorCode::Conflict),
        }
    }
}

impl From<ListError> for ApiError {
    fn from(e: ListError) -> Self {
        ApiError::with_msg(ErrorCode::InvalidPayload, e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials(_) => ApiError::with_msg(
                ErrorCode::InvalidPayload,
                "Invalid credentials",
            ),
            AuthError::UnexpectedError(source) => ApiError::internal(source),
        }
    }
}

/// Parse the list-query convention off the raw query string.
pub(crate) fn parse_list(req: &HttpRequest) -> Result<ListQuery, ApiError> {
    Ok(listing::parse_query(req.query_string())?)
}

/// Client address for session records: `X-Forwarded-For` when fronted
/// by a proxy, else the peer address.
pub(crate) fn client_ip(req: &HttpRequest) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or(value).trim().to_string())
        .unwrap_or_else(|| {
            req.peer_addr()
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "127.0.0.1".to_string())
        })
}

pub(crate) fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_code_over_one_thousand() {
        let cases = [
            (ErrorCode::InvalidPayload, StatusCode::BAD_REQUEST),
            (ErrorCode::AlreadyExists, StatusCode::BAD_REQUEST),
            (ErrorCode::TokenExpired, StatusCode::UNAUTHORIZED),
            (ErrorCode::TokenInvalid, StatusCode::UNAUTHORIZED),
            (ErrorCode::SessionNotFound, StatusCode::UNAUTHORIZED),
            (ErrorCode::Forbidden, StatusCode::FORBIDDEN),
            (ErrorCode::ConfirmationFailed, StatusCode::FORBIDDEN),
            (ErrorCode::NotFound, StatusCode::NOT_FOUND),
            (ErrorCode::Conflict, StatusCode::CONFLICT),
            (ErrorCode::EmailExists, StatusCode::CONFLICT),
            (ErrorCode::StatusAlreadyAssigned, StatusCode::CONFLICT),
            (ErrorCode::TooManyRequests, StatusCode::TOO_MANY_REQUESTS),
            (
                ErrorCode::InternalServerError,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (code, status) in cases {
            assert_eq!(code.http_status(), status, "{code:?}");
        }
    }

    #[test]
    fn error_body_shape() {
        let error = ApiError::validation(vec![FieldViolation {
            field: "email".to_string(),
            reason: "email".to_string(),
        }]);
        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(error.error_code().as_u32(), 400000);
        assert_eq!(
            error.data,
            serde_json::json!([{"field": "email", "reason": "email"}])
        );
    }

    #[test]
    fn store_errors_map_to_taxonomy() {
        let cases = [
            (StoreError::UserNotFound, ErrorCode::NotFound),
            (StoreError::EmailExists, ErrorCode::EmailExists),
            (
                StoreError::StatusAlreadyAssigned,
                ErrorCode::StatusAlreadyAssigned,
            ),
            (StoreError::OutstandingDebt, ErrorCode::Conflict),
            (StoreError::SessionNotFound, ErrorCode::SessionNotFound),
        ];
        for (store_error, expected) in cases {
            assert_eq!(ApiError::from(store_error).error_code(), expected);
        }
    }
}
