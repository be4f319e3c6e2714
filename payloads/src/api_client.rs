//! A typed client for the back-office API, used by integration tests and
//! internal tooling. Holds the bearer token pair issued at login and
//! unwraps the `{ok, result}` envelope.

use std::sync::Mutex;

use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{
    AdminId, ListQuery, LoanId, NewsId, NotificationId, PlatformDocumentId,
    ProfileId, QuestionId, SupportRequestId, UserId, WithdrawalId, requests,
    responses,
};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the backend.
pub struct ApiClient {
    pub address: String,
    inner_client: reqwest::Client,
    tokens: Mutex<Option<responses::JwtPair>>,
}

/// Helper methods for http actions
impl ApiClient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            inner_client: reqwest::Client::new(),
            tokens: Mutex::new(None),
        }
    }

    pub fn set_tokens(&self, tokens: responses::JwtPair) {
        *self.tokens.lock().unwrap() = Some(tokens);
    }

    pub fn clear_tokens(&self) {
        *self.tokens.lock().unwrap() = None;
    }

    fn format_url(&self, path: &str) -> String {
        format!("{}{path}", &self.address)
    }

    fn bearer(&self, request: RequestBuilder) -> RequestBuilder {
        let tokens = self.tokens.lock().unwrap();
        match tokens.as_ref() {
            Some(pair) => request.bearer_auth(&pair.access),
            None => request,
        }
    }

    async fn get(&self, path: &str) -> ReqwestResult {
        self.bearer(self.inner_client.get(self.format_url(path)))
            .send()
            .await
    }

    async fn get_listed(&self, path: &str, query: &ListQuery) -> ReqwestResult {
        let query_string = query.to_query_string();
        let url = if query_string.is_empty() {
            self.format_url(path)
        } else {
            format!("{}?{query_string}", self.format_url(path))
        };
        self.bearer(self.inner_client.get(url)).send().await
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        self.bearer(self.inner_client.post(self.format_url(path)))
            .json(body)
            .send()
            .await
    }

    async fn empty_post(&self, path: &str) -> ReqwestResult {
        self.bearer(self.inner_client.post(self.format_url(path)))
            .send()
            .await
    }

    /// Request with the TOTP step-up `Confirmation` header.
    async fn confirmed<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        totp: &str,
        body: Option<&B>,
    ) -> ReqwestResult {
        let mut request = self
            .bearer(self.inner_client.request(method, self.format_url(path)))
            .header("Confirmation", totp);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }

    async fn confirmed_post<B: Serialize>(
        &self,
        path: &str,
        totp: &str,
        body: Option<&B>,
    ) -> ReqwestResult {
        self.confirmed(reqwest::Method::POST, path, totp, body).await
    }

    async fn put(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        self.bearer(self.inner_client.put(self.format_url(path)))
            .json(body)
            .send()
            .await
    }

    async fn delete(&self, path: &str) -> ReqwestResult {
        self.bearer(self.inner_client.delete(self.format_url(path)))
            .send()
            .await
    }
}

/// Methods on the backend API
impl ApiClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.get("/health_check").await?;
        ok_empty(response).await
    }

    /// Log in and remember the issued token pair.
    pub async fn login(
        &self,
        details: &requests::LoginAdmin,
    ) -> Result<responses::JwtPair, ClientError> {
        let response = self.post("/auth/login", details).await?;
        let pair: responses::JwtPair = ok_result(response).await?;
        self.set_tokens(pair.clone());
        Ok(pair)
    }

    /// Rotate the session using the refresh token.
    pub async fn refresh(&self) -> Result<responses::JwtPair, ClientError> {
        let refresh = {
            let tokens = self.tokens.lock().unwrap();
            tokens.as_ref().map(|pair| pair.refresh.clone())
        };
        let Some(refresh) = refresh else {
            return Err(ClientError::NotLoggedIn);
        };
        let response = self
            .inner_client
            .post(self.format_url("/auth/refresh"))
            .bearer_auth(refresh)
            .send()
            .await?;
        let pair: responses::JwtPair = ok_result(response).await?;
        self.set_tokens(pair.clone());
        Ok(pair)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.empty_post("/auth/logout").await?;
        self.clear_tokens();
        ok_empty(response).await
    }

    pub async fn totp_secret(
        &self,
    ) -> Result<responses::TotpSecret, ClientError> {
        let response = self.empty_post("/auth/totp/secret").await?;
        ok_result(response).await
    }

    pub async fn totp_activate(
        &self,
        details: &requests::ActivateTotp,
    ) -> Result<(), ClientError> {
        let response = self.post("/auth/totp/activate", details).await?;
        ok_empty(response).await
    }

    pub async fn register_admin(
        &self,
        details: &requests::RegisterAdmin,
    ) -> Result<String, ClientError> {
        let response = self.post("/auth/register", details).await?;
        ok_result(response).await
    }

    pub async fn list_admins(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::AdminItem>, ClientError> {
        let response = self.get_listed("/admins", query).await?;
        ok_result(response).await
    }

    pub async fn get_admin(
        &self,
        id: &AdminId,
    ) -> Result<responses::AdminDetails, ClientError> {
        let response = self.get(&format!("/admins/{id}")).await?;
        ok_result(response).await
    }

    pub async fn update_admin_role(
        &self,
        id: &AdminId,
        totp: &str,
        details: &requests::UpdateAdminRole,
    ) -> Result<responses::AdminDetails, ClientError> {
        let response = self
            .confirmed(
                reqwest::Method::PUT,
                &format!("/admins/{id}/role"),
                totp,
                Some(details),
            )
            .await?;
        ok_result(response).await
    }

    pub async fn list_users(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::UserItem>, ClientError> {
        let response = self.get_listed("/users", query).await?;
        ok_result(response).await
    }

    pub async fn get_user(
        &self,
        id: &UserId,
    ) -> Result<responses::UserDetails, ClientError> {
        let response = self.get(&format!("/users/{id}")).await?;
        ok_result(response).await
    }

    pub async fn user_stats(&self) -> Result<responses::UserStats, ClientError> {
        let response = self.get("/users/stats").await?;
        ok_result(response).await
    }

    pub async fn ban_user(&self, id: &UserId) -> Result<(), ClientError> {
        let response =
            self.empty_post(&format!("/actions/users/{id}/ban")).await?;
        ok_empty(response).await
    }

    pub async fn unban_user(&self, id: &UserId) -> Result<(), ClientError> {
        let response =
            self.empty_post(&format!("/actions/users/{id}/unban")).await?;
        ok_empty(response).await
    }

    pub async fn delete_user(
        &self,
        id: &UserId,
        totp: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .confirmed::<()>(
                reqwest::Method::DELETE,
                &format!("/actions/users/{id}"),
                totp,
                None,
            )
            .await?;
        ok_empty(response).await
    }

    pub async fn confirm_profile(
        &self,
        id: &ProfileId,
        totp: &str,
    ) -> Result<responses::ProfileDetails, ClientError> {
        let response = self
            .confirmed_post::<()>(
                &format!("/actions/profiles/{id}/confirm"),
                totp,
                None,
            )
            .await?;
        ok_result(response).await
    }

    pub async fn list_borrowers(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::ProfileItem>, ClientError>
    {
        let response = self.get_listed("/borrowers", query).await?;
        ok_result(response).await
    }

    pub async fn list_investors(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::ProfileItem>, ClientError>
    {
        let response = self.get_listed("/investors", query).await?;
        ok_result(response).await
    }

    pub async fn borrower_history(
        &self,
        user_id: &UserId,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::HistoryEntry>, ClientError>
    {
        let response = self
            .get_listed(&format!("/borrowers/{user_id}/history"), query)
            .await?;
        ok_result(response).await
    }

    pub async fn investor_history(
        &self,
        user_id: &UserId,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::HistoryEntry>, ClientError>
    {
        let response = self
            .get_listed(&format!("/investors/{user_id}/history"), query)
            .await?;
        ok_result(response).await
    }

    pub async fn list_loans(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::LoanItem>, ClientError> {
        let response = self.get_listed("/loans", query).await?;
        ok_result(response).await
    }

    pub async fn get_loan(
        &self,
        id: &LoanId,
    ) -> Result<responses::LoanDetails, ClientError> {
        let response = self.get(&format!("/loans/{id}")).await?;
        ok_result(response).await
    }

    pub async fn loan_stats(&self) -> Result<responses::LoanStats, ClientError> {
        let response = self.get("/loans/stats").await?;
        ok_result(response).await
    }

    pub async fn update_loan_status(
        &self,
        id: &LoanId,
        details: &requests::UpdateLoanStatus,
    ) -> Result<responses::LoanItem, ClientError> {
        let response =
            self.put(&format!("/loans/{id}/status"), details).await?;
        ok_result(response).await
    }

    pub async fn list_investments(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::InvestmentItem>, ClientError>
    {
        let response = self.get_listed("/investments", query).await?;
        ok_result(response).await
    }

    pub async fn list_deposits(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::DepositItem>, ClientError>
    {
        let response = self.get_listed("/deposits", query).await?;
        ok_result(response).await
    }

    pub async fn list_withdrawals(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::WithdrawalItem>, ClientError>
    {
        let response = self.get_listed("/withdrawals", query).await?;
        ok_result(response).await
    }

    pub async fn execute_withdrawal(
        &self,
        id: &WithdrawalId,
        totp: &str,
    ) -> Result<responses::WithdrawalDetails, ClientError> {
        let response = self
            .confirmed_post::<()>(
                &format!("/withdrawals/{id}/execute"),
                totp,
                None,
            )
            .await?;
        ok_result(response).await
    }

    pub async fn decline_withdrawal(
        &self,
        id: &WithdrawalId,
        totp: &str,
        details: &requests::DeclineWithdrawal,
    ) -> Result<responses::WithdrawalDetails, ClientError> {
        let response = self
            .confirmed_post(
                &format!("/withdrawals/{id}/decline"),
                totp,
                Some(details),
            )
            .await?;
        ok_result(response).await
    }

    pub async fn list_registry(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::BankOperationItem>, ClientError>
    {
        let response = self.get_listed("/registry", query).await?;
        ok_result(response).await
    }

    pub async fn list_revise(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::BankReviseItem>, ClientError>
    {
        let response = self.get_listed("/revise", query).await?;
        ok_result(response).await
    }

    pub async fn list_support(
        &self,
        query: &ListQuery,
    ) -> Result<
        responses::Paginated<responses::SupportRequestItem>,
        ClientError,
    > {
        let response = self.get_listed("/support", query).await?;
        ok_result(response).await
    }

    pub async fn get_support_request(
        &self,
        id: &SupportRequestId,
    ) -> Result<responses::SupportRequestDetails, ClientError> {
        let response = self.get(&format!("/support/{id}")).await?;
        ok_result(response).await
    }

    pub async fn reply_support(
        &self,
        id: &SupportRequestId,
        details: &requests::CreateSupportReply,
    ) -> Result<responses::SupportReplyItem, ClientError> {
        let response = self
            .post(&format!("/support/{id}/replies"), details)
            .await?;
        ok_result(response).await
    }

    pub async fn list_notifications(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::NotificationItem>, ClientError>
    {
        let response = self.get_listed("/notifications", query).await?;
        ok_result(response).await
    }

    pub async fn read_notification(
        &self,
        id: &NotificationId,
    ) -> Result<(), ClientError> {
        let response =
            self.empty_post(&format!("/notifications/{id}/read")).await?;
        ok_empty(response).await
    }

    pub async fn list_faq(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::QuestionItem>, ClientError>
    {
        let response = self.get_listed("/faq", query).await?;
        ok_result(response).await
    }

    pub async fn create_question(
        &self,
        details: &requests::CreateQuestion,
    ) -> Result<responses::QuestionItem, ClientError> {
        let response = self.post("/faq", details).await?;
        ok_result(response).await
    }

    pub async fn delete_question(
        &self,
        id: &QuestionId,
    ) -> Result<(), ClientError> {
        let response = self.delete(&format!("/faq/{id}")).await?;
        ok_empty(response).await
    }

    pub async fn list_news(
        &self,
        query: &ListQuery,
    ) -> Result<responses::Paginated<responses::NewsItem>, ClientError> {
        let response = self.get_listed("/news", query).await?;
        ok_result(response).await
    }

    pub async fn create_news(
        &self,
        details: &requests::CreateNews,
    ) -> Result<responses::NewsItem, ClientError> {
        let response = self.post("/news", details).await?;
        ok_result(response).await
    }

    pub async fn delete_news(&self, id: &NewsId) -> Result<(), ClientError> {
        let response = self.delete(&format!("/news/{id}")).await?;
        ok_empty(response).await
    }

    pub async fn list_platform_documents(
        &self,
        query: &ListQuery,
    ) -> Result<
        responses::Paginated<responses::PlatformDocumentItem>,
        ClientError,
    > {
        let response = self.get_listed("/platform-documents", query).await?;
        ok_result(response).await
    }

    pub async fn create_platform_document(
        &self,
        details: &requests::CreatePlatformDocument,
    ) -> Result<responses::PlatformDocumentItem, ClientError> {
        let response = self.post("/platform-documents", details).await?;
        ok_result(response).await
    }

    pub async fn delete_platform_document(
        &self,
        id: &PlatformDocumentId,
    ) -> Result<(), ClientError> {
        let response =
            self.delete(&format!("/platform-documents/{id}")).await?;
        ok_empty(response).await
    }

    pub async fn list_settings(
        &self,
    ) -> Result<Vec<responses::SettingItem>, ClientError> {
        let response = self.get("/settings").await?;
        ok_result(response).await
    }

    pub async fn update_setting(
        &self,
        key: &str,
        totp: &str,
        details: &requests::UpdateSetting,
    ) -> Result<responses::SettingItem, ClientError> {
        let response = self
            .confirmed(
                reqwest::Method::PUT,
                &format!("/settings/{key}"),
                totp,
                Some(details),
            )
            .await?;
        ok_result(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A non-2xx response, with the decoded failure envelope when the
    /// body carried one.
    #[error("{}", .body.msg)]
    Api {
        status: StatusCode,
        body: responses::ErrorBody,
    },
    #[error("not logged in")]
    NotLoggedIn,
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

async fn fail(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = match response.json::<responses::ErrorBody>().await {
        Ok(body) => body,
        Err(_) => responses::ErrorBody {
            ok: false,
            code: status.as_u16() as u32 * 1000,
            data: serde_json::Value::Null,
            msg: status.to_string(),
        },
    };
    ClientError::Api { status, body }
}

/// Unwrap a success envelope into its `result`.
async fn ok_result<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(fail(response).await);
    }
    let envelope = response.json::<responses::Envelope<T>>().await?;
    Ok(envelope.result)
}

/// Check that a response is OK, discarding the empty envelope.
async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(fail(response).await);
    }
    Ok(())
}
