use serde::{Deserialize, Serialize};

use crate::{FileId, LoanStatus, RoleGrants};

pub const EMAIL_MAX_LEN: usize = 255;
pub const SUBJECT_MAX_LEN: usize = 255;
pub const TITLE_MAX_LEN: usize = 255;

/// One rejected field of a request body. Validation collects every
/// violation instead of stopping at the first; the list travels in the
/// error envelope's `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

fn violation(field: &str, reason: &str) -> FieldViolation {
    FieldViolation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Rough shape check, not RFC 5322. The platform only needs to reject
/// obviously broken addresses before they reach the mail collaborator.
pub fn email_looks_valid(email: &str) -> bool {
    if email.is_empty() || email.len() > EMAIL_MAX_LEN {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginAdmin {
    pub email: String,
    pub password: String,
    /// Required once the admin has activated 2FA.
    pub totp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterAdmin {
    pub email: String,
    pub grants: RoleGrants,
}

impl RegisterAdmin {
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if !email_looks_valid(&self.email) {
            violations.push(violation("email", "email"));
        }
        violations
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateTotp {
    pub totp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateAdminRole {
    pub grants: RoleGrants,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateLoanStatus {
    pub status: LoanStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeclineWithdrawal {
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSupportReply {
    pub message: String,
}

impl CreateSupportReply {
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.message.trim().is_empty() {
            violations.push(violation("message", "empty"));
        }
        violations
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateQuestion {
    pub question: String,
    pub answer: String,
}

impl CreateQuestion {
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.question.trim().is_empty() {
            violations.push(violation("question", "empty"));
        }
        if self.answer.trim().is_empty() {
            violations.push(violation("answer", "empty"));
        }
        violations
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateQuestion {
    pub question: Option<String>,
    pub answer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNews {
    pub title: String,
    pub content: String,
}

impl CreateNews {
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.title.trim().is_empty() {
            violations.push(violation("title", "empty"));
        }
        if self.title.len() > TITLE_MAX_LEN {
            violations.push(violation("title", "max"));
        }
        if self.content.trim().is_empty() {
            violations.push(violation("content", "empty"));
        }
        violations
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateNews {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePlatformDocument {
    pub name: String,
    pub description: Option<String>,
    pub file_id: Option<FileId>,
}

impl CreatePlatformDocument {
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(violation("name", "empty"));
        }
        if self.name.len() > TITLE_MAX_LEN {
            violations.push(violation("name", "max"));
        }
        violations
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePlatformDocument {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file_id: Option<FileId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSetting {
    pub value: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PermissionLevel;

    #[test]
    fn register_admin_collects_violations() {
        let request = RegisterAdmin {
            email: "not-an-email".to_string(),
            grants: RoleGrants::uniform(PermissionLevel::Read),
        };
        let violations = request.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "email");
    }

    #[test]
    fn create_question_reports_every_empty_field() {
        let request = CreateQuestion {
            question: " ".to_string(),
            answer: String::new(),
        };
        let violations = request.validate();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn email_shape_check() {
        assert!(email_looks_valid("ops@platform.example"));
        assert!(!email_looks_valid("ops@localhost"));
        assert!(!email_looks_valid("@platform.example"));
        assert!(!email_looks_valid(""));
    }
}
