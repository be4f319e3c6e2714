//! The staged-edit overlay. Profile and user edits coming from the
//! customer-facing platform are not applied to canonical columns
//! directly; they are staged in an `updates` column and only folded in
//! when an administrator confirms the profile. Until then, read
//! endpoints present the merged view produced here.

use serde::{Deserialize, Serialize};

/// Canonical contact/identity columns shared by users and profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFields {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
}

impl ContactFields {
    /// "Lastname Firstname Middlename", skipping absent parts.
    pub fn full_name(&self) -> String {
        [&self.last_name, &self.first_name, &self.middle_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Staged field edits awaiting administrative approval. Absent fields
/// fall through to the canonical value on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PendingUpdates {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
}

impl PendingUpdates {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Whether an editable entity currently has staged edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    /// Canonical columns are authoritative.
    Approved,
    /// Reads must overlay these staged values.
    Staged(PendingUpdates),
}

impl EditState {
    pub fn from_updates(updates: Option<PendingUpdates>) -> Self {
        match updates {
            Some(updates) if !updates.is_empty() => Self::Staged(updates),
            _ => Self::Approved,
        }
    }

    pub fn staged(&self) -> Option<&PendingUpdates> {
        match self {
            Self::Approved => None,
            Self::Staged(updates) => Some(updates),
        }
    }
}

/// The single merge rule: a staged value wins over its canonical
/// counterpart, field by field.
pub fn merged(canonical: &ContactFields, state: &EditState) -> ContactFields {
    let Some(updates) = state.staged() else {
        return canonical.clone();
    };
    ContactFields {
        email: updates.email.clone().or_else(|| canonical.email.clone()),
        phone: updates.phone.clone().or_else(|| canonical.phone.clone()),
        first_name: updates
            .first_name
            .clone()
            .or_else(|| canonical.first_name.clone()),
        last_name: updates
            .last_name
            .clone()
            .or_else(|| canonical.last_name.clone()),
        middle_name: updates
            .middle_name
            .clone()
            .or_else(|| canonical.middle_name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical() -> ContactFields {
        ContactFields {
            email: Some("old@example.com".to_string()),
            phone: Some("+70000000000".to_string()),
            first_name: Some("Ivan".to_string()),
            last_name: Some("Ivanov".to_string()),
            middle_name: None,
        }
    }

    #[test]
    fn approved_state_reads_canonical() {
        let merged = merged(&canonical(), &EditState::Approved);
        assert_eq!(merged, canonical());
    }

    #[test]
    fn staged_fields_win_absent_fields_fall_through() {
        let state = EditState::Staged(PendingUpdates {
            email: Some("new@example.com".to_string()),
            middle_name: Some("Petrovich".to_string()),
            ..Default::default()
        });
        let merged = merged(&canonical(), &state);

        assert_eq!(merged.email.as_deref(), Some("new@example.com"));
        assert_eq!(merged.middle_name.as_deref(), Some("Petrovich"));
        // untouched fields come from the canonical row
        assert_eq!(merged.phone, canonical().phone);
        assert_eq!(merged.last_name, canonical().last_name);
    }

    #[test]
    fn empty_updates_collapse_to_approved() {
        let state = EditState::from_updates(Some(PendingUpdates::default()));
        assert_eq!(state, EditState::Approved);

        let state = EditState::from_updates(None);
        assert_eq!(state, EditState::Approved);
    }

    #[test]
    fn full_name_joins_present_parts() {
        assert_eq!(canonical().full_name(), "Ivanov Ivan");
        let all = ContactFields {
            middle_name: Some("Petrovich".to_string()),
            ..canonical()
        };
        assert_eq!(all.full_name(), "Ivanov Ivan Petrovich");
    }

    #[test]
    fn unknown_overlay_keys_are_ignored() {
        // the customer platform stages more fields than the back office
        // merges; deserialization must not choke on them
        let updates: PendingUpdates = serde_json::from_str(
            r#"{"email":"a@b.c","passportNumber":"4509 123456"}"#,
        )
        .unwrap();
        assert_eq!(updates.email.as_deref(), Some("a@b.c"));
    }
}
