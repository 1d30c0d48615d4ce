//! Preference record data models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The role a user is acting under. One account can act as more than one
/// role (e.g. a company operator with a personal account), and preference
/// records are scoped per (user, role) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    Member,
    Company,
    Admin,
}

impl AccountRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountRole::Member => "MEMBER",
            AccountRole::Company => "COMPANY",
            AccountRole::Admin => "ADMIN",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MEMBER" => Some(AccountRole::Member),
            "COMPANY" => Some(AccountRole::Company),
            "ADMIN" => Some(AccountRole::Admin),
            _ => None,
        }
    }

    /// The toggle categories a role's settings document carries.
    pub fn default_categories(self) -> &'static [PreferenceCategory] {
        match self {
            AccountRole::Member => MEMBER_CATEGORIES,
            AccountRole::Company => COMPANY_CATEGORIES,
            AccountRole::Admin => ADMIN_CATEGORIES,
        }
    }
}

const MEMBER_CATEGORIES: &[PreferenceCategory] = &[
    PreferenceCategory::NewJobFromFollowedCompany,
    PreferenceCategory::FavoriteJobDeadline,
    PreferenceCategory::ApplicationStatusChange,
    PreferenceCategory::InquiryReportAnswered,
];
const COMPANY_CATEGORIES: &[PreferenceCategory] = &[
    PreferenceCategory::NewApplicant,
    PreferenceCategory::EmpJobDeadline,
    PreferenceCategory::AdminDeletedJob,
    PreferenceCategory::InquiryReportAnswered,
];
const ADMIN_CATEGORIES: &[PreferenceCategory] = &[
    PreferenceCategory::NewInquiry,
    PreferenceCategory::NewReport,
];

/// Human-facing toggle switches. These are coarser than the notification
/// type enum; several types can share one switch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum PreferenceCategory {
    NewJobFromFollowedCompany,
    FavoriteJobDeadline,
    EmpJobDeadline,
    ApplicationStatusChange,
    NewApplicant,
    AdminDeletedJob,
    NewInquiry,
    NewReport,
    InquiryReportAnswered,
}

/// One (user, role) opt-in/opt-out document.
///
/// Absence of a record means "not yet bootstrapped" and is treated as
/// deny-by-default when filtering; the settings read path self-heals by
/// persisting role defaults instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub user_id: usize,
    pub role: AccountRole,
    pub all_notifications: bool,
    pub categories: BTreeMap<PreferenceCategory, bool>,
}

impl PreferenceRecord {
    /// The record Bootstrap writes on first touch: master switch on, every
    /// role-appropriate category enabled.
    pub fn defaults(user_id: usize, role: AccountRole) -> Self {
        Self {
            user_id,
            role,
            all_notifications: true,
            categories: role
                .default_categories()
                .iter()
                .map(|category| (*category, true))
                .collect(),
        }
    }

    /// A category missing from the document counts as disabled; only the
    /// switches the user's document actually carries can allow a delivery.
    pub fn category_enabled(&self, category: PreferenceCategory) -> bool {
        self.categories.get(&category).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_strings() {
        assert_eq!(AccountRole::Member.as_str(), "MEMBER");
        assert_eq!(AccountRole::Company.as_str(), "COMPANY");
        assert_eq!(AccountRole::Admin.as_str(), "ADMIN");
    }

    #[test]
    fn role_from_str_is_case_insensitive() {
        assert_eq!(AccountRole::from_str("member"), Some(AccountRole::Member));
        assert_eq!(AccountRole::from_str("COMPANY"), Some(AccountRole::Company));
        assert_eq!(AccountRole::from_str("Admin"), Some(AccountRole::Admin));
        assert_eq!(AccountRole::from_str("guest"), None);
        assert_eq!(AccountRole::from_str(""), None);
    }

    #[test]
    fn role_serde_roundtrip() {
        let json = serde_json::to_string(&AccountRole::Company).unwrap();
        assert_eq!(json, "\"COMPANY\"");
        let role: AccountRole = serde_json::from_str(&json).unwrap();
        assert_eq!(role, AccountRole::Company);
    }

    #[test]
    fn category_keys_are_camel_case() {
        let json =
            serde_json::to_string(&PreferenceCategory::NewJobFromFollowedCompany).unwrap();
        assert_eq!(json, "\"newJobFromFollowedCompany\"");
        let json = serde_json::to_string(&PreferenceCategory::EmpJobDeadline).unwrap();
        assert_eq!(json, "\"empJobDeadline\"");
    }

    #[test]
    fn member_defaults_carry_member_switches() {
        let record = PreferenceRecord::defaults(1, AccountRole::Member);

        assert!(record.all_notifications);
        assert_eq!(record.categories.len(), 4);
        assert!(record.category_enabled(PreferenceCategory::FavoriteJobDeadline));
        assert!(record.category_enabled(PreferenceCategory::ApplicationStatusChange));
        // Company-only switches are absent, hence disabled
        assert!(!record.category_enabled(PreferenceCategory::NewApplicant));
    }

    #[test]
    fn admin_defaults_carry_moderation_switches_only() {
        let record = PreferenceRecord::defaults(7, AccountRole::Admin);

        assert_eq!(record.categories.len(), 2);
        assert!(record.category_enabled(PreferenceCategory::NewInquiry));
        assert!(record.category_enabled(PreferenceCategory::NewReport));
        assert!(!record.category_enabled(PreferenceCategory::FavoriteJobDeadline));
    }

    #[test]
    fn settings_document_roundtrips_through_json() {
        let record = PreferenceRecord::defaults(3, AccountRole::Company);
        let json = serde_json::to_string(&record.categories).unwrap();
        assert!(json.contains("\"newApplicant\":true"));

        let parsed: std::collections::BTreeMap<PreferenceCategory, bool> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record.categories);
    }
}
