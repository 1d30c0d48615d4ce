//! Notification data models.

use serde::{Deserialize, Serialize};

use crate::preferences::{AccountRole, PreferenceCategory};

/// Notification type enum.
///
/// Stored and serialized as SCREAMING_SNAKE_CASE tags. Types map to a
/// preference toggle via [`NotificationType::preference_category`]; a type
/// with no mapping is delivered whenever the master switch is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    NewJobFromFavoriteCompany,
    FavoriteJobDeadline,
    EmpJobDeadline,
    ApplicationStatusUpdate,
    EmpApplicationReceived,
    EmpJobDeletedByAdmin,
    AdminInquiryCreated,
    AdminReportCreated,
    InquiryReportAnswered,
    SystemAnnouncement,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewJobFromFavoriteCompany => "NEW_JOB_FROM_FAVORITE_COMPANY",
            Self::FavoriteJobDeadline => "FAVORITE_JOB_DEADLINE",
            Self::EmpJobDeadline => "EMP_JOB_DEADLINE",
            Self::ApplicationStatusUpdate => "APPLICATION_STATUS_UPDATE",
            Self::EmpApplicationReceived => "EMP_APPLICATION_RECEIVED",
            Self::EmpJobDeletedByAdmin => "EMP_JOB_DELETED_BY_ADMIN",
            Self::AdminInquiryCreated => "ADMIN_INQUIRY_CREATED",
            Self::AdminReportCreated => "ADMIN_REPORT_CREATED",
            Self::InquiryReportAnswered => "INQUIRY_REPORT_ANSWERED",
            Self::SystemAnnouncement => "SYSTEM_ANNOUNCEMENT",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NEW_JOB_FROM_FAVORITE_COMPANY" => Some(Self::NewJobFromFavoriteCompany),
            "FAVORITE_JOB_DEADLINE" => Some(Self::FavoriteJobDeadline),
            "EMP_JOB_DEADLINE" => Some(Self::EmpJobDeadline),
            "APPLICATION_STATUS_UPDATE" => Some(Self::ApplicationStatusUpdate),
            "EMP_APPLICATION_RECEIVED" => Some(Self::EmpApplicationReceived),
            "EMP_JOB_DELETED_BY_ADMIN" => Some(Self::EmpJobDeletedByAdmin),
            "ADMIN_INQUIRY_CREATED" => Some(Self::AdminInquiryCreated),
            "ADMIN_REPORT_CREATED" => Some(Self::AdminReportCreated),
            "INQUIRY_REPORT_ANSWERED" => Some(Self::InquiryReportAnswered),
            "SYSTEM_ANNOUNCEMENT" => Some(Self::SystemAnnouncement),
            _ => None,
        }
    }

    /// The hand-maintained type -> toggle category table.
    ///
    /// Returns None for types that have no human-facing switch; those are
    /// gated only by the master switch (fail-open).
    pub fn preference_category(self) -> Option<PreferenceCategory> {
        match self {
            Self::NewJobFromFavoriteCompany => {
                Some(PreferenceCategory::NewJobFromFollowedCompany)
            }
            Self::FavoriteJobDeadline => Some(PreferenceCategory::FavoriteJobDeadline),
            Self::EmpJobDeadline => Some(PreferenceCategory::EmpJobDeadline),
            Self::ApplicationStatusUpdate => {
                Some(PreferenceCategory::ApplicationStatusChange)
            }
            Self::EmpApplicationReceived => Some(PreferenceCategory::NewApplicant),
            Self::EmpJobDeletedByAdmin => Some(PreferenceCategory::AdminDeletedJob),
            Self::AdminInquiryCreated => Some(PreferenceCategory::NewInquiry),
            Self::AdminReportCreated => Some(PreferenceCategory::NewReport),
            Self::InquiryReportAnswered => Some(PreferenceCategory::InquiryReportAnswered),
            Self::SystemAnnouncement => None,
        }
    }
}

/// A persisted user notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: usize,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: i64,
}

/// A pre-persistence notification produced by a trigger (route handler or
/// deadline scheduler). Carries everything a [`Notification`] needs minus
/// its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateNotification {
    pub user_id: usize,
    /// The role whose preference record gates this delivery. Candidates
    /// without a role are rejected (single publish) or dropped (bulk).
    pub role: Option<AccountRole>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    /// Bypasses preference filtering. Reserved for transactional
    /// confirmations the user must see regardless of settings; kept as an
    /// explicit field so the policy stays visible at each call site.
    pub force: bool,
}

impl CandidateNotification {
    pub fn new(
        user_id: usize,
        role: AccountRole,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            role: Some(role),
            kind,
            title: title.into(),
            message: message.into(),
            metadata: None,
            force: false,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Builds the moderation fan-out batch: one candidate per admin, all
    /// sharing the same payload. Used when a new inquiry or report needs
    /// every moderator's attention.
    pub fn admin_fanout(
        admin_ids: &[usize],
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Vec<Self> {
        let title = title.into();
        let message = message.into();
        admin_ids
            .iter()
            .map(|admin_id| {
                Self::new(*admin_id, AccountRole::Admin, kind, title.clone(), message.clone())
                    .with_metadata(metadata.clone())
            })
            .collect()
    }
}
