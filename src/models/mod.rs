use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification kind, controls client-side presentation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Informational, no action required
    Info,
    /// Positive outcome (request accepted, card created, ...)
    Success,
    /// Something needs the user's attention
    Warning,
    /// The user is expected to act (carries an action URL)
    Action,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Action => "action",
        }
    }
}

/// Notification priority level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }
}

/// Core notification record
///
/// Identity (`id`, `account_id`, `created_at`) is immutable after creation;
/// only the read/dismiss flags change over the record's lifetime.
/// `created_at` is the sole ordering key of the per-account timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,

    /// Owning account; every store index is partitioned by it
    pub account_id: String,

    #[serde(default)]
    pub is_read: bool,

    #[serde(default)]
    pub was_dismissed: bool,

    /// Short display title
    pub label: String,

    /// Display body
    pub content: String,

    pub created_at: DateTime<Utc>,

    /// Presentation metadata, never used for ordering or uniqueness
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotificationKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<NotificationPriority>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

impl Notification {
    /// Create an unread notification with a fresh id and timestamp
    pub fn new(
        account_id: impl Into<String>,
        label: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.into(),
            is_read: false,
            was_dismissed: false,
            label: label.into(),
            content: content.into(),
            created_at: Utc::now(),
            kind: None,
            icon: None,
            priority: Some(NotificationPriority::Normal),
            category: None,
            action_url: None,
        }
    }

    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_action_url(mut self, action_url: impl Into<String>) -> Self {
        self.action_url = Some(action_url.into());
        self
    }
}

/// Request body for the explicit create endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationPayload {
    pub account_id: String,
    pub label: String,
    pub content: String,
    pub kind: Option<NotificationKind>,
    pub icon: Option<String>,
    pub priority: Option<NotificationPriority>,
    pub category: Option<String>,
    pub action_url: Option<String>,
}

impl CreateNotificationPayload {
    pub fn into_notification(self) -> Notification {
        let mut notification = Notification::new(self.account_id, self.label, self.content);
        notification.kind = self.kind;
        notification.icon = self.icon;
        if let Some(priority) = self.priority {
            notification.priority = Some(priority);
        }
        notification.category = self.category;
        notification.action_url = self.action_url;
        notification
    }
}

/// Paginated listing response
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    /// Unfiltered timeline size for the account, even when a category
    /// filter trims the returned page
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub unread_count: u64,
}
