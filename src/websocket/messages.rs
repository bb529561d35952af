use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::Notification;

/// Server-to-client message envelope
///
/// Wire shape is `{"type": "...", "data": {...}}`, matching what the web
/// client consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent immediately after a successful connect
    Connected {
        message: String,
        account_id: String,
        unread_count: u64,
    },

    /// A freshly stored notification, pushed in full
    Notification(Notification),

    /// Pushed after any read-state or count-relevant mutation
    UnreadCountUpdate { unread_count: u64 },

    /// Keepalive reply to a client-sent `ping`
    Pong { timestamp: String },
}

impl ServerMessage {
    pub fn connected(account_id: impl Into<String>, unread_count: u64) -> Self {
        ServerMessage::Connected {
            message: "Connected to notification service".to_string(),
            account_id: account_id.into(),
            unread_count,
        }
    }

    pub fn notification(notification: &Notification) -> Self {
        ServerMessage::Notification(notification.clone())
    }

    pub fn unread_count_update(unread_count: u64) -> Self {
        ServerMessage::UnreadCountUpdate { unread_count }
    }

    pub fn pong() -> Self {
        ServerMessage::Pong {
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
