//! Real-time delivery
//!
//! One registry entry per account holds the live connection handles; a
//! stored notification fans out to every handle of its account. Handle-set
//! mutation (connect, disconnect, post-broadcast cleanup) is serialized
//! behind a write lock, while the fanout pass itself walks a snapshot so
//! slow subscribers never block connects or disconnects.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use tracing::debug;
use uuid::Uuid;

use crate::models::Notification;

pub mod messages;
pub mod session;

pub use messages::ServerMessage;
pub use session::WsSession;

/// Unique identifier for a live connection handle
///
/// Lets a broadcast pass name exactly which handles failed so cleanup
/// removes those and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Handle {
    id: ConnectionId,
    sender: UnboundedSender<ServerMessage>,
}

/// Registry of live connections, keyed by account
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<String, Vec<Handle>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new handle for an account
    ///
    /// Returns the handle id (needed for disconnect) and the receiving end
    /// of its message channel.
    pub async fn connect(
        &self,
        account_id: &str,
    ) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = unbounded_channel();
        let handle = Handle {
            id: ConnectionId::new(),
            sender: tx,
        };
        let id = handle.id;

        let mut guard = self.inner.write().await;
        guard.entry(account_id.to_string()).or_default().push(handle);

        debug!(
            "client connected: {} ({} connections)",
            account_id,
            guard.get(account_id).map(|h| h.len()).unwrap_or(0)
        );

        (id, rx)
    }

    /// Remove a handle; the account entry itself is dropped once its last
    /// handle is gone.
    pub async fn disconnect(&self, account_id: &str, connection_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        if let Some(handles) = guard.get_mut(account_id) {
            handles.retain(|handle| handle.id != connection_id);
            if handles.is_empty() {
                guard.remove(account_id);
            }
        }
        debug!("client disconnected: {}", account_id);
    }

    /// Push a stored notification to every live handle of its account
    pub async fn broadcast_notification(&self, account_id: &str, notification: &Notification) {
        self.fan_out(account_id, ServerMessage::notification(notification))
            .await;
    }

    /// Push a generic message (unread-count updates and the like)
    pub async fn broadcast_message(&self, account_id: &str, message: ServerMessage) {
        self.fan_out(account_id, message).await;
    }

    async fn fan_out(&self, account_id: &str, message: ServerMessage) {
        // Snapshot under the read lock, send after releasing it.
        let targets: Vec<(ConnectionId, UnboundedSender<ServerMessage>)> = {
            let guard = self.inner.read().await;
            match guard.get(account_id) {
                Some(handles) => handles
                    .iter()
                    .map(|handle| (handle.id, handle.sender.clone()))
                    .collect(),
                None => {
                    debug!("no active connections for account {}", account_id);
                    return;
                }
            }
        };

        let mut dead = Vec::new();
        for (id, sender) in targets {
            if sender.send(message.clone()).is_err() {
                dead.push(id);
            }
        }

        // Failed handles are removed after the full fanout pass; a dead
        // connection never costs its siblings their delivery.
        if !dead.is_empty() {
            let mut guard = self.inner.write().await;
            if let Some(handles) = guard.get_mut(account_id) {
                handles.retain(|handle| !dead.contains(&handle.id));
                if handles.is_empty() {
                    guard.remove(account_id);
                }
            }
            debug!(
                "cleaned up {} dead connections for account {}",
                dead.len(),
                account_id
            );
        }
    }

    pub async fn connection_count(&self, account_id: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(account_id).map(|handles| handles.len()).unwrap_or(0)
    }

    pub async fn total_connections(&self) -> usize {
        let guard = self.inner.read().await;
        guard.values().map(|handles| handles.len()).sum()
    }
}
