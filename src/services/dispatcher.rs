use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Notification;
use crate::store::NotificationStore;
use crate::websocket::{ConnectionRegistry, ServerMessage};

/// Delivery coordinator
///
/// The single call path shared by the event consumer and the HTTP layer.
/// It enforces two invariants the store and registry cannot enforce alone:
/// every persisted notification is offered to the registry exactly once per
/// ingestion, and every count-relevant mutation is followed by an
/// unread-count push to the affected account.
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    registry: ConnectionRegistry,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, registry: ConnectionRegistry) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Persist a notification, then push it to live subscribers
    pub async fn publish(&self, notification: Notification) -> AppResult<Notification> {
        self.store.save(&notification).await?;
        self.registry
            .broadcast_notification(&notification.account_id, &notification)
            .await;
        debug!(
            "published notification {} to account {}",
            notification.id, notification.account_id
        );
        Ok(notification)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Option<Notification>> {
        self.store.get(id).await
    }

    pub async fn list_for_account(
        &self,
        account_id: &str,
        page: u32,
        page_size: u32,
        category: Option<&str>,
    ) -> AppResult<(Vec<Notification>, u64)> {
        self.store
            .list_for_account(account_id, page, page_size, category)
            .await
    }

    pub async fn unread_count(&self, account_id: &str) -> AppResult<u64> {
        self.store.unread_count(account_id).await
    }

    /// Mark one notification read; `None` when no such record exists,
    /// otherwise the account's new unread count (already pushed).
    pub async fn mark_read(&self, id: Uuid, account_id: &str) -> AppResult<Option<u64>> {
        if !self.store.mark_read(id, account_id).await? {
            return Ok(None);
        }
        let unread = self.push_unread_count(account_id).await?;
        Ok(Some(unread))
    }

    /// Mark everything read; returns (marked count, unread count after)
    pub async fn mark_all_read(&self, account_id: &str) -> AppResult<(u64, u64)> {
        let read_count = self.store.mark_all_read(account_id).await?;
        let unread = self.push_unread_count(account_id).await?;
        Ok((read_count, unread))
    }

    /// Delete a notification; a successful delete also pushes the updated
    /// unread count, since it may have removed an unread record.
    pub async fn delete(&self, id: Uuid, account_id: &str) -> AppResult<bool> {
        if !self.store.delete(id, account_id).await? {
            return Ok(false);
        }
        self.push_unread_count(account_id).await?;
        Ok(true)
    }

    async fn push_unread_count(&self, account_id: &str) -> AppResult<u64> {
        let unread = self.store.unread_count(account_id).await?;
        self.registry
            .broadcast_message(account_id, ServerMessage::unread_count_update(unread))
            .await;
        Ok(unread)
    }
}
