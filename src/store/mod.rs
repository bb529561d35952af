//! Notification storage
//!
//! Three indexes per account over a single record type:
//! - `notification:{id}` — the full record,
//! - `account_notifications:{account_id}` — timeline, id ordered by creation
//!   timestamp, most-recent-first retrieval,
//! - `unread_notifications:{account_id}` — set of unread ids.
//!
//! The indexes are written independently (no cross-index transaction); a
//! crash between writes can leave them transiently inconsistent and callers
//! must tolerate that.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Notification;

pub mod memory;
pub mod redis;

pub use memory::MemoryNotificationStore;
pub use redis::RedisNotificationStore;

/// Storage contract shared by the Redis backend and the in-memory test double
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Upsert the by-id record, (re-)insert the timeline entry keyed by
    /// `created_at`, and add to the unread set iff the record is unread.
    ///
    /// Safe for both first-write and the overwrite performed by
    /// `mark_read`; an overwrite keeps the original `created_at`, so the
    /// timeline position never moves.
    async fn save(&self, notification: &Notification) -> AppResult<()>;

    /// `None` when no record exists; not-found is never an error
    async fn get(&self, id: Uuid) -> AppResult<Option<Notification>>;

    /// Offset pagination over the most-recent-first timeline.
    ///
    /// The returned total is the UNFILTERED timeline size. A category
    /// filter is applied after the page slice has been fetched, so a
    /// filtered page can carry fewer than `page_size` items while the
    /// total still reports the whole timeline.
    async fn list_for_account(
        &self,
        account_id: &str,
        page: u32,
        page_size: u32,
        category: Option<&str>,
    ) -> AppResult<(Vec<Notification>, u64)>;

    /// Returns `false` when the record does not exist. No ownership check:
    /// `account_id` only addresses the unread index, enforcement belongs to
    /// the caller.
    async fn mark_read(&self, id: Uuid, account_id: &str) -> AppResult<bool>;

    /// Marks every currently-unread notification read and returns how many
    /// were marked. No snapshot isolation: ids added concurrently may or
    /// may not be included.
    async fn mark_all_read(&self, account_id: &str) -> AppResult<u64>;

    async fn unread_count(&self, account_id: &str) -> AppResult<u64>;

    /// Removes the record from all three indexes; returns whether the
    /// by-id record existed.
    async fn delete(&self, id: Uuid, account_id: &str) -> AppResult<bool>;
}
