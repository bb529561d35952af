use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Notification;
use crate::store::NotificationStore;

#[derive(Default)]
struct Indexes {
    records: HashMap<Uuid, Notification>,
    /// account_id -> (id -> creation timestamp millis)
    timelines: HashMap<String, HashMap<Uuid, i64>>,
    unread: HashMap<String, HashSet<Uuid>>,
}

/// In-memory notification store honoring the exact contract of the Redis
/// backend, including the unfiltered total and filter-after-slice listing
/// behavior. Used by the test suite; never wired into the binary.
#[derive(Default, Clone)]
pub struct MemoryNotificationStore {
    inner: Arc<RwLock<Indexes>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn save(&self, notification: &Notification) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        guard
            .records
            .insert(notification.id, notification.clone());
        guard
            .timelines
            .entry(notification.account_id.clone())
            .or_default()
            .insert(notification.id, notification.created_at.timestamp_millis());
        if !notification.is_read {
            guard
                .unread
                .entry(notification.account_id.clone())
                .or_default()
                .insert(notification.id);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Notification>> {
        let guard = self.inner.read().await;
        Ok(guard.records.get(&id).cloned())
    }

    async fn list_for_account(
        &self,
        account_id: &str,
        page: u32,
        page_size: u32,
        category: Option<&str>,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let guard = self.inner.read().await;

        let mut entries: Vec<(Uuid, i64)> = guard
            .timelines
            .get(account_id)
            .map(|timeline| timeline.iter().map(|(id, ts)| (*id, *ts)).collect())
            .unwrap_or_default();
        let total = entries.len() as u64;

        // Most-recent-first; ties resolved like a Redis sorted set
        // (reverse lexicographic member order for equal scores).
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

        let start = page.saturating_sub(1) as usize * page_size as usize;
        let notifications = entries
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .filter_map(|(id, _)| guard.records.get(&id).cloned())
            .filter(|n| category.map_or(true, |c| n.category.as_deref() == Some(c)))
            .collect();

        Ok((notifications, total))
    }

    async fn mark_read(&self, id: Uuid, account_id: &str) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        let Some(record) = guard.records.get_mut(&id) else {
            return Ok(false);
        };
        record.is_read = true;

        let emptied = guard
            .unread
            .get_mut(account_id)
            .map(|set| {
                set.remove(&id);
                set.is_empty()
            })
            .unwrap_or(false);
        if emptied {
            guard.unread.remove(account_id);
        }

        Ok(true)
    }

    async fn mark_all_read(&self, account_id: &str) -> AppResult<u64> {
        let ids: Vec<Uuid> = {
            let guard = self.inner.read().await;
            guard
                .unread
                .get(account_id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
        };

        let mut count = 0u64;
        for id in ids {
            if self.mark_read(id, account_id).await? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn unread_count(&self, account_id: &str) -> AppResult<u64> {
        let guard = self.inner.read().await;
        Ok(guard.unread.get(account_id).map(|set| set.len()).unwrap_or(0) as u64)
    }

    async fn delete(&self, id: Uuid, account_id: &str) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        let existed = guard.records.remove(&id).is_some();

        let timeline_emptied = guard
            .timelines
            .get_mut(account_id)
            .map(|timeline| {
                timeline.remove(&id);
                timeline.is_empty()
            })
            .unwrap_or(false);
        if timeline_emptied {
            guard.timelines.remove(account_id);
        }

        let unread_emptied = guard
            .unread
            .get_mut(account_id)
            .map(|set| {
                set.remove(&id);
                set.is_empty()
            })
            .unwrap_or(false);
        if unread_emptied {
            guard.unread.remove(account_id);
        }

        Ok(existed)
    }
}
