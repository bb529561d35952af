use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Notification;
use crate::store::NotificationStore;

/// Redis-backed notification store
#[derive(Clone)]
pub struct RedisNotificationStore {
    redis: ConnectionManager,
}

impl RedisNotificationStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn connect(redis_url: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Config(format!("invalid REDIS_URL: {}", e)))?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }

    fn notification_key(id: Uuid) -> String {
        format!("notification:{}", id)
    }

    fn timeline_key(account_id: &str) -> String {
        format!("account_notifications:{}", account_id)
    }

    fn unread_key(account_id: &str) -> String {
        format!("unread_notifications:{}", account_id)
    }
}

#[async_trait]
impl NotificationStore for RedisNotificationStore {
    async fn save(&self, notification: &Notification) -> AppResult<()> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| AppError::Internal(format!("failed to serialize notification: {}", e)))?;

        let mut conn = self.redis.clone();
        conn.set::<_, _, ()>(Self::notification_key(notification.id), payload)
            .await?;

        // Timeline score is the creation timestamp; re-saving the same
        // record re-inserts with an identical score, so ordering is stable.
        let score = notification.created_at.timestamp_millis() as f64;
        conn.zadd::<_, _, _, ()>(
            Self::timeline_key(&notification.account_id),
            notification.id.to_string(),
            score,
        )
        .await?;

        if !notification.is_read {
            conn.sadd::<_, _, ()>(
                Self::unread_key(&notification.account_id),
                notification.id.to_string(),
            )
            .await?;
        }

        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Notification>> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = conn.get(Self::notification_key(id)).await?;

        match raw {
            Some(data) => serde_json::from_str(&data).map(Some).map_err(|e| {
                error!("failed to deserialize notification {}: {}", id, e);
                AppError::Internal(format!("corrupt notification record: {}", e))
            }),
            None => Ok(None),
        }
    }

    async fn list_for_account(
        &self,
        account_id: &str,
        page: u32,
        page_size: u32,
        category: Option<&str>,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let timeline = Self::timeline_key(account_id);
        let mut conn = self.redis.clone();

        let total: u64 = conn.zcard(&timeline).await?;

        let start = page.saturating_sub(1) as isize * page_size as isize;
        let stop = start + page_size as isize - 1;
        let ids: Vec<String> = conn.zrevrange(&timeline, start, stop).await?;

        let mut notifications = Vec::with_capacity(ids.len());
        for raw_id in ids {
            let id = match Uuid::parse_str(&raw_id) {
                Ok(id) => id,
                Err(_) => {
                    warn!("skipping non-uuid timeline entry {:?} for {}", raw_id, account_id);
                    continue;
                }
            };
            if let Some(notification) = self.get(id).await? {
                // Filter is applied after the page slice was fetched, so
                // a filtered page may return fewer than page_size items
                // while the total stays unfiltered.
                if category.map_or(true, |c| notification.category.as_deref() == Some(c)) {
                    notifications.push(notification);
                }
            }
        }

        Ok((notifications, total))
    }

    async fn mark_read(&self, id: Uuid, account_id: &str) -> AppResult<bool> {
        let Some(mut notification) = self.get(id).await? else {
            return Ok(false);
        };

        notification.is_read = true;
        self.save(&notification).await?;

        let mut conn = self.redis.clone();
        conn.srem::<_, _, ()>(Self::unread_key(account_id), id.to_string())
            .await?;

        Ok(true)
    }

    async fn mark_all_read(&self, account_id: &str) -> AppResult<u64> {
        let mut conn = self.redis.clone();
        let ids: Vec<String> = conn.smembers(Self::unread_key(account_id)).await?;

        let mut count = 0u64;
        for raw_id in ids {
            let Ok(id) = Uuid::parse_str(&raw_id) else {
                warn!("skipping non-uuid unread entry {:?} for {}", raw_id, account_id);
                continue;
            };
            if self.mark_read(id, account_id).await? {
                count += 1;
            }
        }

        Ok(count)
    }

    async fn unread_count(&self, account_id: &str) -> AppResult<u64> {
        let mut conn = self.redis.clone();
        let count: u64 = conn.scard(Self::unread_key(account_id)).await?;
        Ok(count)
    }

    async fn delete(&self, id: Uuid, account_id: &str) -> AppResult<bool> {
        let mut conn = self.redis.clone();

        let removed: i64 = conn.del(Self::notification_key(id)).await?;
        conn.zrem::<_, _, ()>(Self::timeline_key(account_id), id.to_string())
            .await?;
        conn.srem::<_, _, ()>(Self::unread_key(account_id), id.to_string())
            .await?;

        Ok(removed > 0)
    }
}
