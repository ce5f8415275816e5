// SQLite NotificationQueue Implementation
// Payload column holds the queued message as JSON {"to","subject","body"}

use crate::error::{decode_json, map_sqlx_error};
use async_trait::async_trait;
use gradeflow_core::domain::Notification;
use gradeflow_core::error::Result;
use gradeflow_core::port::{NotificationQueue, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

pub struct SqliteNotificationQueue {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteNotificationQueue {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Queued messages in enqueue order (for the delivery side and tests)
    pub async fn peek(&self, limit: i64) -> Result<Vec<Notification>> {
        let payloads: Vec<String> =
            sqlx::query_scalar("SELECT payload FROM notifications ORDER BY id ASC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        payloads
            .iter()
            .map(|payload| decode_json("notifications.payload", payload))
            .collect()
    }

    pub async fn count_for(&self, recipient: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient = ?")
            .bind(recipient)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl NotificationQueue for SqliteNotificationQueue {
    async fn enqueue(&self, notification: &Notification) -> Result<()> {
        let payload = serde_json::to_string(notification)?;

        sqlx::query("INSERT INTO notifications (recipient, payload, enqueued_at) VALUES (?, ?, ?)")
            .bind(&notification.recipient)
            .bind(&payload)
            .bind(self.time_provider.now_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(recipient = %notification.recipient, "Notification enqueued");
        Ok(())
    }
}
