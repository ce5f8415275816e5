// Notification Queue Port (Interface)
// Delivery is someone else's job; this port only enqueues.

use crate::domain::Notification;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Append a message to the outbound queue
    async fn enqueue(&self, notification: &Notification) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::artifact_store::mocks::{Timeline, TimelineEvent};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryNotificationQueue {
        messages: Mutex<Vec<Notification>>,
        unavailable: AtomicBool,
        timeline: Timeline,
    }

    impl InMemoryNotificationQueue {
        pub fn with_timeline(timeline: Timeline) -> Self {
            Self {
                timeline,
                ..Default::default()
            }
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub fn messages(&self) -> Vec<Notification> {
            self.messages.lock().unwrap().clone()
        }

        pub fn count_for(&self, recipient: &str) -> usize {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.recipient == recipient)
                .count()
        }
    }

    #[async_trait]
    impl NotificationQueue for InMemoryNotificationQueue {
        async fn enqueue(&self, notification: &Notification) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::Database("queue unavailable".to_string()));
            }
            self.messages.lock().unwrap().push(notification.clone());
            self.timeline.push(TimelineEvent::NotificationEnqueued {
                recipient: notification.recipient.clone(),
            });
            Ok(())
        }
    }
}
