// Artifact Store Port (Interface)

use crate::domain::Artifact;
use crate::error::Result;
use async_trait::async_trait;

/// Append-only store for raw grading results
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist a new artifact.
    ///
    /// # Errors
    /// - `AppError::Conflict` if an artifact already exists at `artifact.path`;
    ///   an earlier attempt is never overwritten
    async fn put(&self, artifact: &Artifact) -> Result<()>;

    /// All artifacts ever persisted for `assignment`, oldest first
    async fn list(&self, assignment: &str) -> Result<Vec<Artifact>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Side effect observed by a mock store
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TimelineEvent {
        ArtifactPut { path: String, email: String },
        NotificationEnqueued { recipient: String },
    }

    /// Shared, ordered log of side effects across mock stores
    #[derive(Debug, Clone, Default)]
    pub struct Timeline {
        events: Arc<Mutex<Vec<TimelineEvent>>>,
    }

    impl Timeline {
        pub fn push(&self, event: TimelineEvent) {
            self.events.lock().unwrap().push(event);
        }

        pub fn events(&self) -> Vec<TimelineEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    /// In-memory artifact store with failure injection per email
    #[derive(Default)]
    pub struct InMemoryArtifactStore {
        artifacts: Mutex<Vec<Artifact>>,
        failing_emails: Mutex<HashSet<String>>,
        timeline: Timeline,
    }

    impl InMemoryArtifactStore {
        pub fn with_timeline(timeline: Timeline) -> Self {
            Self {
                timeline,
                ..Default::default()
            }
        }

        pub fn fail_for(&self, email: &str) {
            self.failing_emails.lock().unwrap().insert(email.to_string());
        }

        pub fn all(&self) -> Vec<Artifact> {
            self.artifacts.lock().unwrap().clone()
        }

        pub fn count_for(&self, email: &str) -> usize {
            self.artifacts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.email == email)
                .count()
        }
    }

    #[async_trait]
    impl ArtifactStore for InMemoryArtifactStore {
        async fn put(&self, artifact: &Artifact) -> Result<()> {
            if self.failing_emails.lock().unwrap().contains(&artifact.email) {
                return Err(AppError::Database(format!(
                    "artifact store rejected {}",
                    artifact.path
                )));
            }

            let mut artifacts = self.artifacts.lock().unwrap();
            if artifacts.iter().any(|a| a.path == artifact.path) {
                return Err(AppError::Conflict(format!(
                    "artifact {} already exists",
                    artifact.path
                )));
            }
            artifacts.push(artifact.clone());
            self.timeline.push(TimelineEvent::ArtifactPut {
                path: artifact.path.clone(),
                email: artifact.email.clone(),
            });
            Ok(())
        }

        async fn list(&self, assignment: &str) -> Result<Vec<Artifact>> {
            let mut found: Vec<Artifact> = self
                .artifacts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.assignment == assignment)
                .cloned()
                .collect();
            found.sort_by_key(|a| a.persisted_at);
            Ok(found)
        }
    }
}
