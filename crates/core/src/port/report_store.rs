// Report Store Port (Interface)

use crate::error::Result;
use async_trait::async_trait;

/// Stored report document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReport {
    pub path: String,
    pub content_type: String,
    pub body: String,
    pub written_at: i64,
}

/// Report store. Writes replace whatever is stored at `path`.
///
/// No locking: "latest" pointers are only safe while at most one aggregation
/// per assignment is in flight.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn put(&self, report: &StoredReport) -> Result<()>;

    async fn get(&self, path: &str) -> Result<Option<StoredReport>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryReportStore {
        reports: Mutex<BTreeMap<String, StoredReport>>,
        failing_prefixes: Mutex<HashSet<String>>,
        writes: Mutex<usize>,
    }

    impl InMemoryReportStore {
        /// Reject every write whose path starts with `prefix`
        pub fn fail_for(&self, prefix: &str) {
            self.failing_prefixes.lock().unwrap().insert(prefix.to_string());
        }

        pub fn paths(&self) -> Vec<String> {
            self.reports.lock().unwrap().keys().cloned().collect()
        }

        pub fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    #[async_trait]
    impl ReportStore for InMemoryReportStore {
        async fn put(&self, report: &StoredReport) -> Result<()> {
            let rejected = self
                .failing_prefixes
                .lock()
                .unwrap()
                .iter()
                .any(|p| report.path.starts_with(p.as_str()));
            if rejected {
                return Err(AppError::Database(format!("cannot write {}", report.path)));
            }
            *self.writes.lock().unwrap() += 1;
            self.reports
                .lock()
                .unwrap()
                .insert(report.path.clone(), report.clone());
            Ok(())
        }

        async fn get(&self, path: &str) -> Result<Option<StoredReport>> {
            Ok(self.reports.lock().unwrap().get(path).cloned())
        }
    }
}
