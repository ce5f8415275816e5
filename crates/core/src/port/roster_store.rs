// Roster Store Port (Interface)
// Paginated read access to the assignment and credential tables

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque continuation token handed back by the store
pub type ContinuationToken = String;

/// One page of a segmented query
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` once the last page has been returned
    pub continuation: Option<ContinuationToken>,
}

/// Row of the assignments table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Project key
    pub project: String,
    pub teacher_email: String,
    pub grader_url: String,
}

/// Row of the credentials table (partitioned by project)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub project: String,
    pub email: String,
    pub credentials: String,
}

/// Read-only roster store.
///
/// Any error is reported as-is; the roster service maps it to
/// `AppError::RosterUnavailable`.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Fetch one page of assignments
    async fn assignments_page(
        &self,
        continuation: Option<ContinuationToken>,
    ) -> Result<Page<AssignmentRecord>>;

    /// Fetch one page of credentials for `project`
    async fn credentials_page(
        &self,
        project: &str,
        continuation: Option<ContinuationToken>,
    ) -> Result<Page<CredentialRecord>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory roster store that serves fixed-size pages
    pub struct InMemoryRosterStore {
        assignments: Mutex<Vec<AssignmentRecord>>,
        credentials: Mutex<Vec<CredentialRecord>>,
        page_size: usize,
        /// Fail when serving the page with this (global) index
        fail_on_page: Mutex<Option<usize>>,
        pages_served: AtomicUsize,
    }

    impl InMemoryRosterStore {
        pub fn new(page_size: usize) -> Self {
            Self {
                assignments: Mutex::new(Vec::new()),
                credentials: Mutex::new(Vec::new()),
                page_size: page_size.max(1),
                fail_on_page: Mutex::new(None),
                pages_served: AtomicUsize::new(0),
            }
        }

        pub fn add_assignment(&self, project: &str, teacher_email: &str, grader_url: &str) {
            self.assignments.lock().unwrap().push(AssignmentRecord {
                project: project.to_string(),
                teacher_email: teacher_email.to_string(),
                grader_url: grader_url.to_string(),
            });
        }

        pub fn add_student(&self, project: &str, email: &str, credentials: &str) {
            self.credentials.lock().unwrap().push(CredentialRecord {
                project: project.to_string(),
                email: email.to_string(),
                credentials: credentials.to_string(),
            });
        }

        pub fn fail_on_page(&self, index: Option<usize>) {
            *self.fail_on_page.lock().unwrap() = index;
        }

        pub fn pages_served(&self) -> usize {
            self.pages_served.load(Ordering::SeqCst)
        }

        fn serve<T: Clone>(&self, rows: &[T], continuation: Option<String>) -> Result<Page<T>> {
            let index = self.pages_served.fetch_add(1, Ordering::SeqCst);
            if *self.fail_on_page.lock().unwrap() == Some(index) {
                return Err(AppError::Database(format!("page {} unavailable", index)));
            }

            let start: usize = match continuation {
                Some(token) => token
                    .parse()
                    .map_err(|_| AppError::Validation(format!("bad token {}", token)))?,
                None => 0,
            };
            let end = (start + self.page_size).min(rows.len());
            let items = rows.get(start..end).unwrap_or_default().to_vec();
            let continuation = (end < rows.len()).then(|| end.to_string());
            Ok(Page {
                items,
                continuation,
            })
        }
    }

    #[async_trait]
    impl RosterStore for InMemoryRosterStore {
        async fn assignments_page(
            &self,
            continuation: Option<ContinuationToken>,
        ) -> Result<Page<AssignmentRecord>> {
            let rows = self.assignments.lock().unwrap().clone();
            self.serve(&rows, continuation)
        }

        async fn credentials_page(
            &self,
            project: &str,
            continuation: Option<ContinuationToken>,
        ) -> Result<Page<CredentialRecord>> {
            let rows: Vec<CredentialRecord> = self
                .credentials
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.project == project)
                .cloned()
                .collect();
            self.serve(&rows, continuation)
        }
    }
}
