// Roster loading (Stage A)

use crate::domain::{Assignment, Student};
use crate::error::{AppError, Result};
use crate::port::{AssignmentRecord, ContinuationToken, Page, RosterStore};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Loads every assignment with its enrolled students for the current run
pub struct RosterService {
    store: Arc<dyn RosterStore>,
}

impl RosterService {
    pub fn new(store: Arc<dyn RosterStore>) -> Self {
        Self { store }
    }

    /// Load the complete roster.
    ///
    /// All pages are merged before returning; a partial page set is never
    /// surfaced. Any store failure becomes `AppError::RosterUnavailable`.
    pub async fn load(&self) -> Result<Vec<Assignment>> {
        let records = drain_pages(|token| self.store.assignments_page(token))
            .await
            .map_err(|e| unavailable("assignments", e))?;

        let mut assignments = Vec::with_capacity(records.len());
        for record in records {
            assignments.push(self.load_assignment(record).await?);
        }

        info!(assignments = assignments.len(), "Roster loaded");
        Ok(assignments)
    }

    async fn load_assignment(&self, record: AssignmentRecord) -> Result<Assignment> {
        let project = record.project.clone();
        let credentials = drain_pages(|token| self.store.credentials_page(&project, token))
            .await
            .map_err(|e| unavailable(&project, e))?;

        let students: Vec<Student> = credentials
            .into_iter()
            .map(|c| Student::new(c.email, c.credentials))
            .collect();

        debug!(assignment = %project, students = students.len(), "Assignment roster loaded");

        Ok(Assignment {
            name: record.project,
            teacher_email: record.teacher_email,
            grader_url: record.grader_url,
            serialized_roster: serde_json::to_string(&students)?,
        })
    }
}

/// Follow continuation tokens until the store reports the last page
async fn drain_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<ContinuationToken>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token = None;
    loop {
        let page = fetch(token.take()).await?;
        items.extend(page.items);
        match page.continuation {
            Some(next) => token = Some(next),
            None => return Ok(items),
        }
    }
}

fn unavailable(what: &str, err: AppError) -> AppError {
    error!(source = %what, error = %err, "Roster store unavailable");
    AppError::RosterUnavailable(format!("{}: {}", what, err))
}
