// Report aggregation (Stage D)

use crate::domain::{MarkReport, ReportKind, JSON_CONTENT_TYPE};
use crate::error::{AppError, Result};
use crate::port::time_provider::to_local;
use crate::port::{ArtifactStore, ReportStore, ResultParser, StoredReport, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one aggregation produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub assignment: String,
    pub artifacts_scanned: usize,
    /// Artifacts whose document could not be parsed
    pub artifacts_skipped: usize,
    pub students_accumulated: usize,
    pub students_today: usize,
    pub paths: Vec<String>,
}

/// Recomputes the accumulated and today mark tables of one assignment
pub struct ReportAggregator {
    artifacts: Arc<dyn ArtifactStore>,
    reports: Arc<dyn ReportStore>,
    parser: Arc<dyn ResultParser>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ReportAggregator {
    pub fn new(
        artifacts: Arc<dyn ArtifactStore>,
        reports: Arc<dyn ReportStore>,
        parser: Arc<dyn ResultParser>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            artifacts,
            reports,
            parser,
            time_provider,
        }
    }

    /// Scan every artifact of `assignment` and write four report documents:
    /// the timestamped and latest copies of both tables.
    ///
    /// "Today" is the local calendar day of the clock at aggregation time.
    ///
    /// # Errors
    /// `AppError::ReportCompute` if the artifacts cannot be listed or a report
    /// cannot be written
    pub async fn aggregate(&self, assignment: &str) -> Result<ReportOutcome> {
        let compute_error = |reason: String| AppError::ReportCompute {
            assignment: assignment.to_string(),
            reason,
        };

        let now = self.time_provider.now_local();
        let offset = *now.offset();
        let today = now.date_naive();

        let artifacts = self
            .artifacts
            .list(assignment)
            .await
            .map_err(|e| compute_error(e.to_string()))?;

        let mut accumulated = MarkReport::new();
        let mut today_report = MarkReport::new();
        let mut skipped = 0;

        for artifact in &artifacts {
            let marks = match self.parser.parse(artifact.body.as_bytes()) {
                Ok(marks) => marks,
                Err(e) => {
                    warn!(
                        assignment = %assignment,
                        path = %artifact.path,
                        error = %e,
                        "Skipping unparseable artifact"
                    );
                    skipped += 1;
                    continue;
                }
            };

            accumulated.include(&artifact.email, &marks);
            if to_local(artifact.persisted_at, offset).date_naive() == today {
                today_report.include(&artifact.email, &marks);
            }
        }

        let written_at = now.timestamp_millis();
        let mut paths = Vec::with_capacity(4);
        for (kind, report) in [
            (ReportKind::Accumulated, &accumulated),
            (ReportKind::Today, &today_report),
        ] {
            let body = report.to_json()?;
            for path in [
                kind.snapshot_path(assignment, &now),
                kind.latest_path(assignment),
            ] {
                let stored = StoredReport {
                    path: path.clone(),
                    content_type: JSON_CONTENT_TYPE.to_string(),
                    body: body.clone(),
                    written_at,
                };
                self.reports
                    .put(&stored)
                    .await
                    .map_err(|e| compute_error(format!("write {}: {}", path, e)))?;
                paths.push(path);
            }
        }

        if today_report.is_empty() {
            debug!(assignment = %assignment, "No attempts graded today");
        }
        info!(
            assignment = %assignment,
            artifacts = artifacts.len(),
            skipped,
            students = accumulated.len(),
            students_today = today_report.len(),
            "Reports saved"
        );

        Ok(ReportOutcome {
            assignment: assignment.to_string(),
            artifacts_scanned: artifacts.len(),
            artifacts_skipped: skipped,
            students_accumulated: accumulated.len(),
            students_today: today_report.len(),
            paths,
        })
    }
}
