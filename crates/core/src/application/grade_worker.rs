// Student grading (Stage C) - one grader call per GradingUnit, fully isolated

use crate::application::constants::NOTIFICATION_TIMESTAMP_FORMAT;
use crate::domain::{Artifact, ArtifactRef, GradingUnit, Notification};
use crate::port::{
    ArtifactStore, GraderClient, GraderError, GraderRequest, NotificationQueue, ResultParser,
    TimeProvider, DEFAULT_GRADER_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Why a grading unit did not fully succeed
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum StudentGradingError {
    /// Timeout, transport failure or non-success status
    #[error("Grader call failed: {0}")]
    Grader(String),

    #[error("Artifact write failed: {0}")]
    Storage(String),

    #[error("Result document could not be parsed: {0}")]
    Parse(String),

    #[error("Notification enqueue failed: {0}")]
    Notify(String),

    #[error("Grading unit panicked: {0}")]
    Panicked(String),
}

/// Typed outcome of one grading unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GradingOutcome {
    /// Artifact persisted and notification enqueued
    Graded { artifact: ArtifactRef },
    /// Artifact persisted, but parsing or enqueueing failed
    ArtifactOnly {
        artifact: ArtifactRef,
        failure: StudentGradingError,
    },
    /// Nothing was persisted
    Failed { failure: StudentGradingError },
}

impl GradingOutcome {
    pub fn is_graded(&self) -> bool {
        matches!(self, GradingOutcome::Graded { .. })
    }

    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match self {
            GradingOutcome::Graded { artifact } | GradingOutcome::ArtifactOnly { artifact, .. } => {
                Some(artifact)
            }
            GradingOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&StudentGradingError> {
        match self {
            GradingOutcome::Graded { .. } => None,
            GradingOutcome::ArtifactOnly { failure, .. } | GradingOutcome::Failed { failure } => {
                Some(failure)
            }
        }
    }
}

/// Grades one student against one assignment's autograder.
///
/// Never returns an error: every failure is logged and folded into the outcome.
/// No retry; the next scheduled run is the retry.
#[derive(Clone)]
pub struct StudentGradeWorker {
    grader: Arc<dyn GraderClient>,
    artifacts: Arc<dyn ArtifactStore>,
    notifications: Arc<dyn NotificationQueue>,
    parser: Arc<dyn ResultParser>,
    time_provider: Arc<dyn TimeProvider>,
    grader_timeout: Duration,
}

impl StudentGradeWorker {
    pub fn new(
        grader: Arc<dyn GraderClient>,
        artifacts: Arc<dyn ArtifactStore>,
        notifications: Arc<dyn NotificationQueue>,
        parser: Arc<dyn ResultParser>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            grader,
            artifacts,
            notifications,
            parser,
            time_provider,
            grader_timeout: DEFAULT_GRADER_TIMEOUT,
        }
    }

    /// Override the per-call grader timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.grader_timeout = timeout;
        self
    }

    /// Grade one unit with panic isolation.
    ///
    /// The unit runs on its own task so a panic anywhere inside it surfaces as
    /// `StudentGradingError::Panicked` instead of unwinding through the run.
    pub async fn grade(&self, unit: GradingUnit) -> GradingOutcome {
        let worker = self.clone();
        let assignment = unit.assignment.clone();
        let email = unit.student.email.clone();

        let handle = tokio::task::spawn(async move { worker.grade_unit(&unit).await });

        match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    "grading task cancelled".to_string()
                };
                error!(
                    assignment = %assignment,
                    email = %email,
                    error = %reason,
                    "Grading unit panicked"
                );
                GradingOutcome::Failed {
                    failure: StudentGradingError::Panicked(reason),
                }
            }
        }
    }

    async fn grade_unit(&self, unit: &GradingUnit) -> GradingOutcome {
        let request = GraderRequest::for_unit(unit);
        let started = self.time_provider.now_millis();

        let document = match self.fetch(&request).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(
                    assignment = %unit.assignment,
                    email = %unit.student.email,
                    error = %e,
                    "Grader call failed"
                );
                return GradingOutcome::Failed {
                    failure: StudentGradingError::Grader(e.to_string()),
                };
            }
        };

        let at = self.time_provider.now_local();
        info!(
            assignment = %unit.assignment,
            email = %unit.student.email,
            elapsed_ms = at.timestamp_millis() - started,
            "Grader responded"
        );

        // The artifact must be durable before anything else observes this attempt
        let artifact = Artifact::new(&unit.assignment, &unit.student.email, &at, document);
        if let Err(e) = self.artifacts.put(&artifact).await {
            error!(
                assignment = %unit.assignment,
                email = %unit.student.email,
                path = %artifact.path,
                error = %e,
                "Artifact write failed"
            );
            return GradingOutcome::Failed {
                failure: StudentGradingError::Storage(e.to_string()),
            };
        }
        let artifact_ref = artifact.to_ref();

        let marks = match self.parser.parse(artifact.body.as_bytes()) {
            Ok(marks) => marks,
            Err(e) => {
                warn!(
                    assignment = %unit.assignment,
                    email = %unit.student.email,
                    path = %artifact.path,
                    error = %e,
                    "Result document unparseable, student not notified"
                );
                return GradingOutcome::ArtifactOnly {
                    artifact: artifact_ref,
                    failure: StudentGradingError::Parse(e.to_string()),
                };
            }
        };

        let notification = Notification::mark_report(
            &unit.assignment,
            &unit.student.email,
            &at.format(NOTIFICATION_TIMESTAMP_FORMAT).to_string(),
            &marks,
            &artifact.body,
        );

        if let Err(e) = self.notifications.enqueue(&notification).await {
            error!(
                assignment = %unit.assignment,
                email = %unit.student.email,
                error = %e,
                "Notification enqueue failed"
            );
            return GradingOutcome::ArtifactOnly {
                artifact: artifact_ref,
                failure: StudentGradingError::Notify(e.to_string()),
            };
        }

        info!(
            assignment = %unit.assignment,
            email = %unit.student.email,
            total = marks.values().sum::<i32>(),
            "Student graded"
        );
        GradingOutcome::Graded {
            artifact: artifact_ref,
        }
    }

    async fn fetch(&self, request: &GraderRequest) -> Result<String, GraderError> {
        match tokio::time::timeout(self.grader_timeout, self.grader.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(GraderError::Timeout(self.grader_timeout.as_secs())),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Student;
    use crate::port::artifact_store::mocks::{InMemoryArtifactStore, Timeline, TimelineEvent};
    use crate::port::grader_client::mocks::{MockReply, ScriptedGraderClient};
    use crate::port::notification_queue::mocks::InMemoryNotificationQueue;
    use crate::port::result_parser::mocks::LineResultParser;
    use crate::port::time_provider::mocks::FixedTimeProvider;

    struct Harness {
        grader: Arc<ScriptedGraderClient>,
        artifacts: Arc<InMemoryArtifactStore>,
        queue: Arc<InMemoryNotificationQueue>,
        timeline: Timeline,
        worker: StudentGradeWorker,
    }

    fn harness() -> Harness {
        let timeline = Timeline::default();
        let grader = Arc::new(ScriptedGraderClient::new());
        let artifacts = Arc::new(InMemoryArtifactStore::with_timeline(timeline.clone()));
        let queue = Arc::new(InMemoryNotificationQueue::with_timeline(timeline.clone()));
        let clock = Arc::new(FixedTimeProvider::at_utc(2024, 3, 7, 9, 5, 42));
        let worker = StudentGradeWorker::new(
            grader.clone(),
            artifacts.clone(),
            queue.clone(),
            Arc::new(LineResultParser),
            clock,
        );
        Harness {
            grader,
            artifacts,
            queue,
            timeline,
            worker,
        }
    }

    fn unit(email: &str) -> GradingUnit {
        GradingUnit {
            assignment: "lab1".to_string(),
            grader_url: "http://grader/lab1".to_string(),
            student: Student::new(email, format!("cred-{}", email)),
        }
    }

    #[tokio::test]
    async fn test_graded_student_gets_artifact_then_notification() {
        let h = harness();
        h.grader.document("alice@uni.edu", "test2: 4\ntest1: 3\n");

        let outcome = h.worker.grade(unit("alice@uni.edu")).await;
        assert!(outcome.is_graded());
        assert_eq!(
            outcome.artifact().unwrap().path,
            "lab1/alice@uni.edu/2024/03/07/09/05/aliceuniedu.xml"
        );

        let calls = h.grader.calls();
        assert_eq!(calls[0].credentials, "cred-alice@uni.edu");
        assert_eq!(calls[0].trace, "alice@uni.edu");

        let messages = h.queue.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].subject, "Your lab1 Mark at 2024-03-07 09:05:42");
        assert!(messages[0].body.contains("You have just earned 7 mark(s)."));
        let first = messages[0].body.find("test1: 3").unwrap();
        let second = messages[0].body.find("test2: 4").unwrap();
        assert!(first < second);

        assert_eq!(
            h.timeline.events(),
            vec![
                TimelineEvent::ArtifactPut {
                    path: "lab1/alice@uni.edu/2024/03/07/09/05/aliceuniedu.xml".to_string(),
                    email: "alice@uni.edu".to_string(),
                },
                TimelineEvent::NotificationEnqueued {
                    recipient: "alice@uni.edu".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_grader_timeout_leaves_no_side_effects() {
        let h = harness();
        h.grader
            .reply("bob@uni.edu", MockReply::Fail(GraderError::Timeout(180)));

        let outcome = h.worker.grade(unit("bob@uni.edu")).await;
        assert_eq!(
            outcome,
            GradingOutcome::Failed {
                failure: StudentGradingError::Grader("Grader timeout after 180s".to_string())
            }
        );
        assert!(h.artifacts.all().is_empty());
        assert!(h.queue.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_document_is_partial_success() {
        let h = harness();
        h.grader.document("carol@uni.edu", "<<garbage>>");

        let outcome = h.worker.grade(unit("carol@uni.edu")).await;
        assert!(matches!(
            outcome,
            GradingOutcome::ArtifactOnly {
                failure: StudentGradingError::Parse(_),
                ..
            }
        ));
        assert_eq!(h.artifacts.count_for("carol@uni.edu"), 1);
        assert_eq!(h.queue.count_for("carol@uni.edu"), 0);
    }

    #[tokio::test]
    async fn test_queue_outage_keeps_artifact() {
        let h = harness();
        h.grader.document("dave@uni.edu", "t1: 1");
        h.queue.set_unavailable(true);

        let outcome = h.worker.grade(unit("dave@uni.edu")).await;
        assert!(matches!(
            outcome.failure(),
            Some(StudentGradingError::Notify(_))
        ));
        assert!(outcome.artifact().is_some());
        assert_eq!(h.artifacts.count_for("dave@uni.edu"), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_skips_notification() {
        let h = harness();
        h.grader.document("erin@uni.edu", "t1: 1");
        h.artifacts.fail_for("erin@uni.edu");

        let outcome = h.worker.grade(unit("erin@uni.edu")).await;
        assert!(matches!(
            outcome,
            GradingOutcome::Failed {
                failure: StudentGradingError::Storage(_)
            }
        ));
        assert_eq!(h.queue.count_for("erin@uni.edu"), 0);
    }

    #[tokio::test]
    async fn test_second_attempt_in_same_minute_never_overwrites() {
        let h = harness();
        h.grader.document("fay@uni.edu", "t1: 1");

        assert!(h.worker.grade(unit("fay@uni.edu")).await.is_graded());
        let again = h.worker.grade(unit("fay@uni.edu")).await;

        assert!(matches!(
            again.failure(),
            Some(StudentGradingError::Storage(_))
        ));
        assert_eq!(h.artifacts.count_for("fay@uni.edu"), 1);
        assert_eq!(h.queue.count_for("fay@uni.edu"), 1);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let h = harness();
        h.grader
            .reply("gus@uni.edu", MockReply::Panic("grader exploded".to_string()));

        let outcome = h.worker.grade(unit("gus@uni.edu")).await;
        assert_eq!(
            outcome,
            GradingOutcome::Failed {
                failure: StudentGradingError::Panicked("grader exploded".to_string())
            }
        );
    }

    /// Never answers
    struct HangingGrader;

    #[async_trait::async_trait]
    impl GraderClient for HangingGrader {
        async fn fetch(&self, _request: &GraderRequest) -> Result<String, GraderError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_grader_is_cut_off_at_the_timeout() {
        let h = harness();
        let clock = Arc::new(FixedTimeProvider::at_utc(2024, 3, 7, 9, 5, 42));
        let worker = StudentGradeWorker::new(
            Arc::new(HangingGrader),
            h.artifacts.clone(),
            h.queue.clone(),
            Arc::new(LineResultParser),
            clock,
        );

        let started = tokio::time::Instant::now();
        let outcome = worker.grade(unit("hal@uni.edu")).await;

        let waited = started.elapsed();
        assert!(waited >= DEFAULT_GRADER_TIMEOUT);
        assert!(waited < DEFAULT_GRADER_TIMEOUT + Duration::from_secs(1));
        assert_eq!(
            outcome,
            GradingOutcome::Failed {
                failure: StudentGradingError::Grader("Grader timeout after 180s".to_string())
            }
        );
        assert!(h.artifacts.all().is_empty());
        assert!(h.queue.messages().is_empty());
    }

    #[test]
    fn test_outcome_journal_shape() {
        let outcome = GradingOutcome::Failed {
            failure: StudentGradingError::Grader("HTTP 500".to_string()),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["failure"]["kind"], "grader");

        let back: GradingOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }
}
