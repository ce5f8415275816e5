// Grader Client Port
// Abstraction over the external, assignment-specific autograder endpoint

use crate::domain::GradingUnit;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Fixed per-call grader timeout (180 seconds)
pub const DEFAULT_GRADER_TIMEOUT: Duration = Duration::from_secs(180);

/// One grader call: `GET {grader_url}?credentials={..}&trace={..}`.
///
/// Query values are raw here; the adapter percent-encodes them.
#[derive(Clone, PartialEq, Eq)]
pub struct GraderRequest {
    pub grader_url: String,
    pub credentials: String,
    pub trace: String,
}

impl GraderRequest {
    pub fn for_unit(unit: &GradingUnit) -> Self {
        Self {
            grader_url: unit.grader_url.clone(),
            credentials: unit.student.credential.clone(),
            trace: unit.student.email.clone(),
        }
    }
}

impl fmt::Debug for GraderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraderRequest")
            .field("grader_url", &self.grader_url)
            .field("credentials", &"***")
            .field("trace", &self.trace)
            .finish()
    }
}

/// Grader call errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraderError {
    #[error("Grader timeout after {0}s")]
    Timeout(u64),

    #[error("Grader returned HTTP {0}")]
    Status(u16),

    #[error("Invalid grader URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Grader Client trait
///
/// Implementations:
/// - ReqwestGraderClient: HTTP GET with a fixed timeout
#[async_trait]
pub trait GraderClient: Send + Sync {
    /// Run the grader and return the raw test-result document
    ///
    /// # Errors
    /// - GraderError::Timeout if no response arrives within the timeout
    /// - GraderError::Status on any non-success HTTP status
    async fn fetch(&self, request: &GraderRequest) -> Result<String, GraderError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted grader reply for one student
    #[derive(Debug, Clone)]
    pub enum MockReply {
        Document(String),
        Fail(GraderError),
        /// Panic inside the grader call (panic isolation testing)
        Panic(String),
    }

    /// Grader that answers per trace (student email)
    #[derive(Default)]
    pub struct ScriptedGraderClient {
        replies: Mutex<HashMap<String, MockReply>>,
        calls: Mutex<Vec<GraderRequest>>,
    }

    impl ScriptedGraderClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&self, email: &str, reply: MockReply) {
            self.replies.lock().unwrap().insert(email.to_string(), reply);
        }

        pub fn document(&self, email: &str, document: impl Into<String>) {
            self.reply(email, MockReply::Document(document.into()));
        }

        pub fn calls(&self) -> Vec<GraderRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls_for(&self, email: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.trace == email)
                .count()
        }
    }

    #[async_trait]
    impl GraderClient for ScriptedGraderClient {
        async fn fetch(&self, request: &GraderRequest) -> Result<String, GraderError> {
            self.calls.lock().unwrap().push(request.clone());

            let reply = self.replies.lock().unwrap().get(&request.trace).cloned();
            match reply {
                Some(MockReply::Document(doc)) => Ok(doc),
                Some(MockReply::Fail(e)) => Err(e),
                Some(MockReply::Panic(msg)) => panic!("{}", msg),
                None => Err(GraderError::Status(404)),
            }
        }
    }
}
