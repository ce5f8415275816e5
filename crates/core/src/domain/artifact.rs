// Artifact Domain Model: raw grader result documents

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Content type of every persisted artifact
pub const XML_CONTENT_TYPE: &str = "application/xml";

/// Raw result document of one grading attempt.
///
/// Keyed by path, which embeds (assignment, email, attempt minute). Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub assignment: String,
    pub email: String,
    /// Epoch ms of the persist attempt
    pub persisted_at: i64,
    pub content_type: String,
    pub body: String,
}

impl Artifact {
    /// Build the artifact for a grader response received at `at`
    pub fn new(
        assignment: impl Into<String>,
        email: impl Into<String>,
        at: &DateTime<FixedOffset>,
        body: impl Into<String>,
    ) -> Self {
        let assignment = assignment.into();
        let email = email.into();
        Self {
            path: artifact_path(&assignment, &email, at),
            assignment,
            email,
            persisted_at: at.timestamp_millis(),
            content_type: XML_CONTENT_TYPE.to_string(),
            body: body.into(),
        }
    }

    pub fn to_ref(&self) -> ArtifactRef {
        ArtifactRef {
            path: self.path.clone(),
            persisted_at: self.persisted_at,
        }
    }
}

/// Reference to a persisted artifact (recorded in grading outcomes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: String,
    pub persisted_at: i64,
}

/// Strip everything outside `[0-9a-zA-Z]` (filename component only)
pub fn sanitize_email(email: &str) -> String {
    email.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// `{assignment}/{email}/{yyyy}/{MM}/{dd}/{HH}/{mm}/{sanitizedEmail}.xml`
pub fn artifact_path(assignment: &str, email: &str, at: &DateTime<FixedOffset>) -> String {
    format!(
        "{}/{}/{}/{}.xml",
        assignment,
        email,
        at.format("%Y/%m/%d/%H/%M"),
        sanitize_email(email)
    )
}
