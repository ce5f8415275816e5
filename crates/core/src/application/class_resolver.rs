// Class resolution (Stage B) - pure decode of an assignment's embedded roster

use crate::domain::{Assignment, ClassJob, DomainError, Student};
use std::collections::HashSet;

/// Decodes one assignment into a per-class job descriptor.
///
/// No I/O; identical input always yields an identical `ClassJob`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassResolver;

impl ClassResolver {
    pub fn new() -> Self {
        Self
    }

    /// # Errors
    /// `DomainError::RosterDecode` on malformed JSON, an empty email, or an email
    /// listed twice in the same roster
    pub fn resolve(&self, assignment: &Assignment) -> Result<ClassJob, DomainError> {
        let decode_error = |reason: String| DomainError::RosterDecode {
            assignment: assignment.name.clone(),
            reason,
        };

        let students: Vec<Student> = serde_json::from_str(&assignment.serialized_roster)
            .map_err(|e| decode_error(e.to_string()))?;

        let mut seen = HashSet::with_capacity(students.len());
        for student in &students {
            if student.email.trim().is_empty() {
                return Err(decode_error("student with empty email".to_string()));
            }
            if !seen.insert(student.email.as_str()) {
                return Err(decode_error(format!("duplicate student {}", student.email)));
            }
        }

        Ok(ClassJob {
            assignment: assignment.clone(),
            grader_url: assignment.grader_url.clone(),
            students,
        })
    }
}
