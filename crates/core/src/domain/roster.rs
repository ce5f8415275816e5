// Roster Domain Model: assignments, students and grading work units

use serde::{Deserialize, Serialize};
use std::fmt;

/// Assignment name (project key, unique across the roster store)
pub type AssignmentName = String;

/// One assignment as loaded for a run.
///
/// `serialized_roster` is the JSON array of enrolled students exactly as the
/// roster service embedded it; it is only decoded by the class resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: AssignmentName,
    pub teacher_email: String,
    pub grader_url: String,
    pub serialized_roster: String,
}

impl Assignment {
    pub fn new(
        name: impl Into<String>,
        teacher_email: impl Into<String>,
        grader_url: impl Into<String>,
        serialized_roster: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            teacher_email: teacher_email.into(),
            grader_url: grader_url.into(),
            serialized_roster: serialized_roster.into(),
        }
    }
}

/// Enrolled student with an opaque grading credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub email: String,
    #[serde(rename = "credentials")]
    pub credential: String,
}

impl Student {
    pub fn new(email: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            credential: credential.into(),
        }
    }
}

// Credentials never end up in logs
impl fmt::Debug for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Student")
            .field("email", &self.email)
            .field("credential", &"***")
            .finish()
    }
}

/// Resolved per-class job: grader endpoint plus decoded student list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassJob {
    pub assignment: Assignment,
    pub grader_url: String,
    pub students: Vec<Student>,
}

impl ClassJob {
    /// Expand into one grading unit per student, in roster order
    pub fn units(&self) -> impl Iterator<Item = GradingUnit> + '_ {
        self.students.iter().map(move |student| GradingUnit {
            assignment: self.assignment.name.clone(),
            grader_url: self.grader_url.clone(),
            student: student.clone(),
        })
    }
}

/// The atomic unit of work dispatched to the student grade worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingUnit {
    pub assignment: AssignmentName,
    pub grader_url: String,
    pub student: Student,
}

impl GradingUnit {
    /// Journal key of this unit within a run
    pub fn step_key(&self) -> String {
        format!("grade/{}/{}", self.assignment, self.student.email)
    }
}
