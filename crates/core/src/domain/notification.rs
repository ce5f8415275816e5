// Notification Domain Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Queued mail message: `{to, subject, body}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "to")]
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Build the mark notification for one successful grading attempt.
    ///
    /// `timestamp` is the already formatted attempt time.
    pub fn mark_report(
        assignment: &str,
        email: &str,
        timestamp: &str,
        marks: &BTreeMap<String, i32>,
        raw_document: &str,
    ) -> Self {
        Self {
            recipient: email.to_string(),
            subject: format!("Your {} Mark at {}", assignment, timestamp),
            body: render_body(marks, raw_document),
        }
    }
}

/// Total mark, then `name: mark` per test case (sorted by name), then the raw document
pub fn render_body(marks: &BTreeMap<String, i32>, raw_document: &str) -> String {
    let total: i32 = marks.values().sum();
    let lines: String = marks
        .iter()
        .map(|(name, mark)| format!("{}: {}\n", name, mark))
        .collect();

    format!(
        "Dear Student,\n\nYou have just earned {} mark(s).\n\n{}\nRegards,\nGradeflow\n\nRaw XML:\n{}\n",
        total, lines, raw_document
    )
}
