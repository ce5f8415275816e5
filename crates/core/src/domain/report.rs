// Mark Report Domain Model

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content type of every written report
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// test-case name -> integer mark
pub type MarkTable = BTreeMap<String, i32>;

/// Report variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    /// Every artifact ever persisted for the assignment
    Accumulated,
    /// Artifacts persisted within the current local calendar day
    Today,
}

impl ReportKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportKind::Accumulated => "accumulatedMarks.json",
            ReportKind::Today => "todayMarks.json",
        }
    }

    /// `{assignment}/{yyyy}/{MM}/{dd}/{HH}/{mm}/{file}`
    pub fn snapshot_path(&self, assignment: &str, at: &DateTime<FixedOffset>) -> String {
        format!(
            "{}/{}/{}",
            assignment,
            at.format("%Y/%m/%d/%H/%M"),
            self.file_name()
        )
    }

    /// `{assignment}/{file}`, overwritten by every aggregation
    pub fn latest_path(&self, assignment: &str) -> String {
        format!("{}/{}", assignment, self.file_name())
    }
}

/// student identifier -> mark table, for one assignment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkReport {
    students: BTreeMap<String, MarkTable>,
}

impl MarkReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one attempt into the report.
    ///
    /// A test case keeps the best mark seen across attempts, so adding
    /// attempts never lowers a mark.
    pub fn include(&mut self, student: &str, marks: &MarkTable) {
        let table = self.students.entry(student.to_string()).or_default();
        for (case, mark) in marks {
            table
                .entry(case.clone())
                .and_modify(|best| *best = (*best).max(*mark))
                .or_insert(*mark);
        }
    }

    pub fn student(&self, student: &str) -> Option<&MarkTable> {
        self.students.get(student)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
