// Result Parser Port
// Opaque "test-result document bytes -> {test case -> mark}" collaborator

use crate::domain::MarkTable;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Document is not valid UTF-8")]
    Encoding,

    #[error("Malformed result document: {0}")]
    Malformed(String),
}

/// Parses a grader result document. Must be pure and deterministic.
pub trait ResultParser: Send + Sync {
    fn parse(&self, document: &[u8]) -> Result<MarkTable, ParseError>;
}

pub mod mocks {
    use super::*;

    /// Parses `name: mark` lines; any other non-empty line is malformed
    pub struct LineResultParser;

    impl ResultParser for LineResultParser {
        fn parse(&self, document: &[u8]) -> Result<MarkTable, ParseError> {
            let text = std::str::from_utf8(document).map_err(|_| ParseError::Encoding)?;
            let mut marks = MarkTable::new();
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let (name, mark) = line
                    .split_once(':')
                    .ok_or_else(|| ParseError::Malformed(line.to_string()))?;
                let mark: i32 = mark
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::Malformed(line.to_string()))?;
                marks.insert(name.trim().to_string(), mark);
            }
            Ok(marks)
        }
    }
}
