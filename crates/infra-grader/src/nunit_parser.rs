// NUnit result document parser
//
// Each <test-case> contributes one entry keyed by its `name` attribute. A
// passed case earns its `mark` property (1 when absent); any other result
// earns 0. Two cases sharing a key make the document malformed.

use gradeflow_core::domain::MarkTable;
use gradeflow_core::port::{ParseError, ResultParser};
use regex::Regex;
use std::collections::HashMap;

const DEFAULT_MARK: i32 = 1;

pub struct NUnitResultParser {
    root: Regex,
    test_case: Regex,
    attribute: Regex,
    mark_property: Regex,
}

impl NUnitResultParser {
    pub fn new() -> Self {
        Self {
            root: Regex::new(r"<(test-run|test-results)\b").expect("valid root regex"),
            test_case: Regex::new(r"(?s)<test-case\b([^>]*?)(?:/>|>(.*?)</test-case>)")
                .expect("valid test-case regex"),
            attribute: Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*"([^"]*)""#)
                .expect("valid attribute regex"),
            mark_property: Regex::new(r#"<property\s+name\s*=\s*"mark"\s+value\s*=\s*"(-?\d+)""#)
                .expect("valid property regex"),
        }
    }

    fn attributes<'a>(&self, raw: &'a str) -> HashMap<&'a str, &'a str> {
        self.attribute
            .captures_iter(raw)
            .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
            .collect()
    }
}

impl Default for NUnitResultParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultParser for NUnitResultParser {
    fn parse(&self, document: &[u8]) -> Result<MarkTable, ParseError> {
        let text = std::str::from_utf8(document).map_err(|_| ParseError::Encoding)?;

        if !self.root.is_match(text) {
            return Err(ParseError::Malformed(
                "no <test-run> or <test-results> element".to_string(),
            ));
        }

        let mut marks = MarkTable::new();
        for case in self.test_case.captures_iter(text) {
            let attrs = self.attributes(case.get(1).map_or("", |m| m.as_str()));
            let name = attrs
                .get("name")
                .or_else(|| attrs.get("fullname"))
                .ok_or_else(|| ParseError::Malformed("test-case without a name".to_string()))?;

            let passed = attrs
                .get("result")
                .is_some_and(|r| r.eq_ignore_ascii_case("passed") || r.eq_ignore_ascii_case("success"));

            let mark = if passed {
                match case
                    .get(2)
                    .and_then(|body| self.mark_property.captures(body.as_str()))
                {
                    Some(c) => c[1].parse().map_err(|_| {
                        ParseError::Malformed(format!("mark out of range in {}", name))
                    })?,
                    None => DEFAULT_MARK,
                }
            } else {
                0
            };

            let key = unescape(name);
            if marks.contains_key(&key) {
                return Err(ParseError::Malformed(format!("duplicate test case {}", key)));
            }
            marks.insert(key, mark);
        }

        Ok(marks)
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<test-run id="0" testcasecount="3" result="Failed">
  <test-suite type="TestFixture" name="Lab1Tests">
    <test-case id="1" name="test1" fullname="Lab1Tests.test1" result="Passed">
      <properties>
        <property name="mark" value="3" />
      </properties>
    </test-case>
    <test-case id="2" name="test2" fullname="Lab1Tests.test2" result="Passed">
      <properties><property name="mark" value="4" /></properties>
    </test-case>
    <test-case id="3" name="test3" fullname="Lab1Tests.test3" result="Failed">
      <properties><property name="mark" value="5" /></properties>
      <failure><message>expected 1</message></failure>
    </test-case>
    <test-case id="4" name="smoke &amp; sanity" result="Passed" />
  </test-suite>
</test-run>"#;

    #[test]
    fn test_parses_marks_per_test_case() {
        let marks = NUnitResultParser::new().parse(DOCUMENT.as_bytes()).unwrap();

        assert_eq!(marks.get("test1"), Some(&3));
        assert_eq!(marks.get("test2"), Some(&4));
        assert_eq!(marks.get("test3"), Some(&0));
        assert_eq!(marks.get("smoke & sanity"), Some(&1));
        assert_eq!(marks.values().sum::<i32>(), 8);
    }

    #[test]
    fn test_rejects_non_result_documents() {
        let parser = NUnitResultParser::new();
        assert!(matches!(
            parser.parse(b"<html>502 Bad Gateway</html>"),
            Err(ParseError::Malformed(_))
        ));
        assert_eq!(parser.parse(&[0xff, 0xfe, 0x00]), Err(ParseError::Encoding));
    }

    #[test]
    fn test_duplicate_case_names_are_rejected() {
        // Same short name in two fixtures
        let document = r#"<test-run id="0">
  <test-case name="test1" fullname="FixtureA.test1" result="Passed" />
  <test-case name="test1" fullname="FixtureB.test1" result="Failed" />
</test-run>"#;

        assert_eq!(
            NUnitResultParser::new().parse(document.as_bytes()),
            Err(ParseError::Malformed("duplicate test case test1".to_string()))
        );
    }

    #[test]
    fn test_empty_run_has_no_marks() {
        let marks = NUnitResultParser::new()
            .parse(br#"<test-run id="0" testcasecount="0"></test-run>"#)
            .unwrap();
        assert!(marks.is_empty());
    }
}
