//! Shared deterministic types for pipeline core logic.
//!
//! Everything here is request-scoped: built for one run, handed back to the
//! caller, and dropped. Nothing is persisted.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Smallest accepted iteration bound.
pub const MIN_ITERATIONS: u32 = 1;
/// Largest accepted iteration bound.
pub const MAX_ITERATIONS: u32 = 5;

/// Input rejected before the pipeline is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Please enter a programming task!")]
    EmptyRequirement,
    #[error("max iterations must be between {MIN_ITERATIONS} and {MAX_ITERATIONS}, got {0}")]
    BoundOutOfRange(u32),
}

/// Free-text programming requirement supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Requirement(String);

impl Requirement {
    /// Accept any text that is non-empty after trimming. The text itself is kept as typed.
    pub fn new(text: impl Into<String>) -> Result<Self, InputError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(InputError::EmptyRequirement);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Upper bound on pipeline iterations, always within `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IterationBound(u32);

impl IterationBound {
    pub fn new(value: u32) -> Result<Self, InputError> {
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&value) {
            return Err(InputError::BoundOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for IterationBound {
    fn default() -> Self {
        Self(MIN_ITERATIONS)
    }
}

/// One test case as reported by the testing agent.
///
/// Every field is optional because nothing forces the model to follow the
/// requested shape. Non-string scalars are kept as their JSON text, except
/// `status`: when present it must be a string, or the whole report is
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub call: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub expected_output: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub actual_output: Option<String>,
    #[serde(deserialize_with = "status_string")]
    pub status: Option<String>,
}

impl TestRecord {
    /// Uppercased status, defaulting to `FAIL` when the model omitted it.
    pub fn status_label(&self) -> String {
        self.status.as_deref().unwrap_or("fail").to_uppercase()
    }
}

/// Test report produced by the testing agent: `{"tests": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestReport {
    pub tests: Vec<TestRecord>,
}

fn status_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(Some(text)),
        other => Err(serde::de::Error::custom(format!(
            "status must be a string, got {other}"
        ))),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

/// Display treatment for a test summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Success,
    Error,
    Warning,
}

impl Badge {
    /// `PASS` wins over `FAIL`; anything else is a warning.
    pub fn for_line(line: &str) -> Self {
        if line.contains("PASS") {
            Badge::Success
        } else if line.contains("FAIL") {
            Badge::Error
        } else {
            Badge::Warning
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Badge::Success => "success",
            Badge::Error => "error",
            Badge::Warning => "warning",
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    /// Developer stage output from the last executed iteration.
    pub final_code: String,
    /// Aggregate stage outputs from the last executed iteration.
    pub transcript: String,
    /// Per-test status lines accumulated over every executed iteration.
    pub test_summary: Vec<String>,
    pub iterations_run: u32,
    pub approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_rejects_whitespace_only() {
        assert_eq!(
            Requirement::new("  \n\t"),
            Err(InputError::EmptyRequirement)
        );
        let req = Requirement::new("  reverse a string ").expect("requirement");
        assert_eq!(req.as_str(), "  reverse a string ");
    }

    #[test]
    fn iteration_bound_is_clamped_to_range() {
        assert_eq!(IterationBound::new(0), Err(InputError::BoundOutOfRange(0)));
        assert_eq!(IterationBound::new(6), Err(InputError::BoundOutOfRange(6)));
        assert_eq!(IterationBound::new(5).expect("bound").get(), 5);
        assert_eq!(IterationBound::default().get(), 1);
    }

    #[test]
    fn test_record_tolerates_loose_shapes() {
        let report: TestReport = serde_json::from_str(
            r#"{"tests": [{"call": "rev('ab')", "expected_output": 3, "status": "pass", "extra": true}, {}]}"#,
        )
        .expect("report");

        assert_eq!(report.tests.len(), 2);
        assert_eq!(report.tests[0].expected_output.as_deref(), Some("3"));
        assert_eq!(report.tests[0].status_label(), "PASS");
        assert_eq!(report.tests[1].status_label(), "FAIL");
    }

    #[test]
    fn non_string_status_rejects_report() {
        for status in ["null", "1", "true"] {
            let text = format!(r#"{{"tests": [{{"status": "pass"}}, {{"status": {status}}}]}}"#);
            let err = serde_json::from_str::<TestReport>(&text).unwrap_err();
            assert!(err.to_string().contains("status must be a string"), "{err}");
        }
    }

    #[test]
    fn report_without_tests_key_is_empty() {
        let report: TestReport = serde_json::from_str(r#"{"results": []}"#).expect("report");
        assert!(report.tests.is_empty());
    }

    #[test]
    fn badge_prefers_pass_then_fail() {
        assert_eq!(Badge::for_line("Test Case 1: PASS"), Badge::Success);
        assert_eq!(Badge::for_line("Test Case 2: FAIL"), Badge::Error);
        assert_eq!(
            Badge::for_line("Test results parsing failed: No JSON found in output"),
            Badge::Warning
        );
        assert_eq!(Badge::for_line("Test Case 3: ERROR"), Badge::Warning);
    }
}
