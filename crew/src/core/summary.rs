//! Conversion of testing-agent output into display lines.

use tracing::debug;

use crate::core::extract::extract_test_report;

/// Turn raw testing-agent output into `Test Case N: STATUS` lines.
///
/// Never fails: an extraction error becomes a single descriptive line.
pub fn summarize_test_output(raw: &str) -> Vec<String> {
    match extract_test_report(raw) {
        Ok(report) => report
            .tests
            .iter()
            .enumerate()
            .map(|(idx, test)| format!("Test Case {}: {}", idx + 1, test.status_label()))
            .collect(),
        Err(err) => {
            debug!(error = %err, "test report extraction failed");
            vec![format!("Test results parsing failed: {err}")]
        }
    }
}
