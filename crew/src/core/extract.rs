//! Best-effort JSON extraction from free-form model output.
//!
//! Models wrap JSON in prose and code fences. The extractor takes the span
//! from the first `{` to the last `}` and decodes it. It is not aware of
//! nesting or string escapes, so braces in surrounding prose will spoil it.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::core::types::TestReport;

static JSON_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("json span regex should be valid"));

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No JSON found in output")]
    NoJson,
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

/// Locate the first brace-delimited span in `text` and decode it as JSON.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let span = JSON_SPAN_RE.find(text).ok_or(ExtractError::NoJson)?;
    Ok(serde_json::from_str(span.as_str())?)
}

/// Extract a [`TestReport`] from testing-agent output.
pub fn extract_test_report(text: &str) -> Result<TestReport, ExtractError> {
    let value = extract_json(text)?;
    Ok(serde_json::from_value(value)?)
}
