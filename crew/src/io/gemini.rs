//! Gemini backend over the Generative Language REST API.

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::io::config::Credentials;
use crate::io::executor::{ExecRequest, Executor};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Executor backed by `models/{model}:generateContent`.
pub struct GeminiExecutor {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl GeminiExecutor {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("build gemini http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

impl Executor for GeminiExecutor {
    #[instrument(skip_all, fields(stage = request.stage.as_str(), model = %request.model))]
    fn exec(&self, request: &ExecRequest) -> Result<String> {
        info!("calling gemini");
        let body = build_request(request);
        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", self.credentials.key(request.model_slot))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .with_context(|| format!("send gemini request for {}", request.model))?;

        let status = response.status();
        let raw = response.text().context("read gemini response body")?;
        if !status.is_success() {
            warn!(status = %status, "gemini request failed");
            return Err(anyhow!(
                "gemini returned {status}: {}",
                truncate(&raw, 500)
            ));
        }

        let text = parse_response(&raw)?;
        debug!(bytes = text.len(), "gemini answered");
        Ok(truncate(&text, request.output_limit_bytes).to_string())
    }
}

fn build_request(request: &ExecRequest) -> GenerateRequest<'_> {
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: &request.prompt.system,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: &request.prompt.content,
            }],
        }],
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_response(raw: &str) -> Result<String> {
    let response: GenerateResponse =
        serde_json::from_str(raw).context("parse gemini response")?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(anyhow!("gemini returned no answer: {reason}"));
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty content".to_string());
        return Err(anyhow!("gemini returned an empty answer: {reason}"));
    }
    Ok(text)
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut cut = limit;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ModelSlot, Stage};
    use crate::io::prompt::PromptPack;
    use std::time::Duration;

    fn request() -> ExecRequest {
        ExecRequest {
            stage: Stage::Review,
            model_slot: ModelSlot::Lite,
            model: "gemini-2.5-flash-lite".to_string(),
            prompt: PromptPack {
                system: "You are Code Reviewer.".to_string(),
                content: "Return APPROVED or REJECTED".to_string(),
            },
            timeout: Duration::from_secs(5),
            output_limit_bytes: 1000,
        }
    }

    #[test]
    fn request_body_uses_system_instruction() {
        let req = request();
        let body = serde_json::to_value(build_request(&req)).expect("serialize");

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are Code Reviewer."
        );
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "Return APPROVED or REJECTED"
        );
    }

    #[test]
    fn endpoint_joins_model_name() {
        let executor = GeminiExecutor::new(
            "https://example.test/",
            Credentials::new("a", "b"),
        )
        .expect("executor");
        assert_eq!(
            executor.endpoint("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn response_parts_are_concatenated() {
        let raw = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "APPROVED"}, {"text": ": looks good"}]}, "finishReason": "STOP"}]}"#;
        assert_eq!(parse_response(raw).expect("parse"), "APPROVED: looks good");
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_response(raw).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let raw = r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#;
        let err = parse_response(raw).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
