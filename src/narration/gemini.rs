//! Generative Language API narrator.
//!
//! Wraps the `generateContent` endpoint with a blocking [`reqwest`] client.
//! Calls run on narration worker threads, never on the tick loop.

use serde::Deserialize;

use super::prompt::{negotiation_prompt, parse_narration, summary_prompt};
use super::{Narration, NarrationError, NarrationRequest, Narrator};
use crate::sim::types::MetricSample;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// HTTP narrator backed by a hosted generative model.
pub struct GeminiNarrator {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

impl GeminiNarrator {
    /// Creates a narrator for `model`.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
            model,
        }
    }

    fn generate(&self, prompt: &str, json_output: bool) -> Result<String, NarrationError> {
        let mut body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if json_output {
            body["generationConfig"] = serde_json::json!({ "responseMimeType": "application/json" });
        }

        let response = self
            .client
            .post(format!("{API_BASE}/{}:generateContent", self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;
        let response = Self::ensure_success(response)?;
        let parsed: GenerateResponse = response.json()?;
        Ok(parsed.text())
    }

    /// Returns the response unchanged on 2xx, or an [`NarrationError::Api`]
    /// carrying the status and body text.
    fn ensure_success(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, NarrationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(NarrationError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl Narrator for GeminiNarrator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn narrate(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        let text = self.generate(&negotiation_prompt(request), true)?;
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        parse_narration(text)
    }

    fn compliance_summary(&self, sample: &MetricSample) -> Result<String, NarrationError> {
        self.generate(&summary_prompt(sample), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"logs\": "}, {"text": "[]}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let parsed: Option<GenerateResponse> = serde_json::from_str(raw).ok();
        assert_eq!(parsed.map(|p| p.text()), Some("{\"logs\": []}".to_string()));
    }

    #[test]
    fn empty_response_has_no_text() {
        let parsed: Option<GenerateResponse> = serde_json::from_str("{}").ok();
        assert_eq!(parsed.map(|p| p.text()), Some(String::new()));
    }
}
