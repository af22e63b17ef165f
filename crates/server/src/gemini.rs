//! Gemini `generateContent` client backing plan generation.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_api::PlanGenerator;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL up to and including the API version, e.g. `.../v1beta`.
    pub endpoint: String,
    pub timeout: Duration,
}

pub struct GeminiPlanGenerator {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiPlanGenerator {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build gemini http client")?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint, self.config.model, self.config.api_key
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl PlanGenerator for GeminiPlanGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
        };
        debug!(model = %self.config.model, "requesting plan from gemini");

        let response = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .context("gemini request failed")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("failed to read gemini response")?;
        if !status.is_success() {
            return Err(anyhow!("gemini returned HTTP {status}: {text}"));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).context("unexpected gemini response shape")?;
        if let Some(error) = parsed.error {
            return Err(anyhow!("gemini error: {}", error.message));
        }

        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if reply.trim().is_empty() {
            return Err(anyhow!("gemini returned no content"));
        }
        Ok(reply)
    }
}

#[cfg(test)]
#[path = "tests/gemini_tests.rs"]
mod tests;
