//! Extraction service abstraction and implementations.
//!
//! Defines the [`Extractor`] trait and concrete implementations:
//! - **[`GeminiExtractor`]**: calls the Gemini `generateContent` endpoint with
//!   inline base64 images and `responseMimeType = "application/json"`.
//! - **[`DisabledExtractor`]**: fails every request; used when
//!   `extractor.provider = "disabled"`.
//!
//! Use [`create_extractor`] to build the configured implementation.
//!
//! Requests are sent once. A transport error, a non-success status, or a
//! response without text is returned as an error and the caller moves on to
//! the next card. A response without text is reported as [`NoContent`] so
//! callers can tell it apart from a failed request.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::prompt::{ExtractionRequest, PromptPart};

/// Fallback key variable checked when the configured one is unset.
const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// The service answered but generated no text.
#[derive(Debug, thiserror::Error)]
#[error("No content generated")]
pub struct NoContent;

/// Sends a multimodal request and returns the raw response text.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Identifier shown in logs (e.g. `"gemini:gemini-2.0-flash"`).
    fn name(&self) -> String;

    /// Returns the model's text output. Blank output is a [`NoContent`] error.
    async fn extract(&self, request: &ExtractionRequest) -> Result<String>;
}

/// Builds the extractor named by `config.provider`.
///
/// # Errors
///
/// Unknown providers, and a `gemini` provider with no API key in the
/// environment.
pub fn create_extractor(config: &ExtractorConfig) -> Result<Box<dyn Extractor>> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiExtractor::from_config(config)?)),
        "disabled" => Ok(Box::new(DisabledExtractor)),
        other => bail!("Unknown extractor provider: {}", other),
    }
}

// ============ Disabled ============

pub struct DisabledExtractor;

#[async_trait]
impl Extractor for DisabledExtractor {
    fn name(&self) -> String {
        "disabled".to_string()
    }

    async fn extract(&self, _request: &ExtractionRequest) -> Result<String> {
        bail!("Extractor is disabled")
    }
}

// ============ Gemini ============

/// Gemini `generateContent` client.
pub struct GeminiExtractor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiExtractor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Reads the API key from `config.api_key_env` (or `GEMINI_API_KEY`).
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .or_else(|_| std::env::var(FALLBACK_API_KEY_ENV))
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| {
                format!(
                    "{} environment variable not set (nor {})",
                    config.api_key_env, FALLBACK_API_KEY_ENV
                )
            })?;

        let mut builder = reqwest::Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

fn to_wire(request: &ExtractionRequest) -> GenerateRequest {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => Part::Text { text: text.clone() },
            PromptPart::Image { mime_type, data } => Part::Inline {
                inline_data: InlineData {
                    mime_type: mime_type.to_string(),
                    data: STANDARD.encode(data),
                },
            },
        })
        .collect();

    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
        },
    }
}

/// Text of the first part of the first candidate.
fn first_text(response: &GenerateResponse) -> Result<String> {
    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.clone())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(NoContent.into());
    }
    Ok(text)
}

#[async_trait]
impl Extractor for GeminiExtractor {
    fn name(&self) -> String {
        format!("gemini:{}", self.model)
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<String> {
        let body = to_wire(request);
        debug!(
            model = %self.model,
            images = request.image_count(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Invalid Gemini response body")?;
        first_text(&parsed)
    }
}
