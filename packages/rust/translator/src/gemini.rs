//! Gemini `generateContent` client.
//!
//! One request per essay; the whole translation comes back in a single
//! response. Failures are classified here so the retry layer above can tell
//! quota exhaustion apart from a request the service will never accept.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use essaybridge_shared::{EssayBridgeError, GeminiConfig, Result};

use crate::prompt::build_prompt;

/// Everything needed to talk to the model, resolved from config + environment.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub thinking_budget: i32,
    pub endpoint: String,
    pub timeout: Duration,
    pub target_language: String,
}

impl GeminiSettings {
    /// Combine the `[gemini]` section with an already-resolved API key.
    pub fn from_config(config: &GeminiConfig, api_key: String, target_language: &str) -> Self {
        Self {
            api_key,
            model: config.model.clone(),
            thinking_budget: config.thinking_budget,
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            target_language: target_language.to_string(),
        }
    }
}

/// Translation client backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    url: String,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(EssayBridgeError::config("missing Gemini API key"));
        }
        if settings.model.trim().is_empty() {
            return Err(EssayBridgeError::config("missing Gemini model name"));
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| EssayBridgeError::Network(format!("failed to build HTTP client: {e}")))?;

        let url = format!(
            "{}/models/{}:generateContent",
            settings.endpoint.trim_end_matches('/'),
            settings.model
        );

        Ok(Self {
            client,
            url,
            settings,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Translate one essay. Makes exactly one request; retrying is the caller's job.
    #[instrument(skip_all, fields(model = %self.settings.model, title = %title))]
    pub async fn translate(&self, title: &str, text: &str) -> Result<String> {
        let prompt = build_prompt(title, text, &self.settings.target_language);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: self.settings.thinking_budget,
                },
            },
        };

        debug!(prompt_chars = prompt.chars().count(), "sending translation request");

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EssayBridgeError::Network(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            warn!(%status, "translation request rejected");
            return Err(classify_failure(status, body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| EssayBridgeError::parse(format!("invalid Gemini response: {e}")))?;

        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(EssayBridgeError::EmptyResponse);
        }

        if let Some(usage) = &parsed.usage_metadata {
            info!(
                tokens_in = usage.prompt_token_count,
                tokens_out = usage.candidates_token_count,
                "translation received"
            );
        }

        Ok(text)
    }
}

/// Map a non-2xx response to an error, keeping the raw body in the message.
fn classify_failure(status: StatusCode, body: String) -> EssayBridgeError {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::SERVICE_UNAVAILABLE
        || body.contains("RESOURCE_EXHAUSTED")
    {
        EssayBridgeError::RateLimited {
            message: format!("HTTP {}: {body}", status.as_u16()),
        }
    } else {
        EssayBridgeError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}
