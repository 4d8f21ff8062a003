//! HTTP client for the Gemini `generateContent` API.

use super::snapshot::{self, Snapshot};
use super::{fallback_suggestions, Language, SuggestError, MAX_SUGGESTIONS};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const SYSTEM_INSTRUCTION: &str =
    "You are a creative branding assistant. Return only a JSON object with a list of strings.";

const PROMPT: &str = "Analyze this image and suggest 5 short, professional, or creative watermark texts. They could be witty captions, copyright tags, or brand-like names suitable for this specific photo.";

/// Suggestion endpoint settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// API key; falls back to `GEMINI_API_KEY` when absent
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Longest edge of the uploaded snapshot
    #[serde(default = "default_snapshot_max_edge")]
    pub snapshot_max_edge: u32,

    /// JPEG quality of the uploaded snapshot, 1-100
    #[serde(default = "default_snapshot_quality")]
    pub snapshot_quality: u8,
}

fn default_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV).ok()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_snapshot_max_edge() -> u32 {
    512
}

fn default_snapshot_quality() -> u8 {
    70
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
            snapshot_max_edge: default_snapshot_max_edge(),
            snapshot_quality: default_snapshot_quality(),
        }
    }
}

impl std::fmt::Debug for SuggestionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("snapshot_max_edge", &self.snapshot_max_edge)
            .field("snapshot_quality", &self.snapshot_quality)
            .finish()
    }
}

impl SuggestionConfig {
    /// Defaults with the API key taken from the environment.
    pub fn from_env() -> Self {
        Self {
            api_key: default_api_key(),
            ..Self::default()
        }
    }

    /// Configured key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("suggestions endpoint cannot be empty".to_string());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(format!(
                "suggestions endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }
        if self.model.is_empty() {
            return Err("suggestions model cannot be empty".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("suggestions timeout_seconds must be greater than 0".to_string());
        }
        if self.snapshot_max_edge == 0 {
            return Err("suggestions snapshot_max_edge must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.snapshot_quality) {
            return Err(format!(
                "suggestions snapshot_quality must be between 1 and 100, got {}",
                self.snapshot_quality
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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

#[derive(Debug, Deserialize)]
struct SuggestionPayload {
    #[serde(default)]
    suggestions: Vec<String>,
}

/// Client for watermark text suggestions.
#[derive(Debug, Clone)]
pub struct SuggestionClient {
    config: SuggestionConfig,
    http: reqwest::Client,
}

impl SuggestionClient {
    pub fn new(config: SuggestionConfig) -> Result<Self, SuggestError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    /// Suggestions for `image`, or the fallback list on any failure.
    pub async fn suggest(&self, image: &RgbaImage, lang: Language) -> Vec<String> {
        match self.request(image, lang).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::warn!(error = %e, lang = %lang, "Suggestion request failed, using fallback");
                fallback_suggestions(lang)
            }
        }
    }

    /// Ask the model for suggestions, surfacing every failure.
    pub async fn request(
        &self,
        image: &RgbaImage,
        lang: Language,
    ) -> Result<Vec<String>, SuggestError> {
        let api_key = self.config.api_key().ok_or(SuggestError::MissingApiKey)?;

        let snapshot = snapshot::prepare(
            image,
            self.config.snapshot_max_edge,
            self.config.snapshot_quality,
        )?;

        let url = self.config.request_url();
        tracing::debug!(
            url = %url,
            width = snapshot.width,
            height = snapshot.height,
            "Requesting watermark suggestions"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&build_request_body(&snapshot, lang))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SuggestError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let suggestions = parse_response(&body)?;

        tracing::info!(count = suggestions.len(), lang = %lang, "Received watermark suggestions");
        Ok(suggestions)
    }
}

/// JSON body for a `generateContent` call.
pub fn build_request_body(snapshot: &Snapshot, lang: Language) -> JsonValue {
    json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": Snapshot::MIME_TYPE,
                        "data": snapshot.data,
                    }
                },
                { "text": format!("{} {}", PROMPT, lang.instruction()) }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "suggestions": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" }
                    }
                },
                "required": ["suggestions"]
            }
        }
    })
}

/// Extract suggestions from a raw `generateContent` response body.
pub fn parse_response(body: &str) -> Result<Vec<String>, SuggestError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| SuggestError::Malformed(e.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(SuggestError::EmptyResponse);
    }

    parse_suggestions(&text)
}

/// Parse the model's `{"suggestions": [...]}` text.
///
/// A well-formed object without suggestions yields an empty list.
pub fn parse_suggestions(text: &str) -> Result<Vec<String>, SuggestError> {
    let payload: SuggestionPayload =
        serde_json::from_str(text.trim()).map_err(|e| SuggestError::Malformed(e.to_string()))?;

    Ok(payload
        .suggestions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect())
}
