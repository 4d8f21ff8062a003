//! Watermark text suggestions from a multimodal model.
//!
//! A downscaled snapshot of the base image is sent to a Gemini
//! `generateContent` endpoint, which answers with a short list of watermark
//! texts. Suggestions are advisory: every failure (no key, network error,
//! bad status, malformed JSON) turns into a fixed per-language fallback
//! list. A well-formed answer with no suggestions is returned as an empty
//! list.
//!
//! # Example
//!
//! ```ignore
//! use inkstamp::suggest::{Language, SuggestionClient, SuggestionConfig, SuggestionService};
//!
//! let client = SuggestionClient::new(SuggestionConfig::from_env())?;
//! let service = SuggestionService::new(client);
//! let texts = service.suggest(&base, Language::Zh).await?;
//! ```

pub mod client;
pub mod service;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use client::{SuggestionClient, SuggestionConfig};
pub use service::{BusyGuard, SuggestionService};
pub use snapshot::Snapshot;

/// Maximum number of suggestions returned.
pub const MAX_SUGGESTIONS: usize = 5;

/// Errors from the suggestion collaborator.
///
/// Only `Busy` escapes [`SuggestionService`]; the rest are logged and
/// replaced by [`fallback_suggestions`].
#[derive(Error, Debug)]
pub enum SuggestError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Response contained no model text")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Failed to prepare snapshot: {0}")]
    Snapshot(String),

    #[error("A suggestion request is already in progress")]
    Busy,
}

/// Language the suggestions are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Prompt suffix telling the model which language and length to use.
    pub fn instruction(&self) -> &'static str {
        match self {
            Language::En => "Generate suggestions in English. Keep them under 5 words.",
            Language::Zh => {
                "Generate suggestions in Simplified Chinese (简体中文). Keep them concise (2-6 characters)."
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            other => Err(format!("Unknown language '{}', expected en or zh", other)),
        }
    }
}

/// Fixed suggestions used whenever the model cannot be reached.
pub fn fallback_suggestions(lang: Language) -> Vec<String> {
    let texts: [&str; MAX_SUGGESTIONS] = match lang {
        Language::En => [
            "© Copyright 2024",
            "Protected",
            "Do Not Copy",
            "Watermark",
            "Private",
        ],
        Language::Zh => ["© 版权所有", "原创作品", "严禁复制", "水印", "仅供参考"],
    };
    texts.iter().map(|s| s.to_string()).collect()
}
