//! AI proxy client
//!
//! Text extraction, translation and text-to-speech run as external HTTP
//! services. The API forwards a JSON payload to the configured URL and relays
//! a single field of the answer.

use crate::config::AiConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

pub const TEXT_EXTRACTION: &str = "Text extraction";
pub const TRANSLATION: &str = "Translation";
pub const TEXT_TO_SPEECH: &str = "Text-to-speech";

pub const DEFAULT_VOICE: &str = "en-US-female-1";
pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

/// AI proxy errors
#[derive(Error, Debug)]
pub enum AiError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Request error: {0}")]
    Request(String),
}

/// Where an S3 object lives, as the extraction service expects it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct S3Location {
    pub bucket_name: String,
    pub file_key: String,
}

/// Split an S3 object URL into bucket and key
///
/// URLs under `storage_endpoint` are path style: the first path segment is
/// the bucket. Any other URL is virtual-hosted and the bucket is the first
/// label of the host name. The key is percent-decoded either way.
pub fn parse_s3_location(
    s3_file_url: &str,
    storage_endpoint: Option<&str>,
) -> Result<S3Location, AiError> {
    let url = reqwest::Url::parse(s3_file_url)
        .map_err(|e| AiError::InvalidInput(format!("Invalid s3FileUrl: {}", e)))?;

    let path_style = storage_endpoint
        .map(|endpoint| endpoint.trim_end_matches('/'))
        .and_then(|endpoint| s3_file_url.strip_prefix(endpoint))
        .and_then(|rest| rest.strip_prefix('/'));

    let (bucket_name, raw_key) = match path_style {
        Some(rest) => {
            let rest = rest.split(['?', '#']).next().unwrap_or_default();
            rest.split_once('/').ok_or_else(|| {
                AiError::InvalidInput("Invalid s3FileUrl: missing object key".to_string())
            })?
        }
        None => {
            let bucket = url
                .host_str()
                .and_then(|host| host.split('.').next())
                .ok_or_else(|| {
                    AiError::InvalidInput("Invalid s3FileUrl: missing host".to_string())
                })?;
            (bucket, url.path().trim_start_matches('/'))
        }
    };
    if bucket_name.is_empty() {
        return Err(AiError::InvalidInput(
            "Invalid s3FileUrl: missing bucket".to_string(),
        ));
    }

    let file_key = percent_encoding::percent_decode_str(raw_key)
        .decode_utf8()
        .map_err(|e| AiError::InvalidInput(format!("Invalid s3FileUrl: {}", e)))?
        .into_owned();

    Ok(S3Location {
        bucket_name: bucket_name.to_string(),
        file_key,
    })
}

#[derive(Serialize)]
struct TranslateBody<'a> {
    text: &'a str,
    target_language: &'a str,
}

#[derive(Serialize)]
struct SpeechBody<'a> {
    text: &'a str,
    voice: &'a str,
    speed: f32,
}

#[derive(Deserialize)]
struct Extracted {
    extracted_text: String,
}

#[derive(Deserialize)]
struct Translated {
    translated_text: String,
}

#[derive(Deserialize)]
struct Spoken {
    audio_url: String,
}

#[derive(Deserialize)]
struct UpstreamError {
    message: Option<String>,
}

/// Client for the configured AI services
#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    config: AiConfig,
    storage_endpoint: Option<String>,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AiError::Request(e.to_string()))?;

        Ok(Self {
            http,
            config: config.clone(),
            storage_endpoint: None,
        })
    }

    /// Resolve document URLs against a custom S3 endpoint (path style)
    pub fn with_storage_endpoint(mut self, endpoint: Option<&str>) -> Self {
        self.storage_endpoint = endpoint.map(str::to_string);
        self
    }

    /// Extract the text of a stored document
    pub async fn extract_text(&self, s3_file_url: &str) -> Result<String, AiError> {
        if s3_file_url.trim().is_empty() {
            return Err(AiError::InvalidInput("s3FileUrl is required".to_string()));
        }
        let location = parse_s3_location(s3_file_url, self.storage_endpoint.as_deref())?;

        let reply: Extracted = self
            .call(
                TEXT_EXTRACTION,
                self.config.text_extraction_url.as_deref(),
                &location,
                "Failed to extract text from the document",
            )
            .await?;
        Ok(reply.extracted_text)
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> Result<String, AiError> {
        if text.is_empty() || target_language.is_empty() {
            return Err(AiError::InvalidInput(
                "Text and target_language are required".to_string(),
            ));
        }

        let reply: Translated = self
            .call(
                TRANSLATION,
                self.config.translate_url.as_deref(),
                &TranslateBody {
                    text,
                    target_language,
                },
                "Failed to translate text",
            )
            .await?;
        Ok(reply.translated_text)
    }

    /// Synthesize speech; returns the URL of the generated audio
    pub async fn text_to_speech(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: Option<f32>,
    ) -> Result<String, AiError> {
        if text.is_empty() {
            return Err(AiError::InvalidInput("Text is required".to_string()));
        }
        let speed = speed.unwrap_or(1.0);
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(AiError::InvalidInput(format!(
                "Speed must be between {} and {}",
                MIN_SPEED, MAX_SPEED
            )));
        }

        let reply: Spoken = self
            .call(
                TEXT_TO_SPEECH,
                self.config.text_to_speech_url.as_deref(),
                &SpeechBody {
                    text,
                    voice: voice.filter(|v| !v.is_empty()).unwrap_or(DEFAULT_VOICE),
                    speed,
                },
                "Failed to synthesize speech",
            )
            .await?;
        Ok(reply.audio_url)
    }

    #[tracing::instrument(name = "ai.call", skip(self, url, body, fallback), err)]
    async fn call<B, R>(
        &self,
        service: &'static str,
        url: Option<&str>,
        body: &B,
        fallback: &str,
    ) -> Result<R, AiError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = url.ok_or(AiError::NotConfigured(service))?;

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(service, error = %e, "AI service unreachable");
                crate::metrics::record_ai_call(service, "error");
                AiError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<UpstreamError>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| fallback.to_string());
            error!(service, status = status.as_u16(), %message, "AI service failed");
            crate::metrics::record_ai_call(service, "error");
            return Err(AiError::Upstream(message));
        }

        let reply = response.json::<R>().await.map_err(|e| {
            crate::metrics::record_ai_call(service, "error");
            AiError::Upstream(format!("{}: {}", fallback, e))
        })?;

        debug!(service, "AI service answered");
        crate::metrics::record_ai_call(service, "success");
        Ok(reply)
    }
}
