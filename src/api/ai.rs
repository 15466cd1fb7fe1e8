//! AI proxy routes

use super::{json, require_session, ApiError, ApiRequest, ApiResponse, AppState};
use crate::ai::AiError;
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionBody {
    #[serde(default)]
    s3_file_url: String,
}

#[derive(Deserialize)]
struct TranslateBody {
    #[serde(default)]
    text: String,
    #[serde(default)]
    target_language: String,
}

#[derive(Deserialize)]
struct SpeechBody {
    #[serde(default)]
    text: String,
    voice: Option<String>,
    speed: Option<f32>,
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        let status = match e {
            AiError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AiError::Upstream(_) | AiError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

fn invalid_json() -> ApiError {
    ApiError::bad_request("Invalid JSON body")
}

/// `POST /api/ai-documents/text-extraction`
pub async fn text_extraction(
    state: &AppState,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    require_session(state, request).await?;
    let body: ExtractionBody = request.json(&invalid_json())?;

    let extracted_text = state.ai.extract_text(&body.s3_file_url).await?;
    Ok(json(
        StatusCode::OK,
        &json!({ "extracted_text": extracted_text }),
    ))
}

/// `POST /api/ai-documents/translate`
pub async fn translate(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    require_session(state, request).await?;
    let body: TranslateBody = request.json(&invalid_json())?;

    let translated_text = state
        .ai
        .translate(&body.text, &body.target_language)
        .await?;
    Ok(json(
        StatusCode::OK,
        &json!({ "translated_text": translated_text }),
    ))
}

/// `POST /api/ai-documents/text-to-speech`
pub async fn text_to_speech(
    state: &AppState,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    require_session(state, request).await?;
    let body: SpeechBody = request.json(&invalid_json())?;

    let audio_url = state
        .ai
        .text_to_speech(&body.text, body.voice.as_deref(), body.speed)
        .await?;
    Ok(json(StatusCode::OK, &json!({ "audio_url": audio_url })))
}
