//! OpenAI proxy routes.
//!
//! The browser never sees the OpenAI API key: it asks these routes for an
//! ephemeral realtime credential, synthesized speech, or a transcript.

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::DEFAULT_VOICE;
use crate::core::openai::{
    AudioUpload, OpenAIClient, OpenAIError, RealtimeSessionRequest, SpeechFormat, SpeechModel,
    SpeechRequest, Transcription,
};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the recorded audio
pub const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Default, Deserialize)]
pub struct RealtimeKeyQuery {
    pub model: Option<String>,
    pub voice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Map a client error to the route's error body.
///
/// Upstream rejections keep their status and body as `details`; anything else
/// is a 500 carrying `fallback`.
fn proxy_error(err: OpenAIError, message: &str, fallback: &str) -> AppError {
    match err {
        OpenAIError::Upstream { status, details } => {
            AppError::api(upstream_status(status), message).with_details(details)
        }
        other => AppError::internal(fallback).with_details(Value::String(other.to_string())),
    }
}

fn openai_client<'a>(state: &'a AppState, message: &str) -> AppResult<&'a OpenAIClient> {
    state.openai.as_ref().ok_or_else(|| {
        error!("OpenAI request rejected: {}", message);
        AppError::internal(message)
    })
}

/// Mint an ephemeral realtime session for the browser
pub async fn realtime_key(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RealtimeKeyQuery>,
) -> AppResult<Json<Value>> {
    let client = openai_client(&state, "OPENAI_API_KEY is not configured")?;

    let model = query
        .model
        .unwrap_or_else(|| state.config.openai_realtime_model.clone());
    let voice = query
        .voice
        .unwrap_or_else(|| state.config.openai_realtime_voice.clone());

    let request = RealtimeSessionRequest::transcription(&model, &voice);
    match client.create_realtime_session(&request).await {
        Ok(session) => {
            info!(model = %model, voice = %voice, "Realtime session created");
            Ok(Json(session))
        }
        Err(e) => {
            warn!("Realtime session creation failed: {}", e);
            Err(proxy_error(
                e,
                "Failed to create realtime session",
                "Unexpected error creating realtime session",
            ))
        }
    }
}

/// Synthesize assistant speech as MP3
pub async fn speak(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpeakRequest>,
) -> AppResult<Response> {
    let text = request.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AppError::bad_request("Text is required for speech synthesis."));
    }

    let client = openai_client(&state, "OpenAI API key is not configured.")?;

    let format = SpeechFormat::default();
    let speech = SpeechRequest {
        model: SpeechModel::default(),
        voice: request.voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        input: text,
        format,
    };

    let audio: Bytes = client.synthesize_speech(&speech).await.map_err(|e| {
        warn!("Speech synthesis failed: {}", e);
        proxy_error(e, "Failed to synthesize speech.", "Failed to synthesize speech.")
    })?;

    info!(bytes = audio.len(), voice = %speech.voice, "Speech synthesized");
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type()),
            (header::CACHE_CONTROL, "no-store"),
        ],
        audio,
    )
        .into_response())
}

/// Find the `audio` file part of the upload
async fn read_audio_field(mut multipart: Multipart) -> Result<Option<AudioUpload>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        // A plain text field with the right name is not a file
        let Some(file_name) = field.file_name().map(str::to_string) else {
            return Ok(None);
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| e.to_string())?;
        return Ok(Some(AudioUpload {
            data,
            file_name: Some(file_name),
            content_type,
        }));
    }
    Ok(None)
}

/// Transcribe an uploaded recording
pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Transcription>> {
    let client = openai_client(&state, "OPENAI_API_KEY is not configured.")?;

    let multipart = multipart.map_err(|e| {
        error!("Transcription upload rejected: {}", e);
        AppError::internal("Failed to transcribe audio.")
    })?;

    let upload = match read_audio_field(multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return Err(AppError::bad_request("Audio file is required.")),
        Err(e) => {
            error!("Failed to read transcription upload: {}", e);
            return Err(AppError::internal("Failed to transcribe audio."));
        }
    };

    match client.transcribe(upload).await {
        Ok(transcription) => {
            info!(language = ?transcription.language, "Transcription returned");
            Ok(Json(transcription))
        }
        Err(OpenAIError::Upstream { status, details }) => {
            error!(status, "Transcription upstream error");
            Err(AppError::api(upstream_status(status), "Failed to transcribe audio.")
                .with_details(details))
        }
        Err(e) => {
            error!("Transcription failed: {}", e);
            Err(AppError::internal("Failed to transcribe audio."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_error_mirrors_upstream_status() {
        let err = proxy_error(
            OpenAIError::Upstream {
                status: 429,
                details: serde_json::json!({"error": "rate"}),
            },
            "Failed to synthesize speech.",
            "unused",
        );
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_proxy_error_network_is_internal() {
        let err = proxy_error(
            OpenAIError::Network("connection refused".to_string()),
            "Failed to create realtime session",
            "Unexpected error creating realtime session",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Unexpected error creating realtime session");
    }

    #[test]
    fn test_upstream_status_invalid_code() {
        assert_eq!(upstream_status(42), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream_status(401), StatusCode::UNAUTHORIZED);
    }
}
