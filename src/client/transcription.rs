use bytes::{Bytes, BytesMut};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info};

use super::{ClientError, ClientResult, TRANSCRIBE_PATH, gateway_endpoint};
use crate::core::openai::DEFAULT_AUDIO_FILE_NAME;
use crate::core::realtime::TranscriptCallback;

/// Partial transcript shown while recording
pub const LISTENING_PLACEHOLDER: &str = "Listening…";
pub const EMPTY_TRANSCRIPT_MESSAGE: &str = "Transcription succeeded but returned empty text.";
const UNSUPPORTED_MESSAGE: &str = "Voice capture unsupported on this device.";
const UPLOAD_FAILED_MESSAGE: &str = "Failed to transcribe audio";
const DEFAULT_MIME_TYPE: &str = "audio/webm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderStatus {
    #[default]
    Idle,
    Recording,
    Processing,
    Error,
}

impl RecorderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderStatus::Idle => "idle",
            RecorderStatus::Recording => "recording",
            RecorderStatus::Processing => "processing",
            RecorderStatus::Error => "error",
        }
    }
}

impl fmt::Display for RecorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    transcript: Option<String>,
}

/// Record-then-upload transcription.
///
/// Audio chunks pushed while recording are buffered; `stop_recording`
/// uploads them as one file and hands the trimmed transcript to the final
/// callback. Failures land in [`RecorderStatus::Error`] with a message.
pub struct TranscriptionRecorder {
    http: reqwest::Client,
    endpoint: String,
    supported: bool,
    mime_type: String,
    status: RecorderStatus,
    error: Option<String>,
    buffer: BytesMut,
    on_final: TranscriptCallback,
    on_partial: Option<TranscriptCallback>,
}

impl TranscriptionRecorder {
    /// `supported` reports whether the host can capture audio at all
    pub fn new(gateway_url: &str, supported: bool, on_final: TranscriptCallback) -> Self {
        let (status, error) = if supported {
            (RecorderStatus::Idle, None)
        } else {
            (RecorderStatus::Error, Some(UNSUPPORTED_MESSAGE.to_string()))
        };

        Self {
            http: reqwest::Client::new(),
            endpoint: gateway_endpoint(gateway_url, TRANSCRIBE_PATH),
            supported,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            status,
            error,
            buffer: BytesMut::new(),
            on_final,
            on_partial: None,
        }
    }

    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_partial_callback(mut self, callback: TranscriptCallback) -> Self {
        self.on_partial = Some(callback);
        self
    }

    /// Container type of the recorded audio, `audio/webm` by default
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn status(&self) -> RecorderStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_recording(&self) -> bool {
        self.status == RecorderStatus::Recording
    }

    /// Bytes buffered for the current recording
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    async fn emit_partial(&self, text: &str) {
        if let Some(callback) = &self.on_partial {
            callback(text.to_string()).await;
        }
    }

    fn fail(&mut self, message: String) {
        error!("Transcription error: {}", message);
        self.error = Some(message);
        self.status = RecorderStatus::Error;
    }

    pub async fn start_recording(&mut self) {
        if !self.supported {
            self.fail(UNSUPPORTED_MESSAGE.to_string());
            return;
        }
        if self.status == RecorderStatus::Recording {
            return;
        }

        self.buffer.clear();
        self.status = RecorderStatus::Recording;
        self.error = None;
        info!("Recording started");
        self.emit_partial(LISTENING_PLACEHOLDER).await;
    }

    /// Append recorded audio. Ignored unless recording.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if self.status == RecorderStatus::Recording && !chunk.is_empty() {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Stop recording and upload the buffered audio for transcription
    pub async fn stop_recording(&mut self) {
        if self.status != RecorderStatus::Recording {
            return;
        }

        info!(bytes = self.buffer.len(), "Recording stopped, uploading");
        let audio = self.buffer.split().freeze();

        self.status = RecorderStatus::Processing;
        self.error = None;
        self.emit_partial("").await;

        match self.upload(audio).await {
            Ok(transcript) => {
                info!("Final transcript received");
                (self.on_final)(transcript).await;
                self.status = RecorderStatus::Idle;
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    async fn upload(&self, audio: Bytes) -> ClientResult<String> {
        let part = Part::bytes(audio.to_vec())
            .file_name(DEFAULT_AUDIO_FILE_NAME)
            .mime_str(&self.mime_type)
            .map_err(|e| ClientError::InvalidResponse(format!("Invalid MIME type: {e}")))?;
        let form = Form::new().part("audio", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                UPLOAD_FAILED_MESSAGE.to_string()
            } else {
                body
            };
            return Err(ClientError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        let payload: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        debug!("Transcription payload received");

        payload
            .transcript
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::EmptyTranscript)
    }
}
