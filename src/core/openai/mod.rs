//! OpenAI REST integration used by the proxy routes.
//!
//! - `POST /v1/realtime/sessions` mints ephemeral realtime credentials
//! - `POST /v1/audio/speech` synthesizes assistant speech
//! - `POST /v1/audio/transcriptions` transcribes recorded audio

mod client;
mod config;

use thiserror::Error;

pub use client::{
    AudioUpload, OpenAIClient, RealtimeSessionRequest, SpeechRequest, Transcription,
};
pub use config::{
    DEFAULT_AUDIO_FILE_NAME, REALTIME_SESSION_INSTRUCTIONS, SpeechFormat, SpeechModel,
    TranscriptionModel,
};

/// Errors returned by the OpenAI client.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// The upstream answered with a non-success status
    #[error("OpenAI API error ({status})")]
    Upstream {
        status: u16,
        /// Upstream error body (JSON when parseable)
        details: serde_json::Value,
    },

    /// The request could not be sent or the body not read
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The outgoing request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for OpenAI operations.
pub type OpenAIResult<T> = Result<T, OpenAIError>;
