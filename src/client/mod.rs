//! Client helpers for talking to the gateway's audio routes.
//!
//! - [`TranscriptionRecorder`] buffers recorded audio and uploads it for a transcript
//! - [`AssistantSpeech`] fetches synthesized speech for assistant replies

mod speech;
mod transcription;

use thiserror::Error;

pub use speech::{AssistantSpeech, PlaybackCallback};
pub use transcription::{
    EMPTY_TRANSCRIPT_MESSAGE, LISTENING_PLACEHOLDER, RecorderStatus, TranscriptionRecorder,
};

/// Gateway route for speech synthesis
pub const SPEAK_PATH: &str = "/api/openai/speak";
/// Gateway route for transcription uploads
pub const TRANSCRIBE_PATH: &str = "/api/openai/transcribe";

/// Errors raised by the client helpers
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never reached the gateway
    #[error("Network error: {0}")]
    Network(String),

    /// The gateway answered with a non-success status; the message is the raw body
    #[error("{message}")]
    Gateway { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{}", EMPTY_TRANSCRIPT_MESSAGE)]
    EmptyTranscript,
}

pub type ClientResult<T> = Result<T, ClientError>;

fn gateway_endpoint(gateway_url: &str, path: &str) -> String {
    format!("{}{}", gateway_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_endpoint() {
        assert_eq!(
            gateway_endpoint("http://localhost:3001/", TRANSCRIBE_PATH),
            "http://localhost:3001/api/openai/transcribe"
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ClientError::EmptyTranscript.to_string(),
            "Transcription succeeded but returned empty text."
        );
        let err = ClientError::Gateway {
            status: 500,
            message: "{\"error\":\"boom\"}".to_string(),
        };
        assert_eq!(err.to_string(), "{\"error\":\"boom\"}");
    }
}
