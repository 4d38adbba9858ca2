//! Base types for the realtime voice session.
//!
//! A session is a single connection to OpenAI's realtime endpoint that streams
//! microphone audio and surfaces a final transcript string. The transport is
//! pluggable (see [`super::transport`]); everything in this module is shared
//! between transports.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Label of the data channel carrying JSON events
pub const DATA_CHANNEL_LABEL: &str = "oai-events";

/// STUN server used for ICE gathering
pub const DEFAULT_ICE_SERVER: &str = "stun:stun.l.google.com:19302";

/// SDP exchange endpoint for the WebRTC transport
pub const DEFAULT_REALTIME_HTTP_URL: &str = "https://api.openai.com/v1/realtime";

/// WebSocket endpoint for the WebSocket transport
pub const DEFAULT_REALTIME_WS_URL: &str = "wss://api.openai.com/v1/realtime";

/// Instructions sent in `session.update` once the event channel opens
pub const SESSION_INSTRUCTIONS: &str = "You are a speech recognition service. When the user speaks, respond only with the verbatim transcript as plain text.";

/// Instructions attached to every `response.create`
pub const RESPONSE_INSTRUCTIONS: &str =
    "Transcribe the most recent audio buffer verbatim and respond with only the transcript text.";

/// Message surfaced at construction when the connector cannot capture audio
pub const UNSUPPORTED_MESSAGE: &str = "Voice capture unsupported";

/// Message surfaced when `start_listening` is called without audio capture
pub const UNSUPPORTED_START_MESSAGE: &str = "Voice capture unsupported on this device";

/// Fallback message for `error` events without a message
pub const DEFAULT_REMOTE_ERROR_MESSAGE: &str = "Realtime session error";

/// Message surfaced when the event channel itself fails
pub const DATA_CHANNEL_ERROR_MESSAGE: &str = "Realtime data channel error";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while establishing or driving a realtime session.
///
/// Variants whose message is shown to the end user render it unprefixed.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The connector cannot capture audio on this host
    #[error("{0}")]
    Unsupported(String),

    /// Fetching the ephemeral credential failed
    #[error("{0}")]
    CredentialFailed(String),

    /// The SDP offer/answer exchange failed
    #[error("{0}")]
    SignalingFailed(String),

    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Peer connection error
    #[error("Peer connection error: {0}")]
    PeerError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The link exists but has no microphone or event channel
    #[error("Microphone stream unavailable")]
    MicrophoneUnavailable,

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

impl From<serde_json::Error> for RealtimeError {
    fn from(err: serde_json::Error) -> Self {
        RealtimeError::SerializationError(err.to_string())
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle status of a realtime voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeStatus {
    #[default]
    Idle,
    Connecting,
    Ready,
    Listening,
    Processing,
    Disconnected,
    Error,
}

impl RealtimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RealtimeStatus::Idle => "idle",
            RealtimeStatus::Connecting => "connecting",
            RealtimeStatus::Ready => "ready",
            RealtimeStatus::Listening => "listening",
            RealtimeStatus::Processing => "processing",
            RealtimeStatus::Disconnected => "disconnected",
            RealtimeStatus::Error => "error",
        }
    }
}

impl fmt::Display for RealtimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback type for transcript text (final or accumulated partial).
pub type TranscriptCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for audio received from the remote side.
pub type RemoteAudioCallback =
    Arc<dyn Fn(Bytes) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for status transitions.
pub type StatusCallback =
    Arc<dyn Fn(RealtimeStatus) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;
