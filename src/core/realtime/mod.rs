//! Realtime voice session.
//!
//! A single session against OpenAI's realtime endpoint that streams microphone
//! audio and surfaces a final transcript string.
//!
//! # Architecture
//!
//! - [`RealtimeVoiceSession`] holds the state machine and transcript buffer
//! - [`RealtimeConnector`] / [`RealtimeLink`] abstract the transport
//! - [`WebRtcConnector`] drives an injected host peer connection through SDP signaling
//! - [`WebSocketConnector`] speaks the WebSocket variant of the same protocol
//!
//! There is no retry, reconnection or timeout inside the session: failures land
//! in [`RealtimeStatus::Error`] and the caller starts over with `start_listening`.
//!
//! # Example
//!
//! ```rust,ignore
//! use concierge_gateway::core::realtime::{
//!     GatewayCredentialProvider, RealtimeVoiceSession, WebSocketConnector,
//! };
//! use std::sync::Arc;
//!
//! let (mic_tx, _) = tokio::sync::broadcast::channel(64);
//! let credentials = Arc::new(GatewayCredentialProvider::new("http://localhost:3001"));
//! let connector = Arc::new(WebSocketConnector::new(credentials, Some(mic_tx.clone())));
//!
//! let mut session = RealtimeVoiceSession::new(
//!     connector,
//!     Arc::new(|text| Box::pin(async move { println!("final: {text}") })),
//! );
//! session.start_listening().await;
//! ```

mod base;
mod events;
mod session;
mod signaling;
mod transport;
mod webrtc;
mod websocket;

pub use base::{
    DATA_CHANNEL_LABEL, DEFAULT_ICE_SERVER, DEFAULT_REALTIME_HTTP_URL, DEFAULT_REALTIME_WS_URL,
    RESPONSE_INSTRUCTIONS, RealtimeError, RealtimeResult, RealtimeStatus, RemoteAudioCallback,
    SESSION_INSTRUCTIONS, StatusCallback, TranscriptCallback,
};
pub use events::{ApiError, ClientEvent, ResponseRequest, ServerEvent, SessionUpdate};
pub use session::RealtimeVoiceSession;
pub use signaling::{
    CredentialProvider, EphemeralCredential, GatewayCredentialProvider, SdpSignaling,
    StaticCredentialProvider,
};
pub use transport::{LinkMessage, RealtimeConnector, RealtimeLink};
pub use webrtc::{PeerConnection, PeerFactory, PeerOptions, WebRtcConnector, WebRtcLink};
pub use websocket::{WebSocketConnector, WebSocketLink};
