//! LiveKit integration for the voice concierge.
//!
//! - [`TokenIssuer`] signs participant and server access tokens
//! - [`RoomServiceClient`] creates rooms and dispatches the voice agent over
//!   LiveKit's Twirp JSON API
//! - [`LiveKitService`] bundles both for the HTTP handlers

mod room;
mod token;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::LiveKitCredentials;

pub use room::{CreateRoomOptions, RoomServiceClient, http_base_url};
pub use token::{
    AGENT_ROOM_PREFIX, DEFAULT_ROOM_NAME, ParticipantToken, ROOM_TOKEN_TTL, SESSION_ROOM_PREFIX,
    SESSION_TOKEN_TTL, TokenIssuer,
};

/// Errors returned by LiveKit operations.
#[derive(Debug, Error)]
pub enum LiveKitError {
    #[error("Token generation failed: {0}")]
    Token(String),

    /// Twirp error response (`{"code": ..., "msg": ...}`)
    #[error("LiveKit API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid LiveKit URL: {0}")]
    InvalidUrl(String),
}

impl LiveKitError {
    /// True when the server rejected a room creation because the room exists
    pub fn is_already_exists(&self) -> bool {
        match self {
            LiveKitError::Api { code, message, .. } => {
                code.as_deref() == Some("already_exists") || message.contains("already exists")
            }
            _ => false,
        }
    }
}

pub type LiveKitResult<T> = Result<T, LiveKitError>;

/// Token issuer and room service for one LiveKit project.
#[derive(Debug, Clone)]
pub struct LiveKitService {
    url: String,
    agent_name: String,
    issuer: TokenIssuer,
    rooms: RoomServiceClient,
}

impl LiveKitService {
    pub fn new(
        http: reqwest::Client,
        credentials: LiveKitCredentials,
        agent_name: impl Into<String>,
    ) -> LiveKitResult<Self> {
        let issuer = TokenIssuer::new(&credentials.api_key, &credentials.api_secret);
        let rooms = RoomServiceClient::new(http, &credentials.url, issuer.clone())?;
        Ok(Self {
            url: credentials.url.clone(),
            agent_name: agent_name.into(),
            issuer,
            rooms,
        })
    }

    /// Client-facing server URL, returned alongside tokens
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn rooms(&self) -> &RoomServiceClient {
        &self.rooms
    }

    /// Create `room` and dispatch the configured agent into it.
    ///
    /// Neither step is fatal: an existing room is expected, other failures are
    /// logged and the caller still hands out a token.
    pub async fn prepare_agent_room(&self, room: &str) {
        match self.rooms.create_room(room, &CreateRoomOptions::default()).await {
            Ok(()) => info!(room = %room, "Room created"),
            Err(e) if e.is_already_exists() => {
                info!(room = %room, "Room already exists")
            }
            Err(e) => warn!(room = %room, error = %e, "Room creation failed"),
        }

        match self.rooms.create_dispatch(room, &self.agent_name).await {
            Ok(dispatch_id) => info!(
                room = %room,
                agent = %self.agent_name,
                dispatch_id = ?dispatch_id,
                "Agent dispatched"
            ),
            Err(e) => warn!(
                room = %room,
                agent = %self.agent_name,
                error = %e,
                "Agent dispatch failed"
            ),
        }
    }
}
