use std::time::Duration;

use livekit_api::access_token::{AccessToken, VideoGrants};
use zeroize::Zeroize;

use super::{LiveKitError, LiveKitResult};

/// Shared room used by the simple token route
pub const DEFAULT_ROOM_NAME: &str = "food-concierge";
/// Prefix of generated room names for native sessions
pub const SESSION_ROOM_PREFIX: &str = "food-concierge";
/// Prefix of generated room names for agent-server sessions
pub const AGENT_ROOM_PREFIX: &str = "food-concierge-agentserver";

/// TTL of tokens for the shared room
pub const ROOM_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);
/// TTL of tokens for per-session rooms
pub const SESSION_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
/// TTL of server tokens used against the room service
const SERVER_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

/// Participant token parameters.
#[derive(Debug, Clone)]
pub struct ParticipantToken {
    pub identity: String,
    pub room: String,
    pub ttl: Duration,
    pub can_update_own_metadata: bool,
}

impl ParticipantToken {
    pub fn new(identity: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            room: room.into(),
            ttl: ROOM_TOKEN_TTL,
            can_update_own_metadata: false,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_metadata_updates(mut self) -> Self {
        self.can_update_own_metadata = true;
        self
    }

    fn grants(&self) -> VideoGrants {
        VideoGrants {
            room_join: true,
            room: self.room.clone(),
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
            can_update_own_metadata: self.can_update_own_metadata,
            ..Default::default()
        }
    }
}

/// Signs LiveKit access tokens with an API key pair.
#[derive(Clone)]
pub struct TokenIssuer {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Drop for TokenIssuer {
    fn drop(&mut self) {
        self.api_secret.zeroize();
    }
}

impl TokenIssuer {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    /// Sign a token letting `participant.identity` join, publish and subscribe
    pub fn participant_token(&self, participant: &ParticipantToken) -> LiveKitResult<String> {
        AccessToken::with_api_key(&self.api_key, &self.api_secret)
            .with_identity(&participant.identity)
            .with_ttl(participant.ttl)
            .with_grants(participant.grants())
            .to_jwt()
            .map_err(|e| LiveKitError::Token(e.to_string()))
    }

    /// Sign a short-lived token for room service calls on `room`.
    ///
    /// Admin grants only apply to the named room, so agent dispatch must be
    /// signed for its target room.
    pub fn server_token(&self, room: &str) -> LiveKitResult<String> {
        AccessToken::with_api_key(&self.api_key, &self.api_secret)
            .with_ttl(SERVER_TOKEN_TTL)
            .with_grants(VideoGrants {
                room: room.to_string(),
                room_create: true,
                room_admin: true,
                room_join: false,
                can_publish: false,
                can_subscribe: false,
                can_publish_data: false,
                ..Default::default()
            })
            .to_jwt()
            .map_err(|e| LiveKitError::Token(e.to_string()))
    }
}
