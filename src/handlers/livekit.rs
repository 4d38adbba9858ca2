use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

use crate::errors::app_error::{AppError, AppResult};
use crate::livekit::{
    AGENT_ROOM_PREFIX, DEFAULT_ROOM_NAME, LiveKitService, ParticipantToken, ROOM_TOKEN_TTL,
    SESSION_ROOM_PREFIX, SESSION_TOKEN_TTL,
};
use crate::state::AppState;

/// Endpoint reported by the agent-server status route
pub const AGENT_SERVER_ENDPOINT: &str = "/api/livekit-agentserver/token";
const AGENT_TYPE: &str = "agentserver";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[serde(default)]
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub ws_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenRequest {
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenResponse {
    pub token: String,
    pub url: String,
    pub room_name: String,
    pub participant_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentServerStatus {
    pub configured: bool,
    pub livekit_url: String,
    pub has_api_key: bool,
    pub has_api_secret: bool,
    pub agent_type: &'static str,
    pub endpoint: &'static str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Random participant name `user-{0..max}`
fn random_participant(max: u128) -> String {
    format!("user-{}", uuid::Uuid::new_v4().as_u128() % max)
}

fn session_names(request: SessionTokenRequest, room_prefix: &str, max_user: u128) -> (String, String) {
    let room = non_empty(request.room_name)
        .unwrap_or_else(|| format!("{}-{}", room_prefix, unix_millis()));
    let participant =
        non_empty(request.participant_name).unwrap_or_else(|| random_participant(max_user));
    (room, participant)
}

fn configured_livekit<'a>(state: &'a AppState, details: &str) -> AppResult<&'a LiveKitService> {
    state.livekit.as_ref().ok_or_else(|| {
        error!("Missing LiveKit credentials");
        AppError::internal("Server configuration error").with_details(details.to_string())
    })
}

fn token_error(e: impl std::fmt::Display) -> AppError {
    error!("Error generating LiveKit token: {}", e);
    AppError::internal("Failed to generate token").with_details(e.to_string())
}

/// Token for the shared concierge room
pub async fn generate_token(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(request) = body.map_err(|e| {
        error!("Token generation error: {}", e);
        AppError::internal("Failed to generate token")
    })?;

    let participant = non_empty(request.participant_name)
        .ok_or_else(|| AppError::bad_request("Participant name is required"))?;

    let livekit = state
        .livekit
        .as_ref()
        .ok_or_else(|| AppError::internal("LiveKit credentials not configured"))?;

    let token = livekit
        .issuer()
        .participant_token(
            &ParticipantToken::new(&participant, DEFAULT_ROOM_NAME).with_ttl(ROOM_TOKEN_TTL),
        )
        .map_err(|e| {
            error!("Token generation error: {}", e);
            AppError::internal("Failed to generate token")
        })?;

    info!(participant = %participant, room = DEFAULT_ROOM_NAME, "LiveKit token generated");
    Ok(Json(TokenResponse {
        token,
        ws_url: livekit.url().to_string(),
    }))
}

async fn issue_session_token(
    state: &AppState,
    request: SessionTokenRequest,
) -> AppResult<Json<SessionTokenResponse>> {
    let (room, participant) = session_names(request, SESSION_ROOM_PREFIX, 1000);
    let livekit = configured_livekit(state, "LiveKit credentials not configured")?;

    info!(room = %room, participant = %participant, "Generating LiveKit native token");
    let token = livekit
        .issuer()
        .participant_token(&ParticipantToken::new(&participant, &room).with_ttl(SESSION_TOKEN_TTL))
        .map_err(token_error)?;

    Ok(Json(SessionTokenResponse {
        token,
        url: livekit.url().to_string(),
        room_name: room,
        participant_name: participant,
        agent_type: None,
    }))
}

/// Token for a per-session room joined by the native agent
pub async fn generate_native_token(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SessionTokenRequest>, JsonRejection>,
) -> AppResult<Json<SessionTokenResponse>> {
    let Json(request) = body.map_err(token_error)?;
    issue_session_token(&state, request).await
}

/// `GET` variant of [`generate_native_token`] reading query parameters
pub async fn generate_native_token_get(
    State(state): State<Arc<AppState>>,
    Query(request): Query<SessionTokenRequest>,
) -> AppResult<Json<SessionTokenResponse>> {
    issue_session_token(&state, request).await
}

/// Create a room, dispatch the voice agent into it, and return a token
pub async fn generate_agent_server_token(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SessionTokenRequest>, JsonRejection>,
) -> AppResult<Json<SessionTokenResponse>> {
    let Json(request) = body.map_err(token_error)?;
    let (room, participant) = session_names(request, AGENT_ROOM_PREFIX, 10000);

    let livekit = configured_livekit(
        &state,
        "LiveKit credentials not configured. Check LIVEKIT_URL, LIVEKIT_API_KEY, and LIVEKIT_API_SECRET",
    )?;

    info!(
        room = %room,
        participant = %participant,
        agent = %livekit.agent_name(),
        "Generating LiveKit agent-server token"
    );
    livekit.prepare_agent_room(&room).await;

    let token = livekit
        .issuer()
        .participant_token(
            &ParticipantToken::new(&participant, &room)
                .with_ttl(SESSION_TOKEN_TTL)
                .with_metadata_updates(),
        )
        .map_err(token_error)?;

    Ok(Json(SessionTokenResponse {
        token,
        url: livekit.url().to_string(),
        room_name: room,
        participant_name: participant,
        agent_type: Some(AGENT_TYPE),
    }))
}

/// Report which LiveKit settings are present, without revealing them
pub async fn agent_server_status(State(state): State<Arc<AppState>>) -> Json<AgentServerStatus> {
    let config = &state.config;
    let has_api_key = config.livekit_api_key.is_some();
    let has_api_secret = config.livekit_api_secret.is_some();

    Json(AgentServerStatus {
        configured: has_api_key && has_api_secret && config.livekit_url.is_some(),
        livekit_url: config
            .livekit_url
            .clone()
            .unwrap_or_else(|| "NOT_CONFIGURED".to_string()),
        has_api_key,
        has_api_secret,
        agent_type: AGENT_TYPE,
        endpoint: AGENT_SERVER_ENDPOINT,
    })
}
