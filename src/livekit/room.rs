use serde::{Deserialize, Serialize};
use tracing::debug;

use super::token::TokenIssuer;
use super::{LiveKitError, LiveKitResult};

const CREATE_ROOM_PATH: &str = "/twirp/livekit.RoomService/CreateRoom";
const CREATE_DISPATCH_PATH: &str = "/twirp/livekit.AgentDispatchService/CreateDispatch";

/// Room settings sent with `CreateRoom`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateRoomOptions {
    /// Seconds an empty room is kept open
    pub empty_timeout: u32,
    pub max_participants: u32,
}

impl Default for CreateRoomOptions {
    fn default() -> Self {
        Self {
            empty_timeout: 300,
            max_participants: 10,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomBody<'a> {
    name: &'a str,
    empty_timeout: u32,
    max_participants: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDispatchBody<'a> {
    room: &'a str,
    agent_name: &'a str,
}

#[derive(Deserialize)]
struct DispatchResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct TwirpError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

/// Map a LiveKit server URL to the HTTP base used for Twirp calls.
///
/// `ws://` becomes `http://` and `wss://` becomes `https://`.
pub fn http_base_url(url: &str) -> LiveKitResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let converted = if let Some(rest) = trimmed.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        trimmed.to_string()
    };

    let parsed = url::Url::parse(&converted).map_err(|e| LiveKitError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(converted),
        scheme => Err(LiveKitError::InvalidUrl(format!(
            "unsupported scheme '{scheme}'"
        ))),
    }
}

/// Minimal client for the LiveKit room and agent dispatch services.
#[derive(Debug, Clone)]
pub struct RoomServiceClient {
    http: reqwest::Client,
    base_url: String,
    issuer: TokenIssuer,
}

impl RoomServiceClient {
    pub fn new(http: reqwest::Client, url: &str, issuer: TokenIssuer) -> LiveKitResult<Self> {
        Ok(Self {
            http,
            base_url: http_base_url(url)?,
            issuer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<B: Serialize>(
        &self,
        path: &str,
        room: &str,
        body: &B,
    ) -> LiveKitResult<serde_json::Value> {
        let token = self.issuer.server_token(room)?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| LiveKitError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LiveKitError::Network(e.to_string()))?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<TwirpError>(&text).ok();
            let (code, message) = match parsed {
                Some(err) => (err.code, err.msg.unwrap_or(text)),
                None => (None, text),
            };
            return Err(LiveKitError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| LiveKitError::Network(e.to_string()))
    }

    /// Create a room, failing with [`LiveKitError::Api`] if it cannot be created
    pub async fn create_room(&self, name: &str, options: &CreateRoomOptions) -> LiveKitResult<()> {
        debug!(room = %name, "Creating LiveKit room");
        self.call(
            CREATE_ROOM_PATH,
            name,
            &CreateRoomBody {
                name,
                empty_timeout: options.empty_timeout,
                max_participants: options.max_participants,
            },
        )
        .await
        .map(|_| ())
    }

    /// Dispatch the agent registered as `agent_name` into `room`, returning the dispatch id
    pub async fn create_dispatch(
        &self,
        room: &str,
        agent_name: &str,
    ) -> LiveKitResult<Option<String>> {
        debug!(room = %room, agent = %agent_name, "Creating agent dispatch");
        let value = self
            .call(
                CREATE_DISPATCH_PATH,
                room,
                &CreateDispatchBody { room, agent_name },
            )
            .await?;
        Ok(serde_json::from_value::<DispatchResponse>(value)
            .ok()
            .and_then(|d| d.id))
    }
}
