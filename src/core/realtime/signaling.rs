//! Ephemeral credentials and SDP signaling for realtime sessions.

use async_trait::async_trait;
use serde::Deserialize;

use super::base::{DEFAULT_REALTIME_HTTP_URL, RealtimeError, RealtimeResult};
use crate::config::{DEFAULT_REALTIME_MODEL, DEFAULT_VOICE};

const FETCH_KEY_FAILED: &str = "Failed to fetch realtime key";
const KEY_MISSING: &str = "Realtime key missing from response";
const SIGNALING_FAILED: &str = "Failed to establish realtime session";

/// Short-lived client secret minted by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralCredential {
    pub value: String,
    /// Unix seconds, when the upstream reports it
    pub expires_at: Option<i64>,
}

/// Source of ephemeral credentials for a session.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch(&self) -> RealtimeResult<EphemeralCredential>;
}

/// `client_secret` is either a bare string or `{ value, expires_at }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClientSecret {
    Plain(String),
    Object {
        value: String,
        #[serde(default)]
        expires_at: Option<i64>,
    },
}

#[derive(Debug, Deserialize)]
struct RealtimeKeyResponse {
    #[serde(default)]
    client_secret: Option<ClientSecret>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
}

/// Fetches credentials from the gateway's `/api/openai/realtime-key` route
#[derive(Debug, Clone)]
pub struct GatewayCredentialProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl GatewayCredentialProvider {
    /// `gateway_url` is the gateway's base URL, e.g. `http://localhost:3001`
    pub fn new(gateway_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), gateway_url)
    }

    pub fn with_client(client: reqwest::Client, gateway_url: &str) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/api/openai/realtime-key",
                gateway_url.trim_end_matches('/')
            ),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CredentialProvider for GatewayCredentialProvider {
    async fn fetch(&self) -> RealtimeResult<EphemeralCredential> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| RealtimeError::CredentialFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorPayload>()
                .await
                .ok()
                .and_then(|payload| payload.error)
                .unwrap_or_else(|| FETCH_KEY_FAILED.to_string());
            tracing::warn!(status = %status, "Realtime key request rejected: {}", message);
            return Err(RealtimeError::CredentialFailed(message));
        }

        let body: RealtimeKeyResponse = response
            .json()
            .await
            .map_err(|e| RealtimeError::CredentialFailed(e.to_string()))?;

        let credential = match body.client_secret {
            Some(ClientSecret::Plain(value)) => EphemeralCredential {
                value,
                expires_at: None,
            },
            Some(ClientSecret::Object { value, expires_at }) => {
                EphemeralCredential { value, expires_at }
            }
            None => return Err(RealtimeError::CredentialFailed(KEY_MISSING.to_string())),
        };

        if credential.value.is_empty() {
            return Err(RealtimeError::CredentialFailed(KEY_MISSING.to_string()));
        }

        tracing::debug!("Ephemeral key obtained");
        Ok(credential)
    }
}

/// Fixed credential, for hosts that mint keys out of band
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: EphemeralCredential,
}

impl StaticCredentialProvider {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            credential: EphemeralCredential {
                value: value.into(),
                expires_at: None,
            },
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn fetch(&self) -> RealtimeResult<EphemeralCredential> {
        Ok(self.credential.clone())
    }
}

/// Posts an SDP offer to the realtime endpoint and returns the answer
#[derive(Debug, Clone)]
pub struct SdpSignaling {
    client: reqwest::Client,
    realtime_url: String,
    model: String,
    voice: String,
}

impl Default for SdpSignaling {
    fn default() -> Self {
        Self::new(DEFAULT_REALTIME_HTTP_URL, DEFAULT_REALTIME_MODEL, DEFAULT_VOICE)
    }
}

impl SdpSignaling {
    pub fn new(realtime_url: &str, model: &str, voice: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            realtime_url: realtime_url.to_string(),
            model: model.to_string(),
            voice: voice.to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub async fn exchange(
        &self,
        credential: &EphemeralCredential,
        offer_sdp: &str,
    ) -> RealtimeResult<String> {
        let response = self
            .client
            .post(&self.realtime_url)
            .query(&[("model", self.model.as_str()), ("voice", self.voice.as_str())])
            .header("Authorization", format!("Bearer {}", credential.value))
            .header("Content-Type", "application/sdp")
            .body(offer_sdp.to_string())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("SDP exchange request failed: {}", e);
                RealtimeError::SignalingFailed(SIGNALING_FAILED.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "SDP exchange rejected");
            return Err(RealtimeError::SignalingFailed(SIGNALING_FAILED.to_string()));
        }

        response
            .text()
            .await
            .map_err(|e| RealtimeError::SignalingFailed(e.to_string()))
    }
}
