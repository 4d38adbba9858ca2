use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{ServerConfig, StoreBackend};
use crate::core::openai::OpenAIClient;
use crate::livekit::LiveKitService;
use crate::store::{FoodStore, MemoryStore, PostgrestStore};

/// Timeout for upstream HTTP calls made by the route handlers
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Application state shared by every handler.
///
/// Built once at startup from [`ServerConfig`]; each integration is `None`
/// when its credentials are missing, and the matching routes answer with a
/// configuration error instead.
pub struct AppState {
    pub config: ServerConfig,
    pub http: reqwest::Client,
    pub openai: Option<OpenAIClient>,
    pub livekit: Option<LiveKitService>,
    pub store: Option<Arc<dyn FoodStore>>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                reqwest::Client::new()
            });
        let store = build_store(&config, &http);
        Self::with_store(config, http, store)
    }

    /// Build state around an explicit store, used by tests and embedders
    pub fn with_store(
        config: ServerConfig,
        http: reqwest::Client,
        store: Option<Arc<dyn FoodStore>>,
    ) -> Arc<Self> {
        let openai = config
            .get_openai_api_key()
            .ok()
            .map(|key| OpenAIClient::new(http.clone(), key, &config.openai_base_url));
        if openai.is_none() {
            info!("OPENAI_API_KEY not set, OpenAI proxy routes will return configuration errors");
        }

        let livekit = match config.get_livekit_credentials() {
            Ok(credentials) => {
                match LiveKitService::new(http.clone(), credentials, &config.livekit_agent_name) {
                    Ok(service) => Some(service),
                    Err(e) => {
                        warn!("LiveKit disabled: {}", e);
                        None
                    }
                }
            }
            Err(e) => {
                info!("LiveKit disabled: {}", e);
                None
            }
        };

        Arc::new(Self {
            config,
            http,
            openai,
            livekit,
            store,
        })
    }
}

fn build_store(config: &ServerConfig, http: &reqwest::Client) -> Option<Arc<dyn FoodStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!(profile = %config.demo_profile_id, "Using in-memory food store");
            Some(Arc::new(MemoryStore::with_profile(&config.demo_profile_id)))
        }
        StoreBackend::Postgrest => match config.get_supabase_credentials() {
            Ok((url, key)) => match PostgrestStore::new(http.clone(), &url, key) {
                Ok(store) => {
                    info!(url = %url, "Using Supabase PostgREST food store");
                    Some(Arc::new(store))
                }
                Err(e) => {
                    warn!("Food store disabled: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!(
                    "{}. Supabase-dependent routes will report that they are not configured.",
                    e
                );
                None
            }
        },
    }
}
