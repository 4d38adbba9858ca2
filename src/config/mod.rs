//! Configuration module for the Concierge Gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! The configuration is built exactly once at startup and handed to request handlers
//! through [`crate::state::AppState`]; nothing reads the environment after that point.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML overrides onto the environment configuration
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use concierge_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod validation;
mod yaml;

/// Default OpenAI REST base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default realtime model requested when minting ephemeral sessions
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";

/// Default voice for realtime sessions and speech synthesis
pub const DEFAULT_VOICE: &str = "alloy";

/// Default LiveKit agent dispatched into agent-server rooms
pub const DEFAULT_AGENT_NAME: &str = "ubereats-food-concierge";

/// Profile every cart, order and layout query is scoped to
pub const DEFAULT_DEMO_PROFILE_ID: &str = "00000000-0000-0000-0000-000000000001";

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// API secret authentication entry with a client identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthApiSecret {
    pub id: String,
    pub secret: String,
}

/// Which data store backs the food routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Supabase PostgREST (requires SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY)
    #[default]
    Postgrest,
    /// Process-local store holding only the demo profile
    Memory,
}

impl StoreBackend {
    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "mem" => Self::Memory,
            _ => Self::Postgrest,
        }
    }
}

/// LiveKit server credentials
#[derive(Debug, Clone)]
pub struct LiveKitCredentials {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS, environment)
/// - OpenAI settings (API key, base URL, realtime defaults)
/// - LiveKit integration settings
/// - Supabase data store settings
/// - Authentication settings
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Deployment environment name; "production" disables layout resets
    pub environment: String,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // OpenAI settings
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_realtime_model: String,
    pub openai_realtime_voice: String,

    // LiveKit settings
    pub livekit_url: Option<String>,
    pub livekit_api_key: Option<String>,
    pub livekit_api_secret: Option<String>,
    pub livekit_agent_name: String,

    // Data store settings
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub store_backend: StoreBackend,
    pub demo_profile_id: String,

    // Authentication configuration
    pub auth_api_secrets: Vec<AuthApiSecret>,
    pub auth_required: bool,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

/// Zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.livekit_api_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.livekit_api_secret {
            secret.zeroize();
        }
        if let Some(ref mut key) = self.supabase_service_role_key {
            key.zeroize();
        }
        for secret in &mut self.auth_api_secrets {
            secret.secret.zeroize();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: "development".to_string(),
            tls: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            openai_realtime_voice: DEFAULT_VOICE.to_string(),
            livekit_url: None,
            livekit_api_key: None,
            livekit_api_secret: None,
            livekit_agent_name: DEFAULT_AGENT_NAME.to_string(),
            supabase_url: None,
            supabase_service_role_key: None,
            store_backend: StoreBackend::default(),
            demo_profile_id: DEFAULT_DEMO_PROFILE_ID.to_string(),
            auth_api_secrets: Vec::new(),
            auth_required: false,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// The .env file is loaded in main.rs before this is called, so values from
    /// .env are visible here unless overridden by the real environment.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Check if the server runs in the production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Check if API secret authentication is configured
    pub fn has_api_secret_auth(&self) -> bool {
        !self.auth_api_secrets.is_empty()
    }

    /// Get the OpenAI API key
    ///
    /// # Returns
    /// * `Result<String, String>` - The API key on success, or an error message on failure
    pub fn get_openai_api_key(&self) -> Result<String, String> {
        self.openai_api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .cloned()
            .ok_or_else(|| "OPENAI_API_KEY is not configured".to_string())
    }

    /// Get LiveKit credentials (URL, API key, API secret)
    ///
    /// All three are required to mint tokens or call the server API.
    pub fn get_livekit_credentials(&self) -> Result<LiveKitCredentials, String> {
        let url = self
            .livekit_url
            .as_ref()
            .cloned()
            .ok_or_else(|| "LiveKit URL not configured (LIVEKIT_URL)".to_string())?;
        let api_key = self
            .livekit_api_key
            .as_ref()
            .cloned()
            .ok_or_else(|| "LiveKit API key not configured (LIVEKIT_API_KEY)".to_string())?;
        let api_secret = self
            .livekit_api_secret
            .as_ref()
            .cloned()
            .ok_or_else(|| "LiveKit API secret not configured (LIVEKIT_API_SECRET)".to_string())?;
        Ok(LiveKitCredentials {
            url,
            api_key,
            api_secret,
        })
    }

    /// Get Supabase credentials (REST URL, service role key)
    pub fn get_supabase_credentials(&self) -> Result<(String, String), String> {
        let url = self
            .supabase_url
            .as_ref()
            .cloned()
            .ok_or_else(|| "SUPABASE_URL not configured".to_string())?;
        let key = self
            .supabase_service_role_key
            .as_ref()
            .cloned()
            .ok_or_else(|| "SUPABASE_SERVICE_ROLE_KEY not configured".to_string())?;
        Ok((url, key))
    }
}

pub(crate) fn parse_auth_api_secrets_json(
    json_str: &str,
) -> Result<Vec<AuthApiSecret>, Box<dyn std::error::Error>> {
    #[derive(serde::Deserialize)]
    struct AuthApiSecretJson {
        id: String,
        secret: String,
    }

    let secrets: Vec<AuthApiSecretJson> = serde_json::from_str(json_str)
        .map_err(|e| format!("Invalid AUTH_API_SECRETS_JSON format: {e}"))?;

    Ok(secrets
        .into_iter()
        .map(|entry| AuthApiSecret {
            id: entry.id,
            secret: entry.secret,
        })
        .collect())
}
