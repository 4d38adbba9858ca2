use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in the
/// YAML file take precedence over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   environment: "development"
///
/// openai:
///   api_key: "sk-..."
///   base_url: "https://api.openai.com"
///   realtime_model: "gpt-4o-realtime-preview"
///   realtime_voice: "alloy"
///
/// livekit:
///   url: "wss://demo.livekit.cloud"
///   api_key: "your-api-key"
///   api_secret: "your-api-secret"
///   agent_name: "ubereats-food-concierge"
///
/// supabase:
///   url: "https://project.supabase.co"
///   service_role_key: "service-role-key"
///
/// store:
///   backend: "postgrest"
///   demo_profile_id: "00000000-0000-0000-0000-000000000001"
///
/// auth:
///   required: true
///   api_secrets:
///     - id: "kiosk"
///       secret: "your-api-secret"
///
/// security:
///   cors_allowed_origins: "https://concierge.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub livekit: Option<LiveKitYaml>,
    pub supabase: Option<SupabaseYaml>,
    pub store: Option<StoreYaml>,
    pub auth: Option<AuthYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub environment: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// OpenAI configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub realtime_model: Option<String>,
    pub realtime_voice: Option<String>,
}

/// LiveKit configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LiveKitYaml {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub agent_name: Option<String>,
}

/// Supabase configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SupabaseYaml {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
}

/// Data store configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreYaml {
    /// "postgrest" or "memory"
    pub backend: Option<String>,
    pub demo_profile_id: Option<String>,
}

/// Authentication configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthYaml {
    pub required: Option<bool>,
    /// Single secret, registered under the id "default"
    pub api_secret: Option<String>,
    pub api_secrets: Vec<AuthApiSecretYaml>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthApiSecretYaml {
    pub id: String,
    pub secret: String,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains invalid YAML
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
