use std::env;
use std::path::PathBuf;

use super::{
    AuthApiSecret, DEFAULT_AGENT_NAME, DEFAULT_DEMO_PROFILE_ID, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_REALTIME_MODEL, DEFAULT_VOICE, ServerConfig, StoreBackend, TlsConfig,
    parse_auth_api_secrets_json,
};

/// Read a variable, treating empty values as unset
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid boolean for {name}: {value}").into()),
    }
}

fn parse_u32(name: &str, value: &str) -> Result<u32, Box<dyn std::error::Error>> {
    value
        .parse::<u32>()
        .map_err(|e| format!("Invalid value for {name}: {value} ({e})").into())
}

/// Build a configuration from environment variables, falling back to defaults
pub fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let port = match var("PORT") {
        Some(port) => port
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT value {port}: {e}"))?,
        None => 3001,
    };

    let tls = match (var("TLS_CERT_PATH"), var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => {
            return Err(
                "Both TLS_CERT_PATH and TLS_KEY_PATH must be set to enable TLS".into(),
            );
        }
    };

    let mut auth_api_secrets = match var("AUTH_API_SECRETS_JSON") {
        Some(json) => parse_auth_api_secrets_json(&json)?,
        None => Vec::new(),
    };
    if auth_api_secrets.is_empty() {
        if let Some(secret) = var("AUTH_API_SECRET") {
            auth_api_secrets.push(AuthApiSecret {
                id: var("AUTH_API_SECRET_ID").unwrap_or_else(|| "default".to_string()),
                secret,
            });
        }
    }

    let auth_required = match var("AUTH_REQUIRED") {
        Some(value) => parse_bool("AUTH_REQUIRED", &value)?,
        None => false,
    };

    let rate_limit_requests_per_second = match var("RATE_LIMIT_REQUESTS_PER_SECOND") {
        Some(value) => parse_u32("RATE_LIMIT_REQUESTS_PER_SECOND", &value)?,
        None => 60,
    };
    let rate_limit_burst_size = match var("RATE_LIMIT_BURST_SIZE") {
        Some(value) => parse_u32("RATE_LIMIT_BURST_SIZE", &value)?,
        None => 10,
    };

    Ok(ServerConfig {
        host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        port,
        environment: var("APP_ENV").unwrap_or_else(|| "development".to_string()),
        tls,
        openai_api_key: var("OPENAI_API_KEY"),
        openai_base_url: var("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        openai_realtime_model: var("OPENAI_REALTIME_MODEL")
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        openai_realtime_voice: var("OPENAI_REALTIME_VOICE")
            .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        livekit_url: var("LIVEKIT_URL"),
        livekit_api_key: var("LIVEKIT_API_KEY"),
        livekit_api_secret: var("LIVEKIT_API_SECRET"),
        livekit_agent_name: var("LIVEKIT_AGENT_NAME")
            .unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()),
        supabase_url: var("SUPABASE_URL"),
        supabase_service_role_key: var("SUPABASE_SERVICE_ROLE_KEY"),
        store_backend: var("STORE_BACKEND")
            .map(|value| StoreBackend::from_str_or_default(&value))
            .unwrap_or_default(),
        demo_profile_id: var("DEMO_PROFILE_ID")
            .unwrap_or_else(|| DEFAULT_DEMO_PROFILE_ID.to_string()),
        auth_api_secrets,
        auth_required,
        cors_allowed_origins: var("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second,
        rate_limit_burst_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32("X", "42").unwrap(), 42);
        assert!(parse_u32("X", "-1").is_err());
    }
}
