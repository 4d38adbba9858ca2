use std::path::PathBuf;

use super::env::load_from_env;
use super::yaml::YamlConfig;
use super::{AuthApiSecret, ServerConfig, StoreBackend, TlsConfig};

/// Merge an optional YAML configuration over the environment configuration
///
/// Every value present in YAML replaces the environment value; absent YAML
/// values leave the environment (or default) value untouched.
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml_config else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(environment) = server.environment {
            config.environment = environment;
        }
        if let Some(tls) = server.tls {
            if tls.enabled == Some(false) {
                config.tls = None;
            } else {
                match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) => {}
                    _ => {
                        return Err(
                            "TLS requires both server.tls.cert_path and server.tls.key_path"
                                .into(),
                        );
                    }
                }
            }
        }
    }

    if let Some(openai) = yaml.openai {
        if openai.api_key.is_some() {
            config.openai_api_key = openai.api_key;
        }
        if let Some(base_url) = openai.base_url {
            config.openai_base_url = base_url;
        }
        if let Some(model) = openai.realtime_model {
            config.openai_realtime_model = model;
        }
        if let Some(voice) = openai.realtime_voice {
            config.openai_realtime_voice = voice;
        }
    }

    if let Some(livekit) = yaml.livekit {
        if livekit.url.is_some() {
            config.livekit_url = livekit.url;
        }
        if livekit.api_key.is_some() {
            config.livekit_api_key = livekit.api_key;
        }
        if livekit.api_secret.is_some() {
            config.livekit_api_secret = livekit.api_secret;
        }
        if let Some(agent_name) = livekit.agent_name {
            config.livekit_agent_name = agent_name;
        }
    }

    if let Some(supabase) = yaml.supabase {
        if supabase.url.is_some() {
            config.supabase_url = supabase.url;
        }
        if supabase.service_role_key.is_some() {
            config.supabase_service_role_key = supabase.service_role_key;
        }
    }

    if let Some(store) = yaml.store {
        if let Some(backend) = store.backend {
            config.store_backend = StoreBackend::from_str_or_default(&backend);
        }
        if let Some(profile_id) = store.demo_profile_id {
            config.demo_profile_id = profile_id;
        }
    }

    if let Some(auth) = yaml.auth {
        if let Some(required) = auth.required {
            config.auth_required = required;
        }
        if !auth.api_secrets.is_empty() {
            config.auth_api_secrets = auth
                .api_secrets
                .into_iter()
                .map(|entry| AuthApiSecret {
                    id: entry.id,
                    secret: entry.secret,
                })
                .collect();
        } else if let Some(secret) = auth.api_secret {
            config.auth_api_secrets = vec![AuthApiSecret {
                id: "default".to_string(),
                secret,
            }];
        }
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
    }

    Ok(config)
}
