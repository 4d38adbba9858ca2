use super::ServerConfig;

/// Validate a fully merged configuration
pub fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_auth_required(config)?;
    validate_rate_limits(config)?;
    validate_urls(config)?;
    Ok(())
}

/// AUTH_REQUIRED without any configured secret would lock out every client
fn validate_auth_required(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.auth_required && !config.has_api_secret_auth() {
        return Err(
            "AUTH_REQUIRED is enabled but no API secrets are configured \
             (set AUTH_API_SECRET or AUTH_API_SECRETS_JSON)"
                .into(),
        );
    }

    for secret in &config.auth_api_secrets {
        if secret.id.trim().is_empty() || secret.secret.is_empty() {
            return Err("API secret entries require a non-empty id and secret".into());
        }
    }
    Ok(())
}

fn validate_rate_limits(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.rate_limit_requests_per_second == 0 {
        return Err("RATE_LIMIT_REQUESTS_PER_SECOND must be greater than 0".into());
    }
    if config.rate_limit_burst_size == 0 {
        return Err("RATE_LIMIT_BURST_SIZE must be greater than 0".into());
    }
    Ok(())
}

fn validate_urls(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    url::Url::parse(&config.openai_base_url)
        .map_err(|e| format!("Invalid OPENAI_BASE_URL {}: {e}", config.openai_base_url))?;

    if let Some(ref supabase_url) = config.supabase_url {
        url::Url::parse(supabase_url)
            .map_err(|e| format!("Invalid SUPABASE_URL {supabase_url}: {e}"))?;
    }
    Ok(())
}
