//! Bearer API-secret authentication.

use subtle::ConstantTimeEq;

use crate::config::AuthApiSecret;

/// Authentication context inserted into request extensions by the auth middleware.
///
/// Handlers may read it with `Extension<Auth>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auth {
    /// Identifier of the matched API secret, `None` when auth is disabled
    pub id: Option<String>,
}

impl Auth {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    /// Context used when authentication is disabled
    pub fn empty() -> Self {
        Self { id: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }
}

/// Find the id of the API secret matching `token`.
///
/// Every configured secret is compared in constant time, even after a match.
pub fn match_api_secret_id(token: &str, secrets: &[AuthApiSecret]) -> Option<String> {
    let mut matched: Option<&AuthApiSecret> = None;
    for secret in secrets {
        let equal: bool = token.as_bytes().ct_eq(secret.secret.as_bytes()).into();
        if equal && matched.is_none() {
            matched = Some(secret);
        }
    }
    matched.map(|secret| secret.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> Vec<AuthApiSecret> {
        vec![
            AuthApiSecret {
                id: "kiosk".to_string(),
                secret: "kiosk-secret".to_string(),
            },
            AuthApiSecret {
                id: "admin".to_string(),
                secret: "admin-secret".to_string(),
            },
        ]
    }

    #[test]
    fn test_match_api_secret_id() {
        assert_eq!(
            match_api_secret_id("admin-secret", &secrets()),
            Some("admin".to_string())
        );
        assert_eq!(
            match_api_secret_id("kiosk-secret", &secrets()),
            Some("kiosk".to_string())
        );
        assert_eq!(match_api_secret_id("kiosk-secre", &secrets()), None);
        assert_eq!(match_api_secret_id("", &secrets()), None);
        assert_eq!(match_api_secret_id("anything", &[]), None);
    }

    #[test]
    fn test_auth_context() {
        assert!(Auth::new("kiosk").is_authenticated());
        assert!(!Auth::empty().is_authenticated());
    }
}
