//! Client-credential sign-in and bearer token caching

use reconcile::ApiError;
use serde::Deserialize;
use serde_json::Value as Json;
use std::time::{Duration, Instant};

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the server does not say.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// A bearer token and the moment it stops being usable.
#[derive(Debug, Clone)]
pub struct Token {
    value: String,
    refresh_at: Instant,
}

impl Token {
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            value: value.into(),
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }

    /// `Authorization` header value
    pub fn header(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Json>,
}

/// Parse the sign-in response body
///
/// `expires_in` is sent as a number by some deployments and as a numeric
/// string by others.
pub fn parse_sign_in(body: &str) -> Result<Token, ApiError> {
    let response: SignInResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("sign-in response: {e}")))?;
    if response.access_token.is_empty() {
        return Err(ApiError::Decode("sign-in response has an empty access_token".into()));
    }

    let seconds = match response.expires_in {
        Some(Json::Number(n)) => n.as_u64(),
        Some(Json::String(s)) => s.parse().ok(),
        _ => None,
    };
    let lifetime = seconds.map_or(DEFAULT_LIFETIME, Duration::from_secs);
    Ok(Token::new(response.access_token, lifetime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sign_in() {
        let token = parse_sign_in(r#"{"token_type":"Bearer","access_token":"abc","expires_in":"3600"}"#)
            .unwrap();
        assert_eq!(token.value(), "abc");
        assert_eq!(token.header(), "Bearer abc");
        assert!(token.is_fresh());
    }

    #[test]
    fn test_parse_sign_in_numeric_expiry() {
        let token = parse_sign_in(r#"{"access_token":"abc","expires_in":7200}"#).unwrap();
        assert!(token.is_fresh());
    }

    #[test]
    fn test_parse_sign_in_rejects_garbage() {
        assert!(matches!(parse_sign_in("<html>"), Err(ApiError::Decode(_))));
        assert!(parse_sign_in(r#"{"access_token":""}"#).is_err());
    }

    #[test]
    fn test_short_lived_token_is_stale() {
        let token = Token::new("abc", Duration::from_secs(30));
        assert!(!token.is_fresh());
    }
}
