use serde::{Deserialize, Serialize};
use std::fmt;

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Access and refresh credentials issued together by the auth endpoints
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: default_token_type(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type_defaults_to_bearer() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"access_token":"A1","refresh_token":"R1"}"#).unwrap();
        assert_eq!(pair.token_type, "bearer");
    }

    #[test]
    fn test_single_token_response_is_rejected() {
        let result = serde_json::from_str::<TokenPair>(
            r#"{"access_token":"A1","token_type":"bearer","expires_in":3600}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("bearer"));
    }
}
