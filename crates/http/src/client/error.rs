//! Client error types

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Message used when nothing readable can be extracted from a failure
pub const FALLBACK_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Message attached to errors caused by an unrecoverable session
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again.";

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The session could not be recovered by refreshing it
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Token storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] canteen_core::CoreError),

    /// Notification channel error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Create error from a status and the raw response body
    pub fn from_response_body(status: reqwest::StatusCode, body: &str) -> Self {
        Self::from_status(status, extract_error_message(parse_body(body).as_ref()))
    }

    /// Create error from a failed response, consuming its body.
    ///
    /// A body that cannot be read is treated as empty, so the message falls
    /// back to the status-based default.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                debug!(status = status.as_u16(), "Error response body unreadable: {err}");
                String::new()
            }
        };
        Self::from_response_body(status, &body)
    }

    /// HTTP status associated with this error
    pub fn status(&self) -> u16 {
        match self {
            Self::ServerError { status, .. } => *status,
            Self::AuthenticationFailed(_) | Self::SessionExpired(_) => 401,
            Self::NotFound(_) => 404,
            Self::BadRequest(_) => 400,
            Self::Forbidden(_) => 403,
            Self::Request(err) => err.status().map_or(500, |s| s.as_u16()),
            Self::Serialization(_)
            | Self::Configuration(_)
            | Self::Storage(_)
            | Self::WebSocket(_) => 500,
        }
    }

    /// Human-readable message without the variant prefix
    pub fn message(&self) -> String {
        match self {
            Self::ServerError { message, .. }
            | Self::AuthenticationFailed(message)
            | Self::SessionExpired(message)
            | Self::NotFound(message)
            | Self::BadRequest(message)
            | Self::Forbidden(message) => message.clone(),
            Self::Configuration(message) => message.clone(),
            Self::Request(_) | Self::WebSocket(_) => FALLBACK_ERROR_MESSAGE.to_string(),
            Self::Serialization(err) => err.to_string(),
            Self::Storage(err) => err.to_string(),
        }
    }

    /// Whether the caller has to sign in again
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_) | Self::AuthenticationFailed(_))
    }
}

fn parse_body(body: &str) -> Option<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())))
}

/// Reduce an arbitrary error payload to one readable message.
///
/// Preference order: a plain string payload, an explicit `message`, then
/// the usable strings inside `detail`. Anything else yields
/// [`FALLBACK_ERROR_MESSAGE`]. Never returns an empty string.
pub fn extract_error_message(payload: Option<&Value>) -> String {
    payload
        .and_then(message_from_payload)
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

fn message_from_payload(payload: &Value) -> Option<String> {
    match payload {
        Value::String(s) => non_empty(s),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .and_then(non_empty)
            .or_else(|| map.get("detail").and_then(message_from_detail)),
        _ => None,
    }
}

fn message_from_detail(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) => non_empty(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(detail_entry).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(_) => detail_entry(detail),
        _ => None,
    }
}

fn detail_entry(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => non_empty(s),
        Value::Object(map) => ["msg", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str).and_then(non_empty)),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_array_is_joined() {
        let payload = json!({"detail": [{"msg": "bad"}, {"msg": "worse"}]});
        assert_eq!(extract_error_message(Some(&payload)), "bad, worse");
    }

    #[test]
    fn test_message_wins_over_detail() {
        let payload = json!({"message": "X", "detail": "ignored"});
        assert_eq!(extract_error_message(Some(&payload)), "X");
    }

    #[test]
    fn test_missing_payload_falls_back() {
        assert_eq!(extract_error_message(None), FALLBACK_ERROR_MESSAGE);
        assert_eq!(extract_error_message(Some(&Value::Null)), FALLBACK_ERROR_MESSAGE);
    }

    #[test]
    fn test_detail_shapes() {
        assert_eq!(extract_error_message(Some(&json!({"detail": "Not found"}))), "Not found");
        assert_eq!(
            extract_error_message(Some(&json!({"detail": {"msg": "nested"}}))),
            "nested"
        );
        assert_eq!(
            extract_error_message(Some(&json!({"detail": ["plain", {"loc": []}, {"message": "m"}]}))),
            "plain, m"
        );
    }

    #[test]
    fn test_unusable_payloads_fall_back() {
        for payload in [
            json!(""),
            json!("   "),
            json!(42),
            json!({"message": ""}),
            json!({"code": "E1"}),
            json!({"detail": []}),
            json!({"detail": [{"loc": ["body"]}]}),
            json!({"message": 5, "detail": null}),
        ] {
            let message = extract_error_message(Some(&payload));
            assert_eq!(message, FALLBACK_ERROR_MESSAGE, "payload {payload}");
        }
    }

    #[test]
    fn test_from_response_body() {
        let status = reqwest::StatusCode::UNPROCESSABLE_ENTITY;
        let err = ClientError::from_response_body(status, r#"{"detail":[{"msg":"email invalid"}]}"#);
        assert_eq!(err.status(), 422);
        assert_eq!(err.message(), "email invalid");

        let err = ClientError::from_response_body(reqwest::StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.status(), 502);
        assert_eq!(err.message(), FALLBACK_ERROR_MESSAGE);

        let err = ClientError::from_response_body(reqwest::StatusCode::NOT_FOUND, "no such dish");
        assert_eq!(err.message(), "no such dish");
    }
}
