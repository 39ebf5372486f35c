//! Client configuration

use crate::{CoreError, CoreResult};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Name of the token file inside the data directory
pub const SESSION_FILE_NAME: &str = "session.json";

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Notification channel configuration
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Directory for persisted session state and logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL
    pub base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Explicit WebSocket base URL; derived from the API base URL when absent
    pub ws_url: Option<String>,

    /// Delay between reconnect attempts in milliseconds
    pub reconnect_delay_ms: u64,

    /// Reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("canteen")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            notifications: NotificationConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            user_agent: concat!("canteen-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            reconnect_delay_ms: 3_000,
            max_reconnect_attempts: 10,
        }
    }
}

impl ApiConfig {
    /// Request timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl NotificationConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and `CANTEEN__*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value cannot be parsed
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("CANTEEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the URLs are usable
    ///
    /// # Errors
    ///
    /// Returns an error if a URL does not parse
    pub fn validate(&self) -> CoreResult<()> {
        Url::parse(&self.api.base_url).map_err(|e| {
            CoreError::invalid_config(format!("api.base_url '{}': {e}", self.api.base_url))
        })?;
        if let Some(ws_url) = &self.notifications.ws_url {
            Url::parse(ws_url)
                .map_err(|e| CoreError::invalid_config(format!("notifications.ws_url '{ws_url}': {e}")))?;
        }
        Ok(())
    }

    /// WebSocket base URL, derived from the API base when not configured
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s)
    pub fn websocket_base_url(&self) -> CoreResult<String> {
        if let Some(ws_url) = &self.notifications.ws_url {
            return Ok(ws_url.trim_end_matches('/').to_string());
        }
        websocket_url_from_http(&self.api.base_url)
    }

    /// Path of the persisted token file
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE_NAME)
    }
}

/// Swap `http`/`https` for `ws`/`wss`
///
/// # Errors
///
/// Returns an error for any other scheme
pub fn websocket_url_from_http(base_url: &str) -> CoreResult<String> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if let Some(rest) = base.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else {
        Err(CoreError::invalid_config(format!(
            "cannot derive a websocket URL from '{base_url}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.notifications.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.notifications.max_reconnect_attempts, 10);
        assert!(config.session_file().ends_with("session.json"));
    }

    #[test]
    fn test_websocket_url_derivation() {
        assert_eq!(
            websocket_url_from_http("http://localhost:8000/").unwrap(),
            "ws://localhost:8000"
        );
        assert_eq!(
            websocket_url_from_http("https://canteen.example").unwrap(),
            "wss://canteen.example"
        );
        assert!(websocket_url_from_http("ftp://nope").is_err());
    }

    #[test]
    fn test_explicit_ws_url_wins() {
        let mut config = ClientConfig::default();
        config.notifications.ws_url = Some("wss://push.example/".to_string());
        assert_eq!(config.websocket_base_url().unwrap(), "wss://push.example");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canteen.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://canteen.example"
timeout_secs = 0
user_agent = "test"

[notifications]
reconnect_delay_ms = 250
max_reconnect_attempts = 2
"#,
        )
        .unwrap();

        let config = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api.base_url, "https://canteen.example");
        assert_eq!(config.api.timeout(), None);
        assert_eq!(config.notifications.max_reconnect_attempts, 2);
        assert_eq!(config.websocket_base_url().unwrap(), "wss://canteen.example");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let mut config = ClientConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfig { .. })
        ));
    }
}
