//! CLI configuration utilities

use anyhow::{Context, Result};
use canteen_core::{ClientConfig, FileStore, TokenStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load client configuration, letting `--data-dir` override the configured one
pub fn load(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(path).with_context(|| match path {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_string(),
    })?;

    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    Ok(config)
}

/// Token store persisted in the data directory, so a login survives between runs
pub fn token_store(config: &ClientConfig) -> TokenStore {
    TokenStore::new(Arc::new(FileStore::new(config.session_file())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteen_core::TokenPair;

    #[test]
    fn test_data_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(None, Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.session_file(), dir.path().join("session.json"));
    }

    #[test]
    fn test_tokens_persist_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(None, Some(dir.path().to_path_buf())).unwrap();

        token_store(&config)
            .save(&TokenPair::new("access", "refresh"))
            .unwrap();

        let reopened = token_store(&config);
        assert_eq!(reopened.access_token().as_deref(), Some("access"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("refresh"));
    }
}
