//! Canteen core types and utilities

pub mod config;
pub mod error;
pub mod storage;
pub mod types;

pub use config::{ApiConfig, ClientConfig, NotificationConfig};
pub use error::{CoreError, CoreResult};
pub use storage::{FileStore, KeyValueStore, MemoryStore, NullStore, TokenStore};
pub use types::TokenPair;
