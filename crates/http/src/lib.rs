//! Canteen backend client
//!
//! [`CanteenClient`] is the REST side: typed endpoint methods over a
//! session that attaches bearer credentials and recovers from an expired
//! access token with a single shared refresh. [`NotificationClient`] is the
//! push side: a deduplicated local notification list kept current over a
//! reconnecting WebSocket channel.

pub mod client;
pub mod notifications;
pub mod types;

pub use client::error::{ClientError, FALLBACK_ERROR_MESSAGE, extract_error_message};
pub use client::session::SessionManager;
pub use client::{ApiRequest, CanteenClient, CanteenClientBuilder};
pub use notifications::{ConnectionState, NotificationClient, NotificationFeed, ReconnectPolicy};
