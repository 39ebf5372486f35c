//! Notification delivery
//!
//! [`NotificationClient`] keeps a local copy of the signed-in user's
//! notifications. It seeds the copy over REST, keeps it current from the
//! push channel, and applies read markers only after the backend confirms
//! them. Consumers observe the copy through a `watch` receiver.
//!
//! Failures on this side never reach the caller as errors: they are logged
//! and the local state stays as it was.

pub mod channel;
pub mod feed;
pub mod machine;

use crate::client::CanteenClient;
use crate::types::Notification;
use canteen_core::ClientConfig;
use channel::Channel;
pub use feed::NotificationFeed;
pub use machine::{AUTH_FAILURE_CLOSE_CODE, ConnectionState, ReconnectPolicy};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Local notification state plus the push channel that maintains it
pub struct NotificationClient {
    api: CanteenClient,
    ws_base: String,
    policy: ReconnectPolicy,
    feed: Arc<watch::Sender<NotificationFeed>>,
    state: Arc<watch::Sender<ConnectionState>>,
    worker: Mutex<Option<Worker>>,
}

impl NotificationClient {
    pub fn new(api: CanteenClient, ws_base: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            api,
            ws_base: ws_base.into().trim_end_matches('/').to_string(),
            policy,
            feed: Arc::new(watch::Sender::new(NotificationFeed::new())),
            state: Arc::new(watch::Sender::new(ConnectionState::Disconnected)),
            worker: Mutex::new(None),
        }
    }

    /// Build from configuration, deriving the WebSocket base from the API URL if needed
    ///
    /// # Errors
    ///
    /// Returns an error if no WebSocket URL can be derived
    pub fn from_config(
        api: CanteenClient,
        config: &ClientConfig,
    ) -> Result<Self, canteen_core::CoreError> {
        let ws_base = config.websocket_base_url()?;
        Ok(Self::new(
            api,
            ws_base,
            ReconnectPolicy::from(&config.notifications),
        ))
    }

    /// Observe the feed
    pub fn subscribe(&self) -> watch::Receiver<NotificationFeed> {
        self.feed.subscribe()
    }

    pub fn snapshot(&self) -> NotificationFeed {
        self.feed.borrow().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.feed.borrow().to_vec()
    }

    pub fn unread_count(&self) -> u64 {
        self.feed.borrow().unread_count()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe connection state changes
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Whether the socket task is still alive
    pub fn is_running(&self) -> bool {
        self.worker()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// (Re)start delivery for the current authentication state.
    ///
    /// Unauthenticated: tear down and empty the local state. Authenticated:
    /// load the current list and unread count, then open the push channel.
    pub async fn start(&self, is_authenticated: bool) {
        self.stop().await;

        if !is_authenticated {
            if self.feed.send_if_modified(NotificationFeed::clear) {
                debug!("Cleared notifications for signed-out session");
            }
            return;
        }

        self.refetch().await;

        let cancel = CancellationToken::new();
        let channel = Channel {
            ws_base: self.ws_base.clone(),
            tokens: self.api.session().tokens().clone(),
            policy: self.policy,
            feed: Arc::clone(&self.feed),
            state: Arc::clone(&self.state),
        };
        let handle = tokio::spawn(channel.run(cancel.clone()));
        if let Some(previous) = self.worker().replace(Worker { cancel, handle }) {
            previous.cancel.cancel();
        }
    }

    /// Reload the list and unread count. Both are applied together or not at all.
    pub async fn refetch(&self) {
        let (list, count) = tokio::join!(
            self.api.list_notifications(),
            self.api.unread_notification_count()
        );

        match (list, count) {
            (Ok(items), Ok(unread)) => {
                info!(count = items.len(), unread, "Notifications loaded");
                self.feed.send_modify(|feed| feed.reset(items, unread));
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!("Failed to load notifications: {}", err.message());
            }
        }
    }

    /// Mark one notification read. Local state changes only after the backend confirms.
    pub async fn mark_as_read(&self, id: i64) -> bool {
        match self.api.mark_notification_read(id).await {
            Ok(confirmed) => {
                self.feed
                    .send_if_modified(|feed| feed.mark_read(id, Some(confirmed)));
                true
            }
            Err(err) => {
                warn!(id, "Failed to mark notification read: {}", err.message());
                false
            }
        }
    }

    /// Mark everything read. Local state changes only after the backend confirms.
    pub async fn mark_all_as_read(&self) -> bool {
        match self.api.mark_all_notifications_read().await {
            Ok(()) => {
                self.feed.send_if_modified(NotificationFeed::mark_all_read);
                true
            }
            Err(err) => {
                warn!("Failed to mark all notifications read: {}", err.message());
                false
            }
        }
    }

    /// Close the channel and cancel any pending reconnect
    pub async fn stop(&self) {
        let worker = self.worker().take();
        if let Some(Worker { cancel, handle }) = worker {
            cancel.cancel();
            if let Err(err) = handle.await {
                warn!("Notification channel task ended abnormally: {err}");
            }
        }
        self.state.send_if_modified(|state| {
            let changed = *state != ConnectionState::Disconnected;
            *state = ConnectionState::Disconnected;
            changed
        });
    }

    fn worker(&self) -> std::sync::MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NotificationClient {
    fn drop(&mut self) {
        if let Some(worker) = self.worker().as_ref() {
            worker.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for NotificationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationClient")
            .field("ws_base", &self.ws_base)
            .field("policy", &self.policy)
            .field("state", &self.connection_state())
            .field("unread", &self.unread_count())
            .finish_non_exhaustive()
    }
}
