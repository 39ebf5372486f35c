//! WebSocket task feeding pushed notifications into the shared feed

use super::feed::NotificationFeed;
use super::machine::{ChannelEvent, ConnectionMachine, ConnectionState, Directive, ReconnectPolicy};
use crate::types::Notification;
use canteen_core::TokenStore;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Path of the notification channel relative to the WebSocket base URL
pub const CHANNEL_PATH: &str = "/ws/notifications";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Inbound frame, discriminated by its `type` field
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ServerEvent {
    #[serde(rename = "new_notification")]
    NewNotification(Notification),
    #[serde(other)]
    Unknown,
}

/// Build the channel URL carrying the access token as a query parameter
///
/// # Errors
///
/// Returns an error if `ws_base` is not a valid URL
pub fn channel_url(ws_base: &str, access_token: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{}{CHANNEL_PATH}", ws_base.trim_end_matches('/')))?;
    url.query_pairs_mut().append_pair("token", access_token);
    Ok(url)
}

/// Apply one text frame to the feed. Returns whether the feed changed.
pub(crate) fn apply_frame(feed: &watch::Sender<NotificationFeed>, text: &str) -> bool {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::NewNotification(notification)) => {
            let id = notification.id;
            let added = feed.send_if_modified(|feed| feed.push(notification));
            if added {
                debug!(id, "Notification received");
            } else {
                debug!(id, "Duplicate notification ignored");
            }
            added
        }
        Ok(ServerEvent::Unknown) => {
            debug!("Ignoring unhandled channel event");
            false
        }
        Err(err) => {
            debug!("Ignoring malformed channel frame: {err}");
            false
        }
    }
}

/// State shared between the notification client and its socket task
pub(crate) struct Channel {
    pub ws_base: String,
    pub tokens: TokenStore,
    pub policy: ReconnectPolicy,
    pub feed: Arc<watch::Sender<NotificationFeed>>,
    pub state: Arc<watch::Sender<ConnectionState>>,
}

enum ReadOutcome {
    Closed(Option<u16>),
    Cancelled,
}

impl Channel {
    /// Drive the connection until torn down, rejected or out of retries
    pub async fn run(self, cancel: CancellationToken) {
        let mut machine = ConnectionMachine::new(self.policy);
        let mut directive = machine.handle(ChannelEvent::Connect);
        self.publish(&machine);

        loop {
            directive = match directive {
                Directive::Open => match self.open(&cancel).await {
                    None => break,
                    Some(Err(err)) => {
                        warn!("Notification channel connect failed: {err}");
                        machine.handle(ChannelEvent::Closed { code: None })
                    }
                    Some(Ok(mut socket)) => {
                        machine.handle(ChannelEvent::Opened);
                        self.publish(&machine);
                        info!("Notification channel connected");

                        match self.read(&mut socket, &cancel).await {
                            ReadOutcome::Cancelled => {
                                let _ = socket.close(None).await;
                                break;
                            }
                            ReadOutcome::Closed(code) => {
                                info!(?code, "Notification channel closed");
                                machine.handle(ChannelEvent::Closed { code })
                            }
                        }
                    }
                },
                Directive::ScheduleReconnect { attempt, delay } => {
                    self.publish(&machine);
                    info!(attempt, ?delay, "Reconnecting notification channel");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => machine.handle(ChannelEvent::RetryDue),
                    }
                }
                Directive::Wait | Directive::Stop => break,
            };
            self.publish(&machine);
        }

        machine.handle(ChannelEvent::Teardown);
        self.publish(&machine);
        debug!("Notification channel task finished");
    }

    /// Connect with the current access token. `None` means stop.
    async fn open(
        &self,
        cancel: &CancellationToken,
    ) -> Option<Result<Socket, tokio_tungstenite::tungstenite::Error>> {
        let Some(token) = self.tokens.access_token() else {
            info!("No access token, notification channel not opened");
            return None;
        };

        let url = match channel_url(&self.ws_base, &token) {
            Ok(url) => url,
            Err(err) => {
                warn!("Invalid notification channel URL: {err}");
                return None;
            }
        };

        tokio::select! {
            () = cancel.cancelled() => None,
            result = connect_async(url.as_str()) => Some(result.map(|(socket, _)| socket)),
        }
    }

    async fn read(&self, socket: &mut Socket, cancel: &CancellationToken) -> ReadOutcome {
        loop {
            let message = tokio::select! {
                () = cancel.cancelled() => return ReadOutcome::Cancelled,
                message = socket.next() => message,
            };

            match message {
                Some(Ok(Message::Text(text))) => {
                    apply_frame(&self.feed, text.as_str());
                }
                Some(Ok(Message::Close(frame))) => {
                    return ReadOutcome::Closed(frame.map(|frame| u16::from(frame.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!("Notification channel read error: {err}");
                    return ReadOutcome::Closed(None);
                }
                None => return ReadOutcome::Closed(None),
            }
        }
    }

    fn publish(&self, machine: &ConnectionMachine) {
        let state = machine.state();
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }
}
