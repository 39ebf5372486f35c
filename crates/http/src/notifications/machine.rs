//! Connection lifecycle of the notification channel
//!
//! The machine is pure: it consumes [`ChannelEvent`]s and answers with a
//! [`Directive`] for the socket task. Keeping it free of I/O lets the retry
//! bound and the authorization abort be tested on their own.

use std::time::Duration;

/// Close code the server uses to reject the channel's credentials
pub const AUTH_FAILURE_CLOSE_CODE: u16 = 4003;

/// Retry behaviour after the channel drops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            max_attempts: 10,
        }
    }
}

impl From<&canteen_core::NotificationConfig> for ReconnectPolicy {
    fn from(config: &canteen_core::NotificationConfig) -> Self {
        Self {
            delay: config.reconnect_delay(),
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Caller asked for a connection
    Connect,
    /// Handshake completed
    Opened,
    /// Socket closed or the connection attempt failed
    Closed { code: Option<u16> },
    /// Reconnect delay elapsed
    RetryDue,
    /// Caller tore the channel down
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Open a socket now
    Open,
    /// Sleep, then report [`ChannelEvent::RetryDue`]
    ScheduleReconnect { attempt: u32, delay: Duration },
    /// Nothing to do until the next event
    Wait,
    /// Stop for good
    Stop,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    attempts: u32,
    policy: ReconnectPolicy,
}

impl ConnectionMachine {
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
        }
    }

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive reconnect attempts since the last successful open
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn handle(&mut self, event: ChannelEvent) -> Directive {
        match event {
            ChannelEvent::Connect => {
                self.attempts = 0;
                self.state = ConnectionState::Connecting;
                Directive::Open
            }
            ChannelEvent::Opened => {
                if self.state == ConnectionState::Disconnected {
                    return Directive::Stop;
                }
                self.attempts = 0;
                self.state = ConnectionState::Connected;
                Directive::Wait
            }
            ChannelEvent::Closed { code } => self.on_closed(code),
            ChannelEvent::RetryDue => match self.state {
                ConnectionState::Reconnecting { .. } => {
                    self.state = ConnectionState::Connecting;
                    Directive::Open
                }
                ConnectionState::Disconnected => Directive::Stop,
                ConnectionState::Connecting | ConnectionState::Connected => Directive::Wait,
            },
            ChannelEvent::Teardown => {
                self.state = ConnectionState::Disconnected;
                Directive::Stop
            }
        }
    }

    fn on_closed(&mut self, code: Option<u16>) -> Directive {
        if self.state == ConnectionState::Disconnected {
            return Directive::Stop;
        }

        if code == Some(AUTH_FAILURE_CLOSE_CODE) {
            self.state = ConnectionState::Disconnected;
            return Directive::Stop;
        }

        if self.attempts >= self.policy.max_attempts {
            self.state = ConnectionState::Disconnected;
            return Directive::Stop;
        }

        self.attempts += 1;
        self.state = ConnectionState::Reconnecting {
            attempt: self.attempts,
        };
        Directive::ScheduleReconnect {
            attempt: self.attempts,
            delay: self.policy.delay,
        }
    }
}
