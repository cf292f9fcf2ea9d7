//! Data sources feeding panels and the events they report back

pub mod fetcher;
pub mod poller;
pub mod reconnect;
pub mod socket;

use std::fmt;

use thiserror::Error;

use crate::panel::PanelId;

pub use fetcher::{HttpClient, ReqwestClient};
pub use reconnect::ReconnectPolicy;
pub use socket::{Incoming, SocketConnector, SocketStream, TungsteniteConnector};

/// Connection state of a panel. Only the panel manager changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Reconnecting { remaining: u32 },
}

impl ConnectionState {
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Numeric value exported as a metric
    pub fn as_gauge(&self) -> f64 {
        match self {
            Self::Disconnected => 0.0,
            Self::Connected => 1.0,
            Self::Reconnecting { .. } => 2.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting { remaining } => {
                write!(f, "reconnecting ({remaining} attempt(s) left)")
            }
        }
    }
}

/// Errors raised by data sources. They never reach callers: a failed poll is
/// reported as an event and a failed socket as a close.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error with status code: {0}")]
    HttpError(u16),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Socket error: {0}")]
    SocketError(String),
}

/// Something a transport task observed
#[derive(Debug)]
pub enum EventKind {
    /// A poll response body or socket message
    Payload(String),
    PollFailed(TransportError),
    /// A socket finished opening (after sending its greeting)
    Opened,
    Closed { code: u16 },
    RetryTick,
}

/// Event sent from a transport task to the panel manager.
///
/// `generation` identifies the task that produced it. Events whose generation
/// no longer matches a live task of the panel are dropped.
#[derive(Debug)]
pub struct TransportEvent {
    pub panel: PanelId,
    pub generation: u64,
    pub kind: EventKind,
}

impl TransportEvent {
    pub fn new(panel: PanelId, generation: u64, kind: EventKind) -> Self {
        Self {
            panel,
            generation,
            kind,
        }
    }
}
