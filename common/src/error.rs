//! Error taxonomy of a run.
//!
//! - [`TransportError`]: what an adapter reports for a failed primitive.
//! - [`SessionError`]: why one device's session ended early. Never leaves that session's outcome.
//! - [`DiscoveryError`]: the only failure that stops a run before any session starts.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("bluetooth adapter error: {0}")]
    Adapter(String),

    #[error("device {0} was not seen during discovery")]
    UnknownDevice(String),

    #[error("connection to {address} failed: {reason}")]
    ConnectFailed { address: String, reason: String },

    #[error("characteristic {0} not found")]
    ChannelNotFound(Uuid),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("subscription failed: {0}")]
    SubscribeFailed(String),

    #[error("device is not connected")]
    NotConnected,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] TransportError),

    #[error("notify subscription failed: {0}")]
    SubscribeFailed(#[source] TransportError),

    #[error("handshake command {step} failed: {source}")]
    WriteFailed {
        step: usize,
        #[source]
        source: TransportError,
    },

    #[error("observation window closed while connecting")]
    DeadlineDuringConnect,

    #[error("observation window closed after {sent} of 5 handshake commands")]
    DeadlineDuringHandshake { sent: usize },

    #[error("device disconnected while streaming")]
    StreamDisconnect,

    #[error("session task aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("only {found} of {requested} requested devices were found")]
    InsufficientDevices { requested: usize, found: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DiscoveryError {
    /// Missing devices for an [`DiscoveryError::InsufficientDevices`] failure.
    pub fn shortfall(&self) -> Option<usize> {
        match self {
            Self::InsufficientDevices { requested, found } => Some(requested.saturating_sub(*found)),
            Self::Transport(_) => None,
        }
    }
}
