//! The wireless transport capability consumed by the session core.
//!
//! A [`Transport`] finds peripherals and opens [`Connection`]s to them. Concrete
//! radios (or simulations of them) live in `blecount-core`; the core only ever
//! talks to these traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::device::DeviceIdentity;
use crate::error::TransportError;

/// Callback invoked once per notification. Must not block.
pub type NotificationSink = Arc<dyn Fn(&[u8]) + Send + Sync>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Scans for `timeout` and returns every device seen, in the order first seen.
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceIdentity>, TransportError>;

    /// Opens an exclusive connection to `device`.
    async fn connect(&self, device: &DeviceIdentity) -> Result<Box<dyn Connection>, TransportError>;
}

/// An open link to one peripheral. Owned by exactly one session.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn write_command(
        &self,
        channel: Uuid,
        bytes: &[u8],
        require_ack: bool,
    ) -> Result<(), TransportError>;

    /// Registers `sink` for notifications on `channel`.
    ///
    /// Delivery starts before this returns, so nothing sent afterwards is missed.
    async fn subscribe(&self, channel: Uuid, sink: NotificationSink) -> Result<(), TransportError>;

    async fn unsubscribe(&self, channel: Uuid) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;

    async fn is_connected(&self) -> bool;
}
