//! # Device Session
//!
//! Drives one peripheral through `connect → subscribe → handshake → stream → teardown`.
//!
//! Notifications never pass through the session loop: the callback registered at
//! subscription bumps the device's [`PacketCounter`] directly. The loop itself only
//! sleeps and watches the shared deadline.
//!
//! Every failure stays inside this session and ends up in its [`SessionOutcome`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use blecount_common::clock::SessionClock;
use blecount_common::device::DeviceIdentity;
use blecount_common::error::SessionError;
use blecount_common::transport::{Connection, NotificationSink, Transport};
use blecount_common::{success, warn};
use blecount_protocols::gatt::{NOTIFY_UUID, WRITE_UUID};
use blecount_protocols::{HANDSHAKE, STOP_SENSORS};
use tracing::debug;

use crate::counter::PacketCounter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Idle,
    Connecting,
    HandshakeInFlight,
    Streaming,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::HandshakeInFlight => "handshake",
            Self::Streaming => "streaming",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Pacing of a session's suspension points.
#[derive(Clone, Copy, Debug)]
pub struct SessionTiming {
    pub settle_delay: Duration,
    pub poll_interval: Duration,
}

/// How a session ended.
#[derive(Clone, Debug)]
pub struct SessionOutcome {
    pub identity: DeviceIdentity,
    /// Furthest state reached before closing.
    pub reached: SessionState,
    pub result: Result<(), SessionError>,
}

impl SessionOutcome {
    /// Outcome for a session whose task died before reporting back.
    pub fn aborted(identity: DeviceIdentity, reason: impl Into<String>) -> Self {
        Self {
            identity,
            reached: SessionState::Idle,
            result: Err(SessionError::Aborted(reason.into())),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct DeviceSession {
    identity: DeviceIdentity,
    transport: Arc<dyn Transport>,
    counter: Arc<PacketCounter>,
    clock: SessionClock,
    timing: SessionTiming,
    state: SessionState,
    reached: SessionState,
    subscribed: bool,
}

impl DeviceSession {
    pub fn new(
        identity: DeviceIdentity,
        transport: Arc<dyn Transport>,
        counter: Arc<PacketCounter>,
        clock: SessionClock,
        timing: SessionTiming,
    ) -> Self {
        Self {
            identity,
            transport,
            counter,
            clock,
            timing,
            state: SessionState::Idle,
            reached: SessionState::Idle,
            subscribed: false,
        }
    }

    /// Runs the session to completion. Never fails; errors land in the outcome.
    ///
    /// A connect in flight when the window closes is allowed to finish; the link is
    /// then released straight away.
    pub async fn run(mut self) -> SessionOutcome {
        self.transition(SessionState::Connecting);

        let conn: Box<dyn Connection> = match self.transport.connect(&self.identity).await {
            Ok(conn) => conn,
            Err(e) => return self.close(Err(SessionError::ConnectFailed(e))),
        };

        if self.clock.is_expired() {
            debug!(address = %self.identity.address, "connected after the window closed");
            self.teardown(conn.as_ref()).await;
            return self.close(Err(SessionError::DeadlineDuringConnect));
        }
        success!("Connected → {}", self.identity);

        let result: Result<(), SessionError> = self.drive(conn.as_ref()).await;
        self.teardown(conn.as_ref()).await;
        self.close(result)
    }

    async fn drive(&mut self, conn: &dyn Connection) -> Result<(), SessionError> {
        let counter: Arc<PacketCounter> = self.counter.clone();
        let sink: NotificationSink = Arc::new(move |bytes: &[u8]| {
            counter.record_notification(bytes);
        });

        conn.subscribe(NOTIFY_UUID, sink)
            .await
            .map_err(SessionError::SubscribeFailed)?;
        self.subscribed = true;

        self.transition(SessionState::HandshakeInFlight);
        self.handshake(conn).await?;

        self.transition(SessionState::Streaming);
        self.stream(conn).await
    }

    /// Sends [`HANDSHAKE`] in order, pausing after each acknowledged write.
    ///
    /// No new command starts once the deadline has passed; an in-flight write is
    /// always allowed to finish.
    async fn handshake(&mut self, conn: &dyn Connection) -> Result<(), SessionError> {
        for (idx, command) in HANDSHAKE.iter().enumerate() {
            if self.clock.is_expired() {
                return Err(SessionError::DeadlineDuringHandshake { sent: idx });
            }

            conn.write_command(WRITE_UUID, command, true)
                .await
                .map_err(|source| SessionError::WriteFailed {
                    step: idx + 1,
                    source,
                })?;
            debug!(address = %self.identity.address, step = idx + 1, "handshake command sent");

            tokio::time::sleep(self.timing.settle_delay).await;
        }
        Ok(())
    }

    async fn stream(&mut self, conn: &dyn Connection) -> Result<(), SessionError> {
        loop {
            if self.clock.is_expired() {
                return Ok(());
            }
            self.clock.sleep_tick(self.timing.poll_interval).await;

            if !conn.is_connected().await {
                return Err(SessionError::StreamDisconnect);
            }
        }
    }

    /// Best-effort release of the link. Nothing here can fail the session.
    async fn teardown(&mut self, conn: &dyn Connection) {
        let streamed: bool = self.state == SessionState::Streaming;
        self.transition(SessionState::Closing);

        if streamed && conn.is_connected().await {
            if let Err(e) = conn.write_command(WRITE_UUID, STOP_SENSORS, true).await {
                debug!(address = %self.identity.address, "stop command failed: {e}");
            }
        }

        if self.subscribed {
            if let Err(e) = conn.unsubscribe(NOTIFY_UUID).await {
                debug!(address = %self.identity.address, "unsubscribe failed: {e}");
            }
        }

        if let Err(e) = conn.disconnect().await {
            debug!(address = %self.identity.address, "disconnect failed: {e}");
        }
    }

    fn close(mut self, result: Result<(), SessionError>) -> SessionOutcome {
        self.transition(SessionState::Closed);

        match &result {
            Ok(()) => success!(
                "[{}] session finished with {} packets",
                self.identity.address,
                self.counter.total()
            ),
            Err(e) => warn!("[{}] session ended early: {e}", self.identity.address),
        }

        SessionOutcome {
            identity: self.identity,
            reached: self.reached,
            result,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            address = %self.identity.address,
            from = %self.state,
            to = %next,
            "session state"
        );
        self.state = next;
        if next < SessionState::Closing {
            self.reached = self.reached.max(next);
        }
    }
}
