//! Scripted in-memory transport plus helpers shared by the integration tests.
//!
//! Every primitive is recorded with the paused tokio clock's `Instant`, so tests
//! can assert ordering and spacing without real radios.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use blecount_common::config::RunConfig;
use blecount_common::device::DeviceIdentity;
use blecount_common::error::TransportError;
use blecount_common::progress::ProgressSink;
use blecount_common::transport::{Connection, NotificationSink, Transport};
use blecount_protocols::command::{self, OP_START};
use blecount_protocols::frame::{self, FrameKind};
use tokio::time::Instant;
use uuid::Uuid;

pub const FRAME_SPACING: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Connect(String),
    Subscribe(String),
    Write {
        address: String,
        bytes: Vec<u8>,
        at: Instant,
    },
    Unsubscribe(String),
    Disconnect(String),
}

/// What one fake peripheral does once connected.
#[derive(Clone, Debug)]
pub struct FakeDevice {
    pub identity: DeviceIdentity,
    /// Frames emitted after the start command, `FRAME_SPACING` apart.
    pub frames: usize,
    pub fail_connect: bool,
    /// How long `connect` takes to complete.
    pub connect_delay: Duration,
    /// 1-based index of the write that is refused.
    pub fail_write: Option<usize>,
    /// Link drops this long after the start command.
    pub drop_after: Option<Duration>,
}

impl FakeDevice {
    pub fn new(address: &str, name: &str) -> Self {
        Self {
            identity: DeviceIdentity::new(address, Some(name.to_string())),
            frames: 0,
            fail_connect: false,
            connect_delay: Duration::ZERO,
            fail_write: None,
            drop_after: None,
        }
    }

    pub fn frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn fail_write(mut self, step: usize) -> Self {
        self.fail_write = Some(step);
        self
    }

    pub fn drop_after(mut self, after: Duration) -> Self {
        self.drop_after = Some(after);
        self
    }
}

type EventLog = Arc<Mutex<Vec<Event>>>;

fn push(log: &EventLog, event: Event) {
    log.lock().unwrap_or_else(PoisonError::into_inner).push(event);
}

pub struct FakeTransport {
    devices: Vec<FakeDevice>,
    log: EventLog,
}

impl FakeTransport {
    pub fn new(devices: Vec<FakeDevice>) -> Arc<Self> {
        Arc::new(Self {
            devices,
            log: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Addresses in the order `connect` was called.
    pub fn connects(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Connect(address) => Some(address),
                _ => None,
            })
            .collect()
    }

    /// Position of the first event equal to `event`.
    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Position of the first write `address` sent with `bytes`.
    pub fn write_position(&self, address: &str, bytes: &[u8]) -> Option<usize> {
        self.events().iter().position(|e| {
            matches!(e, Event::Write { address: a, bytes: b, .. } if a == address && b.as_slice() == bytes)
        })
    }

    pub fn writes(&self, address: &str) -> Vec<(Vec<u8>, Instant)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write { address: a, bytes, at } if a == address => Some((bytes, at)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceIdentity>, TransportError> {
        tokio::time::sleep(timeout.min(Duration::from_millis(50))).await;
        Ok(self.devices.iter().map(|d| d.identity.clone()).collect())
    }

    async fn connect(&self, device: &DeviceIdentity) -> Result<Box<dyn Connection>, TransportError> {
        push(&self.log, Event::Connect(device.address.clone()));

        let script: FakeDevice = self
            .devices
            .iter()
            .find(|d| d.identity.address == device.address)
            .cloned()
            .ok_or_else(|| TransportError::UnknownDevice(device.address.clone()))?;

        if !script.connect_delay.is_zero() {
            tokio::time::sleep(script.connect_delay).await;
        }
        if script.fail_connect {
            return Err(TransportError::ConnectFailed {
                address: device.address.clone(),
                reason: "refused by script".into(),
            });
        }

        Ok(Box::new(FakeConnection {
            script,
            log: self.log.clone(),
            sink: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(true)),
            writes: AtomicUsize::new(0),
            lost_at: Mutex::new(None),
        }))
    }
}

struct FakeConnection {
    script: FakeDevice,
    log: EventLog,
    sink: Arc<Mutex<Option<NotificationSink>>>,
    connected: Arc<AtomicBool>,
    writes: AtomicUsize,
    lost_at: Mutex<Option<Instant>>,
}

impl FakeConnection {
    fn address(&self) -> String {
        self.script.identity.address.clone()
    }

    fn start_streaming(&self) {
        let lost_at: Option<Instant> = self.script.drop_after.map(|after| Instant::now() + after);
        *self.lost_at.lock().unwrap_or_else(PoisonError::into_inner) = lost_at;

        let sink = self.sink.clone();
        let connected = self.connected.clone();
        let frames: usize = self.script.frames;
        tokio::spawn(async move {
            for n in 0..frames {
                tokio::time::sleep(FRAME_SPACING).await;
                let lost: bool = lost_at.is_some_and(|at| Instant::now() >= at);
                if lost || !connected.load(Ordering::SeqCst) {
                    return;
                }
                let kind: FrameKind = if n % 2 == 0 { FrameKind::Accel } else { FrameKind::Gyro };
                let bytes: Vec<u8> = frame::encode(kind, [n as i16, 0, -1]);
                let current: Option<NotificationSink> =
                    sink.lock().unwrap_or_else(PoisonError::into_inner).clone();
                if let Some(sink) = current {
                    sink(&bytes);
                }
            }
        });
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn write_command(
        &self,
        _channel: Uuid,
        bytes: &[u8],
        _require_ack: bool,
    ) -> Result<(), TransportError> {
        push(
            &self.log,
            Event::Write {
                address: self.address(),
                bytes: bytes.to_vec(),
                at: Instant::now(),
            },
        );

        let idx: usize = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.script.fail_write == Some(idx) {
            return Err(TransportError::WriteFailed("refused by script".into()));
        }

        if command::opcode(bytes) == Some(OP_START) {
            self.start_streaming();
        }
        Ok(())
    }

    async fn subscribe(&self, _channel: Uuid, sink: NotificationSink) -> Result<(), TransportError> {
        push(&self.log, Event::Subscribe(self.address()));
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        Ok(())
    }

    async fn unsubscribe(&self, _channel: Uuid) -> Result<(), TransportError> {
        push(&self.log, Event::Unsubscribe(self.address()));
        self.sink.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        push(&self.log, Event::Disconnect(self.address()));
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let lost: bool = self
            .lost_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|at| Instant::now() >= at);
        if lost {
            self.connected.store(false, Ordering::SeqCst);
        }
        self.connected.load(Ordering::SeqCst)
    }
}

/// Progress sink that keeps every rendered line.
#[derive(Default)]
pub struct RecordingSink {
    pub lines: Mutex<Vec<(Instant, String)>>,
    pub newlines: AtomicUsize,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<(Instant, String)> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ProgressSink for RecordingSink {
    fn render(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Instant::now(), line.to_string()));
    }

    fn newline(&self) {
        self.newlines.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn run_config(device_count: usize, window: Duration) -> RunConfig {
    RunConfig {
        device_count,
        scan_timeout: Duration::from_secs(1),
        session_duration: window,
        ..RunConfig::default()
    }
}
