//! In-process peripherals for running without hardware.
//!
//! Each simulated device honours the real command set: streaming begins when the
//! start command arrives and ends on the stop command. Frames alternate between
//! accelerometer and gyroscope samples at a jittered rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::task::JoinHandle;
use uuid::Uuid;

use blecount_common::device::DeviceIdentity;
use blecount_common::error::TransportError;
use blecount_common::transport::{Connection, NotificationSink, Transport};
use blecount_protocols::command::{self, OP_START, OP_STOP};
use blecount_protocols::frame::{self, FrameKind};
use blecount_protocols::gatt::{NOTIFY_UUID, WRITE_UUID};

const SCAN_TIME: Duration = Duration::from_millis(800);
const CONNECT_LATENCY: Duration = Duration::from_millis(150);
const WRITE_LATENCY: Duration = Duration::from_millis(15);
const DEFAULT_RATE_HZ: u64 = 100;

#[derive(Clone, Debug)]
pub struct SimulatedDevice {
    pub identity: DeviceIdentity,
    pub rate_hz: u64,
    /// Refuses every connection attempt.
    pub unreachable: bool,
}

pub struct SimulatedTransport {
    devices: Vec<SimulatedDevice>,
}

impl SimulatedTransport {
    /// `count` healthy devices named `<prefix>-SIM-<n>`.
    pub fn new(count: usize, name_prefix: &str) -> Self {
        let devices: Vec<SimulatedDevice> = (0..count)
            .map(|idx| SimulatedDevice {
                identity: DeviceIdentity::new(
                    format!("5A:1D:00:00:{:02X}:{:02X}", idx / 256, idx % 256),
                    Some(format!("{name_prefix}-SIM-{}", idx + 1)),
                ),
                rate_hz: DEFAULT_RATE_HZ,
                unreachable: false,
            })
            .collect();
        Self { devices }
    }

    pub fn with_devices(devices: Vec<SimulatedDevice>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[SimulatedDevice] {
        &self.devices
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceIdentity>, TransportError> {
        tokio::time::sleep(timeout.min(SCAN_TIME)).await;
        Ok(self.devices.iter().map(|d| d.identity.clone()).collect())
    }

    async fn connect(&self, device: &DeviceIdentity) -> Result<Box<dyn Connection>, TransportError> {
        let sim: &SimulatedDevice = self
            .devices
            .iter()
            .find(|d| d.identity.address == device.address)
            .ok_or_else(|| TransportError::UnknownDevice(device.address.clone()))?;

        tokio::time::sleep(CONNECT_LATENCY).await;
        if sim.unreachable {
            return Err(TransportError::ConnectFailed {
                address: device.address.clone(),
                reason: "device did not answer".into(),
            });
        }

        Ok(Box::new(SimulatedConnection::new(sim.rate_hz)))
    }
}

#[derive(Default)]
struct LinkState {
    sink: Option<NotificationSink>,
    emitter: Option<JoinHandle<()>>,
}

pub struct SimulatedConnection {
    connected: AtomicBool,
    interval: Duration,
    state: Mutex<LinkState>,
}

impl SimulatedConnection {
    fn new(rate_hz: u64) -> Self {
        Self {
            connected: AtomicBool::new(true),
            interval: Duration::from_micros(1_000_000 / rate_hz.max(1)),
            state: Mutex::new(LinkState::default()),
        }
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn start_streaming(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.emitter.is_some() {
            return;
        }
        if let Some(sink) = state.sink.clone() {
            state.emitter = Some(tokio::spawn(emit_frames(sink, self.interval)));
        }
    }

    fn stop_streaming(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(emitter) = state.emitter.take() {
            emitter.abort();
        }
    }
}

async fn emit_frames(sink: NotificationSink, interval: Duration) {
    let mut kind: FrameKind = FrameKind::Accel;
    loop {
        let (jitter_us, raw): (u64, [i16; 3]) = {
            let mut rng = rand::rng();
            let max_jitter: u64 = (interval.as_micros() as u64 / 5).max(1);
            let raw = match kind {
                FrameKind::Accel => [
                    rng.random_range(-200..=200),
                    rng.random_range(-200..=200),
                    2048 + rng.random_range(-100..=100),
                ],
                _ => [
                    rng.random_range(-30..=30),
                    rng.random_range(-30..=30),
                    rng.random_range(-30..=30),
                ],
            };
            (rng.random_range(0..max_jitter), raw)
        };

        tokio::time::sleep(interval + Duration::from_micros(jitter_us)).await;
        sink(&frame::encode(kind, raw));

        kind = match kind {
            FrameKind::Accel => FrameKind::Gyro,
            _ => FrameKind::Accel,
        };
    }
}

#[async_trait]
impl Connection for SimulatedConnection {
    async fn write_command(
        &self,
        channel: Uuid,
        bytes: &[u8],
        _require_ack: bool,
    ) -> Result<(), TransportError> {
        self.ensure_connected()?;
        if channel != WRITE_UUID {
            return Err(TransportError::ChannelNotFound(channel));
        }

        tokio::time::sleep(WRITE_LATENCY).await;
        match command::opcode(bytes) {
            Some(OP_START) => self.start_streaming(),
            Some(OP_STOP) => self.stop_streaming(),
            Some(_) => {}
            None => return Err(TransportError::WriteFailed("malformed command frame".into())),
        }
        Ok(())
    }

    async fn subscribe(&self, channel: Uuid, sink: NotificationSink) -> Result<(), TransportError> {
        self.ensure_connected()?;
        if channel != NOTIFY_UUID {
            return Err(TransportError::ChannelNotFound(channel));
        }
        self.state.lock().unwrap_or_else(PoisonError::into_inner).sink = Some(sink);
        Ok(())
    }

    async fn unsubscribe(&self, channel: Uuid) -> Result<(), TransportError> {
        if channel != NOTIFY_UUID {
            return Err(TransportError::ChannelNotFound(channel));
        }
        self.stop_streaming();
        self.state.lock().unwrap_or_else(PoisonError::into_inner).sink = None;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.stop_streaming();
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for SimulatedConnection {
    fn drop(&mut self) {
        self.stop_streaming();
    }
}
