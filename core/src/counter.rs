//! # Packet Counter Store
//!
//! Per-device notification counters shared between the sessions (writers) and the
//! reporter (reader).
//!
//! Each session gets an `Arc<PacketCounter>` from [`PacketCounterStore::ensure`] and
//! its notification callback bumps that counter directly, so the hot path is a few
//! relaxed atomic adds and never touches the map lock. The lock only guards
//! insertion and iteration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use blecount_protocols::frame::{self, Frame};
use blecount_protocols::FrameKind;

/// Gravity magnitudes are accumulated in micro-g so they fit an atomic integer.
const MICRO_G: f64 = 1_000_000.0;

/// Point-in-time values of one device's counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketCounts {
    pub total: u64,
    pub accel: u64,
    pub gyro: u64,
    pub other: u64,
    /// Accel samples that went into the gravity mean. All-zero samples are skipped.
    pub gravity_samples: u64,
    pub gravity_sum_ug: u64,
}

impl PacketCounts {
    /// Mean acceleration magnitude in g, `None` without usable accel samples.
    pub fn mean_gravity(&self) -> Option<f64> {
        if self.gravity_samples == 0 {
            return None;
        }
        Some(self.gravity_sum_ug as f64 / MICRO_G / self.gravity_samples as f64)
    }
}

#[derive(Debug, Default)]
pub struct PacketCounter {
    total: AtomicU64,
    accel: AtomicU64,
    gyro: AtomicU64,
    other: AtomicU64,
    gravity_samples: AtomicU64,
    gravity_sum_ug: AtomicU64,
}

impl PacketCounter {
    /// Counts one notification of the given kind.
    pub fn record(&self, kind: FrameKind) {
        let bucket: &AtomicU64 = match kind {
            FrameKind::Accel => &self.accel,
            FrameKind::Gyro => &self.gyro,
            FrameKind::Other => &self.other,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a raw notification and feeds accel samples into the gravity mean.
    pub fn record_notification(&self, bytes: &[u8]) {
        match frame::parse(bytes) {
            Ok(frame) => {
                self.record(frame.kind);
                if frame.kind == FrameKind::Accel {
                    self.record_gravity(&frame);
                }
            }
            Err(_) => self.record(FrameKind::Other),
        }
    }

    fn record_gravity(&self, frame: &Frame) {
        if frame.raw == [0, 0, 0] {
            return;
        }
        let [x, y, z] = frame.scaled().map(f64::from);
        let magnitude: f64 = (x * x + y * y + z * z).sqrt();
        self.gravity_sum_ug
            .fetch_add((magnitude * MICRO_G).round() as u64, Ordering::Relaxed);
        self.gravity_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn load(&self) -> PacketCounts {
        PacketCounts {
            total: self.total.load(Ordering::Relaxed),
            accel: self.accel.load(Ordering::Relaxed),
            gyro: self.gyro.load(Ordering::Relaxed),
            other: self.other.load(Ordering::Relaxed),
            gravity_samples: self.gravity_samples.load(Ordering::Relaxed),
            gravity_sum_ug: self.gravity_sum_ug.load(Ordering::Relaxed),
        }
    }
}

/// Insertion-ordered map from device address to its [`PacketCounter`].
#[derive(Debug, Default)]
pub struct PacketCounterStore {
    entries: RwLock<Vec<(String, Arc<PacketCounter>)>>,
}

impl PacketCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counter for `key`, creating a zeroed one if absent.
    pub fn ensure(&self, key: &str) -> Arc<PacketCounter> {
        if let Some(counter) = self.get(key) {
            return counter;
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Re-check: another task may have inserted between the two locks.
        if let Some((_, counter)) = entries.iter().find(|(k, _)| k == key) {
            return counter.clone();
        }
        let counter: Arc<PacketCounter> = Arc::new(PacketCounter::default());
        entries.push((key.to_string(), counter.clone()));
        counter
    }

    /// Adds one notification to `key`. Returns `false` if the key was never ensured.
    pub fn increment(&self, key: &str, kind: FrameKind) -> bool {
        match self.get(key) {
            Some(counter) => {
                counter.record(kind);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<PacketCounter>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().find(|(k, _)| k == key).map(|(_, c)| c.clone())
    }

    /// Current counts for every key, in insertion order.
    pub fn snapshot(&self) -> Vec<(String, PacketCounts)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .map(|(key, counter)| (key.clone(), counter.load()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
