//! Notification frame decoding.
//!
//! Sensor samples arrive as `55 AA <opcode> 06 <x:i16be> <y:i16be> <z:i16be>`,
//! where the opcode tells accelerometer (`0x08`) from gyroscope (`0x0A`) data.
//! Anything else is still a notification, it just is not a sample.

use thiserror::Error;

use crate::command::{HDR_LEN, OP_ACCEL, OP_GYRO, SYNC};

pub const SAMPLE_LEN: u8 = 0x06;
pub const MIN_FRAME_LEN: usize = HDR_LEN + SAMPLE_LEN as usize;

/// Accelerometer full scale, in g.
const ACCEL_SCALE: f32 = 16.0 / 32768.0;
/// Gyroscope scale, in deg/s per LSB.
const GYRO_SCALE: f32 = 500.0 / 28571.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("missing 55 AA sync header")]
    BadSync,
    #[error("unexpected payload length {0:#04x}")]
    BadLength(u8),
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Accel,
    Gyro,
    Other,
}

/// A decoded sample frame with its raw axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub raw: [i16; 3],
}

impl Frame {
    /// Axes converted to physical units: g for accel, deg/s for gyro.
    pub fn scaled(&self) -> [f32; 3] {
        let scale: f32 = match self.kind {
            FrameKind::Accel => ACCEL_SCALE,
            FrameKind::Gyro => GYRO_SCALE,
            FrameKind::Other => 1.0,
        };
        self.raw.map(|axis| f32::from(axis) * scale)
    }
}

pub fn parse(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort(bytes.len()));
    }
    if bytes[..2] != SYNC {
        return Err(FrameError::BadSync);
    }
    if bytes[3] != SAMPLE_LEN {
        return Err(FrameError::BadLength(bytes[3]));
    }

    let kind: FrameKind = match bytes[2] {
        OP_ACCEL => FrameKind::Accel,
        OP_GYRO => FrameKind::Gyro,
        op => return Err(FrameError::UnknownOpcode(op)),
    };

    let p: &[u8] = &bytes[HDR_LEN..];
    let raw: [i16; 3] = [
        i16::from_be_bytes([p[0], p[1]]),
        i16::from_be_bytes([p[2], p[3]]),
        i16::from_be_bytes([p[4], p[5]]),
    ];

    Ok(Frame { kind, raw })
}

/// Encodes a sample frame. Used by the simulated peripherals.
pub fn encode(kind: FrameKind, raw: [i16; 3]) -> Vec<u8> {
    let opcode: u8 = match kind {
        FrameKind::Accel => OP_ACCEL,
        FrameKind::Gyro => OP_GYRO,
        FrameKind::Other => 0x00,
    };
    let mut buf: Vec<u8> = Vec::with_capacity(MIN_FRAME_LEN);
    buf.extend_from_slice(&SYNC);
    buf.push(opcode);
    buf.push(SAMPLE_LEN);
    for axis in raw {
        buf.extend_from_slice(&axis.to_be_bytes());
    }
    buf
}
