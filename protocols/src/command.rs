//! Command frames understood by the sensor firmware.
//!
//! Every frame is `55 AA <opcode> <len> <payload..>`. The firmware expects the
//! [`HANDSHAKE`] sequence verbatim and in order before it starts streaming.

pub const SYNC: [u8; 2] = [0x55, 0xAA];
pub const HDR_LEN: usize = 4;

pub const OP_STOP: u8 = 0xF0;
pub const OP_MODE: u8 = 0x11;
pub const OP_GYRO: u8 = 0x0A;
pub const OP_ACCEL: u8 = 0x08;
pub const OP_START: u8 = 0x06;

/// Resets the sensor pipeline. Also sent on teardown.
pub const STOP_SENSORS: &[u8] = &[0x55, 0xAA, OP_STOP, 0x00];

/// Enable sequence, sent in this exact order.
pub const HANDSHAKE: [&[u8]; 5] = [
    STOP_SENSORS,
    &[0x55, 0xAA, OP_MODE, 0x02, 0x00, 0x02],
    &[0x55, 0xAA, OP_GYRO, 0x00],
    &[0x55, 0xAA, OP_ACCEL, 0x00],
    &[0x55, 0xAA, OP_START, 0x00],
];

/// Returns the opcode of a command frame, or `None` if `bytes` is not one.
pub fn opcode(bytes: &[u8]) -> Option<u8> {
    if bytes.len() < HDR_LEN || bytes[..2] != SYNC {
        return None;
    }
    Some(bytes[2])
}
