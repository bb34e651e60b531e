//! Wire-level knowledge about the streaming peripherals.
//!
//! * [`gatt`]: service and characteristic identifiers.
//! * [`command`]: the command frames written to the peripheral.
//! * [`frame`]: decoding of the notification frames it sends back.

pub mod command;
pub mod frame;
pub mod gatt;

pub use command::{HANDSHAKE, STOP_SENSORS};
pub use frame::{Frame, FrameKind};
