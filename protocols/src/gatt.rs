use uuid::Uuid;

/// Characteristic the sensor streams its frames on.
pub const NOTIFY_UUID: Uuid = Uuid::from_u128(0x0000b3a1_0000_1000_8000_00805f9b34fb);

/// Characteristic accepting command frames.
pub const WRITE_UUID: Uuid = Uuid::from_u128(0x0000b3a2_0000_1000_8000_00805f9b34fb);
