//! Concrete implementations of the [`Transport`] capability.
//!
//! * [`btle`]: the host's Bluetooth adapter through `btleplug`.
//! * [`simulated`]: in-process peripherals speaking the same command protocol.
//!
//! **Architectural Note:**
//! Sessions and the orchestrator only see `Arc<dyn Transport>`. Nothing outside
//! this module names a concrete radio type, so swapping hardware for a simulation
//! (or a scripted fake in tests) never touches the session logic.

use std::sync::Arc;

use blecount_common::transport::Transport;

pub mod btle;
pub mod simulated;

pub use btle::BtleTransport;
pub use simulated::SimulatedTransport;

/// Picks the radio for a run: `simulate` devices in-process, or the host adapter.
pub async fn select(simulate: Option<usize>, name_prefix: &str) -> anyhow::Result<Arc<dyn Transport>> {
    match simulate {
        Some(count) => Ok(Arc::new(SimulatedTransport::new(count, name_prefix))),
        None => Ok(Arc::new(BtleTransport::new().await?)),
    }
}
