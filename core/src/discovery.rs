//! # Device Discovery Service
//!
//! Implements the "find my devices" use case.
//!
//! The raw scan is delegated to the [`Transport`]; this module owns the domain
//! rules that turn a scan into the set of devices a run will talk to.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use blecount_common::config::RunConfig;
use blecount_common::device::DeviceIdentity;
use blecount_common::error::{DiscoveryError, TransportError};
use blecount_common::transport::Transport;
use tracing::{debug, info};

/// Application service for device discovery.
pub struct DiscoveryService {
    transport: Arc<dyn Transport>,
}

impl DiscoveryService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Scans for `timeout` and returns every device seen, first sighting first.
    pub async fn perform_discovery(
        &self,
        timeout: Duration,
    ) -> Result<Vec<DeviceIdentity>, TransportError> {
        info!("Scanning for devices ({}s)...", timeout.as_secs_f32());
        let found: Vec<DeviceIdentity> = self.transport.discover(timeout).await?;
        debug!(count = found.len(), "scan finished");
        Ok(found)
    }

    /// Scans and narrows the result down to the run's targets.
    pub async fn discover_targets(
        &self,
        cfg: &RunConfig,
    ) -> Result<Vec<DeviceIdentity>, DiscoveryError> {
        let found: Vec<DeviceIdentity> = self.perform_discovery(cfg.scan_timeout).await?;
        select_targets(&found, cfg)
    }
}

/// `true` if `device` passes the name filter and, when set, the address allow-list.
pub fn is_candidate(device: &DeviceIdentity, cfg: &RunConfig) -> bool {
    if !device.name_contains(&cfg.name_filter) {
        return false;
    }
    cfg.addresses.is_empty() || cfg.addresses.iter().any(|addr| device.has_address(addr))
}

/// Picks the first `cfg.device_count` candidates in discovery order.
///
/// Repeated addresses keep their first sighting only. Fewer candidates than
/// requested is an error; a partial target set is never returned.
pub fn select_targets(
    found: &[DeviceIdentity],
    cfg: &RunConfig,
) -> Result<Vec<DeviceIdentity>, DiscoveryError> {
    let mut seen: HashSet<String> = HashSet::new();

    let targets: Vec<DeviceIdentity> = found
        .iter()
        .filter(|device| is_candidate(device, cfg))
        .filter(|device| seen.insert(device.address.to_ascii_lowercase()))
        .take(cfg.device_count)
        .cloned()
        .collect();

    if targets.len() < cfg.device_count {
        return Err(DiscoveryError::InsufficientDevices {
            requested: cfg.device_count,
            found: targets.len(),
        });
    }

    Ok(targets)
}
