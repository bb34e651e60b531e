use std::time::Duration;

use colored::*;

use crate::commands::ScanArgs;
use crate::{mprint, terminal::{colors, print}};
use blecount_common::config::{Config, RunConfig};
use blecount_common::device::DeviceIdentity;
use blecount_core::discovery::{self, DiscoveryService};
use blecount_core::transport;

/// Lists every advertising device and whether a run would pick it up.
pub async fn scan(args: ScanArgs, cfg: &Config) -> anyhow::Result<()> {
    let transport = transport::select(args.simulate, &args.name_filter).await?;
    let run_cfg = RunConfig {
        name_filter: args.name_filter.clone(),
        scan_timeout: Duration::from_secs(args.scan_timeout),
        ..RunConfig::default()
    };

    let devices: Vec<DeviceIdentity> = DiscoveryService::new(transport)
        .perform_discovery(run_cfg.scan_timeout)
        .await?;

    if devices.is_empty() {
        print::section("zero devices detected", cfg);
        print::failure("No advertising devices were heard.");
        return Ok(());
    }

    print::section("devices in range", cfg);
    let mut matching: usize = 0;
    for (idx, device) in devices.iter().enumerate() {
        let is_match: bool = discovery::is_candidate(device, &run_cfg);
        if is_match {
            matching += 1;
        } else if cfg.quiet > 1 {
            continue;
        }

        let marker: ColoredString = if is_match { "match".green().bold() } else { "-".dimmed() };
        print::device_row(
            idx,
            device.display_name(),
            format!("{}  {marker}", device.address.color(colors::ADDRESS)),
        );
    }

    mprint!();
    print::summary(&format!(
        "{} devices heard, {} matching '{}'",
        devices.len(),
        matching.to_string().green().bold(),
        run_cfg.name_filter
    ));
    Ok(())
}
