use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use tracing::{Instrument, info_span};

use crate::commands::RunArgs;
use crate::{mprint, terminal::{colors, format, print, prompt, spinner}};
use blecount_common::config::{Config, RunConfig};
use blecount_common::device::DeviceIdentity;
use blecount_common::error::DiscoveryError;
use blecount_common::progress::ProgressSink;
use blecount_common::{info, success};
use blecount_core::session::SessionOutcome;
use blecount_core::{Orchestrator, RunReport, Verdict, transport};

pub async fn run(args: RunArgs, cfg: &Config) -> anyhow::Result<()> {
    let device_count: usize = match args.count {
        Some(count) => count,
        None => prompt::ask_device_count()?,
    };
    let run_cfg: RunConfig = args.to_run_config(device_count);
    run_cfg.validate()?;
    print_settings(&run_cfg, args.scan.simulate, cfg);

    let transport = transport::select(args.scan.simulate, &run_cfg.name_filter).await?;
    let orchestrator = Orchestrator::new(transport, run_cfg);

    let start_time: Instant = Instant::now();
    let targets: Vec<DeviceIdentity> = match orchestrator.discover_targets().await {
        Ok(targets) => targets,
        Err(e @ DiscoveryError::InsufficientDevices { .. }) => {
            not_enough_devices(&e, cfg);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for (idx, target) in targets.iter().enumerate() {
        success!("Target {} → {target}", idx + 1);
    }

    let span = info_span!("collecting", indicatif.pb_show = true);
    let sink: Arc<dyn ProgressSink> = spinner::progress_sink(&span, cfg);

    let outcomes: Vec<SessionOutcome> = orchestrator
        .run(targets, sink)
        .instrument(span)
        .await;
    let report: RunReport = orchestrator.finalize(outcomes);

    run_ends(&report, start_time.elapsed(), cfg);
    Ok(())
}

fn print_settings(run_cfg: &RunConfig, simulate: Option<usize>, cfg: &Config) {
    if cfg.quiet > 0 {
        return;
    }

    print::section("run settings", cfg);
    print::setting("Devices", run_cfg.device_count);
    print::setting("Name filter", &run_cfg.name_filter);
    if !run_cfg.addresses.is_empty() {
        print::setting("Addresses", run_cfg.addresses.join(", "));
    }
    print::setting("Window", format!("{}s", run_cfg.session_duration.as_secs()));
    match simulate {
        Some(n) => print::setting("Transport", format!("simulated ({n} devices)")),
        None => print::setting("Transport", "bluetooth adapter"),
    }
    mprint!();
}

fn not_enough_devices(err: &DiscoveryError, cfg: &Config) {
    print::section("not enough devices", cfg);
    print::failure(&format!(
        "{err} ({} short). Nothing was started.",
        err.shortfall().unwrap_or(0)
    ));
}

fn run_ends(report: &RunReport, total_time: Duration, cfg: &Config) {
    if cfg.quiet < 2 {
        mprint!();
    }
    print::section("final packet counts", cfg);

    for (idx, device) in report.devices.iter().enumerate() {
        match cfg.quiet {
            0 => {
                print::device_row(idx, device.identity.display_name(), format::total_line(device));
                print::details(&format::report_to_details(device));
            }
            _ => {
                mprint!(&format::total_line(device));
            }
        }
    }

    print_summary(report, total_time, cfg);
}

fn print_summary(report: &RunReport, total_time: Duration, cfg: &Config) {
    if cfg.quiet > 1 {
        return;
    }

    let passed: usize = report
        .devices
        .iter()
        .filter(|d| d.verdict() == Verdict::Pass)
        .count();
    let packets: ColoredString = format!("{} packets", report.total_packets()).bold().green();
    let devices: ColoredString = format!("{passed}/{} passed", report.devices.len()).bold();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: String = format!("Run complete: {packets}, {devices}, {total_time}")
        .color(colors::TEXT_DEFAULT)
        .to_string();

    match cfg.quiet {
        0 => {
            print::rule();
            print::summary(&output);
            print::rule();
        }
        _ => success!("{}", output),
    }

    let failed: usize = report.failed_sessions();
    if failed > 0 {
        info!("{failed} session(s) ended early; their counts cover the time they were streaming");
    }
}
