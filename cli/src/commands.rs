pub mod run;
pub mod scan;

use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use blecount_common::config::{DEFAULT_NAME_FILTER, RunConfig};

#[derive(Parser)]
#[command(name = "blecount")]
#[command(about = "Counts notification packets streamed by a fleet of BLE sensors.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Do not print the banner
    #[arg(long, global = true)]
    pub no_banner: bool,

    /// Print less (-q drops headers, -qq leaves only the totals)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Print debug logs
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to N sensors and count their packets over a fixed window
    #[command(alias = "r")]
    Run(RunArgs),
    /// List advertising devices without connecting
    #[command(alias = "s")]
    Scan(ScanArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ScanArgs {
    /// Substring the advertised name must contain
    #[arg(short = 'f', long = "name", default_value = DEFAULT_NAME_FILTER)]
    pub name_filter: String,

    /// Seconds to scan for
    #[arg(long, value_name = "SECS", default_value_t = 20)]
    pub scan_timeout: u64,

    /// Use N in-process simulated sensors instead of the Bluetooth adapter
    #[arg(long, value_name = "N")]
    pub simulate: Option<usize>,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Number of sensors to connect to (asked for when omitted)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Only accept these addresses (repeatable)
    #[arg(short, long = "address", value_name = "ADDR")]
    pub addresses: Vec<String>,

    /// Length of the observation window, in seconds
    #[arg(short, long, value_name = "SECS", default_value_t = 60)]
    pub duration: u64,

    #[command(flatten)]
    pub scan: ScanArgs,
}

impl RunArgs {
    pub fn to_run_config(&self, device_count: usize) -> RunConfig {
        RunConfig {
            device_count,
            name_filter: self.scan.name_filter.clone(),
            addresses: self.addresses.clone(),
            scan_timeout: Duration::from_secs(self.scan.scan_timeout),
            session_duration: Duration::from_secs(self.duration),
            ..RunConfig::default()
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
