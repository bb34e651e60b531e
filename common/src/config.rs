use std::time::Duration;

use anyhow::ensure;

pub const DEFAULT_NAME_FILTER: &str = "GMSync";

/// Presentation settings shared by every command.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Skips the banner printed at startup.
    pub no_banner: bool,
    /// 0 prints everything, 1 drops headers and trees, 2 prints only the final totals.
    pub quiet: u8,
}

/// Everything a single counting run needs.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub device_count: usize,
    /// Substring the advertised name must contain.
    pub name_filter: String,
    /// Optional allow-list; compared case-insensitively. Empty accepts any address.
    pub addresses: Vec<String>,
    pub scan_timeout: Duration,
    pub session_duration: Duration,
    /// Pause after each handshake write.
    pub settle_delay: Duration,
    /// Granularity of the sessions' deadline check.
    pub poll_interval: Duration,
    /// Cadence of the progress line.
    pub report_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            device_count: 1,
            name_filter: DEFAULT_NAME_FILTER.to_string(),
            addresses: Vec::new(),
            scan_timeout: Duration::from_secs(20),
            session_duration: Duration::from_secs(60),
            settle_delay: Duration::from_millis(200),
            poll_interval: Duration::from_millis(100),
            report_interval: Duration::from_secs(1),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.device_count > 0, "device count must be at least 1");
        ensure!(!self.scan_timeout.is_zero(), "scan timeout must be positive");
        ensure!(!self.session_duration.is_zero(), "session duration must be positive");
        ensure!(!self.poll_interval.is_zero(), "poll interval must be positive");
        ensure!(!self.report_interval.is_zero(), "report interval must be positive");
        Ok(())
    }
}
