//! # Session Orchestrator
//!
//! Runs a whole counting job:
//! 1. **Discovery**: pick exactly `N` target devices or give up before touching any.
//! 2. **Fan-out**: one [`DeviceSession`] task per target plus one [`Reporter`] task,
//!    all sharing a single [`SessionClock`].
//! 3. **Fan-in**: join every task, in creation order, before reading the counters.
//! 4. **Finalize**: one [`DeviceReport`] per device in session creation order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use blecount_common::clock::SessionClock;
use blecount_common::config::RunConfig;
use blecount_common::device::DeviceIdentity;
use blecount_common::error::DiscoveryError;
use blecount_common::progress::ProgressSink;
use blecount_common::transport::Transport;
use blecount_common::{error, info};
use tokio::task::JoinHandle;

use crate::counter::{PacketCounterStore, PacketCounts};
use crate::discovery::DiscoveryService;
use crate::reporter::Reporter;
use crate::session::{DeviceSession, SessionOutcome, SessionTiming};

/// Final numbers for one device.
#[derive(Clone, Debug)]
pub struct DeviceReport {
    pub identity: DeviceIdentity,
    pub counts: PacketCounts,
    pub outcome: SessionOutcome,
}

impl DeviceReport {
    /// A device passes once it streamed anything at all.
    pub fn verdict(&self) -> Verdict {
        if self.counts.total == 0 {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        })
    }
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub devices: Vec<DeviceReport>,
    /// Length of the observation window.
    pub window: Duration,
}

impl RunReport {
    pub fn total_packets(&self) -> u64 {
        self.devices.iter().map(|d| d.counts.total).sum()
    }

    pub fn failed_sessions(&self) -> usize {
        self.devices.iter().filter(|d| !d.outcome.is_success()).count()
    }
}

pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    cfg: RunConfig,
    store: Arc<PacketCounterStore>,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, cfg: RunConfig) -> Self {
        Self {
            transport,
            cfg,
            store: Arc::new(PacketCounterStore::new()),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn store(&self) -> Arc<PacketCounterStore> {
        self.store.clone()
    }

    /// Discovers and selects the run's targets.
    pub async fn discover_targets(&self) -> Result<Vec<DeviceIdentity>, DiscoveryError> {
        DiscoveryService::new(self.transport.clone())
            .discover_targets(&self.cfg)
            .await
    }

    /// Discovery, sessions and final report in one go.
    pub async fn execute(&self, sink: Arc<dyn ProgressSink>) -> Result<RunReport, DiscoveryError> {
        let targets: Vec<DeviceIdentity> = self.discover_targets().await?;
        let outcomes: Vec<SessionOutcome> = self.run(targets, sink).await;
        Ok(self.finalize(outcomes))
    }

    /// Runs one session per target plus the reporter and waits for all of them.
    pub async fn run(
        &self,
        targets: Vec<DeviceIdentity>,
        sink: Arc<dyn ProgressSink>,
    ) -> Vec<SessionOutcome> {
        let clock: SessionClock = SessionClock::start(self.cfg.session_duration);
        let timing = SessionTiming {
            settle_delay: self.cfg.settle_delay,
            poll_interval: self.cfg.poll_interval,
        };
        info!(
            "Starting {} sessions for {}s",
            targets.len(),
            clock.duration().as_secs_f32()
        );

        let mut handles: Vec<(DeviceIdentity, JoinHandle<SessionOutcome>)> = Vec::new();
        for target in targets {
            let counter = self.store.ensure(&target.address);
            let session = DeviceSession::new(
                target.clone(),
                self.transport.clone(),
                counter,
                clock,
                timing,
            );
            handles.push((target, tokio::spawn(session.run())));
        }

        let reporter = Reporter::new(self.store.clone(), sink, clock, self.cfg.report_interval);
        let reporter_handle: JoinHandle<usize> = tokio::spawn(reporter.run());

        let mut outcomes: Vec<SessionOutcome> = Vec::with_capacity(handles.len());
        for (identity, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("Session task for {identity} died: {e}");
                    outcomes.push(SessionOutcome::aborted(identity, e.to_string()));
                }
            }
        }

        if let Err(e) = reporter_handle.await {
            error!("Progress reporter died: {e}");
        }

        outcomes
    }

    /// Pairs the final counter snapshot with each session's outcome.
    pub fn finalize(&self, outcomes: Vec<SessionOutcome>) -> RunReport {
        let mut outcomes: Vec<Option<SessionOutcome>> = outcomes.into_iter().map(Some).collect();

        let devices: Vec<DeviceReport> = self
            .store
            .snapshot()
            .into_iter()
            .filter_map(|(address, counts)| {
                let outcome: SessionOutcome = outcomes
                    .iter_mut()
                    .find(|o| o.as_ref().is_some_and(|o| o.identity.address == address))?
                    .take()?;
                Some(DeviceReport {
                    identity: outcome.identity.clone(),
                    counts,
                    outcome,
                })
            })
            .collect();

        RunReport {
            devices,
            window: self.cfg.session_duration,
        }
    }
}
