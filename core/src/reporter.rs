//! Live progress line for a run.

use std::sync::Arc;
use std::time::Duration;

use blecount_common::clock::SessionClock;
use blecount_common::device::short_address;
use blecount_common::progress::ProgressSink;

use crate::counter::{PacketCounterStore, PacketCounts};

pub const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Renders a progress line every `cadence` until the shared deadline.
///
/// Only ever reads the store. Its last sleep is clamped to the deadline, so it
/// stops at the same instant the sessions see the window close.
pub struct Reporter {
    store: Arc<PacketCounterStore>,
    sink: Arc<dyn ProgressSink>,
    clock: SessionClock,
    cadence: Duration,
}

impl Reporter {
    pub fn new(
        store: Arc<PacketCounterStore>,
        sink: Arc<dyn ProgressSink>,
        clock: SessionClock,
        cadence: Duration,
    ) -> Self {
        Self {
            store,
            sink,
            clock,
            cadence,
        }
    }

    /// Runs until the deadline and returns the number of lines rendered.
    pub async fn run(self) -> usize {
        let mut tick: usize = 0;

        while !self.clock.is_expired() {
            let line: String = render_line(tick, &self.store.snapshot());
            self.sink.render(&line);
            tick += 1;
            self.clock.sleep_tick(self.cadence).await;
        }

        self.sink.newline();
        tick
    }
}

pub fn render_line(tick: usize, snapshot: &[(String, PacketCounts)]) -> String {
    let glyph: &str = SPINNER_FRAMES[tick % SPINNER_FRAMES.len()];
    let stats: String = snapshot
        .iter()
        .map(|(address, counts)| format!("{}={}", short_address(address), counts.total))
        .collect::<Vec<String>>()
        .join(" | ");

    format!("Collecting data... {glyph}  {stats}")
}
