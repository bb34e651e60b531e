use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use blecount_common::clock::SessionClock;
use blecount_core::Orchestrator;
use blecount_core::counter::PacketCounterStore;
use blecount_core::reporter::Reporter;
use blecount_protocols::FrameKind;
use tokio::time::Instant;

use crate::support::{FakeDevice, FakeTransport, RecordingSink, run_config};

#[tokio::test(start_paused = true)]
async fn reporter_stops_within_one_tick_of_the_deadline() {
    let store = Arc::new(PacketCounterStore::new());
    store.ensure("C6:22:D5:9E:0C:53");
    let sink = Arc::new(RecordingSink::default());
    let clock = SessionClock::start(Duration::from_millis(2500));

    let rendered: usize = Reporter::new(store, sink.clone(), clock, Duration::from_secs(1))
        .run()
        .await;
    let ended: Instant = Instant::now();

    assert_eq!(rendered, 3);
    assert!(ended >= clock.deadline(), "reporter ended before the window closed");
    assert!(ended - clock.deadline() < Duration::from_secs(1));
    assert_eq!(sink.newlines.load(Ordering::SeqCst), 1);

    let lines = sink.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|(_, line)| line.ends_with("0C:53=0")));
}

#[tokio::test(start_paused = true)]
async fn progress_lines_follow_the_live_counters() {
    let store = Arc::new(PacketCounterStore::new());
    let sink = Arc::new(RecordingSink::default());
    let clock = SessionClock::start(Duration::from_secs(3));

    let reporter = tokio::spawn(
        Reporter::new(store.clone(), sink.clone(), clock, Duration::from_secs(1)).run(),
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    store.ensure("AA:00:00:00:00:01");
    for _ in 0..4 {
        assert!(store.increment("AA:00:00:00:00:01", FrameKind::Accel));
    }

    reporter.await.unwrap();
    let lines: Vec<String> = sink.lines().into_iter().map(|(_, line)| line).collect();
    assert_eq!(
        lines,
        [
            "Collecting data... |  ",
            "Collecting data... /  ",
            "Collecting data... -  00:01=4",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn orchestrated_run_reports_until_the_window_closes() {
    let transport = FakeTransport::new(vec![FakeDevice::new("AA:00:00:00:00:01", "GMSync-1").frames(20)]);
    let orchestrator = Orchestrator::new(transport, run_config(1, Duration::from_secs(4)));
    let sink = Arc::new(RecordingSink::default());

    let targets = orchestrator.discover_targets().await.unwrap();
    let started: Instant = Instant::now();
    let outcomes = orchestrator.run(targets, sink.clone()).await;
    let finished: Instant = Instant::now();

    assert_eq!(outcomes.len(), 1);
    assert!(finished - started >= Duration::from_secs(4));

    let lines = sink.lines();
    assert_eq!(lines.len(), 4);
    let (_, last) = lines.last().unwrap();
    assert!(last.ends_with("00:01=20"), "last line was {last}");
    assert_eq!(sink.newlines.load(Ordering::SeqCst), 1);

    let report = orchestrator.finalize(outcomes);
    assert_eq!(report.total_packets(), 20);
    assert_eq!(report.window, Duration::from_secs(4));
}
