use std::sync::Arc;
use std::time::Duration;

use blecount_common::error::SessionError;
use blecount_core::session::SessionState;
use blecount_core::{DeviceReport, Orchestrator, RunReport, Verdict};
use blecount_protocols::{HANDSHAKE, STOP_SENSORS};

use crate::support::{Event, FakeDevice, FakeTransport, RecordingSink, run_config};

const A: &str = "C6:22:D5:9E:0C:53";
const B: &str = "D8:6C:8A:A8:38:DE";

async fn run(devices: Vec<FakeDevice>, window: Duration) -> (Arc<FakeTransport>, RunReport) {
    let count: usize = devices.len();
    let transport = FakeTransport::new(devices);
    let orchestrator = Orchestrator::new(transport.clone(), run_config(count, window));

    let report: RunReport = orchestrator
        .execute(Arc::new(RecordingSink::default()))
        .await
        .expect("discovery should succeed");
    (transport, report)
}

fn device<'a>(report: &'a RunReport, address: &str) -> &'a DeviceReport {
    report
        .devices
        .iter()
        .find(|d| d.identity.address == address)
        .expect("device missing from report")
}

#[tokio::test(start_paused = true)]
async fn final_counts_equal_notifications_received() {
    let (_, report) = run(
        vec![
            FakeDevice::new(A, "GMSync-A").frames(37),
            FakeDevice::new(B, "GMSync-B"),
        ],
        Duration::from_secs(5),
    )
    .await;

    let a = device(&report, A);
    assert_eq!(a.counts.total, 37);
    assert_eq!(a.counts.accel, 19);
    assert_eq!(a.counts.gyro, 18);
    assert_eq!(a.counts.other, 0);
    assert_eq!(a.counts.gravity_samples, 19);
    assert!(a.counts.mean_gravity().is_some());
    assert!(a.outcome.is_success());
    assert_eq!(a.verdict(), Verdict::Pass);

    let b = device(&report, B);
    assert_eq!(b.counts.total, 0);
    assert!(b.outcome.is_success(), "a silent device is still a clean session");
    assert_eq!(b.counts.mean_gravity(), None);
    assert_eq!(b.verdict(), Verdict::Fail);
    assert_eq!(report.total_packets(), 37);
}

#[tokio::test(start_paused = true)]
async fn handshake_is_sent_in_order_with_settle_spacing() {
    let (transport, report) = run(vec![FakeDevice::new(A, "GMSync-A")], Duration::from_secs(3)).await;

    let writes = transport.writes(A);
    let sent: Vec<&[u8]> = writes.iter().map(|(bytes, _)| bytes.as_slice()).collect();
    let mut expected: Vec<&[u8]> = HANDSHAKE.to_vec();
    expected.push(STOP_SENSORS);
    assert_eq!(sent, expected);

    for pair in writes[..HANDSHAKE.len()].windows(2) {
        let gap: Duration = pair[1].1 - pair[0].1;
        assert!(gap >= Duration::from_millis(200), "handshake gap was {gap:?}");
    }
    assert_eq!(device(&report, A).outcome.reached, SessionState::Streaming);
}

#[tokio::test(start_paused = true)]
async fn subscription_is_in_place_before_the_first_command() {
    let (transport, _) = run(vec![FakeDevice::new(A, "GMSync-A").frames(5)], Duration::from_secs(2)).await;

    let subscribed = transport.position(&Event::Subscribe(A.to_string())).unwrap();
    let first_write = transport.write_position(A, HANDSHAKE[0]).unwrap();
    assert!(subscribed < first_write);
}

#[tokio::test(start_paused = true)]
async fn teardown_stops_then_unsubscribes_then_disconnects() {
    let (transport, _) = run(vec![FakeDevice::new(A, "GMSync-A").frames(5)], Duration::from_secs(2)).await;

    let events = transport.events();
    let stop = events
        .iter()
        .rposition(|e| matches!(e, Event::Write { bytes, .. } if bytes.as_slice() == STOP_SENSORS))
        .unwrap();
    let unsubscribed = transport.position(&Event::Unsubscribe(A.to_string())).unwrap();
    let disconnected = transport.position(&Event::Disconnect(A.to_string())).unwrap();

    assert!(stop > transport.write_position(A, HANDSHAKE[4]).unwrap());
    assert!(stop < unsubscribed);
    assert!(unsubscribed < disconnected);
    assert_eq!(disconnected, events.len() - 1);
}

#[tokio::test(start_paused = true)]
async fn failed_handshake_write_stops_the_sequence() {
    let (transport, report) = run(
        vec![FakeDevice::new(A, "GMSync-A").frames(10).fail_write(3)],
        Duration::from_secs(3),
    )
    .await;

    let sent: Vec<Vec<u8>> = transport.writes(A).into_iter().map(|(b, _)| b).collect();
    assert_eq!(sent.len(), 3, "writes after the failed one must not be sent");
    assert_eq!(sent[2], HANDSHAKE[2]);

    let a = device(&report, A);
    assert!(matches!(
        a.outcome.result,
        Err(SessionError::WriteFailed { step: 3, .. })
    ));
    assert_eq!(a.outcome.reached, SessionState::HandshakeInFlight);
    assert_eq!(a.counts.total, 0);

    let failed_write = transport.write_position(A, HANDSHAKE[2]).unwrap();
    let unsubscribed = transport.position(&Event::Unsubscribe(A.to_string())).unwrap();
    let disconnected = transport.position(&Event::Disconnect(A.to_string())).unwrap();
    assert!(failed_write < unsubscribed);
    assert!(unsubscribed < disconnected);
}

#[tokio::test(start_paused = true)]
async fn connect_failure_does_not_touch_siblings() {
    let (transport, report) = run(
        vec![
            FakeDevice::new(A, "GMSync-A").frames(12),
            FakeDevice::new(B, "GMSync-B").fail_connect(),
        ],
        Duration::from_secs(3),
    )
    .await;

    let a = device(&report, A);
    assert!(a.outcome.is_success());
    assert_eq!(a.counts.total, 12);

    let b = device(&report, B);
    assert!(matches!(b.outcome.result, Err(SessionError::ConnectFailed(_))));
    assert_eq!(b.counts.total, 0);
    assert!(transport.writes(B).is_empty());

    assert_eq!(report.failed_sessions(), 1);
}

#[tokio::test(start_paused = true)]
async fn stream_disconnect_keeps_counts_so_far() {
    let (transport, report) = run(
        vec![FakeDevice::new(A, "GMSync-A").frames(100).drop_after(Duration::from_millis(505))],
        Duration::from_secs(5),
    )
    .await;

    let a = device(&report, A);
    assert_eq!(a.outcome.result, Err(SessionError::StreamDisconnect));
    assert_eq!(a.outcome.reached, SessionState::Streaming);
    assert_eq!(a.counts.total, 50);

    let sent: Vec<Vec<u8>> = transport.writes(A).into_iter().map(|(b, _)| b).collect();
    assert_eq!(sent.len(), HANDSHAKE.len(), "no stop command on a dead link");
}

#[tokio::test(start_paused = true)]
async fn window_closing_mid_handshake_ends_the_session() {
    let (transport, report) = run(
        vec![FakeDevice::new(A, "GMSync-A").frames(5)],
        Duration::from_millis(500),
    )
    .await;

    let a = device(&report, A);
    assert_eq!(
        a.outcome.result,
        Err(SessionError::DeadlineDuringHandshake { sent: 3 })
    );
    assert_eq!(transport.writes(A).len(), 3);
    assert_eq!(a.counts.total, 0);
}

#[tokio::test(start_paused = true)]
async fn connect_outlasting_the_window_is_released() {
    let (transport, report) = run(
        vec![FakeDevice::new(A, "GMSync-A").frames(5).connect_delay(Duration::from_secs(2))],
        Duration::from_secs(1),
    )
    .await;

    let a = device(&report, A);
    assert_eq!(a.outcome.result, Err(SessionError::DeadlineDuringConnect));
    assert_eq!(a.outcome.reached, SessionState::Connecting);
    assert_eq!(a.verdict(), Verdict::Fail);

    assert_eq!(
        transport.events(),
        [Event::Connect(A.to_string()), Event::Disconnect(A.to_string())]
    );
}
