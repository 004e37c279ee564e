use std::sync::Arc;
use std::time::Duration;

use frame_extract::Frame;
use room_replay::transport::{Connection, MockConnection, TransportError};
use room_replay::{FrameStore, HeartbeatExit, Session, SessionEnd, SessionError, SessionState, SessionTiming};
use tokio::sync::oneshot;
use tokio::time::sleep;

fn frames(payloads: &[&[u8]]) -> Vec<Frame> {
    payloads.iter().map(|p| Frame::new(p.to_vec())).collect()
}

fn session_with(mock: &Arc<MockConnection>, timing: SessionTiming) -> Session {
    let connection: Arc<dyn Connection> = mock.clone();
    Session::new(connection, timing)
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn join_frames_go_out_in_capture_order() {
    let mock = Arc::new(MockConnection::new());
    let session = session_with(&mock, SessionTiming::default());
    let join = frames(&[b"\x0a\x01a", b"\x0a\x01b", b"\x0a\x01c", b"\x0a\x01d", b"\x0a\x01e"]);

    let report = session.replay(&join).await.expect("replay succeeds");

    assert!(report.completed);
    assert_eq!(report.sent, 5);
    assert_eq!(report.silent, 5);
    assert_eq!(report.replies, 0);
    let expected: Vec<Vec<u8>> = join.iter().map(|f| f.as_bytes().to_vec()).collect();
    assert_eq!(mock.sent_payloads(), expected);
    assert_eq!(session.state(), SessionState::SteadyState);
    assert_eq!(mock.close_count(), 0);
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn frames_are_spaced_by_listen_window_and_pacing() {
    let mock = Arc::new(MockConnection::new());
    let timing = SessionTiming::default();
    let session = session_with(&mock, timing);

    session
        .replay(&frames(&[b"one", b"two", b"three"]))
        .await
        .expect("replay succeeds");

    let sent = mock.sent();
    for pair in sent.windows(2) {
        let gap = pair[1].at - pair[0].at;
        assert!(
            gap >= timing.listen_window + timing.pacing,
            "frames only {gap:?} apart"
        );
    }
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn replies_do_not_change_control_flow() {
    let mock = Arc::new(MockConnection::new());
    mock.push_reply(b"ack".to_vec());
    mock.push_reply(b"welcome".to_vec());
    let session = session_with(&mock, SessionTiming::default());

    let report = session
        .replay(&frames(&[b"one", b"two", b"three"]))
        .await
        .expect("replay succeeds");

    assert_eq!(report.replies, 2);
    assert_eq!(report.silent, 1);
    assert_eq!(mock.sent_payloads().len(), 3);
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn send_failure_aborts_replay_and_closes_once() {
    let mock = Arc::new(MockConnection::new().failing_from(1));
    let session = session_with(&mock, SessionTiming::default());

    let err = session
        .replay(&frames(&[b"one", b"two", b"three"]))
        .await
        .expect_err("second send fails");

    match err {
        SessionError::Replay {
            position, total, ..
        } => {
            assert_eq!(position, 2);
            assert_eq!(total, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(mock.sent_payloads(), vec![b"one".to_vec()]);
    assert_eq!(mock.close_count(), 1);
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.is_stopped());
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn heartbeat_refuses_to_start_before_join_completes() {
    let mock = Arc::new(MockConnection::new());
    let session = session_with(&mock, SessionTiming::default());

    let err = session
        .spawn_heartbeat(Frame::new(&b"hb"[..]))
        .expect_err("idle session has no heartbeat");
    assert!(matches!(
        err,
        SessionError::InvalidState {
            expected: SessionState::SteadyState,
            actual: SessionState::Idle,
        }
    ));
    assert!(mock.sent().is_empty());
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn end_to_end_join_then_periodic_heartbeat_until_shutdown() {
    let mock = Arc::new(MockConnection::new());
    let timing = SessionTiming::default();
    let session = session_with(&mock, timing);
    let store = FrameStore::new(frames(&[b"F1", b"F2"]), Frame::new(&b"H"[..]));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let runner = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .run(&store, async {
                    let _ = stop_rx.await;
                })
                .await
        })
    };

    // Replay ends at 2.3 s; heartbeats follow at 17.3 s and 32.3 s.
    sleep(Duration::from_secs(40)).await;
    let sent = mock.sent();
    let payloads: Vec<&[u8]> = sent.iter().map(|f| f.bytes.as_slice()).collect();
    assert_eq!(payloads, vec![&b"F1"[..], &b"F2"[..], &b"H"[..], &b"H"[..]]);
    assert!(sent[2].at - sent[1].at >= timing.heartbeat_period);
    assert!(sent[3].at - sent[2].at >= timing.heartbeat_period);

    stop_tx.send(()).expect("runner is waiting");
    let end = runner.await.expect("runner task").expect("session ends cleanly");
    assert!(matches!(end, SessionEnd::Shutdown { heartbeats: 2 }));

    sleep(Duration::from_secs(60)).await;
    assert_eq!(mock.sent().len(), 4, "no sends after shutdown");
    assert_eq!(mock.close_count(), 1);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn heartbeat_failure_ends_session_without_signal() {
    // Calls 0 and 1 are the join frames; the first heartbeat fails.
    let mock = Arc::new(MockConnection::new().failing_from(2));
    let session = session_with(&mock, SessionTiming::default());
    let store = FrameStore::new(frames(&[b"F1", b"F2"]), Frame::new(&b"H"[..]));

    let end = session
        .run(&store, std::future::pending::<()>())
        .await
        .expect("heartbeat failure is a session end, not an error");

    match end {
        SessionEnd::HeartbeatFailed { heartbeats, error } => {
            assert_eq!(heartbeats, 0);
            assert!(matches!(error, TransportError::Other(_)));
        }
        other => panic!("unexpected end: {other:?}"),
    }
    assert_eq!(mock.sent_payloads().len(), 2);
    assert_eq!(mock.close_count(), 1);
    assert!(session.is_stopped());
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn interrupt_during_replay_stops_remaining_frames() {
    let mock = Arc::new(MockConnection::new());
    let session = session_with(&mock, SessionTiming::default());
    let store = FrameStore::new(
        frames(&[b"F1", b"F2", b"F3", b"F4", b"F5"]),
        Frame::new(&b"H"[..]),
    );

    // Frames leave at 0 s and 1.15 s; the interrupt lands mid-way through
    // the second listen window.
    let end = session
        .run(&store, sleep(Duration::from_millis(1_500)))
        .await
        .expect("interrupt is not an error");

    assert!(matches!(end, SessionEnd::Shutdown { heartbeats: 0 }));
    assert_eq!(mock.sent_payloads(), vec![b"F1".to_vec(), b"F2".to_vec()]);
    assert_eq!(mock.close_count(), 1);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(mock.sent_payloads().len(), 2);
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn concurrent_shutdowns_close_exactly_once() {
    let mock = Arc::new(MockConnection::new().with_close_latency(Duration::from_millis(200)));
    let session = session_with(&mock, SessionTiming::default());

    let first = session.clone();
    let second = session.clone();
    let handles = (
        tokio::spawn(async move { first.shutdown().await }),
        tokio::spawn(async move { second.shutdown().await }),
    );
    handles.0.await.expect("first shutdown");
    handles.1.await.expect("second shutdown");
    session.shutdown().await;

    assert_eq!(mock.close_count(), 1);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn sends_never_overlap() {
    let mock = Arc::new(MockConnection::new().with_send_latency(Duration::from_millis(400)));
    let timing = SessionTiming {
        heartbeat_period: Duration::from_millis(100),
        ..SessionTiming::default()
    };
    let session = session_with(&mock, timing);
    session.replay(&frames(&[b"F1"])).await.expect("replay");

    // Two heartbeat tasks racing on one connection still send one at a time.
    let a = session.spawn_heartbeat(Frame::new(&b"A"[..])).expect("first task");
    let b = session.spawn_heartbeat(Frame::new(&b"B"[..])).expect("second task");
    sleep(Duration::from_secs(3)).await;
    session.shutdown().await;

    assert!(matches!(a.await.expect("task a"), HeartbeatExit::Stopped { .. }));
    assert!(matches!(b.await.expect("task b"), HeartbeatExit::Stopped { .. }));
    assert!(mock.sent().len() > 3);
    assert_eq!(mock.max_concurrent_sends(), 1);
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn heartbeat_listen_drains_replies() {
    let mock = Arc::new(MockConnection::new());
    let timing = SessionTiming {
        heartbeat_listen: Some(Duration::from_millis(500)),
        ..SessionTiming::default()
    };
    let session = session_with(&mock, timing);
    session.replay(&[]).await.expect("empty replay completes");

    let heartbeat = session.spawn_heartbeat(Frame::new(&b"H"[..])).expect("heartbeat");
    mock.push_reply(b"pong".to_vec());
    sleep(Duration::from_secs(16)).await;
    session.shutdown().await;

    match heartbeat.await.expect("heartbeat task") {
        HeartbeatExit::Stopped { sent } => assert_eq!(sent, 1),
        other => panic!("unexpected exit: {other:?}"),
    }
    assert!(mock.recv_timeout(Duration::from_millis(1)).await.expect("recv").is_none());
}
