//! End-to-end behavior of the leaderboard sync against scripted doubles.
//!
//! Every test runs on a paused tokio clock, so the 2-second poll cadence
//! and reconnect delays cost nothing and are exact.

use std::time::Duration;

use podium_api::ApiClient;
use podium_poll::PollConfig;
use podium_protocol::{NotificationKind, ValidationError};
use podium_sync::{
    LeaderboardSync, PushConfig, PushStatus, SyncConfig, SyncError, SyncHandle,
    SyncPhase, SyncSnapshot,
};
use podium_transport::{Method, MockConnector, MockPeer, MockReply, MockTransport};
use serde_json::json;
use tokio::time::{timeout, Instant};

const TOP: &str = "/api/leaderboard/top/10";

// =========================================================================
// Helpers
// =========================================================================

fn board(names: &[(&str, u64)]) -> String {
    let rows: Vec<_> = names
        .iter()
        .map(|(name, score)| json!({"username": name, "score": score, "timestamp": "2024-01-01T00:00:00Z"}))
        .collect();
    json!({"topScores": rows, "count": rows.len()}).to_string()
}

fn api() -> (ApiClient<MockTransport>, MockTransport) {
    let mock = MockTransport::new();
    (ApiClient::new(mock.clone(), "http://api.test"), mock)
}

fn push_only() -> SyncConfig {
    SyncConfig {
        poll: PollConfig::with_interval(Duration::ZERO),
        ..SyncConfig::default()
    }
}

fn push_config() -> PushConfig {
    PushConfig {
        host: Some("ws://push.test".into()),
        reconnect_delay: Duration::from_secs(3),
        reconnect_jitter: Duration::ZERO,
        ..PushConfig::new("app-key", "eu")
    }
}

async fn settle<T>(
    handle: &SyncHandle<T>,
    mut pred: impl FnMut(&SyncSnapshot) -> bool,
) -> SyncSnapshot
where
    T: podium_transport::HttpTransport,
{
    let mut rx = handle.subscribe();
    timeout(Duration::from_secs(30), rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out waiting for snapshot")
        .expect("sync publisher dropped")
        .clone()
}

fn names(snap: &SyncSnapshot) -> Vec<&str> {
    snap.rows.iter().map(|r| r.entry.username.as_str()).collect()
}

fn event(name: &str, data: serde_json::Value) -> String {
    json!({"event": name, "channel": "leaderboard", "data": data.to_string()}).to_string()
}

async fn expect_subscribe(peer: &mut MockPeer) {
    let frame = timeout(Duration::from_secs(30), peer.recv())
        .await
        .expect("no frame from client")
        .expect("client hung up");
    let frame: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(frame["event"], "pusher:subscribe");
    assert_eq!(frame["data"]["channel"], "leaderboard");
}

// =========================================================================
// Polling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_fetch_is_immediate_then_every_interval() {
    let (api, mock) = api();
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("ada", 900), ("bob", 800)])));
    let start = Instant::now();
    let sync = LeaderboardSync::spawn(api, SyncConfig::default());

    let snap = settle(&sync, |s| s.phase == SyncPhase::Ready).await;
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(names(&snap), ["ada", "bob"]);
    assert_eq!(snap.rows[1].rank, 2);
    assert!(snap.last_updated_ms.is_some());
    assert!(snap.error.is_none());

    tokio::time::sleep(Duration::from_millis(4_100)).await;
    assert_eq!(mock.count(Method::Get, TOP), 3);
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_keeps_previous_rows() {
    let (api, mock) = api();
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("ada", 900)])));
    let sync = LeaderboardSync::spawn(api, SyncConfig::default());
    settle(&sync, |s| s.phase == SyncPhase::Ready).await;

    mock.replace(
        Method::Get,
        TOP,
        MockReply::json(500, r#"{"error":"Internal server error"}"#),
    );
    let snap = settle(&sync, |s| s.phase == SyncPhase::Error).await;
    assert_eq!(names(&snap), ["ada"]);
    assert_eq!(snap.error.as_deref(), Some("Internal server error"));

    mock.replace(Method::Get, TOP, MockReply::network_failure("connection reset"));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(names(&sync.snapshot()), ["ada"]);

    mock.replace(Method::Get, TOP, MockReply::json(200, &board(&[("bob", 1000), ("ada", 900)])));
    let snap = settle(&sync, |s| s.phase == SyncPhase::Ready).await;
    assert_eq!(names(&snap), ["bob", "ada"]);
    assert!(snap.error.is_none());
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rank_changes_only_when_tracking() {
    let (api, mock) = api();
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("ada", 900), ("bob", 800)])));
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("bob", 1000), ("ada", 900)])));
    let sync = LeaderboardSync::spawn(
        api,
        SyncConfig {
            track_rank_changes: true,
            ..SyncConfig::default()
        },
    );

    let snap = settle(&sync, |s| s.rows.first().is_some_and(|r| r.entry.username == "bob")).await;
    assert_eq!(snap.row_for("bob").unwrap().change, 1);
    assert_eq!(snap.row_for("ada").unwrap().change, -1);
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_earlier_fetch_landing_last_wins() {
    let (api, mock) = api();
    // The t=0 fetch takes 3s; the t=2s fetch answers at once.
    mock.on(
        Method::Get,
        TOP,
        MockReply::json(200, &board(&[("slow", 100)])).delayed(Duration::from_secs(3)),
    );
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("fast", 200)])));
    let sync = LeaderboardSync::spawn(api, SyncConfig::default());

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(names(&sync.snapshot()), ["fast"]);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let snap = sync.snapshot();
    assert_eq!(names(&snap), ["slow"]);
    assert_eq!(snap.phase, SyncPhase::Ready);
    assert_eq!(mock.count(Method::Get, TOP), 2);
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_pause_polling_stops_fetches() {
    let (api, mock) = api();
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("ada", 900)])));
    let sync = LeaderboardSync::spawn(api, SyncConfig::default());
    settle(&sync, |s| s.phase == SyncPhase::Ready).await;

    sync.pause_polling();
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(mock.count(Method::Get, TOP), 1);

    sync.resume_polling();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(mock.count(Method::Get, TOP), 2);
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_refresh_applies_before_returning() {
    let (api, mock) = api();
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("ada", 900)])));
    let sync = LeaderboardSync::spawn(api, push_only());

    sync.refresh().await.unwrap();
    assert_eq!(names(&sync.snapshot()), ["ada"]);

    mock.replace(Method::Get, TOP, MockReply::json(503, "{}"));
    let err = sync.refresh().await.unwrap_err();
    assert!(matches!(err, SyncError::Api(_)));
    let snap = sync.snapshot();
    assert_eq!(snap.phase, SyncPhase::Error);
    assert_eq!(names(&snap), ["ada"]);
    sync.shutdown().await;
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_late_response_after_shutdown_is_discarded() {
    let (api, mock) = api();
    mock.on(
        Method::Get,
        TOP,
        MockReply::json(200, &board(&[("ada", 900)])).delayed(Duration::from_secs(1)),
    );
    let sync = LeaderboardSync::spawn(api, SyncConfig::default());
    let rx = sync.subscribe();
    settle(&sync, |s| s.phase == SyncPhase::Loading).await;

    sync.shutdown().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let last = rx.borrow().clone();
    assert_eq!(last.phase, SyncPhase::Stopped);
    assert!(last.rows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_operations_after_stop_fail() {
    let (api, mock) = api();
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[])));
    let sync = LeaderboardSync::spawn(api, push_only());
    sync.stop();
    assert!(matches!(sync.refresh().await, Err(SyncError::Stopped)));
    assert!(matches!(
        sync.submit_score("tok", "10").await,
        Err(SyncError::Stopped)
    ));
    let snap = settle(&sync, |s| s.phase.is_stopped()).await;
    assert_eq!(snap.phase, SyncPhase::Stopped);
}

// =========================================================================
// Submission gate
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_submit_closes_gate_and_refetches_immediately() {
    let (api, mock) = api();
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("bob", 800)])));
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("ada", 1500), ("bob", 800)])));
    mock.on(Method::Get, "/api/scores/can-submit", MockReply::json(200, r#"{"canSubmit":true}"#));
    mock.on(Method::Get, "/api/scores/can-submit", MockReply::json(200, r#"{"canSubmit":false}"#));
    mock.on(
        Method::Post,
        "/api/scores/submit",
        MockReply::json(201, r#"{"message":"Score submitted successfully"}"#),
    );

    let sync = LeaderboardSync::spawn(api, SyncConfig::default());
    settle(&sync, |s| s.phase == SyncPhase::Ready).await;
    assert!(sync.check_can_submit("tok").await);

    let start = Instant::now();
    let resp = sync.submit_score("tok", "1500").await.unwrap();
    assert_eq!(resp["message"], "Score submitted successfully");

    let snap = sync.snapshot();
    assert!(!snap.can_submit);
    assert_eq!(names(&snap), ["ada", "bob"]);
    assert_eq!(mock.count(Method::Get, TOP), 2);
    assert!(start.elapsed() < Duration::from_millis(2_000));

    let err = sync.submit_score("tok", "1600").await.unwrap_err();
    assert!(matches!(err, SyncError::SubmissionClosed));
    assert_eq!(mock.count(Method::Post, "/api/scores/submit"), 1);
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_score_input_never_reaches_network() {
    let (api, mock) = api();
    let sync = LeaderboardSync::spawn(api, push_only());

    for input in ["-5", "abc", "0", "1000001", ""] {
        let err = sync.submit_score("tok", input).await.unwrap_err();
        assert!(
            matches!(err, SyncError::Validation(_)),
            "{input:?} gave {err:?}"
        );
    }
    assert!(matches!(
        sync.submit_score("tok", "abc").await,
        Err(SyncError::Validation(ValidationError::NotANumber(_)))
    ));
    assert!(mock.requests().is_empty());
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_upper_bound_score_is_submitted() {
    let (api, mock) = api();
    mock.on(Method::Post, "/api/scores/submit", MockReply::json(201, r#"{"ok":true}"#));
    mock.on(Method::Get, "/api/scores/can-submit", MockReply::json(200, r#"{"canSubmit":false}"#));
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[])));
    let sync = LeaderboardSync::spawn(api, push_only());

    sync.submit_score("tok", "1000000").await.unwrap();
    let sent = mock
        .requests()
        .into_iter()
        .find(|r| r.path().ends_with("/api/scores/submit"))
        .unwrap();
    assert_eq!(sent.body.as_deref(), Some(br#"{"score":1000000}"#.as_slice()));
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_gate_check_error_leaves_gate_open() {
    let (api, mock) = api();
    mock.on(Method::Get, "/api/scores/can-submit", MockReply::json(500, "{}"));
    let sync = LeaderboardSync::spawn(api, push_only());
    assert!(sync.check_can_submit("tok").await);
    assert!(sync.can_submit());
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_gate_handle_outlives_borrow_and_resets() {
    let (api, mock) = api();
    mock.on(Method::Get, "/api/scores/can-submit", MockReply::json(200, r#"{"canSubmit":false}"#));
    let sync = LeaderboardSync::spawn(api, push_only());
    let gate = sync.gate();

    let checked = tokio::spawn({
        let gate = gate.clone();
        async move { gate.check("tok").await }
    });
    assert!(!checked.await.unwrap());
    settle(&sync, |s| !s.can_submit).await;

    gate.reset().await;
    settle(&sync, |s| s.can_submit).await;
    assert_eq!(mock.count(Method::Get, "/api/scores/can-submit"), 1);
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_gate_re_check_failure_after_submit_is_ignored() {
    let (api, mock) = api();
    mock.on(Method::Get, "/api/scores/can-submit", MockReply::network_failure("reset"));
    mock.on(Method::Post, "/api/scores/submit", MockReply::json(201, r#"{"ok":true}"#));
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("ada", 10)])));
    let sync = LeaderboardSync::spawn(api, push_only());

    sync.submit_score("tok", "10").await.unwrap();
    let snap = sync.snapshot();
    assert!(snap.can_submit);
    assert_eq!(names(&snap), ["ada"]);
    sync.shutdown().await;
}

// =========================================================================
// Push
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pushed_ranking_replaces_rows_in_order() {
    let (api, _mock) = api();
    let connector = MockConnector::new();
    let mut peer = connector.prepare();
    let sync = LeaderboardSync::spawn_with_push(api, push_only(), connector.clone(), push_config());

    expect_subscribe(&mut peer).await;
    assert!(connector.dialed()[0].starts_with("ws://push.test/app/app-key?protocol=7"));

    peer.send(&event(
        "score-submitted",
        json!({"response": {"topScores": [
            {"username": "c", "score": 3000, "timestamp": "t"},
            {"username": "a", "score": 2000, "timestamp": "t"},
            {"username": "b", "score": 1000, "timestamp": "t"}
        ], "count": 3}}),
    ));

    let snap = settle(&sync, |s| s.rows.len() == 3).await;
    let ranks: Vec<_> = snap.rows.iter().map(|r| (r.rank, r.entry.username.as_str())).collect();
    assert_eq!(ranks, [(1, "c"), (2, "a"), (3, "b")]);
    assert_eq!(snap.phase, SyncPhase::Ready);
    assert_eq!(snap.notifications.len(), 1);
    assert_eq!(snap.notifications[0].kind, NotificationKind::GameEvent);
    assert_eq!(snap.notifications[0].message, "Leaderboard updated");
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_milestone_notifies_without_touching_rows() {
    let (api, _mock) = api();
    let connector = MockConnector::new();
    let mut peer = connector.prepare();
    let sync = LeaderboardSync::spawn_with_push(api, push_only(), connector, push_config());
    expect_subscribe(&mut peer).await;

    peer.send(&event("1000 posted", json!({"username": "ada", "score": 1500})));
    peer.send(&event("1000 posted", json!({})));

    let snap = settle(&sync, |s| s.notifications.len() == 2).await;
    assert!(snap.rows.is_empty());
    assert_eq!(snap.notifications[0].kind, NotificationKind::HighScore);
    assert_eq!(snap.notifications[0].message, "ada hit 1,500!");
    assert_eq!(snap.notifications[0].score, Some(1500));
    assert_eq!(snap.notifications[1].message, "Someone hit 1,000!");
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_notification_feed_is_bounded_and_expires() {
    let (api, _mock) = api();
    let connector = MockConnector::new();
    let mut peer = connector.prepare();
    let sync = LeaderboardSync::spawn_with_push(api, push_only(), connector, push_config());
    expect_subscribe(&mut peer).await;

    for i in 1..=6 {
        peer.send(&event(
            "notification",
            json!({"type": "TEST", "message": format!("n{i}")}),
        ));
    }
    let snap = settle(&sync, |s| s.notifications.last().is_some_and(|n| n.message == "n6")).await;
    let messages: Vec<_> = snap.notifications.iter().map(|n| n.message.as_str()).collect();
    assert_eq!(messages, ["n3", "n4", "n5", "n6"]);

    let snap = settle(&sync, |s| s.notifications.is_empty()).await;
    assert!(snap.notifications.is_empty());
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_clear_notifications() {
    let (api, _mock) = api();
    let connector = MockConnector::new();
    let mut peer = connector.prepare();
    let sync = LeaderboardSync::spawn_with_push(api, push_only(), connector, push_config());
    expect_subscribe(&mut peer).await;

    peer.send(&event("notification", json!({"type": "NEW_PLAYER", "message": "hi"})));
    settle(&sync, |s| s.notifications.len() == 1).await;
    sync.clear_notifications().await;
    settle(&sync, |s| s.notifications.is_empty()).await;
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_ping_is_answered_and_status_tracks_connection() {
    let (api, _mock) = api();
    let connector = MockConnector::new();
    let mut peer = connector.prepare();
    let sync = LeaderboardSync::spawn_with_push(api, push_only(), connector, push_config());
    expect_subscribe(&mut peer).await;

    peer.send(&json!({"event": "pusher:connection_established", "data": "{\"socket_id\":\"1.2\"}"}).to_string());
    settle(&sync, |s| s.push.is_connected()).await;

    peer.send(r#"{"event":"pusher:ping","data":{}}"#);
    let pong = timeout(Duration::from_secs(5), peer.recv()).await.unwrap().unwrap();
    let pong: serde_json::Value = serde_json::from_str(&pong).unwrap();
    assert_eq!(pong["event"], "pusher:pong");
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_connection_loss() {
    let (api, _mock) = api();
    let connector = MockConnector::new();
    let mut first = connector.prepare();
    let mut second = connector.prepare();
    let sync = LeaderboardSync::spawn_with_push(api, push_only(), connector.clone(), push_config());
    expect_subscribe(&mut first).await;

    let lost_at = Instant::now();
    first.disconnect();
    settle(&sync, |s| matches!(s.push, PushStatus::Disconnected { .. })).await;

    expect_subscribe(&mut second).await;
    assert!(lost_at.elapsed() >= Duration::from_secs(3));
    assert_eq!(connector.dialed().len(), 2);

    second.send(&event("1000 posted", json!({"username": "ada", "score": 1000})));
    settle(&sync, |s| s.notifications.len() == 1).await;
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_unsubscribes_and_closes() {
    let (api, _mock) = api();
    let connector = MockConnector::new();
    let mut peer = connector.prepare();
    let sync = LeaderboardSync::spawn_with_push(api, push_only(), connector, push_config());
    expect_subscribe(&mut peer).await;

    let rx = sync.subscribe();
    sync.shutdown().await;

    let frame = peer.recv().await.expect("unsubscribe frame");
    let frame: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(frame["event"], "pusher:unsubscribe");
    assert!(peer.is_closed());
    assert_eq!(rx.borrow().phase, SyncPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_missing_push_credentials_degrade_to_polling() {
    let (api, mock) = api();
    mock.on(Method::Get, TOP, MockReply::json(200, &board(&[("ada", 900)])));
    let connector = MockConnector::new();
    let sync = LeaderboardSync::spawn_with_push(
        api,
        SyncConfig::default(),
        connector.clone(),
        PushConfig::default(),
    );

    let snap = settle(&sync, |s| s.phase == SyncPhase::Ready).await;
    assert_eq!(names(&snap), ["ada"]);
    assert!(snap.error.is_none());
    assert_eq!(snap.push, PushStatus::Disabled);
    assert!(connector.dialed().is_empty());
    sync.shutdown().await;
}
