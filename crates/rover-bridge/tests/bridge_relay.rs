//! End-to-end relay tests: a real bridge instance on an ephemeral port, a
//! fake rover behind real TCP listeners, and tokio-tungstenite as the
//! browser.
//!
//! These tests cover the observable contract of the bridge: the connect-phase
//! acknowledgements, the per-kind framing, close propagation in both
//! directions, and the registry's bookkeeping.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use rover_bridge::domain::BridgeConfig;
use rover_bridge::infrastructure::{run_server, SessionRegistry};

// ── Harness ───────────────────────────────────────────────────────────────────

struct TestBridge {
    /// `ws://127.0.0.1:<port>` — append the query string.
    url_base: String,
    registry: Arc<SessionRegistry>,
}

/// Starts a bridge on an ephemeral port, with the rover ports pointed
/// wherever the test put its fake listeners.
async fn start_bridge(camera_port: u16, control_port: u16) -> TestBridge {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = Arc::new(BridgeConfig {
        ws_bind_addr: addr,
        camera_port,
        control_port,
        connect_timeout: Duration::from_secs(2),
        probe_timeout: Duration::from_millis(500),
        ..BridgeConfig::default()
    });

    let registry = Arc::new(SessionRegistry::new());
    let running = Arc::new(AtomicBool::new(true));
    tokio::spawn(run_server(
        listener,
        config,
        Arc::clone(&registry),
        running,
    ));

    TestBridge {
        url_base: format!("ws://{addr}"),
        registry,
    }
}

/// A port with (almost certainly) nothing listening on it.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Polls `predicate` until it holds or the deadline passes.
async fn wait_until(predicate: impl Fn() -> bool, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for: {what}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ── Scenario A: control session, newline framing ─────────────────────────────

#[tokio::test]
async fn test_control_session_acks_and_appends_newline() {
    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_port = rover.local_addr().unwrap().port();
    let bridge = start_bridge(free_port().await, control_port).await;

    let (mut ws, _) = connect_async(format!("{}/?type=control&ip=127.0.0.1", bridge.url_base))
        .await
        .unwrap();

    let ack = ws.next().await.unwrap().unwrap();
    assert_eq!(
        ack.into_text().unwrap(),
        r#"{"status":"connected","type":"control"}"#
    );
    assert_eq!(bridge.registry.len(), 1);

    ws.send(Message::Text("go".into())).await.unwrap();

    let (mut conn, _) = rover.accept().await.unwrap();
    let mut buf = [0u8; 3];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"go\n");
}

// ── Scenario B: camera connect failure ───────────────────────────────────────

#[tokio::test]
async fn test_camera_connect_failure_reports_error_then_closes() {
    // No listener on the camera port: the downstream connect is refused.
    let bridge = start_bridge(free_port().await, free_port().await).await;

    let (mut ws, _) = connect_async(format!("{}/?type=camera&ip=127.0.0.1", bridge.url_base))
        .await
        .unwrap();

    let msg = ws.next().await.unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(&msg.into_text().unwrap()).unwrap();
    assert!(
        body.get("error").is_some(),
        "connect failure must produce a structured error, got {body}"
    );

    // After the error message the server closes the connection.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => break,
                Some(Ok(other)) => panic!("unexpected frame after error: {other:?}"),
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "server must close after the error message");

    assert_eq!(bridge.registry.len(), 0, "failed connects must not register");
}

// ── P1 / Scenario D: rover-side close propagates upstream ────────────────────

#[tokio::test]
async fn test_rover_close_propagates_to_browser() {
    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_port = rover.local_addr().unwrap().port();
    let bridge = start_bridge(free_port().await, control_port).await;

    let (mut ws, _) = connect_async(format!("{}/?type=control&ip=127.0.0.1", bridge.url_base))
        .await
        .unwrap();
    ws.next().await.unwrap().unwrap(); // connected ack

    let (mut conn, _) = rover.accept().await.unwrap();

    // Scenario D: a few commands flow before the rover dies mid-session.
    for command in ["fwd", "rev", "stop"] {
        ws.send(Message::Text(command.into())).await.unwrap();
    }
    let mut buf = [0u8; 13];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"fwd\nrev\nstop\n");

    // Rover hangs up.
    drop(conn);
    drop(rover);

    // The browser leg must observe closure within the teardown bound.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "browser must see the close within the bound");

    // And the session must deregister itself (no leak).
    wait_until(|| bridge.registry.is_empty(), "registry to drain").await;
}

// ── P1 (reverse): browser-side close propagates downstream ───────────────────

#[tokio::test]
async fn test_browser_close_propagates_to_rover() {
    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_port = rover.local_addr().unwrap().port();
    let bridge = start_bridge(free_port().await, control_port).await;

    let (mut ws, _) = connect_async(format!("{}/?type=control&ip=127.0.0.1", bridge.url_base))
        .await
        .unwrap();
    ws.next().await.unwrap().unwrap(); // connected ack

    let (mut conn, _) = rover.accept().await.unwrap();

    ws.close(None).await.unwrap();

    // The rover leg must be destroyed: EOF or a reset, but never silence.
    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(Duration::from_secs(5), conn.read(&mut buf))
        .await
        .expect("rover read must unblock within the teardown bound");
    match read {
        Ok(0) | Err(_) => {}
        Ok(n) => panic!("expected EOF or error on the rover leg, got {n} bytes"),
    }

    wait_until(|| bridge.registry.is_empty(), "registry to drain").await;
}

// ── P3: byte order preservation (camera, rover → browser) ────────────────────

#[tokio::test]
async fn test_camera_bytes_arrive_concatenated_in_order() {
    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let camera_port = rover.local_addr().unwrap().port();
    let bridge = start_bridge(camera_port, free_port().await).await;

    let (mut ws, _) = connect_async(format!("{}/?type=camera&ip=127.0.0.1", bridge.url_base))
        .await
        .unwrap();
    let ack = ws.next().await.unwrap().unwrap();
    assert_eq!(
        ack.into_text().unwrap(),
        r#"{"status":"connected","type":"camera"}"#
    );

    let (mut conn, _) = rover.accept().await.unwrap();

    // Several distinct writes; TCP may coalesce or split them arbitrarily,
    // but the concatenation seen by the browser must be exact.
    let mut expected = Vec::new();
    for i in 0..5u8 {
        let chunk = format!("frame-{i}:0123456789").into_bytes();
        conn.write_all(&chunk).await.unwrap();
        expected.extend_from_slice(&chunk);
    }

    let mut got = Vec::new();
    while got.len() < expected.len() {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for camera bytes")
            .unwrap()
            .unwrap();
        match msg {
            Message::Binary(bytes) => got.extend_from_slice(&bytes),
            Message::Close(_) => break,
            other => panic!("camera payload must be binary, got {other:?}"),
        }
    }
    assert_eq!(got, expected);
}

// ── P5: ping creates no session ──────────────────────────────────────────────

#[tokio::test]
async fn test_ping_replies_online_and_creates_no_session() {
    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let camera_port = rover.local_addr().unwrap().port();
    let bridge = start_bridge(camera_port, free_port().await).await;

    for _ in 0..3 {
        let (mut ws, _) = connect_async(format!("{}/?type=ping&ip=127.0.0.1", bridge.url_base))
            .await
            .unwrap();
        let msg = ws.next().await.unwrap().unwrap();
        assert_eq!(
            msg.into_text().unwrap(),
            r#"{"online":true,"ip":"127.0.0.1"}"#
        );
    }

    assert_eq!(bridge.registry.len(), 0, "ping must never register a session");
}

#[tokio::test]
async fn test_ping_replies_offline_with_error_detail() {
    // Camera port closed: the probe fails and the reply says why.
    let bridge = start_bridge(free_port().await, free_port().await).await;

    let (mut ws, _) = connect_async(format!("{}/?type=ping&ip=127.0.0.1", bridge.url_base))
        .await
        .unwrap();
    let msg = ws.next().await.unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(&msg.into_text().unwrap()).unwrap();

    assert_eq!(body["online"], false);
    assert_eq!(body["ip"], "127.0.0.1");
    assert!(body["error"].is_string(), "offline replies carry a detail");
    assert_eq!(bridge.registry.len(), 0);
}

// ── Shutdown: close_all tears down live sessions ─────────────────────────────

#[tokio::test]
async fn test_close_all_tears_down_active_sessions() {
    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_port = rover.local_addr().unwrap().port();
    let bridge = start_bridge(free_port().await, control_port).await;

    let (mut ws, _) = connect_async(format!("{}/?type=control&ip=127.0.0.1", bridge.url_base))
        .await
        .unwrap();
    ws.next().await.unwrap().unwrap(); // connected ack
    let (_conn, _) = rover.accept().await.unwrap();
    assert_eq!(bridge.registry.len(), 1);

    bridge.registry.close_all();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "close_all must reach the browser leg");

    wait_until(|| bridge.registry.is_empty(), "registry to drain").await;
}

// ── Defaulting: unknown type behaves as control ──────────────────────────────

#[tokio::test]
async fn test_unknown_type_falls_back_to_control_port() {
    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_port = rover.local_addr().unwrap().port();
    let bridge = start_bridge(free_port().await, control_port).await;

    let (mut ws, _) = connect_async(format!("{}/?type=video&ip=127.0.0.1", bridge.url_base))
        .await
        .unwrap();

    let ack = ws.next().await.unwrap().unwrap();
    assert_eq!(
        ack.into_text().unwrap(),
        r#"{"status":"connected","type":"control"}"#
    );
}
