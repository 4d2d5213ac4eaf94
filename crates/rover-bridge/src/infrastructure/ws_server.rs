//! WebSocket server: accept loop and per-connection dispatch.
//!
//! This module is responsible for:
//!
//! 1. Accepting incoming TCP connections from browsers on a pre-bound
//!    listener.
//! 2. Upgrading each connection to a WebSocket session, capturing the
//!    request URI so the `ip` / `type` query parameters survive the upgrade.
//! 3. Dispatching on the requested kind:
//!    - `ping`   → one reachability probe, one JSON reply, close.  No
//!      session, no registry entry.
//!    - `camera` / `control` → open the downstream TCP leg, acknowledge with
//!      a `connected` message, register a session, and hand off to the relay.
//! 4. Gracefully shutting down when the `running` flag is cleared.
//!
//! # Scalability
//!
//! Each browser connection runs in its own Tokio task.  The accept loop
//! never blocks on a session: it accepts a connection and immediately spawns
//! a task for it before accepting the next one, so the number of concurrent
//! sessions is limited only by memory and the OS's TCP stack.  The only
//! state the tasks share is the internally synchronized session registry.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tracing::{error, info, warn};
use uuid::Uuid;

use rover_core::{BridgeToBrowserMsg, RequestedKind, SessionKind};

use crate::application::params::parse_request_params;
use crate::domain::config::BridgeConfig;
use crate::infrastructure::device_conn::DeviceConnection;
use crate::infrastructure::probe::probe_device;
use crate::infrastructure::registry::{SessionHandle, SessionRegistry};
use crate::infrastructure::relay::RelaySession;

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the main WebSocket accept loop until `running` is set to `false`.
///
/// The listener is bound by the caller (main binds the configured address;
/// tests bind port 0) so that the local address is known before the loop
/// starts.
///
/// # Parameters
///
/// - `listener` – Pre-bound TCP listener for browser connections.
/// - `config`   – Bridge configuration (ports, timeouts, default device).
/// - `registry` – Shared session registry; sessions register and deregister
///   themselves through it.
/// - `running`  – Shared flag; the loop exits when this is set to `false`.
pub async fn run_server(
    listener: TcpListener,
    config: Arc<BridgeConfig>,
    registry: Arc<SessionRegistry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    info!(
        "WebSocket bridge listening on {}",
        listener.local_addr().context("listener has no local address")?
    );

    loop {
        // Check the shutdown flag before each accept attempt.
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short timeout on `accept()` lets the loop re-check the `running`
        // flag even when no browsers are connecting.
        let accept_result = timeout(Duration::from_millis(200), listener.accept()).await;

        match accept_result {
            Ok(Ok((stream, peer_addr))) => {
                info!("new browser connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                let reg = Arc::clone(&registry);

                // One dedicated Tokio task per connection; the accept loop
                // is never delayed by a slow client.
                tokio::spawn(async move {
                    handle_browser_connection(stream, peer_addr, cfg, reg).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., too many open file
                // descriptors).  Log it and keep accepting.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout — no new connection in the last 200 ms.  Loop back
                // to check the `running` flag.
            }
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Top-level handler for a single browser connection.
///
/// Wraps [`dispatch`] and logs the outcome; this is the entry point of each
/// per-connection task spawned by [`run_server`].  The outer/inner split
/// keeps `?` usable inside `dispatch` while errors are logged here.
async fn handle_browser_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<BridgeConfig>,
    registry: Arc<SessionRegistry>,
) {
    match dispatch(raw_stream, peer_addr, config, registry).await {
        Ok(()) => info!("connection {peer_addr} finished"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e:#}"),
    }
}

/// Completes the WebSocket handshake, resolves the request parameters, and
/// routes the connection to the ping path or a relay session.
async fn dispatch(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<BridgeConfig>,
    registry: Arc<SessionRegistry>,
) -> anyhow::Result<()> {
    // `accept_hdr_async` runs the HTTP upgrade like `accept_async`, but the
    // callback sees the upgrade request, the only place the query
    // parameters are visible.
    let mut request_uri = String::from("/");
    let ws_stream = accept_hdr_async(raw_stream, |req: &Request, response: Response| {
        request_uri = req.uri().to_string();
        Ok(response)
    })
    .await
    .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let params = parse_request_params(&request_uri, &config.default_device_ip);

    match params.kind {
        RequestedKind::Ping => handle_ping(ws_stream, peer_addr, &params.device_ip, &config).await,
        RequestedKind::Bridge(kind) => {
            run_bridge_session(ws_stream, peer_addr, params.device_ip, kind, config, registry)
                .await
        }
    }
}

// ── Ping path ─────────────────────────────────────────────────────────────────

/// Handles a `type=ping` connection: one probe against the camera port, one
/// JSON reply, close.  Never touches the registry.
async fn handle_ping(
    mut ws_stream: WebSocketStream<TcpStream>,
    peer_addr: SocketAddr,
    device_ip: &str,
    config: &BridgeConfig,
) -> anyhow::Result<()> {
    info!("ping request for {device_ip} from {peer_addr}");

    let reply = match probe_device(device_ip, config.camera_port, config.probe_timeout).await {
        Ok(()) => {
            info!("ping succeeded for {device_ip}");
            BridgeToBrowserMsg::ping_online(device_ip)
        }
        Err(e) => {
            info!("ping failed for {device_ip}: {e}");
            BridgeToBrowserMsg::ping_offline(device_ip, e.to_string())
        }
    };

    send_json(&mut ws_stream, &reply).await?;
    let _ = ws_stream.close(None).await;
    Ok(())
}

// ── Bridge path ───────────────────────────────────────────────────────────────

/// Handles a `type=camera` / `type=control` connection: connects the
/// downstream leg, registers a session, and runs the relay to completion.
async fn run_bridge_session(
    mut ws_stream: WebSocketStream<TcpStream>,
    peer_addr: SocketAddr,
    device_ip: String,
    kind: SessionKind,
    config: Arc<BridgeConfig>,
    registry: Arc<SessionRegistry>,
) -> anyhow::Result<()> {
    let port = config.downstream_port(kind);
    let device_addr = format!("{device_ip}:{port}");
    info!("new {kind} session for {device_addr} (peer {peer_addr})");

    // Connect-phase failures are reported to the browser as a structured
    // message, then the connection is closed.  They are not server errors
    // and are never retried; the browser decides whether to try again.
    let device = match DeviceConnection::connect(&device_ip, port, config.connect_timeout).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("session for {device_addr}: downstream connect failed: {e:#}");
            let _ = send_json(&mut ws_stream, &BridgeToBrowserMsg::connect_error(format!("{e:#}"))).await;
            let _ = ws_stream.close(None).await;
            return Ok(());
        }
    };

    let id = Uuid::new_v4();
    let closer = Arc::new(Notify::new());
    registry.insert(
        id,
        SessionHandle {
            kind,
            device_addr: device_addr.clone(),
            peer_addr,
            closer: Arc::clone(&closer),
        },
    );

    // The acknowledgement is the browser's cue to start sending; if it
    // cannot be delivered the session is dead before it started.
    if let Err(e) = send_json(&mut ws_stream, &BridgeToBrowserMsg::connected(kind)).await {
        registry.remove(id);
        return Err(e).with_context(|| format!("session {id}: failed to send connected ack"));
    }

    let session = RelaySession::new(id, kind, peer_addr, device_addr);
    session.run(ws_stream, device, closer, registry).await;
    Ok(())
}

// ── Helper ────────────────────────────────────────────────────────────────────

/// Serializes a control-plane message and sends it as one text frame.
async fn send_json(
    ws_stream: &mut WebSocketStream<TcpStream>,
    msg: &BridgeToBrowserMsg,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg).context("control-plane message serialization failed")?;
    ws_stream
        .send(WsMessage::Text(json))
        .await
        .context("control-plane send failed")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

// The dispatcher's observable behavior (acks, errors, ping replies, registry
// effects, close propagation) is covered end-to-end in
// tests/bridge_relay.rs; the pure parameter handling it relies on is unit
// tested in application::params.
