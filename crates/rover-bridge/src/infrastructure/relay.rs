//! The relay session: one browser WebSocket paired with one rover TCP
//! connection for the lifetime of a bridge request.
//!
//! # Task topology
//!
//! Each session owns three tasks:
//!
//! - **rover → browser**: reads chunks from the rover TCP stream and sends
//!   each as one WebSocket message (framing per kind).
//! - **browser → rover**: reads WebSocket messages and writes their bytes to
//!   the rover (control commands get a trailing `\n`).
//! - **the session task itself** (this module's [`RelaySession::run`]),
//!   which waits for the first of: either loop ending, or the registry's
//!   close signal.
//!
//! # Close propagation
//!
//! The session task is the single close owner.  Whatever ends a session (a
//! rover EOF, a browser disconnect, a transport error on either leg, or a
//! shutdown signal) funnels into one `select!`, and the teardown code below
//! it runs exactly once: abort both loops (dropping their socket halves
//! closes both legs), best-effort send a WebSocket Close frame, deregister.
//! Neither forwarding loop ever touches the registry or the other loop's
//! socket, so there is no double-close path to guard.
//!
//! Transport errors are not retried.  Sessions are ephemeral; the browser's
//! recovery path is reconnecting, which builds a brand-new session.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use rover_core::{SessionKind, SessionState};

use crate::application::framing;
use crate::infrastructure::device_conn::DeviceConnection;
use crate::infrastructure::registry::SessionRegistry;

/// Read size for the rover TCP stream.  One read becomes one WebSocket
/// message, so this also bounds the size of forwarded chunks.
const READ_BUF_SIZE: usize = 8 * 1024;

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// One relay session.  Constructed by the dispatcher after the downstream
/// connect succeeds; consumed by [`RelaySession::run`].
pub struct RelaySession {
    id: Uuid,
    kind: SessionKind,
    peer_addr: SocketAddr,
    device_addr: String,
    state: SessionState,
}

impl RelaySession {
    /// Creates a session in the `Connecting` state.  The downstream leg is
    /// already being dialed by the dispatcher at this point.
    pub fn new(id: Uuid, kind: SessionKind, peer_addr: SocketAddr, device_addr: String) -> Self {
        Self {
            id,
            kind,
            peer_addr,
            device_addr,
            state: SessionState::Connecting,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves the session to `next`, enforcing the state machine.  The run
    /// loop is the only caller, so an illegal transition is a bug; it is
    /// logged and ignored rather than poisoning the session.
    fn transition(&mut self, next: SessionState) {
        if self.state.can_transition_to(next) {
            debug!(session = %self.id, from = %self.state, to = %next, "session state change");
            self.state = next;
        } else {
            warn!(session = %self.id, from = %self.state, to = %next, "illegal session state change ignored");
        }
    }

    /// Runs the session to completion: forwards in both directions until
    /// either leg closes or `closer` fires, then tears down both legs and
    /// deregisters exactly once.
    pub async fn run(
        mut self,
        ws_stream: WebSocketStream<TcpStream>,
        device: DeviceConnection,
        closer: Arc<Notify>,
        registry: Arc<SessionRegistry>,
    ) {
        self.transition(SessionState::Active);
        info!(
            session = %self.id,
            kind = %self.kind,
            device = %self.device_addr,
            peer = %self.peer_addr,
            "relay session active"
        );

        let (ws_tx, ws_rx) = ws_stream.split();
        // The sink is shared between the rover→browser loop and the teardown
        // path (which sends the final Close frame).
        let ws_tx = Arc::new(Mutex::new(ws_tx));

        let mut rover_to_browser = tokio::spawn(rover_to_browser_loop(
            self.id,
            self.kind,
            device.read_half,
            Arc::clone(&ws_tx),
        ));
        let mut browser_to_rover = tokio::spawn(browser_to_rover_loop(
            self.id,
            self.kind,
            ws_rx,
            device.write_half,
        ));

        // Single close owner: the first of these three arms wins, and the
        // teardown below runs exactly once regardless of which one it was.
        tokio::select! {
            _ = &mut rover_to_browser => {
                debug!(session = %self.id, "rover leg finished first");
            }
            _ = &mut browser_to_rover => {
                debug!(session = %self.id, "browser leg finished first");
            }
            _ = closer.notified() => {
                info!(session = %self.id, "close requested");
            }
        }

        self.transition(SessionState::Closing);

        // Aborting the loops drops their socket halves: the rover TCP
        // connection closes and any in-flight read or write unblocks now
        // rather than after a dead-peer send.
        rover_to_browser.abort();
        browser_to_rover.abort();

        // Best-effort Close frame so the browser sees a clean shutdown
        // instead of a reset; if the browser is the leg that died, this
        // fails and that is fine.
        {
            let mut sink = ws_tx.lock().await;
            let _ = sink.send(WsMessage::Close(None)).await;
        }

        let deregistered = registry.remove(self.id);
        self.transition(SessionState::Closed);
        info!(
            session = %self.id,
            kind = %self.kind,
            deregistered,
            "relay session closed"
        );
    }
}

// ── Forwarding loops ──────────────────────────────────────────────────────────

/// Rover → browser: each TCP read becomes one WebSocket message.
///
/// Terminates on rover EOF, rover read error, or a failed send to the
/// browser.  Byte order within the direction is preserved because there is
/// exactly one reader and one writer.
async fn rover_to_browser_loop(
    id: Uuid,
    kind: SessionKind,
    mut read_half: OwnedReadHalf,
    ws_tx: Arc<Mutex<WsSink>>,
) {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!(session = %id, "rover closed the connection (EOF)");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!(session = %id, error = %e, "read from rover failed");
                break;
            }
        };

        let msg = framing::device_to_browser(kind, &buf[..n]);
        let mut sink = ws_tx.lock().await;
        if sink.send(msg).await.is_err() {
            // A closed peer is an immediate error here, never a retry.
            debug!(session = %id, "browser send failed (client disconnected)");
            break;
        }
    }
}

/// Browser → rover: each WebSocket message's bytes are written to the rover.
///
/// Terminates on a browser Close frame, the WebSocket stream ending, a
/// transport error, or a failed write to the rover.
async fn browser_to_rover_loop(
    id: Uuid,
    kind: SessionKind,
    mut ws_rx: WsSource,
    mut write_half: OwnedWriteHalf,
) {
    loop {
        let frame = match ws_rx.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!(session = %id, "browser WebSocket closed normally");
                break;
            }
            Some(Err(e)) => {
                warn!(session = %id, error = %e, "browser WebSocket error");
                break;
            }
            None => {
                debug!(session = %id, "browser stream ended");
                break;
            }
        };

        if let WsMessage::Close(_) = frame {
            debug!(session = %id, "browser sent Close frame");
            break;
        }

        // Protocol-level Ping/Pong frames carry no relay payload; the
        // transport answers them on the sink side.
        let Some(bytes) = framing::browser_to_device(kind, &frame) else {
            continue;
        };

        if let Err(e) = write_half.write_all(&bytes).await {
            warn!(session = %id, error = %e, "write to rover failed");
            break;
        }

        if kind == SessionKind::Control {
            if let WsMessage::Text(command) = &frame {
                debug!(session = %id, command = %command, "forwarded control command");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
