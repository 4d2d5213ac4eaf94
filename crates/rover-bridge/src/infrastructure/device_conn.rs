//! TCP connection management for the rover (the downstream leg).
//!
//! Each browser WebSocket session gets its own TCP connection to the rover;
//! a session's downstream handle points at exactly one device for its entire
//! life.  The rover speaks raw bytes on both ports, so there is no message
//! codec here; this module only establishes the connection and hands the
//! split halves to the relay's two forwarding loops.
//!
//! The connect is bounded: an unreachable rover must turn into a structured
//! error for the browser within the configured timeout, never a hung
//! handshake.

use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

/// The downstream leg of a relay session: one TCP connection to the rover,
/// already split so each half can move into its own forwarding task.
#[derive(Debug)]
pub struct DeviceConnection {
    /// Read half of the rover TCP stream (rover → browser direction).
    pub read_half: OwnedReadHalf,
    /// Write half of the rover TCP stream (browser → rover direction).
    pub write_half: OwnedWriteHalf,
}

impl DeviceConnection {
    /// Opens a new TCP connection to the rover at `host:port`, bounded by
    /// `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connect fails (rover offline, wrong address,
    /// firewall) or if no result arrives within `limit`.  The error text is
    /// what the dispatcher reports to the browser, so both paths carry the
    /// target address.
    pub async fn connect(host: &str, port: u16, limit: Duration) -> anyhow::Result<Self> {
        let stream = tokio::time::timeout(limit, TcpStream::connect((host, port)))
            .await
            .map_err(|_| anyhow!("connect to {host}:{port} timed out after {limit:?}"))?
            .with_context(|| format!("failed to connect to rover at {host}:{port}"))?;

        debug!(host, port, "downstream TCP connection established");

        // Split into independent read and write halves so we can pass each to
        // a separate async task without shared ownership.
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            read_half,
            write_half,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
