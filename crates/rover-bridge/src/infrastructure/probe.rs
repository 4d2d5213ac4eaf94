//! One-shot TCP reachability probe.
//!
//! A rover is "online" when its camera port accepts a TCP connection.  The
//! probe opens one connection, closes it immediately on success, and absorbs
//! every failure mode (refusal, unreachable network, timeout) into a single
//! typed error.  One call, one timeout, one exit point per outcome; it
//! cannot complete twice.
//!
//! The probe shares no state with relay sessions; its only side effect is the
//! transient socket.

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Why a probe concluded the device is unreachable.
///
/// Callers that only need the boolean use `.is_ok()`; the WebSocket ping
/// path forwards the description to the browser as the `error` field.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No connect result within the probe's time budget.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// The connect attempt itself failed (refused, unreachable, ...).
    #[error("{0}")]
    Connect(#[from] std::io::Error),
}

/// Probes `host:port` once, with `limit` as the overall time budget.
///
/// `Ok(())` means the device accepted a TCP connection; the connection is
/// closed before returning and never reused.  No retries are made: online
/// status is inherently momentary, and the caller decides how often to ask.
pub async fn probe_device(host: &str, port: u16, limit: Duration) -> Result<(), ProbeError> {
    match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            debug!(host, port, "probe succeeded");
            // Dropping the stream closes the socket; the probe never holds on.
            drop(stream);
            Ok(())
        }
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "probe failed");
            Err(ProbeError::Connect(e))
        }
        Err(_) => {
            debug!(host, port, ?limit, "probe timed out");
            Err(ProbeError::Timeout(limit))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
