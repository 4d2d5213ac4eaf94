//! Per-kind framing policy.
//!
//! The bridge never interprets relay payload; it only decides how bytes are
//! wrapped when they change transport:
//!
//! | Direction        | Camera                    | Control                         |
//! |------------------|---------------------------|---------------------------------|
//! | rover → browser  | one Binary frame per read | one Text frame per read (lossy) |
//! | browser → rover  | raw bytes, unmodified     | raw bytes + one trailing `\n`   |
//!
//! Chunk boundaries carry no meaning: a "frame" is whatever one TCP read
//! returned.  The rover's control firmware splits commands on `\n`, which is
//! why exactly one terminator is appended per browser message, and never for
//! camera sessions, whose reverse direction is best-effort passthrough.
//!
//! These functions are pure (no I/O); the forwarding loops in
//! `infrastructure::relay` call them on every chunk.

use tokio_tungstenite::tungstenite::Message as WsMessage;

use rover_core::SessionKind;

/// Wraps one chunk of rover TCP bytes as a WebSocket message.
///
/// Camera bytes are opaque binary.  Control bytes are text on the wire; any
/// invalid UTF-8 is replaced rather than dropped so a glitched rover reply
/// still reaches the browser.
pub fn device_to_browser(kind: SessionKind, bytes: &[u8]) -> WsMessage {
    match kind {
        SessionKind::Camera => WsMessage::Binary(bytes.to_vec()),
        SessionKind::Control => WsMessage::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Converts one browser WebSocket message into the bytes to write to the
/// rover, or `None` when the frame carries no relay payload (protocol-level
/// Ping/Pong/Close frames, which the transport layer answers itself).
pub fn browser_to_device(kind: SessionKind, msg: &WsMessage) -> Option<Vec<u8>> {
    let payload: &[u8] = match msg {
        WsMessage::Text(text) => text.as_bytes(),
        WsMessage::Binary(bytes) => bytes.as_slice(),
        _ => return None,
    };

    match kind {
        SessionKind::Control => {
            let mut out = Vec::with_capacity(payload.len() + 1);
            out.extend_from_slice(payload);
            out.push(b'\n');
            Some(out)
        }
        SessionKind::Camera => Some(payload.to_vec()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
