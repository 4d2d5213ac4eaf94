//! JSON control-plane messages sent from the bridge to the browser.
//!
//! The relay payload itself is never wrapped: camera bytes travel as
//! WebSocket binary frames and control-channel bytes as text frames, exactly
//! as they arrive from the rover.  The bridge only speaks JSON at three
//! well-defined moments of a connection's life:
//!
//! - after the downstream TCP connect succeeds (`connected` acknowledgement),
//! - when the downstream TCP connect fails (`error` report), and
//! - as the single reply to a `type=ping` request.
//!
//! # Wire shapes
//!
//! ```json
//! {"status":"connected","type":"control"}
//! {"error":"connection refused"}
//! {"online":true,"ip":"192.168.1.7"}
//! {"online":false,"ip":"192.168.1.7","error":"connect timed out after 2s"}
//! ```
//!
//! These shapes are heterogeneous (there is no shared discriminant field), so
//! the enum is `#[serde(untagged)]` and each variant carries exactly the
//! fields of its wire shape.  Variant order matters for deserialization:
//! `PingResult` must be tried before `ConnectError`, because a ping failure
//! also contains an `error` field.
//!
//! Browser-to-bridge traffic has no JSON envelope at all (whatever the
//! browser sends is relay payload), so there is no companion enum for the
//! opposite direction.

use serde::{Deserialize, Serialize};

use crate::kind::SessionKind;

/// A control-plane message from the bridge to a browser client.
///
/// Construct via [`BridgeToBrowserMsg::connected`],
/// [`BridgeToBrowserMsg::connect_error`], or the ping helpers, which pin the
/// constant fields (e.g. `status` is always `"connected"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeToBrowserMsg {
    /// Downstream TCP connect succeeded; relaying is about to begin.
    Connected {
        /// Always the literal `"connected"`.
        status: String,
        /// The session kind being acknowledged.
        #[serde(rename = "type")]
        kind: SessionKind,
    },

    /// Reply to a `type=ping` request.
    PingResult {
        /// Whether the rover accepted a TCP connection within the probe timeout.
        online: bool,
        /// The probed address, echoed back so the browser can match replies
        /// to vehicles.
        ip: String,
        /// Failure detail when `online` is `false`; omitted from the JSON
        /// when absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Downstream TCP connect failed; the bridge closes the connection after
    /// sending this.
    ConnectError {
        /// Human-readable description of the failure.
        error: String,
    },
}

impl BridgeToBrowserMsg {
    /// The acknowledgement sent once the downstream leg is connected.
    pub fn connected(kind: SessionKind) -> Self {
        BridgeToBrowserMsg::Connected {
            status: "connected".to_string(),
            kind,
        }
    }

    /// The error report sent when the downstream connect fails.
    pub fn connect_error(description: impl Into<String>) -> Self {
        BridgeToBrowserMsg::ConnectError {
            error: description.into(),
        }
    }

    /// A successful ping reply.
    pub fn ping_online(ip: impl Into<String>) -> Self {
        BridgeToBrowserMsg::PingResult {
            online: true,
            ip: ip.into(),
            error: None,
        }
    }

    /// A failed ping reply, with the probe's failure description.
    pub fn ping_offline(ip: impl Into<String>, error: impl Into<String>) -> Self {
        BridgeToBrowserMsg::PingResult {
            online: false,
            ip: ip.into(),
            error: Some(error.into()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
