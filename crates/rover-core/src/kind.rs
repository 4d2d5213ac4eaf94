//! Session kinds: which rover TCP service a browser connection bridges to.
//!
//! The `type` query parameter on the WebSocket handshake selects the kind.
//! Two of the values (`camera`, `control`) create a long-lived relay session;
//! the third (`ping`) is a one-shot reachability check that never creates a
//! session.  [`SessionKind`] covers only the relaying kinds so that relay code
//! can never be handed a ping by mistake; [`RequestedKind`] is the full set a
//! browser may ask for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Relaying kinds ────────────────────────────────────────────────────────────

/// The kind of a relay session: which fixed downstream port and framing
/// policy the session uses.
///
/// Serialized in lowercase (`"camera"` / `"control"`) because that is what
/// the browser sends in the `type` query parameter and what the bridge echoes
/// back in the `connected` acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Binary camera stream.  Bytes pass through the bridge opaquely in both
    /// directions; the WebSocket binary framing carries the payload.
    Camera,

    /// Textual control channel.  Device bytes are forwarded to the browser as
    /// text; each browser message is written to the device with exactly one
    /// trailing `\n` appended (the rover expects newline-terminated commands).
    Control,
}

impl SessionKind {
    /// The lowercase wire name, as used in query parameters and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Camera => "camera",
            SessionKind::Control => "control",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Requested kinds ───────────────────────────────────────────────────────────

/// Everything a browser may request in the `type` query parameter.
///
/// `ping` is deliberately not a [`SessionKind`]: it performs one bounded
/// reachability probe, replies with a single JSON message, and closes the
/// connection without ever registering a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedKind {
    /// Create a relay session of the given kind.
    Bridge(SessionKind),
    /// One-shot reachability check against the camera port.
    Ping,
}

/// Error returned when the `type` query parameter holds an unrecognized value.
///
/// The dispatcher treats this the same as an absent parameter (falls back to
/// `control`) but logs the rejected value, so the error carries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown session type {0:?} (expected camera, control, or ping)")]
pub struct UnknownKindError(pub String);

impl FromStr for RequestedKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camera" => Ok(RequestedKind::Bridge(SessionKind::Camera)),
            "control" => Ok(RequestedKind::Bridge(SessionKind::Control)),
            "ping" => Ok(RequestedKind::Ping),
            other => Err(UnknownKindError(other.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_kind_wire_names() {
        assert_eq!(SessionKind::Camera.as_str(), "camera");
        assert_eq!(SessionKind::Control.as_str(), "control");
    }

    #[test]
    fn test_session_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SessionKind::Camera).unwrap(), r#""camera""#);
        assert_eq!(serde_json::to_string(&SessionKind::Control).unwrap(), r#""control""#);
    }

    #[test]
    fn test_session_kind_deserializes_lowercase() {
        let kind: SessionKind = serde_json::from_str(r#""control""#).unwrap();
        assert_eq!(kind, SessionKind::Control);
    }

    #[test]
    fn test_requested_kind_parses_camera() {
        assert_eq!(
            "camera".parse::<RequestedKind>().unwrap(),
            RequestedKind::Bridge(SessionKind::Camera)
        );
    }

    #[test]
    fn test_requested_kind_parses_control() {
        assert_eq!(
            "control".parse::<RequestedKind>().unwrap(),
            RequestedKind::Bridge(SessionKind::Control)
        );
    }

    #[test]
    fn test_requested_kind_parses_ping() {
        assert_eq!("ping".parse::<RequestedKind>().unwrap(), RequestedKind::Ping);
    }

    #[test]
    fn test_requested_kind_rejects_unknown_value() {
        let err = "video".parse::<RequestedKind>().unwrap_err();
        assert_eq!(err, UnknownKindError("video".to_string()));
    }

    #[test]
    fn test_requested_kind_is_case_sensitive() {
        // Wire names are exact; "Camera" is not the camera kind.
        assert!("Camera".parse::<RequestedKind>().is_err());
    }

    #[test]
    fn test_display_matches_wire_name() {
        assert_eq!(SessionKind::Camera.to_string(), "camera");
        assert_eq!(SessionKind::Control.to_string(), "control");
    }
}
