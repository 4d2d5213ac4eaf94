//! Handshake parameter parsing.
//!
//! Browsers select a target rover and session kind with query parameters on
//! the WebSocket handshake URI:
//!
//! ```text
//! ws://bridge:8080/?type=camera&ip=192.168.1.7
//! ```
//!
//! Both parameters are optional.  A missing `ip` falls back to the configured
//! default device address; a missing or unrecognized `type` falls back to
//! `control`.  These functions are pure so the defaulting rules can be unit
//! tested without a handshake.

use tracing::warn;
use url::Url;

use rover_core::{RequestedKind, SessionKind};

/// The resolved connection parameters for one upstream connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    /// Target device address (host or IP), already defaulted.
    pub device_ip: String,
    /// What the browser asked for, already defaulted.
    pub kind: RequestedKind,
}

/// Parses the `ip` and `type` query parameters from a handshake request URI.
///
/// `request_uri` is the raw URI from the HTTP upgrade request, e.g.
/// `/?type=camera&ip=192.168.1.7`.  An unparsable URI yields the defaults:
/// by the time the handshake has succeeded there is nothing useful to do
/// with a malformed query string except ignore it.
pub fn parse_request_params(request_uri: &str, default_device_ip: &str) -> RequestParams {
    let mut device_ip = default_device_ip.to_string();
    let mut kind = RequestedKind::Bridge(SessionKind::Control);

    // The handshake URI is origin-form (`/path?query`); a synthetic base
    // makes it absolute so `Url` will parse it.
    let parsed = Url::parse(&format!("ws://bridge{request_uri}"));
    let Ok(parsed) = parsed else {
        warn!(uri = request_uri, "unparsable handshake URI; applying defaults");
        return RequestParams { device_ip, kind };
    };

    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "ip" if !value.is_empty() => device_ip = value.into_owned(),
            "type" => match value.parse::<RequestedKind>() {
                Ok(parsed_kind) => kind = parsed_kind,
                Err(e) => warn!(error = %e, "falling back to control"),
            },
            _ => {}
        }
    }

    RequestParams { device_ip, kind }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
