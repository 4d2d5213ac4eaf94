//! Application layer for rover-bridge.
//!
//! The application layer holds the bridge's decision logic: it knows *what*
//! to forward and in which shape, but delegates all socket work to the
//! infrastructure layer.
//!
//! # Responsibilities
//!
//! - Parsing the `ip` / `type` query parameters off the WebSocket handshake
//!   URI, including the defaulting rules
//! - The per-kind framing policy: how rover TCP bytes become WebSocket
//!   messages and vice versa (the control channel's trailing `\n` lives here)
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - Tokio task spawning (that happens in the infrastructure layer)
//! - WebSocket frame encoding (handled by tokio-tungstenite)

pub mod framing;
pub mod params;

pub use framing::{browser_to_device, device_to_browser};
pub use params::{parse_request_params, RequestParams};
