//! Infrastructure layer for rover-bridge.
//!
//! The infrastructure layer handles all I/O: accepting WebSocket connections
//! from browsers, opening TCP connections to rovers, relaying bytes between
//! the two, probing reachability, and serving the HTTP status surface.
//!
//! # Responsibilities
//!
//! - Binding a TCP listener for browser WebSocket connections
//! - Performing the WebSocket HTTP upgrade handshake
//! - Opening the downstream TCP leg with a bounded connect timeout
//! - Running the two forwarding loops of each relay session
//! - Tracking live sessions in the registry and closing them at shutdown
//! - One-shot reachability probes
//! - Serving `/status` and `/ping` over HTTP with permissive CORS
//!
//! # What does NOT belong here?
//!
//! - Framing policy and parameter defaulting (that is the application layer)
//! - Message type definitions (that is `rover-core`)
//! - Configuration parsing (that is done in `main.rs`)

pub mod device_conn;
pub mod http_api;
pub mod probe;
pub mod registry;
pub mod relay;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use http_api::{serve_http_api, ApiState};
pub use probe::{probe_device, ProbeError};
pub use registry::{SessionHandle, SessionRegistry};
pub use ws_server::run_server;
