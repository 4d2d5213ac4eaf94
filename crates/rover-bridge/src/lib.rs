//! rover-bridge library crate.
//!
//! This crate provides a WebSocket-to-TCP bridge that lets web browsers reach
//! a Rover32 vehicle's two raw TCP services: the binary camera stream and the
//! newline-terminated text control channel.  It also carries a bounded TCP
//! reachability prober and a small out-of-band HTTP status surface.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (WebSocket: binary camera frames / text commands / JSON control plane)
//!         ↕
//! [rover-bridge]
//!   ├── domain/           BridgeConfig (pure, no I/O)
//!   ├── application/      Handshake-parameter parsing, per-kind framing policy
//!   └── infrastructure/
//!         ├── ws_server/  Accept loop + dispatcher (tokio-tungstenite)
//!         ├── relay/      Relay session: two forwarding loops, close propagation
//!         ├── device_conn/ Bounded-timeout TCP connect to the rover
//!         ├── registry/   Concurrent session registry (insert/remove/close_all)
//!         ├── probe/      One-shot TCP reachability probe
//!         └── http_api/   axum /status and /ping endpoints
//!         ↕
//! Rover32 (raw TCP: camera port 8000, control port 8001)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no external dependencies (no I/O, no async, no frameworks).
//! - `application` depends on `domain` and `rover-core` only (plus the
//!   WebSocket `Message` type it classifies).
//! - `infrastructure` depends on all other layers plus `tokio`, `tungstenite`,
//!   and `axum`.

/// Domain layer: pure configuration types (no I/O).
pub mod domain;

/// Application layer: handshake-parameter parsing and framing policy.
pub mod application;

/// Infrastructure layer: listeners, relay sessions, registry, prober, HTTP API.
pub mod infrastructure;
