//! # rover-core
//!
//! Shared library for the Rover32 bridge containing the pure domain types:
//! session kinds, the browser-facing control-plane message shapes, and the
//! relay session state machine.
//!
//! This crate is used by the bridge binary and by its integration tests.
//! It has zero dependencies on OS APIs, async runtimes, or network sockets —
//! everything here can be unit tested without opening a single connection.
//!
//! # Background
//!
//! A Rover32 vehicle exposes two raw TCP services:
//!
//! - a **camera** port streaming opaque binary video frames, and
//! - a **control** port accepting newline-terminated text commands.
//!
//! Browsers cannot open raw TCP sockets, so the bridge pairs each browser
//! WebSocket connection with one TCP connection to the rover and forwards
//! bytes in both directions.  The types in this crate describe *which* kind
//! of pairing a browser asked for ([`SessionKind`], [`RequestedKind`]), the
//! JSON envelopes the bridge sends back on the control plane
//! ([`BridgeToBrowserMsg`]), and the lifecycle of one pairing
//! ([`SessionState`]).

pub mod kind;
pub mod messages;
pub mod session;

// Re-export the most-used types at the crate root so callers can write
// `rover_core::SessionKind` instead of `rover_core::kind::SessionKind`.
pub use kind::{RequestedKind, SessionKind, UnknownKindError};
pub use messages::BridgeToBrowserMsg;
pub use session::SessionState;
