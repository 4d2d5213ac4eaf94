//! Domain layer for rover-bridge.
//!
//! The domain layer contains pure types that have no dependencies on I/O,
//! networking, or external frameworks, so they can be tested in isolation.
//!
//! # What belongs in the domain layer?
//!
//! - Configuration structures
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - File I/O or environment variable reading
//! - Anything that could block or fail due to external state
//!
//! The message types and session kinds that the bridge shares with its tests
//! live in the `rover-core` crate rather than here.

pub mod config;

pub use config::BridgeConfig;
