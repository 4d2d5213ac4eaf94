//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It can be constructed from CLI arguments (preferred for production) or from
//! sensible defaults (useful for local development and tests).
//!
//! Configuration stays a plain struct: no global state, no environment
//! variable reads inside the domain.  The infrastructure layer populates the
//! struct from CLI args or environment variables, which keeps the bridge
//! easy to embed in tests.

use std::net::SocketAddr;
use std::time::Duration;

use rover_core::SessionKind;

/// All runtime configuration for the Rover32 bridge.
///
/// Build this struct once at startup (via CLI args or defaults) and then wrap
/// it in an `Arc` so it can be shared cheaply across all session tasks.
///
/// # Example
///
/// ```rust
/// use rover_bridge::domain::BridgeConfig;
///
/// // Defaults are suitable for local development:
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 8080);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The address and port the WebSocket bridge listener binds to.
    pub ws_bind_addr: SocketAddr,

    /// The address and port of the out-of-band HTTP status surface.
    ///
    /// Serves `/status` and `/ping` only; the relay data path never touches
    /// this listener.
    pub http_bind_addr: SocketAddr,

    /// Device address used when a browser omits the `ip` query parameter.
    ///
    /// The external vehicle registry normally supplies the address per
    /// request; this fallback exists for direct/manual connections.
    pub default_device_ip: String,

    /// The rover's camera stream port.  Also the port the reachability
    /// prober dials.
    pub camera_port: u16,

    /// The rover's control channel port.
    pub control_port: u16,

    /// Maximum time to wait for the downstream TCP connect before reporting
    /// the device unreachable to the browser.
    pub connect_timeout: Duration,

    /// Maximum time a reachability probe may take before the device is
    /// reported offline.
    pub probe_timeout: Duration,

    /// How long shutdown waits for active sessions to drain before dropping
    /// whatever is left.
    pub shutdown_grace: Duration,
}

impl BridgeConfig {
    /// The fixed downstream port for a session kind.
    pub fn downstream_port(&self, kind: SessionKind) -> u16 {
        match kind {
            SessionKind::Camera => self.camera_port,
            SessionKind::Control => self.control_port,
        }
    }
}

impl Default for BridgeConfig {
    /// Returns a `BridgeConfig` suitable for local development without any
    /// external configuration.
    ///
    /// | Field             | Default          |
    /// |-------------------|------------------|
    /// | ws_bind_addr      | `0.0.0.0:8080`   |
    /// | http_bind_addr    | `0.0.0.0:8081`   |
    /// | default_device_ip | `192.168.1.1`    |
    /// | camera_port       | `8000`           |
    /// | control_port      | `8001`           |
    /// | connect_timeout   | 5 seconds        |
    /// | probe_timeout     | 2 seconds        |
    /// | shutdown_grace    | 3 seconds        |
    fn default() -> Self {
        Self {
            // The `.parse().unwrap()` calls here are safe because these are
            // compile-time-known valid socket address strings.
            ws_bind_addr: "0.0.0.0:8080".parse().unwrap(),
            http_bind_addr: "0.0.0.0:8081".parse().unwrap(),
            default_device_ip: "192.168.1.1".to_string(),
            camera_port: 8000,
            control_port: 8001,
            connect_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(3),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
