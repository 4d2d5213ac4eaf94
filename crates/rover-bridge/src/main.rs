//! Rover32 WebSocket bridge — entry point.
//!
//! This binary accepts WebSocket connections from web browsers and proxies
//! them to a Rover32 vehicle's raw TCP services: the binary camera stream and
//! the newline-terminated text control channel.  It also answers rover
//! reachability checks, both over WebSocket (`type=ping`) and over a small
//! HTTP surface (`GET /ping`).
//!
//! # Why a separate bridge process?
//!
//! Web browsers can only communicate over HTTP/WebSocket — they cannot open
//! raw TCP sockets.  The rover firmware speaks raw TCP only.  This bridge
//! sits between the two so the web dashboard can stream video and drive the
//! vehicle without any native client software.
//!
//! # Usage
//!
//! ```text
//! rover-bridge [OPTIONS]
//!
//! Options:
//!   --ws-port            <PORT>  WebSocket listener port [default: 8080]
//!   --http-port          <PORT>  HTTP status surface port [default: 8081]
//!   --bind               <ADDR>  Bind address for both listeners [default: 0.0.0.0]
//!   --default-device-ip  <ADDR>  Device address when `ip` is omitted [default: 192.168.1.1]
//!   --camera-port        <PORT>  Rover camera port [default: 8000]
//!   --control-port       <PORT>  Rover control port [default: 8001]
//!   --connect-timeout-ms <MS>    Downstream connect timeout [default: 5000]
//!   --probe-timeout-ms   <MS>    Reachability probe timeout [default: 2000]
//!   --shutdown-grace-ms  <MS>    Session drain budget at shutdown [default: 3000]
//! ```
//!
//! Every option can also be set via a `ROVER_*` environment variable (CLI
//! args take precedence when both are present).
//!
//! # Architecture overview
//!
//! ```text
//! Web Browser  (WebSocket: binary camera frames / text commands / JSON control plane)
//!       ↕
//! rover-bridge  ← this process
//!   domain/          BridgeConfig
//!   application/     query-parameter parsing, framing policy
//!   infrastructure/
//!     ws_server/     accept + dispatch (camera | control | ping)
//!     relay/         per-session forwarding loops + close propagation
//!     registry/      live-session map (bulk close at shutdown)
//!     probe/         bounded TCP reachability check
//!     http_api/      GET /status, GET /ping
//!       ↕
//! Rover32  (raw TCP: camera :8000, control :8001)
//! ```

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rover_bridge::domain::BridgeConfig;
use rover_bridge::infrastructure::{run_server, serve_http_api, ApiState, SessionRegistry};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rover32 WebSocket bridge.
///
/// Accepts WebSocket connections from browsers and proxies them to a rover's
/// camera and control TCP ports.
#[derive(Debug, Parser)]
#[command(
    name = "rover-bridge",
    about = "WebSocket-to-TCP bridge for Rover32 vehicles",
    version
)]
struct Cli {
    /// TCP port for the WebSocket bridge to listen on.
    ///
    /// Browsers connect to this port via WebSocket
    /// (ws://host:PORT/?type=camera&ip=ROVER_IP).
    #[arg(long, default_value_t = 8080, env = "ROVER_WS_PORT")]
    ws_port: u16,

    /// TCP port for the out-of-band HTTP status surface (/status, /ping).
    #[arg(long, default_value_t = 8081, env = "ROVER_HTTP_PORT")]
    http_port: u16,

    /// IP address to bind both listeners to.
    ///
    /// Use `0.0.0.0` to accept connections from any network interface, or
    /// `127.0.0.1` to accept only local connections.
    #[arg(long, default_value = "0.0.0.0", env = "ROVER_BIND")]
    bind: String,

    /// Device address used when a browser omits the `ip` query parameter.
    #[arg(long, default_value = "192.168.1.1", env = "ROVER_DEFAULT_DEVICE_IP")]
    default_device_ip: String,

    /// The rover's camera stream port.  Reachability probes dial this port.
    #[arg(long, default_value_t = 8000, env = "ROVER_CAMERA_PORT")]
    camera_port: u16,

    /// The rover's control channel port.
    #[arg(long, default_value_t = 8001, env = "ROVER_CONTROL_PORT")]
    control_port: u16,

    /// Downstream TCP connect timeout in milliseconds.
    #[arg(long, default_value_t = 5000, env = "ROVER_CONNECT_TIMEOUT_MS")]
    connect_timeout_ms: u64,

    /// Reachability probe timeout in milliseconds.
    #[arg(long, default_value_t = 2000, env = "ROVER_PROBE_TIMEOUT_MS")]
    probe_timeout_ms: u64,

    /// How long shutdown waits for active sessions to drain, in milliseconds.
    #[arg(long, default_value_t = 3000, env = "ROVER_SHUTDOWN_GRACE_MS")]
    shutdown_grace_ms: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address, so that a typo
    /// fails at startup instead of binding something unexpected.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let ws_bind_addr: SocketAddr = format!("{}:{}", self.bind, self.ws_port)
            .parse()
            .with_context(|| {
                format!("invalid WebSocket bind address: '{}:{}'", self.bind, self.ws_port)
            })?;

        let http_bind_addr: SocketAddr = format!("{}:{}", self.bind, self.http_port)
            .parse()
            .with_context(|| {
                format!("invalid HTTP bind address: '{}:{}'", self.bind, self.http_port)
            })?;

        Ok(BridgeConfig {
            ws_bind_addr,
            http_bind_addr,
            default_device_ip: self.default_device_ip,
            camera_port: self.camera_port,
            control_port: self.control_port,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `EnvFilter::try_from_default_env()` reads the `RUST_LOG` environment
    // variable.  If it is absent or invalid, fall back to `info` level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_bridge_config()?;

    info!(
        "Rover32 bridge starting — ws={}, http={}",
        config.ws_bind_addr, config.http_bind_addr
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    //
    // The accept loop checks this flag every 200 ms and exits cleanly once it
    // is cleared.  `Relaxed` ordering is enough: the value only needs to
    // propagate eventually.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let registry = Arc::new(SessionRegistry::new());

    // ── HTTP status surface ───────────────────────────────────────────────────
    //
    // Runs on its own listener and task; it shares nothing with the relay
    // path, so it just dies with the process at exit.
    let http_listener = tokio::net::TcpListener::bind(config.http_bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", config.http_bind_addr))?;
    let api_state = ApiState {
        camera_port: config.camera_port,
        probe_timeout: config.probe_timeout,
    };
    tokio::spawn(async move {
        if let Err(e) = serve_http_api(http_listener, api_state).await {
            tracing::error!("HTTP status surface failed: {e:#}");
        }
    });

    // ── Main bridge loop ──────────────────────────────────────────────────────
    let ws_listener = tokio::net::TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.ws_bind_addr))?;

    log_usage(&config);

    let config = Arc::new(config);
    run_server(
        ws_listener,
        Arc::clone(&config),
        Arc::clone(&registry),
        running,
    )
    .await?;

    // The accept loop has stopped; close whatever sessions are still up.
    drain_sessions(&registry, config.shutdown_grace).await;

    info!("Rover32 bridge stopped");
    Ok(())
}

// ── Shutdown ──────────────────────────────────────────────────────────────────

/// Closes all registered sessions and waits for them to deregister
/// themselves, bounded by `grace`.  Sessions that miss the deadline are
/// abandoned to process exit.
async fn drain_sessions(registry: &SessionRegistry, grace: Duration) {
    let open = registry.len();
    if open == 0 {
        return;
    }

    info!("closing {open} active session(s)");
    registry.close_all();

    let deadline = tokio::time::Instant::now() + grace;
    while !registry.is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let remaining = registry.len();
    if remaining > 0 {
        warn!("{remaining} session(s) did not close within {grace:?}; dropping them");
    }
}

/// Logs example connection URLs, one per kind.
fn log_usage(config: &BridgeConfig) {
    let port = config.ws_bind_addr.port();
    info!("usage:");
    info!("  camera:  ws://<host>:{port}/?type=camera&ip=<rover-ip>");
    info!("  control: ws://<host>:{port}/?type=control&ip=<rover-ip>");
    info!("  ping:    ws://<host>:{port}/?type=ping&ip=<rover-ip>");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
