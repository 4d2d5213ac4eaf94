//! The session registry: the only state shared across connection tasks.
//!
//! Every active relay session has exactly one entry, inserted by the
//! dispatcher after the downstream connect succeeds and removed by the
//! session's own teardown path.  The registry is iterated in one place only:
//! bulk close at process shutdown.
//!
//! All mutation goes through [`SessionRegistry::insert`] and
//! [`SessionRegistry::remove`]; there is no other way to touch a foreign
//! session.  `remove` of an id that is already gone is a silent no-op, which
//! is what makes near-simultaneous close triggers from both legs safe.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Notify;
use uuid::Uuid;

use rover_core::SessionKind;

/// What the registry knows about one live session: enough to identify it in
/// logs and to ask it to close from outside.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Which downstream service the session bridges.
    pub kind: SessionKind,
    /// The rover address the downstream leg is connected to (`host:port`).
    pub device_addr: String,
    /// The browser's socket address.
    pub peer_addr: SocketAddr,
    /// Close signal; the session's run loop selects on it.  Notifying stores
    /// a permit, so a session that has not reached its select yet still sees
    /// the request.
    pub closer: Arc<Notify>,
}

/// Concurrency-safe map from session id to [`SessionHandle`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session.  Ids are v4 UUIDs, so collisions are not a
    /// practical concern; a duplicate insert would replace the entry.
    pub fn insert(&self, id: Uuid, handle: SessionHandle) {
        self.sessions.insert(id, handle);
    }

    /// Deregisters a session.  Returns `true` only for the call that
    /// actually removed the entry; removing an absent id is a silent no-op.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Number of currently registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Asks every registered session to close.  Used only at shutdown; each
    /// session still tears itself down through its normal close path and
    /// deregisters itself.
    pub fn close_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().closer.notify_one();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
