//! Registry of open WebSocket sessions and directed delivery.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use metrics::counter;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::metrics::RELAY_SENDS_DROPPED_TOTAL;

/// Opaque per-session identifier, unique for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Fresh time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws_{}", self.0.simple())
    }
}

/// Outbound side of one session.
pub struct ClientConnection {
    /// Session identifier.
    pub id: ConnectionId,
    tx: mpsc::Sender<String>,
    connected_at: Instant,
}

impl ClientConnection {
    /// Wrap the sender feeding this session's write loop.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
        }
    }

    /// When the session was opened.
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }
}

/// Result of a directed send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for the session's writer.
    Delivered,
    /// No session with that id is registered.
    NotRegistered,
    /// Registered, but its writer has gone away.
    Closed,
}

/// Maps session ids to their outbound channels.
///
/// Sharded, so sends to one session never wait behind another session's
/// registration or removal.
pub struct SessionRegistry {
    connections: DashMap<ConnectionId, Arc<ClientConnection>>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a session. Returns `false` if the id was already present.
    pub fn add(&self, connection: Arc<ClientConnection>) -> bool {
        let id = connection.id;
        let inserted = self.connections.insert(id, connection).is_none();
        debug!(conn_id = %id, inserted, "session registered");
        inserted
    }

    /// Remove a session. Safe to call more than once.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        let removed = self.connections.remove(id).map(|(_, c)| c);
        if removed.is_some() {
            debug!(conn_id = %id, "session removed");
        }
        removed
    }

    /// Deliver `text` to exactly the session `id`.
    ///
    /// Unknown or closed sessions are a silent no-op for the caller; the
    /// outcome is returned so the relay can stop its turn.
    pub async fn send(&self, id: &ConnectionId, text: String) -> SendOutcome {
        // Release the shard guard before awaiting on the channel.
        let Some(conn) = self.connections.get(id).map(|c| Arc::clone(c.value())) else {
            counter!(RELAY_SENDS_DROPPED_TOTAL).increment(1);
            return SendOutcome::NotRegistered;
        };
        if conn.tx.send(text).await.is_ok() {
            SendOutcome::Delivered
        } else {
            counter!(RELAY_SENDS_DROPPED_TOTAL).increment(1);
            SendOutcome::Closed
        }
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
