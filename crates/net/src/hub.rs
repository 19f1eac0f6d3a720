//! Shared hub state
//!
//! The board, the identity registry and the connection directory are three
//! independently locked resources. When both the registry and the directory
//! are needed they are always locked in that order (registry, then
//! directory) so a claim and its binding change together. The board lock is
//! never held together with either of the others, and no lock is held while
//! a message is queued for delivery.

use retro_core::invariants::assert_claims_consistent;
use retro_core::{BoardSnapshot, BoardStore, BoardView, Identity, IdentityRegistry, Projector};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{DeleteAuth, ServerConfig};
use crate::directory::{ConnectionDirectory, ConnectionId, Outbox, Peer};
use crate::error::{Error, Result};

/// Counts reported by the stats timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub cards: usize,
    pub connections: usize,
    pub identities: usize,
}

/// Process-wide shared state behind the sessions
#[derive(Debug, Default)]
pub struct Hub {
    pub(crate) board: RwLock<BoardStore>,
    pub(crate) identities: RwLock<IdentityRegistry>,
    pub(crate) directory: RwLock<ConnectionDirectory>,
    projector: Projector,
    delete_auth: DeleteAuth,
}

impl Hub {
    pub fn new(projector: Projector, delete_auth: DeleteAuth) -> Self {
        Self {
            board: RwLock::new(BoardStore::new()),
            identities: RwLock::new(IdentityRegistry::new()),
            directory: RwLock::new(ConnectionDirectory::new()),
            projector,
            delete_auth,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(Projector::new(config.redaction), config.delete_auth)
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn delete_auth(&self) -> DeleteAuth {
        self.delete_auth
    }

    /// Register a new anonymous connection
    pub async fn connect(&self, tx: Outbox) -> ConnectionId {
        let id = self.directory.write().await.register(tx);
        debug!(conn = %id, "Connection registered");
        id
    }

    /// Claim an identity and bind it to `conn` in one step
    pub async fn claim(&self, conn: ConnectionId, identity: &Identity) -> Result<()> {
        let mut identities = self.identities.write().await;
        let mut directory = self.directory.write().await;

        if !directory.contains(&conn) {
            return Err(Error::ConnectionClosed);
        }
        if directory.identity_of(&conn).is_some() {
            return Err(retro_core::Error::AlreadyJoined.into());
        }

        identities.try_claim(identity)?;
        directory.bind(&conn, identity.clone());

        assert_claims_consistent(&identities, directory.identities());
        Ok(())
    }

    /// Unbind `conn` and release its claims. Returns what it held.
    pub async fn release(&self, conn: ConnectionId) -> Option<Identity> {
        let mut identities = self.identities.write().await;
        let mut directory = self.directory.write().await;

        let identity = directory.unbind(&conn)?;
        identities.release(&identity);

        assert_claims_consistent(&identities, directory.identities());
        Some(identity)
    }

    /// Remove `conn` from the directory and release its claims
    ///
    /// Only the first call for a connection returns the peer, which makes
    /// the caller that gets it the one responsible for announcing the
    /// released color.
    pub(crate) async fn remove(&self, conn: ConnectionId) -> Option<Peer> {
        let mut identities = self.identities.write().await;
        let mut directory = self.directory.write().await;

        let peer = directory.remove(&conn)?;
        if let Some(identity) = &peer.identity {
            identities.release(identity);
        }

        assert_claims_consistent(&identities, directory.identities());
        Some(peer)
    }

    /// Terminate a connection: unbind, release, announce. Idempotent.
    pub async fn disconnect(&self, conn: ConnectionId) {
        self.drop_connections(vec![conn]).await;
    }

    pub async fn identity_of(&self, conn: ConnectionId) -> Option<Identity> {
        self.directory.read().await.identity_of(&conn).cloned()
    }

    /// The directory's view of `conn`: `None` once it has been removed,
    /// otherwise the identity it is bound to, if any
    pub async fn binding(&self, conn: ConnectionId) -> Option<Option<Identity>> {
        let directory = self.directory.read().await;
        directory
            .contains(&conn)
            .then(|| directory.identity_of(&conn).cloned())
    }

    /// Full copy of the board with the currently used colors attached
    pub async fn snapshot(&self) -> BoardSnapshot {
        let snapshot = self.board.read().await.snapshot();
        let colors: Vec<String> = self
            .identities
            .read()
            .await
            .used_colors()
            .map(str::to_string)
            .collect();
        snapshot.with_used_colors(colors)
    }

    /// The board as `viewer` should see it
    pub async fn board_view(&self, viewer: Option<&str>) -> BoardView {
        let snapshot = self.snapshot().await;
        self.projector.board_view(&snapshot, viewer)
    }

    pub async fn connection_count(&self) -> usize {
        self.directory.read().await.len()
    }

    pub async fn stats(&self) -> HubStats {
        let cards = self.board.read().await.len();
        let identities = self.identities.read().await.len();
        let connections = self.directory.read().await.len();
        HubStats {
            cards,
            connections,
            identities,
        }
    }

    pub(crate) fn log_removed(conn: ConnectionId, peer: &Peer) {
        let seconds = (chrono::Utc::now() - peer.connected_at).num_seconds();
        match &peer.identity {
            Some(identity) => info!(
                conn = %conn,
                username = %identity.name,
                color = %identity.color,
                connected_secs = seconds,
                "Connection removed, identity released"
            ),
            None => debug!(conn = %conn, connected_secs = seconds, "Connection removed"),
        }
    }
}
