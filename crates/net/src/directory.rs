//! Connection directory
//!
//! Every live connection, its outbound queue, and the identity it has
//! joined with (if any). This is what cleanup consults on disconnect, so
//! bindings here must always move in step with the identity registry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use retro_core::Identity;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Server-assigned connection identifier
pub type ConnectionId = Uuid;

/// Outbound queue feeding a connection's writer task
pub type Outbox = mpsc::Sender<ServerMessage>;

/// A live connection
#[derive(Debug)]
pub struct Peer {
    pub tx: Outbox,
    pub identity: Option<Identity>,
    pub connected_at: DateTime<Utc>,
}

/// A fan-out target copied out of the directory
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: ConnectionId,
    pub tx: Outbox,
    /// Joined display name, `None` for anonymous viewers
    pub viewer: Option<String>,
}

#[derive(Debug, Default)]
pub struct ConnectionDirectory {
    peers: HashMap<ConnectionId, Peer>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new, not yet joined connection
    pub fn register(&mut self, tx: Outbox) -> ConnectionId {
        let id = Uuid::new_v4();
        self.peers.insert(
            id,
            Peer {
                tx,
                identity: None,
                connected_at: Utc::now(),
            },
        );
        id
    }

    /// Remove a connection. Returns `None` if it was already gone.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Peer> {
        self.peers.remove(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.peers.contains_key(id)
    }

    /// Attach an identity. Returns false if the connection is unknown.
    pub fn bind(&mut self, id: &ConnectionId, identity: Identity) -> bool {
        match self.peers.get_mut(id) {
            Some(peer) => {
                peer.identity = Some(identity);
                true
            }
            None => false,
        }
    }

    /// Detach and return the connection's identity
    pub fn unbind(&mut self, id: &ConnectionId) -> Option<Identity> {
        self.peers.get_mut(id).and_then(|peer| peer.identity.take())
    }

    pub fn identity_of(&self, id: &ConnectionId) -> Option<&Identity> {
        self.peers.get(id).and_then(|peer| peer.identity.as_ref())
    }

    pub fn sender(&self, id: &ConnectionId) -> Option<Outbox> {
        self.peers.get(id).map(|peer| peer.tx.clone())
    }

    /// Copy of every live connection, for iterating without the lock
    pub fn recipients(&self) -> Vec<Recipient> {
        self.peers
            .iter()
            .map(|(id, peer)| Recipient {
                id: *id,
                tx: peer.tx.clone(),
                viewer: peer.identity.as_ref().map(|i| i.name.clone()),
            })
            .collect()
    }

    /// All bound identities
    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.peers.values().filter_map(|peer| peer.identity.as_ref())
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbox() -> Outbox {
        mpsc::channel(1).0
    }

    #[test]
    fn test_register_bind_unbind() {
        let mut directory = ConnectionDirectory::new();
        let id = directory.register(outbox());
        assert_eq!(directory.identity_of(&id), None);

        let alice = Identity::new("Alice", "#f00").unwrap();
        assert!(directory.bind(&id, alice.clone()));
        assert_eq!(directory.identity_of(&id), Some(&alice));

        assert_eq!(directory.unbind(&id), Some(alice));
        assert_eq!(directory.unbind(&id), None);
        assert!(directory.contains(&id));
    }

    #[test]
    fn test_bind_unknown_connection() {
        let mut directory = ConnectionDirectory::new();
        let alice = Identity::new("Alice", "#f00").unwrap();
        assert!(!directory.bind(&Uuid::new_v4(), alice));
    }

    #[test]
    fn test_remove_happens_once() {
        let mut directory = ConnectionDirectory::new();
        let id = directory.register(outbox());

        assert!(directory.remove(&id).is_some());
        assert!(directory.remove(&id).is_none());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_recipients_carry_viewer_names() {
        let mut directory = ConnectionDirectory::new();
        let anonymous = directory.register(outbox());
        let joined = directory.register(outbox());
        directory.bind(&joined, Identity::new("Bob", "#0f0").unwrap());

        let recipients = directory.recipients();
        assert_eq!(recipients.len(), 2);

        let viewer_of = |id| {
            recipients
                .iter()
                .find(|r| r.id == id)
                .and_then(|r| r.viewer.clone())
        };
        assert_eq!(viewer_of(anonymous), None);
        assert_eq!(viewer_of(joined), Some("Bob".to_string()));
        assert_eq!(directory.identities().count(), 1);
    }
}
