//! Broadcast fan-out
//!
//! Delivery means pushing onto a connection's bounded outbound queue; the
//! per-connection writer task does the actual socket write. A closed or
//! full queue is a delivery failure: that connection is dropped from the
//! directory right away and the rest still get the message.

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

use crate::directory::{ConnectionId, Recipient};
use crate::hub::Hub;
use crate::protocol::ServerMessage;

impl Hub {
    /// Deliver the same message to every connection
    pub async fn broadcast(&self, msg: ServerMessage) {
        self.broadcast_with(|_| msg.clone()).await;
    }

    /// Deliver a per-viewer message to every connection
    ///
    /// `render` receives the recipient's joined name, or `None` for
    /// anonymous viewers.
    pub async fn broadcast_with<F>(&self, render: F)
    where
        F: Fn(Option<&str>) -> ServerMessage,
    {
        let recipients = self.directory.read().await.recipients();
        let dead = deliver_all(&recipients, render);
        self.drop_connections(dead).await;
    }

    /// Unicast a direct reply. Failures are logged, never retried.
    pub async fn send_to(&self, conn: ConnectionId, msg: ServerMessage) {
        let Some(tx) = self.directory.read().await.sender(&conn) else {
            debug!(conn = %conn, kind = msg.kind(), "Reply to unknown connection dropped");
            return;
        };

        if let Err(e) = tx.try_send(msg) {
            let msg = match &e {
                TrySendError::Full(m) | TrySendError::Closed(m) => m,
            };
            debug!(conn = %conn, kind = msg.kind(), error = %e, "Reply not delivered");
        }
    }

    /// Remove connections and tell everyone else which colors came free
    ///
    /// Announcing a release can itself find more dead connections; those are
    /// handled in the same loop rather than recursively.
    pub(crate) async fn drop_connections(&self, mut pending: Vec<ConnectionId>) {
        while let Some(conn) = pending.pop() {
            let Some(peer) = self.remove(conn).await else {
                continue;
            };
            Hub::log_removed(conn, &peer);

            if let Some(identity) = peer.identity {
                let recipients = self.directory.read().await.recipients();
                let dead = deliver_all(&recipients, |_| {
                    ServerMessage::ColorReleased(identity.color.clone())
                });
                pending.extend(dead);
            }
        }
    }
}

/// Queue a rendered message for each recipient, returning those that failed
fn deliver_all<F>(recipients: &[Recipient], render: F) -> Vec<ConnectionId>
where
    F: Fn(Option<&str>) -> ServerMessage,
{
    let mut dead = Vec::new();

    for recipient in recipients {
        let msg = render(recipient.viewer.as_deref());
        match recipient.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                info!(conn = %recipient.id, kind = msg.kind(), "Outbound queue full, evicting");
                dead.push(recipient.id);
            }
            Err(TrySendError::Closed(msg)) => {
                debug!(conn = %recipient.id, kind = msg.kind(), "Connection gone, evicting");
                dead.push(recipient.id);
            }
        }
    }

    dead
}
