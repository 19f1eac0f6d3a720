//! Per-connection session handler
//!
//! A session starts anonymous (`Connected`), may join with an identity
//! (`Joined`), and ends when `close` consumes it. Messages are handled one
//! at a time; every handler takes the locks it needs for a single mutation,
//! releases them, and only then queues replies or broadcasts.

use std::sync::Arc;

use retro_core::{DeleteOutcome, Identity, Redaction, SortOrder};
use tracing::{debug, info, warn};

use crate::config::DeleteAuth;
use crate::directory::{ConnectionId, Outbox};
use crate::error::Error;
use crate::hub::Hub;
use crate::protocol::{
    CardLiked, ClientMessage, DeleteCard, IdentityClaim, LikeCard, MoveCard, ServerMessage,
};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Joined(Identity),
}

/// Whether the read loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Session {
    id: ConnectionId,
    hub: Arc<Hub>,
    state: SessionState,
}

impl Session {
    /// Register the connection and send it the anonymous board
    pub async fn open(hub: Arc<Hub>, tx: Outbox) -> Self {
        let id = hub.connect(tx).await;
        let view = hub.board_view(None).await;
        hub.send_to(id, ServerMessage::BoardState(view)).await;

        Self {
            id,
            hub,
            state: SessionState::Connected,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn viewer(&self) -> Option<&str> {
        match &self.state {
            SessionState::Joined(identity) => Some(identity.name.as_str()),
            SessionState::Connected => None,
        }
    }

    /// Handle one decoded client message
    ///
    /// The directory decides who this connection is. If fan-out evicted it,
    /// the session stops instead of acting under a released identity.
    pub async fn handle(&mut self, msg: ClientMessage) -> Flow {
        if !self.sync_state().await {
            debug!(conn = %self.id, kind = msg.kind(), "Connection evicted, dropping message");
            return Flow::Stop;
        }

        let flow = match msg {
            ClientMessage::Join(claim) => self.join(claim).await,
            ClientMessage::AddCard(new) => {
                self.add_card(new).await;
                Flow::Continue
            }
            ClientMessage::DeleteCard(req) => {
                self.delete_card(req).await;
                Flow::Continue
            }
            ClientMessage::MoveCard(req) => {
                self.move_card(req).await;
                Flow::Continue
            }
            ClientMessage::Logout(claim) => {
                self.logout(claim).await;
                Flow::Continue
            }
            ClientMessage::ToggleHideContent(hide) => {
                self.toggle_hide_content(hide).await;
                Flow::Continue
            }
            ClientMessage::SortCards(req) => {
                self.sort_cards(&req.sort_order).await;
                Flow::Continue
            }
            ClientMessage::LikeCard(req) => {
                self.like_card(req).await;
                Flow::Continue
            }
            ClientMessage::Ping => {
                self.reply(ServerMessage::Pong).await;
                Flow::Continue
            }
        };

        if flow == Flow::Continue && !self.sync_state().await {
            debug!(conn = %self.id, "Connection evicted while handling message");
            return Flow::Stop;
        }
        flow
    }

    /// Reload the state from the directory. Returns false once the
    /// connection is no longer there.
    async fn sync_state(&mut self) -> bool {
        match self.hub.binding(self.id).await {
            Some(Some(identity)) => {
                self.state = SessionState::Joined(identity);
                true
            }
            Some(None) => {
                self.state = SessionState::Connected;
                true
            }
            None => false,
        }
    }

    /// Run cleanup. Safe even if the hub already evicted this connection.
    pub async fn close(self) {
        self.hub.disconnect(self.id).await;
    }

    async fn reply(&self, msg: ServerMessage) {
        self.hub.send_to(self.id, msg).await;
    }

    async fn reply_error(&self, err: retro_core::Error) {
        debug!(conn = %self.id, error = %err, "Rejected request");
        self.reply(ServerMessage::Error(err.to_string())).await;
    }

    async fn add_card(&self, new: retro_core::NewCard) {
        let (card, hide) = {
            let mut board = self.hub.board.write().await;
            let card = board.add_card(new);
            (card, board.hide_content())
        };
        debug!(conn = %self.id, card_id = %card.id, "Card added");

        let projector = *self.hub.projector();
        self.hub
            .broadcast_with(|viewer| ServerMessage::CardAdded(projector.project(&card, viewer, hide)))
            .await;
    }

    async fn delete_card(&self, req: DeleteCard) {
        let requester = match self.hub.delete_auth() {
            DeleteAuth::Payload => Some(req.author_name.as_str()),
            DeleteAuth::Session => self.viewer(),
        };
        let Some(requester) = requester else {
            self.reply_error(retro_core::Error::NotAuthor).await;
            return;
        };

        let outcome = self.hub.board.write().await.delete_card(&req.id, requester);

        match outcome {
            DeleteOutcome::Deleted => {
                debug!(conn = %self.id, card_id = %req.id, "Card deleted");
                self.hub.broadcast(ServerMessage::CardDeleted(req.id)).await;
            }
            DeleteOutcome::NotAuthor => self.reply_error(retro_core::Error::NotAuthor).await,
            DeleteOutcome::NotFound => {
                debug!(conn = %self.id, card_id = %req.id, "Delete of unknown card ignored");
            }
        }
    }

    async fn move_card(&self, req: MoveCard) {
        let found = self
            .hub
            .board
            .write()
            .await
            .move_card(&req.id, &req.new_column);

        if found {
            self.hub.broadcast(ServerMessage::CardMoved(req)).await;
        } else {
            debug!(conn = %self.id, card_id = %req.id, "Move of unknown card ignored");
        }
    }

    async fn join(&mut self, claim: IdentityClaim) -> Flow {
        if let SessionState::Joined(current) = &self.state {
            debug!(conn = %self.id, username = %current.name, "Join while already joined");
            self.reply_error(retro_core::Error::AlreadyJoined).await;
            return Flow::Continue;
        }

        let identity = match Identity::new(claim.username, claim.color) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(conn = %self.id, error = %e, "Dropping join");
                return Flow::Continue;
            }
        };

        match self.hub.claim(self.id, &identity).await {
            Ok(()) => {}
            Err(Error::Board(e)) => {
                self.reply_error(e).await;
                return Flow::Continue;
            }
            Err(Error::ConnectionClosed) => return Flow::Stop,
            Err(e) => {
                warn!(conn = %self.id, error = %e, "Join failed");
                return Flow::Continue;
            }
        }

        info!(conn = %self.id, username = %identity.name, color = %identity.color, "Joined");

        self.hub
            .broadcast(ServerMessage::ColorUsed(identity.color.clone()))
            .await;

        // The broadcast above may have evicted this very connection
        if !self.sync_state().await {
            debug!(conn = %self.id, username = %identity.name, "Evicted while joining");
            return Flow::Stop;
        }
        self.reply(ServerMessage::JoinSuccess).await;

        let view = self.hub.board_view(Some(&identity.name)).await;
        self.reply(ServerMessage::BoardState(view)).await;
        Flow::Continue
    }

    async fn logout(&mut self, claim: IdentityClaim) {
        let SessionState::Joined(current) = &self.state else {
            warn!(conn = %self.id, "Dropping logout from a session that has not joined");
            return;
        };

        if current.name != claim.username || current.color != claim.color {
            warn!(
                conn = %self.id,
                username = %current.name,
                claimed = %claim.username,
                "Logout names a different identity, releasing the bound one"
            );
        }

        self.state = SessionState::Connected;

        if let Some(released) = self.hub.release(self.id).await {
            info!(conn = %self.id, username = %released.name, "Logged out");
            self.hub
                .broadcast(ServerMessage::ColorReleased(released.color))
                .await;
        }
    }

    async fn toggle_hide_content(&self, hide: bool) {
        self.hub.board.write().await.set_hide_content(hide);
        self.hub
            .broadcast(ServerMessage::HideContentToggled(hide))
            .await;

        if self.hub.projector().redaction() == Redaction::Enforced {
            // Texts change per viewer, so everyone gets a fresh board
            let snapshot = self.hub.snapshot().await;
            let projector = *self.hub.projector();
            self.hub
                .broadcast_with(|viewer| {
                    ServerMessage::BoardState(projector.board_view(&snapshot, viewer))
                })
                .await;
        }
    }

    async fn sort_cards(&self, sort_order: &str) {
        let order = SortOrder::parse(sort_order);
        let (cards, hide) = {
            let mut board = self.hub.board.write().await;
            board.sort(order);
            (board.cards().to_vec(), board.hide_content())
        };
        debug!(conn = %self.id, order = ?order, "Cards sorted");

        let projector = *self.hub.projector();
        self.hub
            .broadcast_with(|viewer| {
                ServerMessage::CardsSorted(projector.project_cards(&cards, viewer, hide))
            })
            .await;
    }

    async fn like_card(&self, req: LikeCard) {
        let Some(voter) = self.viewer() else {
            self.reply_error(retro_core::Error::NotJoined).await;
            return;
        };

        let count = self
            .hub
            .board
            .write()
            .await
            .set_like(&req.card_id, voter, req.liked);

        let Some(like_count) = count else {
            debug!(conn = %self.id, card_id = %req.card_id, "Like of unknown card ignored");
            return;
        };

        self.hub
            .broadcast(ServerMessage::CardLiked(CardLiked {
                card_id: req.card_id.clone(),
                like_count,
                liked: None,
            }))
            .await;
        self.reply(ServerMessage::CardLiked(CardLiked {
            card_id: req.card_id,
            like_count,
            liked: Some(req.liked),
        }))
        .await;
    }
}
