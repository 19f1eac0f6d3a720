//! Network protocol message types
//!
//! Every message is a JSON envelope `{ "type": ..., "payload": ... }`,
//! length-prefixed on the wire. Client messages are decoded once at the
//! boundary into a closed enum; unknown types decode to `None` so older
//! servers tolerate newer clients.

use retro_core::{BoardView, CardView, NewCard};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Payload of `deleteCard`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCard {
    pub id: String,
    #[serde(default)]
    pub author_name: String,
}

/// Payload of `moveCard`, also echoed back in `cardMoved`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCard {
    pub id: String,
    pub new_column: String,
}

/// Payload of `join` and `logout`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaim {
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub username: String,
}

/// Payload of `sortCards`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortCards {
    #[serde(default)]
    pub sort_order: String,
}

/// Payload of `likeCard`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeCard {
    pub card_id: String,
    pub liked: bool,
}

/// Payload of `cardLiked`; `liked` is only sent to the viewer who voted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLiked {
    pub card_id: String,
    pub like_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

/// Messages sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    AddCard(NewCard),
    DeleteCard(DeleteCard),
    MoveCard(MoveCard),
    Join(IdentityClaim),
    Logout(IdentityClaim),
    ToggleHideContent(bool),
    SortCards(SortCards),
    LikeCard(LikeCard),
    Ping,
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full board as seen by the recipient
    BoardState(BoardView),
    CardAdded(CardView),
    /// Id of the removed card
    CardDeleted(String),
    CardMoved(MoveCard),
    CardsSorted(Vec<CardView>),
    CardLiked(CardLiked),
    ColorUsed(String),
    ColorReleased(String),
    HideContentToggled(bool),
    JoinSuccess,
    Error(String),
    Pong,
}

/// Undecoded envelope
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

impl ClientMessage {
    /// Decode a client envelope
    ///
    /// Returns `Ok(None)` for message types this server does not know.
    pub fn decode(bytes: &[u8]) -> Result<Option<Self>> {
        let Envelope { kind, payload } =
            serde_json::from_slice(bytes).map_err(|e| Error::MalformedPayload {
                kind: "envelope".into(),
                reason: e.to_string(),
            })?;

        let msg = match kind.as_str() {
            "addCard" => ClientMessage::AddCard(payload_as(&kind, payload)?),
            "deleteCard" => ClientMessage::DeleteCard(payload_as(&kind, payload)?),
            "moveCard" => ClientMessage::MoveCard(payload_as(&kind, payload)?),
            "join" => ClientMessage::Join(payload_as(&kind, payload)?),
            "logout" => ClientMessage::Logout(payload_as(&kind, payload)?),
            "toggleHideContent" => ClientMessage::ToggleHideContent(payload_as(&kind, payload)?),
            "sortCards" => ClientMessage::SortCards(payload_as(&kind, payload)?),
            "likeCard" => ClientMessage::LikeCard(payload_as(&kind, payload)?),
            "ping" => ClientMessage::Ping,
            _ => return Ok(None),
        };

        Ok(Some(msg))
    }

    /// Envelope type name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::AddCard(_) => "addCard",
            ClientMessage::DeleteCard(_) => "deleteCard",
            ClientMessage::MoveCard(_) => "moveCard",
            ClientMessage::Join(_) => "join",
            ClientMessage::Logout(_) => "logout",
            ClientMessage::ToggleHideContent(_) => "toggleHideContent",
            ClientMessage::SortCards(_) => "sortCards",
            ClientMessage::LikeCard(_) => "likeCard",
            ClientMessage::Ping => "ping",
        }
    }

    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl ServerMessage {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Envelope type name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::BoardState(_) => "boardState",
            ServerMessage::CardAdded(_) => "cardAdded",
            ServerMessage::CardDeleted(_) => "cardDeleted",
            ServerMessage::CardMoved(_) => "cardMoved",
            ServerMessage::CardsSorted(_) => "cardsSorted",
            ServerMessage::CardLiked(_) => "cardLiked",
            ServerMessage::ColorUsed(_) => "colorUsed",
            ServerMessage::ColorReleased(_) => "colorReleased",
            ServerMessage::HideContentToggled(_) => "hideContentToggled",
            ServerMessage::JoinSuccess => "joinSuccess",
            ServerMessage::Error(_) => "error",
            ServerMessage::Pong => "pong",
        }
    }
}

fn payload_as<T: DeserializeOwned>(kind: &str, payload: serde_json::Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| Error::MalformedPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}
