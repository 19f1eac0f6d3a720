//! Personalization projector
//!
//! Turns shared board state into what a particular viewer is shown. Two
//! viewers of the same board differ only in the `userLiked` flag and, when
//! redaction is enforced, in which card texts are hidden.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::BoardSnapshot;
use crate::models::Card;

/// How the hide-content flag is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Redaction {
    /// Text of other authors' cards is blanked before it leaves the server
    #[default]
    Enforced,
    /// The flag is only forwarded; clients decide what to show
    Advisory,
}

/// A card as seen by one viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: String,
    pub text: String,
    pub column: String,
    pub author: String,
    pub color: String,
    pub likes: usize,
    /// Absent for anonymous viewers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_liked: Option<bool>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

/// The whole board as seen by one viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub cards: Vec<CardView>,
    pub used_colors: BTreeMap<String, bool>,
    pub hide_content: bool,
}

/// Builds per-viewer projections
#[derive(Debug, Clone, Copy, Default)]
pub struct Projector {
    redaction: Redaction,
}

impl Projector {
    pub fn new(redaction: Redaction) -> Self {
        Self { redaction }
    }

    pub fn redaction(&self) -> Redaction {
        self.redaction
    }

    /// Project one card for `viewer` (`None` = not joined)
    pub fn project(&self, card: &Card, viewer: Option<&str>, hide_content: bool) -> CardView {
        let hidden = hide_content
            && self.redaction == Redaction::Enforced
            && viewer != Some(card.author.as_str());

        CardView {
            id: card.id.clone(),
            text: if hidden { String::new() } else { card.text.clone() },
            column: card.column.clone(),
            author: card.author.clone(),
            color: card.color.clone(),
            likes: card.like_count(),
            user_liked: viewer.map(|name| card.is_liked_by(name)),
            hidden,
        }
    }

    pub fn project_cards(
        &self,
        cards: &[Card],
        viewer: Option<&str>,
        hide_content: bool,
    ) -> Vec<CardView> {
        cards
            .iter()
            .map(|card| self.project(card, viewer, hide_content))
            .collect()
    }

    /// Project a full snapshot for `viewer`
    pub fn board_view(&self, snapshot: &BoardSnapshot, viewer: Option<&str>) -> BoardView {
        BoardView {
            cards: self.project_cards(&snapshot.cards, viewer, snapshot.hide_content),
            used_colors: snapshot
                .used_colors
                .iter()
                .map(|color| (color.clone(), true))
                .collect(),
            hide_content: snapshot.hide_content,
        }
    }
}
