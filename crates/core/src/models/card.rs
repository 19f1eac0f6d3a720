//! Card model - a single note on the board

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Card fields supplied by the client when adding a card
///
/// The id is generated client-side and treated as an opaque token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub color: String,
}

/// A card owned by the board
///
/// The like count is derived from the voter set, so the two can never
/// disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub text: String,
    /// Free-form column label; clients decide which labels are displayed
    pub column: String,
    /// Display name at creation time
    pub author: String,
    /// Author's claimed color at creation time
    pub color: String,
    liked_by: HashSet<String>,
}

impl Card {
    pub fn new(new: NewCard) -> Self {
        Self {
            id: new.id,
            text: new.text,
            column: new.column,
            author: new.author,
            color: new.color,
            liked_by: HashSet::new(),
        }
    }

    pub fn like_count(&self) -> usize {
        self.liked_by.len()
    }

    pub fn is_liked_by(&self, voter: &str) -> bool {
        self.liked_by.contains(voter)
    }

    /// Add or remove a voter. Returns true if the voter set changed.
    pub fn set_liked(&mut self, voter: &str, liked: bool) -> bool {
        if liked {
            self.liked_by.insert(voter.to_string())
        } else {
            self.liked_by.remove(voter)
        }
    }

    pub fn voters(&self) -> impl Iterator<Item = &str> {
        self.liked_by.iter().map(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_card() -> Card {
        Card::new(NewCard {
            id: "c1".to_string(),
            text: "Ship it".to_string(),
            column: "todo".to_string(),
            author: "Alice".to_string(),
            color: "#f00".to_string(),
        })
    }

    #[test]
    fn test_new_card_has_no_likes() {
        let card = make_card();
        assert_eq!(card.like_count(), 0);
        assert!(!card.is_liked_by("Alice"));
    }

    #[test]
    fn test_set_liked_is_idempotent() {
        let mut card = make_card();
        assert!(card.set_liked("Bob", true));
        assert!(!card.set_liked("Bob", true));
        assert_eq!(card.like_count(), 1);

        assert!(card.set_liked("Bob", false));
        assert!(!card.set_liked("Bob", false));
        assert_eq!(card.like_count(), 0);
    }

    #[test]
    fn test_new_card_payload_defaults() {
        let new: NewCard = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(new.id, "x");
        assert!(new.text.is_empty());
        assert!(new.column.is_empty());
    }
}
