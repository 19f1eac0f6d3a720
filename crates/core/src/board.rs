//! Board store - the ordered card collection and global flags
//!
//! All mutations go through `&mut self`; callers wrap the store in a lock
//! and hold it only for the duration of one call.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::invariants::assert_card_invariants;
use crate::models::{Card, NewCard};

/// Requested card ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Author ascending
    Asc,
    /// Author descending
    Desc,
    /// Id ascending
    Reset,
}

impl SortOrder {
    /// Parse a client-supplied order; anything unrecognised resets
    pub fn parse(s: &str) -> Self {
        match s {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => SortOrder::Reset,
        }
    }

    fn compare(self, a: &Card, b: &Card) -> Ordering {
        match self {
            SortOrder::Asc => a.author.cmp(&b.author),
            SortOrder::Desc => b.author.cmp(&a.author),
            SortOrder::Reset => a.id.cmp(&b.id),
        }
    }
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Card exists but belongs to someone else; it was left in place
    NotAuthor,
    NotFound,
}

/// Point-in-time copy of the board
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    pub cards: Vec<Card>,
    pub used_colors: BTreeSet<String>,
    pub hide_content: bool,
}

impl BoardSnapshot {
    /// Attach the colors currently claimed in the identity registry
    pub fn with_used_colors(mut self, colors: impl IntoIterator<Item = String>) -> Self {
        self.used_colors = colors.into_iter().collect();
        self
    }
}

/// The shared board aggregate
#[derive(Debug, Default)]
pub struct BoardStore {
    cards: Vec<Card>,
    hide_content: bool,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a card with a fresh like state
    pub fn add_card(&mut self, new: NewCard) -> Card {
        let card = Card::new(new);
        self.cards.push(card.clone());
        card
    }

    /// Delete the first card with `id` if `requesting_author` wrote it
    ///
    /// Author comparison is exact, not case-insensitive. Removal swaps the
    /// last card into the freed slot.
    pub fn delete_card(&mut self, id: &str, requesting_author: &str) -> DeleteOutcome {
        let Some(index) = self.position(id) else {
            return DeleteOutcome::NotFound;
        };

        if self.cards[index].author != requesting_author {
            return DeleteOutcome::NotAuthor;
        }

        self.cards.swap_remove(index);
        DeleteOutcome::Deleted
    }

    /// Change the column of the first card with `id`. Returns false if absent.
    pub fn move_card(&mut self, id: &str, new_column: &str) -> bool {
        match self.cards.iter_mut().find(|c| c.id == id) {
            Some(card) => {
                card.column = new_column.to_string();
                true
            }
            None => false,
        }
    }

    /// Like or unlike a card on behalf of `voter`
    ///
    /// Returns the new like count, or `None` if the card does not exist.
    pub fn set_like(&mut self, id: &str, voter: &str, liked: bool) -> Option<usize> {
        let card = self.cards.iter_mut().find(|c| c.id == id)?;
        card.set_liked(voter, liked);
        assert_card_invariants(card);
        Some(card.like_count())
    }

    /// Stable reorder of the whole backing sequence
    pub fn sort(&mut self, order: SortOrder) {
        self.cards.sort_by(|a, b| order.compare(a, b));
    }

    pub fn set_hide_content(&mut self, hide: bool) {
        self.hide_content = hide;
    }

    pub fn hide_content(&self) -> bool {
        self.hide_content
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Copy of the cards and hide flag; used colors are attached by the caller
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cards: self.cards.clone(),
            used_colors: BTreeSet::new(),
            hide_content: self.hide_content,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_card(id: &str, author: &str) -> NewCard {
        NewCard {
            id: id.to_string(),
            text: format!("card {}", id),
            column: "todo".to_string(),
            author: author.to_string(),
            color: "#f00".to_string(),
        }
    }

    fn authors(board: &BoardStore) -> Vec<&str> {
        board.cards().iter().map(|c| c.author.as_str()).collect()
    }

    fn ids(board: &BoardStore) -> Vec<&str> {
        board.cards().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_add_card_appends() {
        let mut board = BoardStore::new();
        board.add_card(new_card("1", "a"));
        let card = board.add_card(new_card("2", "b"));

        assert_eq!(card.like_count(), 0);
        assert_eq!(ids(&board), vec!["1", "2"]);
    }

    #[test]
    fn test_delete_requires_exact_author() {
        let mut board = BoardStore::new();
        board.add_card(new_card("1", "Alice"));

        assert_eq!(board.delete_card("1", "alice"), DeleteOutcome::NotAuthor);
        assert_eq!(board.len(), 1);

        assert_eq!(board.delete_card("1", "Alice"), DeleteOutcome::Deleted);
        assert!(board.is_empty());

        assert_eq!(board.delete_card("1", "Alice"), DeleteOutcome::NotFound);
    }

    #[test]
    fn test_delete_swaps_last_into_place() {
        let mut board = BoardStore::new();
        board.add_card(new_card("1", "a"));
        board.add_card(new_card("2", "a"));
        board.add_card(new_card("3", "a"));

        board.delete_card("1", "a");
        assert_eq!(ids(&board), vec!["3", "2"]);
    }

    #[test]
    fn test_move_card_accepts_any_column() {
        let mut board = BoardStore::new();
        board.add_card(new_card("1", "a"));

        assert!(board.move_card("1", "not-a-real-column"));
        assert_eq!(board.cards()[0].column, "not-a-real-column");
        assert!(!board.move_card("missing", "done"));
    }

    #[test]
    fn test_set_like_counts_each_voter_once() {
        let mut board = BoardStore::new();
        board.add_card(new_card("1", "a"));

        assert_eq!(board.set_like("1", "Bob", true), Some(1));
        assert_eq!(board.set_like("1", "Bob", true), Some(1));
        assert_eq!(board.set_like("1", "Carol", true), Some(2));
        assert_eq!(board.set_like("1", "Dave", false), Some(2));
        assert_eq!(board.set_like("1", "Bob", false), Some(1));
        assert_eq!(board.set_like("missing", "Bob", true), None);
    }

    #[test]
    fn test_sort_by_author() {
        let mut board = BoardStore::new();
        board.add_card(new_card("1", "b"));
        board.add_card(new_card("2", "a"));
        board.add_card(new_card("3", "c"));

        board.sort(SortOrder::parse("asc"));
        assert_eq!(authors(&board), vec!["a", "b", "c"]);

        board.sort(SortOrder::parse("desc"));
        assert_eq!(authors(&board), vec!["c", "b", "a"]);

        board.sort(SortOrder::parse("whatever"));
        assert_eq!(ids(&board), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_authors() {
        let mut board = BoardStore::new();
        board.add_card(new_card("3", "a"));
        board.add_card(new_card("1", "b"));
        board.add_card(new_card("2", "a"));

        board.sort(SortOrder::Asc);
        assert_eq!(ids(&board), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_snapshot_carries_hide_flag() {
        let mut board = BoardStore::new();
        board.add_card(new_card("1", "a"));
        board.set_hide_content(true);

        let snapshot = board
            .snapshot()
            .with_used_colors(vec!["#0f0".to_string(), "#f00".to_string()]);

        assert!(snapshot.hide_content);
        assert_eq!(snapshot.cards.len(), 1);
        assert_eq!(snapshot.used_colors.len(), 2);
    }
}
