//! Identity registry - which display names and colors are claimed
//!
//! Names are compared case-insensitively, colors exactly. A claim checks
//! and inserts both under the same `&mut self` borrow, so callers holding
//! a write lock get an atomic check-and-claim.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::Identity;

/// Registry of claimed names and colors
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    /// Lower-cased display names
    names: HashSet<String>,
    colors: HashSet<String>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim both the name and the color, or neither
    pub fn try_claim(&mut self, identity: &Identity) -> Result<()> {
        let key = identity.name_key();

        if self.names.contains(&key) {
            return Err(Error::NameTaken(identity.name.clone()));
        }
        if self.colors.contains(&identity.color) {
            return Err(Error::ColorTaken(identity.color.clone()));
        }

        self.names.insert(key);
        self.colors.insert(identity.color.clone());

        tracing::debug!(
            username = %identity.name,
            color = %identity.color,
            "Claimed identity"
        );
        Ok(())
    }

    /// Release a name and color. Releasing something unclaimed is a no-op.
    pub fn release(&mut self, identity: &Identity) {
        self.names.remove(&identity.name_key());
        self.colors.remove(&identity.color);
    }

    pub fn is_name_claimed(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn is_color_claimed(&self, color: &str) -> bool {
        self.colors.contains(color)
    }

    /// Colors currently in use
    pub fn used_colors(&self) -> impl Iterator<Item = &str> {
        self.colors.iter().map(|c| c.as_str())
    }

    /// Number of claimed identities
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str, color: &str) -> Identity {
        Identity::new(name, color).unwrap()
    }

    #[test]
    fn test_claim_and_release() {
        let mut registry = IdentityRegistry::new();
        let alice = identity("Alice", "#f00");

        registry.try_claim(&alice).unwrap();
        assert!(registry.is_name_claimed("alice"));
        assert!(registry.is_color_claimed("#f00"));
        assert_eq!(registry.len(), 1);

        registry.release(&alice);
        assert!(registry.is_empty());
        assert!(!registry.is_color_claimed("#f00"));
    }

    #[test]
    fn test_name_conflict_is_case_insensitive() {
        let mut registry = IdentityRegistry::new();
        registry.try_claim(&identity("Alice", "#f00")).unwrap();

        let result = registry.try_claim(&identity("alice", "#0f0"));
        assert!(matches!(result, Err(Error::NameTaken(_))));
        // The rejected color must not have been claimed
        assert!(!registry.is_color_claimed("#0f0"));
    }

    #[test]
    fn test_color_conflict_is_exact() {
        let mut registry = IdentityRegistry::new();
        registry.try_claim(&identity("Alice", "#f00")).unwrap();

        let result = registry.try_claim(&identity("Bob", "#f00"));
        assert!(matches!(result, Err(Error::ColorTaken(_))));
        assert!(!registry.is_name_claimed("bob"));

        registry.try_claim(&identity("Bob", "#F00")).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut registry = IdentityRegistry::new();
        let alice = identity("Alice", "#f00");

        registry.release(&alice);
        registry.try_claim(&alice).unwrap();
        registry.release(&alice);
        registry.release(&alice);
        assert!(registry.is_empty());

        // Name and color are reusable after release
        registry.try_claim(&identity("ALICE", "#f00")).unwrap();
    }

    #[test]
    fn test_used_colors() {
        let mut registry = IdentityRegistry::new();
        registry.try_claim(&identity("Alice", "#f00")).unwrap();
        registry.try_claim(&identity("Bob", "#0f0")).unwrap();

        let mut colors: Vec<&str> = registry.used_colors().collect();
        colors.sort();
        assert_eq!(colors, vec!["#0f0", "#f00"]);
    }
}
