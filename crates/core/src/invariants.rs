//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{Card, Identity};
use crate::registry::IdentityRegistry;

/// Validate that a card's like state is internally consistent
pub fn assert_card_invariants(card: &Card) {
    debug_assert!(
        card.voters().all(|v| !v.is_empty()),
        "Card {} has a like from an empty voter name",
        card.id
    );

    debug_assert_eq!(
        card.voters().count(),
        card.like_count(),
        "Card {} like count disagrees with its voters",
        card.id
    );
}

/// Validate that every bound identity is claimed and nothing else is
pub fn assert_claims_consistent<'a>(
    registry: &IdentityRegistry,
    bound: impl IntoIterator<Item = &'a Identity>,
) {
    let mut count = 0;
    for identity in bound {
        count += 1;
        debug_assert!(
            registry.is_name_claimed(&identity.name),
            "Bound name {} is not claimed",
            identity.name
        );
        debug_assert!(
            registry.is_color_claimed(&identity.color),
            "Bound color {} is not claimed",
            identity.color
        );
    }

    debug_assert_eq!(
        count,
        registry.len(),
        "Registry holds {} claims but {} identities are bound",
        registry.len(),
        count
    );
}
