//! Data models for the board

mod card;
mod identity;

pub use card::*;
pub use identity::*;
