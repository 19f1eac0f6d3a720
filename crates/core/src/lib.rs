//! Retro Board Core Library
//!
//! Board state, identity claims, and per-viewer projections for the
//! retro board. Everything here is synchronous; the network hub wraps
//! these types in locks.

pub mod board;
pub mod error;
pub mod invariants;
pub mod models;
pub mod projection;
pub mod registry;

pub use board::{BoardSnapshot, BoardStore, DeleteOutcome, SortOrder};
pub use error::{Error, Result};
pub use models::*;
pub use projection::{BoardView, CardView, Projector, Redaction};
pub use registry::IdentityRegistry;
