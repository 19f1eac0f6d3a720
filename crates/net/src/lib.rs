//! Retro Board Network Library
//!
//! Hosts a shared retro board over TCP and keeps every connected viewer in
//! sync.
//!
//! # Architecture
//!
//! - **Hub**: board store, identity registry and connection directory, each
//!   behind its own lock
//! - **Session**: per-connection state machine (connected, joined, closed)
//! - **Fan-out**: queues messages for every viewer, evicting dead ones
//! - **Server**: accept loop plus one reader and one writer task per
//!   connection
//! - **Protocol**: length-prefixed JSON envelopes `{ type, payload }`
//!
//! # Usage
//!
//! ```ignore
//! let server = Server::start(ServerConfig::default()).await?;
//!
//! let mut client = Client::connect(server.addr()).await?;
//! client.join("Alice", "#f00").await?;
//! while let Some(msg) = client.next_message().await {
//!     match msg {
//!         ServerMessage::CardAdded(card) => { /* render */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
mod fanout;
mod frame;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod session;

pub use client::Client;
pub use config::{DeleteAuth, ServerConfig};
pub use error::{Error, Result};
pub use hub::{Hub, HubStats};
pub use protocol::{ClientMessage, ServerMessage};
pub use server::Server;
pub use session::{Session, SessionState};
