//! Multi-Client TCP Chat Relay Library
//!
//! A chat relay that accepts TCP connections, authenticates each one
//! against a persisted credential store, and routes newline-delimited JSON
//! messages among connected clients, named groups, and the broadcast
//! audience.
//!
//! # Features
//! - Login/registration handshake (bcrypt-hashed credentials in SQLite)
//! - Named groups with lazy-join membership (`#General`, `#Random`)
//! - Direct messages with a sender-side echo for conversation filing
//! - Broadcast to everyone, user-list notifications on join/leave
//! - Operator broadcasts from local stdin (admin channel)
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `RelayServer` is the central actor owning the registry and group table
//! - Each connection has a handler task; each connection's writes funnel
//!   through one write task, so records never interleave on the wire
//! - No locks on shared chat state - all access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use chat_relay::{Relay, SqliteUserStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteUserStore::connect("sqlite://chat_users.db").await?);
//!     let relay = Relay::bind("0.0.0.0:65432", store).await?;
//!     relay.run_until_ctrl_c().await?;
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod auth;
pub mod client;
pub mod codec;
pub mod error;
pub mod group;
pub mod handler;
pub mod listener;
pub mod message;
pub mod router;
pub mod server;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use error::{AppError, SendError, StoreError};
pub use handler::handle_connection;
pub use listener::Relay;
pub use message::{AuthReply, ClientFrame, Content, Envelope, EnvelopeKind};
pub use server::{RelayServer, ServerCommand};
pub use store::{CredentialStore, MemoryUserStore, SqliteUserStore};
pub use types::ConnectionId;
