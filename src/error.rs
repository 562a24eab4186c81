//! Error types for the chat relay
//!
//! Defines application-level errors, message send errors and credential
//! store errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination, bind failure) and
/// per-record errors (malformed frames) that the handler decides how to
/// treat depending on the connection phase.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on a transport (fatal for that connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credential store failure
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Message send errors
///
/// Occurs when a delivery through a send handle cannot be accepted.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The recipient's buffer is full (peer stopped reading)
    #[error("Channel full")]
    ChannelFull,
}

/// Credential store errors
///
/// Database and hashing failures; "username taken" and "wrong password"
/// are not errors, they are ordinary `false` results.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing or verification failure
    #[error("password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}
