//! Credential persistence
//!
//! The relay talks to credential storage through the [`CredentialStore`]
//! trait: existence check, registration and verification, all safe under
//! concurrent invocation. Passwords are stored as bcrypt hashes, never in
//! the clear.
//!
//! [`SqliteUserStore`] is the production implementation (SQLite file,
//! created on first start); [`MemoryUserStore`] backs tests.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Async credential store interface
///
/// "Taken" and "wrong password" are ordinary `false` results; `Err` is
/// reserved for database and hashing failures.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether an identity is already registered
    async fn exists(&self, username: &str) -> Result<bool, StoreError>;

    /// Persist a new identity; returns `false` if the name is taken
    async fn register(&self, username: &str, password: &str) -> Result<bool, StoreError>;

    /// Check a password attempt against the stored hash
    async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed credential store
pub struct SqliteUserStore {
    pool: SqlitePool,
    cost: u32,
}

impl SqliteUserStore {
    /// Open (and if missing, create) the user database
    ///
    /// A single pooled connection is enough for the login path and keeps
    /// `sqlite::memory:` URLs coherent.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            cost: bcrypt::DEFAULT_COST,
        })
    }

    /// Lower the bcrypt cost (test databases only)
    #[doc(hidden)]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }
}

#[async_trait]
impl CredentialStore for SqliteUserStore {
    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn register(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let hash = bcrypt::hash(password, self.cost)?;
        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?1, ?2)")
            .bind(username)
            .bind(hash)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            // Primary-key conflict: the name was taken, possibly by a
            // concurrent registration that won the race.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        match stored {
            Some(hash) => Ok(bcrypt::verify(password, &hash)?),
            None => Ok(false),
        }
    }
}

/// In-memory credential store
///
/// Same contract as [`SqliteUserStore`] without the file; used by the test
/// suites and handy for throwaway relay instances.
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, String>>,
    cost: u32,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    /// Use a cheaper bcrypt cost (minimum 4) to keep tests fast
    pub fn with_cost(cost: u32) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            cost,
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryUserStore {
    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.users.lock().await.contains_key(username))
    }

    async fn register(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let hash = bcrypt::hash(password, self.cost)?;
        let mut users = self.users.lock().await;
        if users.contains_key(username) {
            return Ok(false);
        }
        users.insert(username.to_string(), hash);
        Ok(true)
    }

    async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let hash = match self.users.lock().await.get(username) {
            Some(hash) => hash.clone(),
            None => return Ok(false),
        };
        Ok(bcrypt::verify(password, &hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn test_register_twice_fails_second_time() {
        let store = MemoryUserStore::with_cost(TEST_COST);

        assert!(store.register("alice", "secret").await.unwrap());
        assert!(!store.register("alice", "other").await.unwrap());
        assert!(store.exists("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_accepts_only_the_registered_secret() {
        let store = MemoryUserStore::with_cost(TEST_COST);
        store.register("alice", "secret").await.unwrap();

        assert!(store.verify("alice", "secret").await.unwrap());
        assert!(!store.verify("alice", "wrong").await.unwrap());
        assert!(!store.verify("nobody", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_usernames_are_case_sensitive() {
        let store = MemoryUserStore::with_cost(TEST_COST);
        store.register("Alice", "secret").await.unwrap();

        assert!(!store.exists("alice").await.unwrap());
        assert!(store.register("alice", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let store = SqliteUserStore::connect("sqlite::memory:")
            .await
            .unwrap()
            .with_cost(TEST_COST);

        assert!(!store.exists("alice").await.unwrap());
        assert!(store.register("alice", "secret").await.unwrap());
        assert!(!store.register("alice", "secret").await.unwrap());
        assert!(store.verify("alice", "secret").await.unwrap());
        assert!(!store.verify("alice", "wrong").await.unwrap());
    }
}
