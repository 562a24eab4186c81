//! Multi-Client TCP Chat Relay - Entry Point
//!
//! Opens the credential database, binds the listener, starts the admin
//! input task and accepts connections until Ctrl-C.

use std::env;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::{admin, Relay, SqliteUserStore};

/// Default bind address
const DEFAULT_ADDR: &str = "0.0.0.0:65432";

/// Default credential database
const DEFAULT_DB_URL: &str = "sqlite://chat_users.db";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    // Bind address and database URL from the command line, or defaults
    let addr = env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let db_url = env::args()
        .nth(2)
        .unwrap_or_else(|| DEFAULT_DB_URL.to_string());

    // Open (or create) the user database
    let store = Arc::new(SqliteUserStore::connect(&db_url).await?);
    info!("Credential store ready at {}", db_url);

    // Bind the relay; failure here is fatal
    let relay = Relay::bind(&addr, store).await?;

    // Operator broadcasts from stdin
    tokio::spawn(admin::run_admin_input(relay.command_sender()));

    relay.run_until_ctrl_c().await?;

    Ok(())
}
