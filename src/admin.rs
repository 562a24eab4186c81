//! Admin channel
//!
//! Reads operator input from local stdin, line by line, and injects each
//! non-blank line as a SYSTEM broadcast to every registered client. This
//! is a trusted local facility: there is no authentication on this path.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::server::ServerCommand;

/// Forward operator stdin lines to the relay as broadcasts
///
/// Ends when stdin closes or the server side is gone.
pub async fn run_admin_input(cmd_tx: mpsc::Sender<ServerCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        if cmd_tx
            .send(ServerCommand::Broadcast {
                text: text.to_string(),
            })
            .await
            .is_err()
        {
            debug!("Server closed, ending admin input loop");
            break;
        }
    }

    debug!("Admin input loop ended");
}
