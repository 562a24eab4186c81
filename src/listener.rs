//! Listener: accept loop and shutdown
//!
//! [`Relay`] binds the listening socket, starts the [`RelayServer`] actor
//! and accepts connections until a shutdown future resolves. Handler
//! failures are isolated per connection and never terminate the accept
//! loop; a bind failure is fatal before any of that starts.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::handler::handle_connection;
use crate::server::{RelayServer, ServerCommand};
use crate::store::CredentialStore;

/// Channel buffer size for server commands
const COMMAND_BUFFER_SIZE: usize = 256;

/// A bound chat relay, ready to accept connections
pub struct Relay {
    listener: TcpListener,
    cmd_tx: mpsc::Sender<ServerCommand>,
    store: Arc<dyn CredentialStore>,
}

impl Relay {
    /// Bind the listening socket and start the RelayServer actor
    ///
    /// Bind or listen failure is fatal; the process must not proceed.
    pub async fn bind(addr: &str, store: Arc<dyn CredentialStore>) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Chat relay listening on {}", listener.local_addr()?);

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        tokio::spawn(RelayServer::new(cmd_rx).run());

        Ok(Self {
            listener,
            cmd_tx,
            store,
        })
    }

    /// The locally bound address (useful with port 0)
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle for injecting commands from outside the accept loop
    /// (the admin channel uses this for operator broadcasts)
    pub fn command_sender(&self) -> mpsc::Sender<ServerCommand> {
        self.cmd_tx.clone()
    }

    /// Accept connections until the shutdown future resolves
    ///
    /// On shutdown: stop accepting, tell the actor to close every
    /// registered connection, abort the handler tasks (this also closes
    /// connections still mid-handshake), drop the listening socket.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send,
    {
        let Relay {
            listener,
            cmd_tx,
            store,
        } = self;
        tokio::pin!(shutdown);

        let mut handlers: JoinSet<()> = JoinSet::new();

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, closing relay");
                    let _ = cmd_tx.send(ServerCommand::Shutdown).await;
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            spawn_handler(&mut handlers, stream, peer, &cmd_tx, &store);
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                        }
                    }
                }
                // Reap finished handlers so the set doesn't grow unbounded.
                Some(_) = handlers.join_next(), if !handlers.is_empty() => {}
            }
        }

        handlers.shutdown().await;

        Ok(())
    }

    /// Accept connections until Ctrl-C
    pub async fn run_until_ctrl_c(self) -> Result<(), AppError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl-C handler: {}", e);
            }
        })
        .await
    }
}

/// Spawn one handler task per accepted connection
fn spawn_handler(
    handlers: &mut JoinSet<()>,
    stream: TcpStream,
    peer: SocketAddr,
    cmd_tx: &mpsc::Sender<ServerCommand>,
    store: &Arc<dyn CredentialStore>,
) {
    info!("New connection from {}", peer);
    let cmd_tx = cmd_tx.clone();
    let store = Arc::clone(store);

    handlers.spawn(async move {
        if let Err(e) = handle_connection(stream, cmd_tx, store).await {
            error!("Connection handler error for {}: {}", peer, e);
        }
    });
}
