//! RelayServer actor implementation
//!
//! The central actor that owns all shared state: the client registry
//! (identity → send handle, in registration order) and the group table.
//! Handlers and the admin channel reach it only through [`ServerCommand`]
//! messages, so every registry and group operation is atomic with respect
//! to the others and delivery always iterates a consistent snapshot.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::group::Group;
use crate::message::Envelope;
use crate::router::{self, Route};
use crate::types::{ConnectionId, ADMIN_SENDER, BROADCAST_TARGET, DEFAULT_GROUP, DEFAULT_GROUPS, SERVER_SENDER};

/// Commands sent from handlers and the admin channel to the RelayServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Freshly authenticated connection enters the chat
    Register {
        conn_id: ConnectionId,
        username: String,
        sender: mpsc::Sender<Envelope>,
    },
    /// Connection ended; tagged with its id so a stale handler cannot
    /// evict a session that took the username over
    Disconnect {
        conn_id: ConnectionId,
        username: String,
    },
    /// Route one chat message from an authenticated sender
    Dispatch {
        sender: String,
        target: String,
        content: String,
    },
    /// Operator broadcast injected through the admin channel
    Broadcast { text: String },
    /// Close every connection and stop admitting traffic
    Shutdown,
}

/// The main RelayServer actor
///
/// Manages the registry and group table and processes commands from the
/// connection handlers.
pub struct RelayServer {
    /// All registered clients: identity -> send handle
    clients: HashMap<String, Client>,
    /// Identities in registration order (for USER_LIST)
    order: Vec<String>,
    /// Fixed group table in creation order
    groups: Vec<Group>,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl RelayServer {
    /// Create a new RelayServer with the startup group table
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            clients: HashMap::new(),
            order: Vec::new(),
            groups: DEFAULT_GROUPS.iter().map(|name| Group::new(name)).collect(),
            receiver,
        }
    }

    /// Run the RelayServer event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped or a Shutdown command arrives.
    pub async fn run(mut self) {
        info!("RelayServer started");

        while let Some(cmd) = self.receiver.recv().await {
            if matches!(cmd, ServerCommand::Shutdown) {
                self.handle_shutdown().await;
                break;
            }
            self.handle_command(cmd).await;
        }

        info!("RelayServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register {
                conn_id,
                username,
                sender,
            } => {
                self.handle_register(conn_id, username, sender).await;
            }
            ServerCommand::Disconnect { conn_id, username } => {
                self.handle_disconnect(conn_id, username).await;
            }
            ServerCommand::Dispatch {
                sender,
                target,
                content,
            } => {
                self.handle_dispatch(sender, target, content).await;
            }
            ServerCommand::Broadcast { text } => {
                self.handle_admin_broadcast(text).await;
            }
            ServerCommand::Shutdown => unreachable!("handled in run()"),
        }
    }

    /// Handle a freshly authenticated connection
    async fn handle_register(
        &mut self,
        conn_id: ConnectionId,
        username: String,
        sender: mpsc::Sender<Envelope>,
    ) {
        let client = Client::new(conn_id, sender);

        // A second login under the same identity takes the session over:
        // the mapping is replaced, the old connection keeps its socket but
        // receives nothing further.
        if let Some(old) = self.clients.insert(username.clone(), client) {
            warn!(
                "Session takeover for '{}': {} replaces {}",
                username, conn_id, old.conn_id
            );
        } else {
            self.order.push(username.clone());
        }

        self.join_group(DEFAULT_GROUP, &username);

        info!("Client '{}' ({}) entered the chat", username, conn_id);

        if let Some(client) = self.clients.get(&username) {
            let _ = client.send(Envelope::login_success(&username));
        }
        self.broadcast(Envelope::system(
            SERVER_SENDER,
            format!("{username} joined the chat."),
        ));
        self.broadcast_user_list();

        debug!(
            "Total clients: {}, group sizes: {:?}",
            self.clients.len(),
            self.groups.iter().map(Group::len).collect::<Vec<_>>()
        );
    }

    /// Handle a connection ending
    async fn handle_disconnect(&mut self, conn_id: ConnectionId, username: String) {
        // Only the connection that owns the mapping may tear it down.
        match self.clients.get(&username) {
            Some(client) if client.conn_id == conn_id => {}
            _ => {
                debug!("Stale disconnect for '{}' ({}) ignored", username, conn_id);
                return;
            }
        }

        self.clients.remove(&username);
        self.order.retain(|name| name != &username);
        for group in &mut self.groups {
            group.remove(&username);
        }

        info!("Client '{}' ({}) left the chat", username, conn_id);

        self.broadcast(Envelope::system(
            SERVER_SENDER,
            format!("{username} left the chat."),
        ));
        self.broadcast_user_list();
    }

    /// Route one chat message
    async fn handle_dispatch(&mut self, sender: String, target: String, content: String) {
        match router::resolve(&target) {
            Route::Group(name) => {
                if !self.join_group(&name, &sender) {
                    // Unknown group: dropped, no feedback to the sender.
                    debug!("Dropping message from '{}' to unknown group '{}'", sender, name);
                    return;
                }
                let members: Vec<String> = self
                    .groups
                    .iter()
                    .find(|g| g.name == name)
                    .map(|g| g.members().to_vec())
                    .unwrap_or_default();

                let envelope = Envelope::chat(&sender, content, false, Some(name));
                for member in &members {
                    self.deliver(member, envelope.clone());
                }
            }
            Route::Broadcast => {
                let envelope = Envelope::chat(&sender, content, false, None);
                self.broadcast(envelope);
            }
            Route::Direct(name) => {
                if !self.clients.contains_key(&name) {
                    // Unknown identity: dropped, no feedback to the sender.
                    debug!("Dropping message from '{}' to unknown target '{}'", sender, name);
                    return;
                }
                self.deliver(&name, Envelope::chat(&sender, content.clone(), true, None));
                // Echo to the sender, filed under the peer's name.
                self.deliver(&sender, Envelope::chat(&sender, content, true, Some(name)));
            }
        }
    }

    /// Handle an operator broadcast from the admin channel
    async fn handle_admin_broadcast(&mut self, text: String) {
        info!("Admin broadcast: {}", text);
        self.broadcast(Envelope::system(ADMIN_SENDER, text));
    }

    /// Close every connection on shutdown
    async fn handle_shutdown(&mut self) {
        self.broadcast(Envelope::system(SERVER_SENDER, "Server is shutting down."));
        // Dropping the send handles ends every write task, which shuts the
        // sockets down and unblocks the peers' reads.
        self.clients.clear();
        self.order.clear();
    }

    /// Add an identity to a group if the group exists; idempotent
    ///
    /// Returns false if the group is unknown.
    fn join_group(&mut self, name: &str, username: &str) -> bool {
        match self.groups.iter_mut().find(|g| g.name == name) {
            Some(group) => {
                if group.join(username) {
                    debug!("'{}' joined group {}", username, name);
                }
                true
            }
            None => false,
        }
    }

    /// Best-effort delivery to one identity
    ///
    /// A send failure means the client is mid-disconnect or has stopped
    /// reading; it is logged and swallowed, never surfaced to the
    /// message's sender, and never stalls the actor.
    fn deliver(&self, username: &str, envelope: Envelope) {
        if let Some(client) = self.clients.get(username) {
            if let Err(e) = client.send(envelope) {
                warn!("Delivery to '{}' failed: {}", username, e);
            }
        }
    }

    /// Best-effort delivery to every registered identity, in registration order
    fn broadcast(&self, envelope: Envelope) {
        for username in &self.order {
            self.deliver(username, envelope.clone());
        }
    }

    /// Send the refreshed target list to everyone
    ///
    /// Entries: the broadcast target, then group names in creation order,
    /// then identities in registration order.
    fn broadcast_user_list(&self) {
        let mut entries = vec![BROADCAST_TARGET.to_string()];
        entries.extend(self.groups.iter().map(|g| g.name.clone()));
        entries.extend(self.order.iter().cloned());
        self.broadcast(Envelope::user_list(entries));
    }
}
