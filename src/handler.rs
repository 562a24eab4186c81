//! Connection handler
//!
//! Owns one TCP connection's full lifecycle: login/registration handshake,
//! registration with the relay, the chat message loop, and teardown.
//!
//! All outbound traffic for the connection, handshake prompts as much as
//! router deliveries from other handlers, funnels through one mpsc
//! channel into a single write task, so writes are serialized and records
//! never interleave on the wire.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthOutcome, AuthSession};
use crate::codec::{self, FrameReader};
use crate::error::AppError;
use crate::message::{AuthReply, ClientFrame, Envelope};
use crate::server::ServerCommand;
use crate::store::CredentialStore;
use crate::types::{ConnectionId, SERVER_SENDER};

/// Per-connection outbound channel capacity
const SEND_BUFFER_SIZE: usize = 32;

/// Handle a new TCP connection
///
/// Runs the handshake; a connection that never authenticates is closed and
/// leaves no trace. On success the identity is registered with the relay,
/// the chat loop runs until disconnect, and teardown (unregister, group
/// cleanup, "left" notice) is triggered exactly once via the Disconnect
/// command.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    store: Arc<dyn CredentialStore>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let conn_id = ConnectionId::new();
    debug!("New connection {} from {}", conn_id, peer_addr);

    let (read_half, write_half) = stream.into_split();
    let mut frames = FrameReader::new(read_half);

    // Channel feeding the write task; clones of msg_tx handed to the relay
    // become this connection's send handle.
    let (msg_tx, msg_rx) = mpsc::channel::<Envelope>(SEND_BUFFER_SIZE);
    let write_task = tokio::spawn(write_loop(write_half, msg_rx));

    let username = authenticate(&mut frames, &msg_tx, store.as_ref()).await?;

    let Some(username) = username else {
        info!("Connection {} from {} failed authentication", conn_id, peer_addr);
        drop(msg_tx);
        let _ = write_task.await;
        return Ok(());
    };

    info!("Connection {} authenticated as '{}'", conn_id, username);

    if cmd_tx
        .send(ServerCommand::Register {
            conn_id,
            username: username.clone(),
            sender: msg_tx.clone(),
        })
        .await
        .is_err()
    {
        error!("Failed to register '{}' - server closed", username);
        return Err(AppError::ChannelSend);
    }

    // Chat loop: decode one frame, hand it to the router. Malformed frames
    // are discarded; EOF or an IO error ends the loop.
    loop {
        let record = match frames.next_record().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Connection {} closed by peer", conn_id);
                break;
            }
            Err(e) => {
                warn!("Read error on connection {}: {}", conn_id, e);
                break;
            }
        };

        match codec::decode::<ClientFrame>(&record) {
            Ok(frame) => {
                if cmd_tx
                    .send(ServerCommand::Dispatch {
                        sender: username.clone(),
                        target: frame.target,
                        content: frame.content,
                    })
                    .await
                    .is_err()
                {
                    debug!("Server closed, ending chat loop for '{}'", username);
                    break;
                }
            }
            Err(e) => {
                warn!("Invalid frame from '{}': {}", username, e);
            }
        }
    }

    // Teardown: runs exactly once however the loop ended.
    let _ = cmd_tx
        .send(ServerCommand::Disconnect {
            conn_id,
            username: username.clone(),
        })
        .await;
    drop(msg_tx);
    let _ = write_task.await;

    info!("Client '{}' ({}) disconnected", username, conn_id);

    Ok(())
}

/// Drive the handshake state machine over the framed transport
///
/// Returns the authenticated identity, or `None` when the handshake was
/// rejected or the peer vanished. A record that fails to decode aborts the
/// handshake: protocol correctness is required before admission.
async fn authenticate<R>(
    frames: &mut FrameReader<R>,
    msg_tx: &mpsc::Sender<Envelope>,
    store: &dyn CredentialStore,
) -> Result<Option<String>, AppError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut session = AuthSession::new();

    loop {
        if msg_tx
            .send(Envelope::system(SERVER_SENDER, session.prompt()))
            .await
            .is_err()
        {
            return Ok(None);
        }

        let Some(record) = frames.next_record().await? else {
            debug!("Peer disconnected mid-handshake");
            return Ok(None);
        };

        let reply = match codec::decode::<AuthReply>(&record) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Malformed handshake record, closing: {}", e);
                return Ok(None);
            }
        };

        match session.advance(reply.content.trim(), store).await? {
            AuthOutcome::Continue(next) => session = next,
            AuthOutcome::Authenticated(username) => return Ok(Some(username)),
            AuthOutcome::Rejected(notice) => {
                let _ = msg_tx.send(Envelope::system(SERVER_SENDER, notice)).await;
                return Ok(None);
            }
        }
    }
}

/// Write task: drain the envelope channel onto the socket
///
/// Ends when every send handle is dropped, then shuts the socket down so
/// the peer sees an orderly close.
async fn write_loop(mut writer: OwnedWriteHalf, mut msg_rx: mpsc::Receiver<Envelope>) {
    while let Some(envelope) = msg_rx.recv().await {
        match codec::encode(&envelope) {
            Ok(bytes) => {
                if writer.write_all(&bytes).await.is_err() {
                    debug!("Socket write failed, ending write task");
                    break;
                }
            }
            Err(e) => {
                // Continue - don't break on serialization errors
                error!("Failed to serialize envelope: {}", e);
            }
        }
    }
    let _ = writer.shutdown().await;
}
