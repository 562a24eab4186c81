//! Client send handle
//!
//! A [`Client`] is the registry's view of a connection: an opaque,
//! synchronized capability to deliver envelopes. The mpsc channel feeds
//! the connection's single write task, so concurrent deliveries from many
//! tasks are serialized and two records never interleave on the wire.
//!
//! Delivery never blocks the caller: a recipient whose buffer is full has
//! stopped reading, and stalling the relay on it would let one slow peer
//! hold up routing for everyone. The envelope is dropped instead.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::Envelope;
use crate::types::ConnectionId;

/// Registered client: a connection's live send handle
#[derive(Debug)]
pub struct Client {
    /// The connection this handle belongs to
    pub conn_id: ConnectionId,
    /// Server → Client envelope channel
    pub sender: mpsc::Sender<Envelope>,
}

impl Client {
    pub fn new(conn_id: ConnectionId, sender: mpsc::Sender<Envelope>) -> Self {
        Self { conn_id, sender }
    }

    /// Deliver one envelope to this client, without waiting
    ///
    /// Fails when the channel is closed (client disconnected) or full
    /// (client has stopped draining its socket); either way the envelope
    /// is lost, which is the best-effort contract.
    pub fn send(&self, msg: Envelope) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::ChannelFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_delivers_to_channel() {
        let (tx, mut rx) = mpsc::channel(32);
        let client = Client::new(ConnectionId::new(), tx);

        client.send(Envelope::login_success("alice")).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, Envelope::login_success("alice"));
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(32);
        drop(rx);
        let client = Client::new(ConnectionId::new(), tx);

        assert!(matches!(
            client.send(Envelope::login_success("alice")),
            Err(SendError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_send_drops_instead_of_blocking_when_buffer_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = Client::new(ConnectionId::new(), tx);

        client.send(Envelope::login_success("alice")).unwrap();
        assert!(matches!(
            client.send(Envelope::login_success("alice")),
            Err(SendError::ChannelFull)
        ));

        // The stalled recipient lost the second envelope, nothing else.
        assert_eq!(rx.recv().await.unwrap(), Envelope::login_success("alice"));
        client.send(Envelope::login_success("bob")).unwrap();
        assert_eq!(rx.recv().await.unwrap(), Envelope::login_success("bob"));
    }
}
