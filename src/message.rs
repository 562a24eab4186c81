//! Message protocol definitions
//!
//! JSON-based bidirectional wire protocol. Every record is one JSON object
//! serialized on a single newline-terminated line.
//!
//! Outbound records are [`Envelope`]s tagged with an [`EnvelopeKind`];
//! inbound records are [`ClientFrame`]s after login and [`AuthReply`]s
//! during the handshake.

use serde::{Deserialize, Serialize};

use crate::types::{BROADCAST_TARGET, SERVER_SENDER};

/// Discriminant for server → client envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvelopeKind {
    /// Server or operator notice (prompts, join/leave, admin broadcasts)
    System,
    /// Relayed chat message (group, broadcast or direct)
    Chat,
    /// Handshake finished, the client is admitted to chat
    LoginSuccess,
    /// Refreshed list of targets: broadcast, groups, then identities
    UserList,
}

/// Envelope content: a single line of text, or a list for `USER_LIST`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    List(Vec<String>),
}

/// Server → Client wire record
///
/// `target_group` carries the group a chat was addressed to, and on the
/// sender-side echo of a direct message it carries the peer's name so the
/// client can file the echo under the right conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub sender: String,
    pub content: Content,
    pub is_private: bool,
    pub target_group: Option<String>,
}

impl Envelope {
    /// Server notice with the given sender (prompts, join/leave, admin)
    pub fn system(sender: &str, text: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::System,
            sender: sender.to_string(),
            content: Content::Text(text.into()),
            is_private: false,
            target_group: None,
        }
    }

    /// Relayed chat message
    pub fn chat(
        sender: &str,
        content: impl Into<String>,
        is_private: bool,
        target_group: Option<String>,
    ) -> Self {
        Self {
            kind: EnvelopeKind::Chat,
            sender: sender.to_string(),
            content: Content::Text(content.into()),
            is_private,
            target_group,
        }
    }

    /// Login confirmation sent to the freshly authenticated client
    pub fn login_success(username: &str) -> Self {
        Self {
            kind: EnvelopeKind::LoginSuccess,
            sender: SERVER_SENDER.to_string(),
            content: Content::Text(format!("Welcome {username}! You are now logged in.")),
            is_private: false,
            target_group: None,
        }
    }

    /// Refreshed target list broadcast after every join and leave
    pub fn user_list(entries: Vec<String>) -> Self {
        Self {
            kind: EnvelopeKind::UserList,
            sender: SERVER_SENDER.to_string(),
            content: Content::List(entries),
            is_private: false,
            target_group: None,
        }
    }
}

/// Client → Server chat record (post-auth)
///
/// `target` defaults to the reserved broadcast target when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(default = "default_target")]
    pub target: String,
    pub content: String,
}

fn default_target() -> String {
    BROADCAST_TARGET.to_string()
}

/// Client → Server handshake record: one answer to one prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthReply {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_kind_serializes_uppercase() {
        let msg = Envelope::login_success("alice");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"LOGIN_SUCCESS\""));
        assert!(json.contains("\"is_private\":false"));
        assert!(json.contains("\"target_group\":null"));
    }

    #[test]
    fn test_chat_envelope_serialize() {
        let msg = Envelope::chat("alice", "hi", false, Some("#General".to_string()));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"CHAT\""));
        assert!(json.contains("\"sender\":\"alice\""));
        assert!(json.contains("\"content\":\"hi\""));
        assert!(json.contains("\"target_group\":\"#General\""));
    }

    #[test]
    fn test_user_list_content_is_a_list() {
        let msg = Envelope::user_list(vec!["Everyone".to_string(), "#General".to_string()]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"content\":[\"Everyone\",\"#General\"]"));
    }

    #[test]
    fn test_client_frame_target_defaults_to_broadcast() {
        let frame: ClientFrame = serde_json::from_str(r#"{"content": "hello"}"#).unwrap();
        assert_eq!(frame.target, BROADCAST_TARGET);
        assert_eq!(frame.content, "hello");
    }

    #[test]
    fn test_client_frame_with_target() {
        let frame: ClientFrame =
            serde_json::from_str(r##"{"target": "#General", "content": "hi"}"##).unwrap();
        assert_eq!(frame.target, "#General");
    }

    #[test]
    fn test_auth_reply_deserialize() {
        let reply: AuthReply = serde_json::from_str(r#"{"content": "login"}"#).unwrap();
        assert_eq!(reply.content, "login");
    }

    #[test]
    fn test_envelope_roundtrip() {
        let msg = Envelope::chat("bob", "yo", true, Some("alice".to_string()));
        let json = serde_json::to_string(&msg).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
