//! Basic type definitions and protocol constants for the chat relay
//!
//! Provides the `ConnectionId` newtype plus the reserved names the wire
//! protocol is built around (group marker, broadcast target, startup groups).

use uuid::Uuid;

/// Prefix that marks a message target as a group name.
pub const GROUP_MARKER: char = '#';

/// Reserved target meaning "every registered client".
pub const BROADCAST_TARGET: &str = "Everyone";

/// Groups created at startup, in creation order. Never destroyed.
pub const DEFAULT_GROUPS: &[&str] = &["#General", "#Random"];

/// Group every client is added to right after login.
pub const DEFAULT_GROUP: &str = "#General";

/// Sender name on server-originated notices (prompts, join/leave, user list).
pub const SERVER_SENDER: &str = "Server";

/// Sender name on operator broadcasts injected through the admin channel.
pub const ADMIN_SENDER: &str = "Admin";

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 so a connection has a stable log identity before it
/// authenticates, and so a stale handler's teardown can be told apart from
/// the connection that took over its username.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check whether a target string is group-marked.
pub fn is_group_target(target: &str) -> bool {
    target.starts_with(GROUP_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_group_target_detection() {
        assert!(is_group_target("#General"));
        assert!(!is_group_target("alice"));
        assert!(!is_group_target(""));
    }

    #[test]
    fn test_default_group_is_created_at_startup() {
        assert!(DEFAULT_GROUPS.contains(&DEFAULT_GROUP));
    }
}
