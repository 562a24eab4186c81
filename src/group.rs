//! Group struct definition
//!
//! A named multi-member channel. Groups are created once at startup and
//! never destroyed; members join lazily (first message to the group, or
//! the default-group add at login) and only leave via disconnect cleanup.

use crate::types::GROUP_MARKER;

/// Named chat group with membership in join order
#[derive(Debug)]
pub struct Group {
    /// Group name, always starting with the group marker
    pub name: String,
    /// Member identities in join order
    members: Vec<String>,
}

impl Group {
    /// Create an empty group
    pub fn new(name: &str) -> Self {
        debug_assert!(name.starts_with(GROUP_MARKER));
        Self {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    /// Add a member; idempotent
    ///
    /// Returns true if the member was newly added.
    pub fn join(&mut self, username: &str) -> bool {
        if self.contains(username) {
            false
        } else {
            self.members.push(username.to_string());
            true
        }
    }

    /// Remove a member if present
    ///
    /// Returns true if the member was removed.
    pub fn remove(&mut self, username: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != username);
        self.members.len() != before
    }

    /// Check membership
    pub fn contains(&self, username: &str) -> bool {
        self.members.iter().any(|m| m == username)
    }

    /// Current members in join order
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_starts_empty() {
        let group = Group::new("#General");
        assert_eq!(group.name, "#General");
        assert!(group.is_empty());
        assert_eq!(group.len(), 0);
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut group = Group::new("#General");

        assert!(group.join("alice"));
        assert!(!group.join("alice"));

        assert_eq!(group.len(), 1);
        assert!(group.contains("alice"));
    }

    #[test]
    fn test_members_in_join_order() {
        let mut group = Group::new("#General");
        group.join("alice");
        group.join("bob");
        group.join("carol");
        group.join("alice");

        assert_eq!(group.members(), &["alice", "bob", "carol"]);
    }

    #[test]
    fn test_remove_member() {
        let mut group = Group::new("#General");
        group.join("alice");
        group.join("bob");

        assert!(group.remove("alice"));
        assert!(!group.remove("alice"));
        assert!(!group.contains("alice"));
        assert_eq!(group.members(), &["bob"]);
    }

    #[test]
    fn test_membership_is_case_sensitive() {
        let mut group = Group::new("#General");
        group.join("Alice");

        assert!(!group.contains("alice"));
        assert!(group.join("alice"));
        assert_eq!(group.len(), 2);
    }
}
