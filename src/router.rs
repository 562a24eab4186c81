//! Target resolution
//!
//! Maps an inbound frame's `target` string to a delivery route. The exact
//! precedence matters: a group-marked target is always treated as a group
//! (never as an identity), the reserved broadcast value and an empty
//! target fan out to everyone, and anything else is a direct message
//! attempt. Whether a group or identity actually exists is checked against
//! live state by the relay server; unknown destinations are dropped there.

use crate::types::{is_group_target, BROADCAST_TARGET};

/// Where a message should be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// To every current member of the named group, lazily joining the sender
    Group(String),
    /// To every registered identity
    Broadcast,
    /// To one identity, with a private echo back to the sender
    Direct(String),
}

/// Resolve a raw target string into a route
pub fn resolve(target: &str) -> Route {
    let target = target.trim();
    if is_group_target(target) {
        Route::Group(target.to_string())
    } else if target.is_empty() || target == BROADCAST_TARGET {
        Route::Broadcast
    } else {
        Route::Direct(target.to_string())
    }
}
