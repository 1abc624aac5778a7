//! Hub connection identifiers.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Identifies one WebSocket connection to the coordination hub.
///
/// Allocated by the transport when a client connects and released when it
/// disconnects.  It never appears on the wire, only in logs and the debug
/// room snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first 8 hex digits are plenty to tell connections apart in logs.
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}
