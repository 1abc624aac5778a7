//! Room identifiers, session tokens, and participant roles.
//!
//! A room is known by two kinds of name:
//!
//! - A short public [`RoomId`] (six alphanumeric characters) that appears in
//!   join links and HTTP paths.  It is *not* a secret; the room password
//!   protects it.
//! - Two secret [`SessionToken`]s, one per [`Role`].  Whoever holds a token
//!   acts as that role on the datagram relay and on the coordination hub, so
//!   tokens are generated from the operating-system RNG and never derived from
//!   anything guessable.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a generated room id in characters.
pub const ROOM_ID_LEN: usize = 6;

const ROOM_ID_ALPHABET: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

// ── RoomId ────────────────────────────────────────────────────────────────────

/// Short public identifier of a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps an existing id, e.g. one taken from an HTTP path.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random id of [`ROOM_ID_LEN`] characters.
    ///
    /// Each character is picked by reducing one random byte modulo the
    /// alphabet size.  The slight modulo bias is irrelevant here because ids
    /// are public; uniqueness is what matters, and the registry retries on
    /// collision.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ROOM_ID_LEN];
        OsRng.fill_bytes(&mut bytes);
        let id = bytes
            .iter()
            .map(|b| ROOM_ID_ALPHABET[*b as usize % ROOM_ID_ALPHABET.len()] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── SessionToken ──────────────────────────────────────────────────────────────

/// Opaque 16-byte secret that identifies one role inside one room.
///
/// In JSON the token is the hyphenated UUID string; on the datagram wire it is
/// the 16 raw UUID bytes in RFC 4122 order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    /// Number of bytes a token occupies on the wire.
    pub const LEN: usize = 16;

    /// Generates a fresh random (UUID v4) token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Rebuilds a token from its 16 wire bytes.
    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// The 16 wire bytes of this token.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        self.0.as_bytes()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ── Role ──────────────────────────────────────────────────────────────────────

/// The two participants of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Produces pointer samples.
    Teacher,
    /// Consumes pointer samples.
    Student,
}

impl Role {
    /// The opposite role.
    pub fn peer(self) -> Role {
        match self {
            Role::Teacher => Role::Student,
            Role::Student => Role::Teacher,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Teacher => f.write_str("teacher"),
            Role::Student => f.write_str("student"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_room_id_has_six_alphanumeric_chars() {
        // Arrange / Act
        let id = RoomId::generate();

        // Assert
        assert_eq!(id.as_str().len(), ROOM_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_room_ids_are_mostly_unique() {
        // 62^6 ≈ 5.7e10 possibilities; 1000 draws colliding would indicate a
        // broken RNG rather than bad luck.
        let ids: HashSet<_> = (0..1000).map(|_| RoomId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_session_token_bytes_round_trip() {
        let token = SessionToken::generate();
        let rebuilt = SessionToken::from_bytes(*token.as_bytes());
        assert_eq!(token, rebuilt);
    }

    #[test]
    fn test_session_token_parses_its_display_form() {
        let token = SessionToken::generate();
        let parsed: SessionToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_session_token_rejects_garbage() {
        assert!("not-a-token".parse::<SessionToken>().is_err());
    }

    #[test]
    fn test_session_token_serializes_as_plain_string() {
        let token = SessionToken::generate();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{token}\""));
    }

    #[test]
    fn test_role_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn test_role_peer_is_the_other_role() {
        assert_eq!(Role::Teacher.peer(), Role::Student);
        assert_eq!(Role::Student.peer(), Role::Teacher);
    }
}
