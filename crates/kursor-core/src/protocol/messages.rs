//! Message types carried by the Kursor datagram relay and the hub's binary
//! coordinate frames.
//!
//! # Datagram layout (for beginners)
//!
//! Every datagram is exactly [`PACKET_SIZE`] bytes.  Multi-byte fields are
//! **little-endian**: the least significant byte comes first, which is how
//! x86 and ARM CPUs lay integers out in memory.
//!
//! ```text
//! offset  size  field
//!   0       1   opcode   (1 = keepalive, 2 = cursor)
//!   1      16   token    (session token, raw UUID bytes)
//!  17       4   seq      (u32)
//!  21       8   ts       (i64, Unix milliseconds)
//!  29       4   x        (f32, normalized 0..1)
//!  33       4   y        (f32, normalized 0..1)
//! ```
//!
//! A keepalive carries the same layout with the position fields zeroed; the
//! relay only uses its opcode and token.

use crate::domain::ids::SessionToken;

/// Total size of a relay datagram in bytes.
pub const PACKET_SIZE: usize = 37;

pub const OPCODE_OFFSET: usize = 0;
pub const TOKEN_OFFSET: usize = 1;
pub const SEQ_OFFSET: usize = 17;
pub const TS_OFFSET: usize = 21;
pub const X_OFFSET: usize = 29;
pub const Y_OFFSET: usize = 33;

/// Size of a hub coordinate frame in bytes.
pub const COORDS_FRAME_SIZE: usize = 5;

/// Kind of relay datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Refreshes the sender's endpoint and the room's activity.
    Keepalive = 1,
    /// Carries a pointer position from teacher to student.
    Cursor = 2,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Opcode::Keepalive),
            2 => Ok(Opcode::Cursor),
            other => Err(other),
        }
    }
}

/// A decoded relay datagram.
///
/// `x` and `y` are exactly what the sender put on the wire.  Use
/// [`RelayPacket::clamped_position`] before handing them to a renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelayPacket {
    pub opcode: Opcode,
    pub token: SessionToken,
    pub seq: u32,
    pub timestamp_ms: i64,
    pub x: f32,
    pub y: f32,
}

impl RelayPacket {
    /// Builds a keepalive for `token`.
    pub fn keepalive(token: SessionToken, seq: u32, timestamp_ms: i64) -> Self {
        Self {
            opcode: Opcode::Keepalive,
            token,
            seq,
            timestamp_ms,
            x: 0.0,
            y: 0.0,
        }
    }

    /// Builds a cursor packet for `token` at `(x, y)`.
    pub fn cursor(token: SessionToken, seq: u32, timestamp_ms: i64, x: f32, y: f32) -> Self {
        Self {
            opcode: Opcode::Cursor,
            token,
            seq,
            timestamp_ms,
            x,
            y,
        }
    }

    /// The position clamped into the unit square.
    pub fn clamped_position(&self) -> (f32, f32) {
        (clamp_unit(self.x), clamp_unit(self.y))
    }
}

/// Clamps `v` into `[0, 1]`.  NaN maps to `0`.
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// A quantized pointer position sent from the hub to the student.
///
/// Only the low byte of the room sequence number travels on the wire; it lets
/// the student spot reordering, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordsFrame {
    pub seq_low: u8,
    pub x: u16,
    pub y: u16,
}
