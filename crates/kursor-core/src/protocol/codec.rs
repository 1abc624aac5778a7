//! Binary codec for the Kursor relay datagram and the hub coordinate frame.
//!
//! Datagram wire format (see [`crate::protocol::messages`] for the table):
//! ```text
//! [opcode:1][token:16][seq:4][ts_ms:8][x:4][y:4]
//! ```
//! Total size: 37 bytes.  All multi-byte fields are little-endian.
//!
//! Coordinate frame wire format:
//! ```text
//! [seq_low:1][x:2][y:2]
//! ```
//! `x` and `y` are big-endian unsigned 16-bit fixed point (`0` = 0.0,
//! `65535` = 1.0).

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::domain::ids::SessionToken;
use crate::protocol::messages::{
    CoordsFrame, Opcode, RelayPacket, COORDS_FRAME_SIZE, OPCODE_OFFSET, PACKET_SIZE, SEQ_OFFSET,
    TOKEN_OFFSET, TS_OFFSET, X_OFFSET, Y_OFFSET,
};

/// Largest fixed-point value; represents 1.0.
pub const QUANT_MAX: u16 = u16::MAX;

/// Errors that can occur while decoding wire data.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The datagram is not exactly [`PACKET_SIZE`] bytes long.
    #[error("invalid packet length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The opcode byte is not a recognized value.
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// A coordinate frame is shorter than its fixed layout.
    #[error("coordinate frame too short: need at least 4 bytes, got {0}")]
    FrameTooShort(usize),
}

// ── Datagram ──────────────────────────────────────────────────────────────────

/// Encodes a [`RelayPacket`] into its 37-byte wire form.
///
/// # Examples
///
/// ```rust
/// use kursor_core::protocol::{decode_packet, encode_packet};
/// use kursor_core::{RelayPacket, SessionToken};
///
/// let packet = RelayPacket::cursor(SessionToken::generate(), 1, 0, 0.5, 0.25);
/// let bytes = encode_packet(&packet);
/// assert_eq!(decode_packet(&bytes).unwrap(), packet);
/// ```
pub fn encode_packet(packet: &RelayPacket) -> [u8; PACKET_SIZE] {
    let mut buf = [0u8; PACKET_SIZE];
    buf[OPCODE_OFFSET] = packet.opcode as u8;
    buf[TOKEN_OFFSET..SEQ_OFFSET].copy_from_slice(packet.token.as_bytes());
    buf[SEQ_OFFSET..TS_OFFSET].copy_from_slice(&packet.seq.to_le_bytes());
    buf[TS_OFFSET..X_OFFSET].copy_from_slice(&packet.timestamp_ms.to_le_bytes());
    buf[X_OFFSET..Y_OFFSET].copy_from_slice(&packet.x.to_le_bytes());
    buf[Y_OFFSET..PACKET_SIZE].copy_from_slice(&packet.y.to_le_bytes());
    buf
}

/// Decodes a relay datagram.
///
/// The coordinates are returned unclamped; receivers clamp with
/// [`RelayPacket::clamped_position`].
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidLength`] unless `bytes` is exactly
/// [`PACKET_SIZE`] long, and [`ProtocolError::UnknownOpcode`] for an opcode
/// other than keepalive or cursor.
pub fn decode_packet(bytes: &[u8]) -> Result<RelayPacket, ProtocolError> {
    let (opcode, token) = peek_header(bytes)?;
    Ok(RelayPacket {
        opcode,
        token,
        seq: u32::from_le_bytes(read_array(bytes, SEQ_OFFSET)),
        timestamp_ms: i64::from_le_bytes(read_array(bytes, TS_OFFSET)),
        x: f32::from_le_bytes(read_array(bytes, X_OFFSET)),
        y: f32::from_le_bytes(read_array(bytes, Y_OFFSET)),
    })
}

/// Parses only the opcode and token of a datagram.
///
/// This is all the relay needs to route a packet; the payload is forwarded
/// byte-for-byte without being re-encoded.
///
/// # Errors
///
/// Same as [`decode_packet`].
pub fn peek_header(bytes: &[u8]) -> Result<(Opcode, SessionToken), ProtocolError> {
    if bytes.len() != PACKET_SIZE {
        return Err(ProtocolError::InvalidLength {
            expected: PACKET_SIZE,
            actual: bytes.len(),
        });
    }
    let opcode =
        Opcode::try_from(bytes[OPCODE_OFFSET]).map_err(ProtocolError::UnknownOpcode)?;
    let token = SessionToken::from_bytes(read_array(bytes, TOKEN_OFFSET));
    Ok((opcode, token))
}

/// Milliseconds since the Unix epoch, for the datagram `ts` field.
pub fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

// ── Fixed-point coordinates ───────────────────────────────────────────────────

/// Quantizes a normalized coordinate to unsigned 16-bit fixed point.
///
/// Computes `round(v * 65535)` and clamps to `0..=65535`.  NaN maps to `0`.
pub fn quantize(v: f32) -> u16 {
    if v.is_nan() {
        return 0;
    }
    let scaled = (f64::from(v) * f64::from(QUANT_MAX)).round();
    scaled.clamp(0.0, f64::from(QUANT_MAX)) as u16
}

/// Inverse of [`quantize`].
pub fn dequantize(q: u16) -> f32 {
    (f64::from(q) / f64::from(QUANT_MAX)) as f32
}

impl CoordsFrame {
    /// Builds a frame from a room sequence number and a normalized position.
    pub fn from_position(seq: u32, x: f32, y: f32) -> Self {
        Self {
            seq_low: (seq & 0xFF) as u8,
            x: quantize(x),
            y: quantize(y),
        }
    }

    /// The normalized position this frame carries.
    pub fn position(&self) -> (f32, f32) {
        (dequantize(self.x), dequantize(self.y))
    }
}

/// Encodes a coordinate frame as `[seq_low, x_hi, x_lo, y_hi, y_lo]`.
pub fn encode_coords(frame: &CoordsFrame) -> [u8; COORDS_FRAME_SIZE] {
    let [x_hi, x_lo] = frame.x.to_be_bytes();
    let [y_hi, y_lo] = frame.y.to_be_bytes();
    [frame.seq_low, x_hi, x_lo, y_hi, y_lo]
}

/// Decodes a coordinate frame.
///
/// A 4-byte frame without the sequence byte is also accepted; its
/// `seq_low` is reported as `0`.  Extra trailing bytes are ignored.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooShort`] for fewer than 4 bytes.
pub fn decode_coords(bytes: &[u8]) -> Result<CoordsFrame, ProtocolError> {
    match bytes.len() {
        0..=3 => Err(ProtocolError::FrameTooShort(bytes.len())),
        4 => Ok(CoordsFrame {
            seq_low: 0,
            x: u16::from_be_bytes([bytes[0], bytes[1]]),
            y: u16::from_be_bytes([bytes[2], bytes[3]]),
        }),
        _ => Ok(CoordsFrame {
            seq_low: bytes[0],
            x: u16::from_be_bytes([bytes[1], bytes[2]]),
            y: u16::from_be_bytes([bytes[3], bytes[4]]),
        }),
    }
}

// ── Utility helpers ───────────────────────────────────────────────────────────

/// Copies `N` bytes starting at `offset`.  Callers have already checked the
/// buffer length against [`PACKET_SIZE`].
fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
