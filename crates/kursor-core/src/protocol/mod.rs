//! Protocol module containing the datagram codec, the hub coordinate frame,
//! and the hub's JSON message types.

pub mod codec;
pub mod hub;
pub mod messages;
pub mod sequence;

pub use codec::{
    current_timestamp_ms, decode_coords, decode_packet, dequantize, encode_coords, encode_packet,
    peek_header, quantize, ProtocolError,
};
pub use hub::{HubEvent, HubOutbound, HubRequest, SignalKind};
pub use messages::*;
pub use sequence::SequenceCounter;
