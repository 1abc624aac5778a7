//! JSON messages exchanged over the coordination hub.
//!
//! Client → server text frames are [`HubRequest`]s tagged by a `"method"`
//! field.  Server → client text frames are [`HubEvent`]s tagged by an
//! `"event"` field.  Pointer positions flowing to the student are the one
//! exception: they travel as 5-byte binary frames (see
//! [`crate::protocol::codec::encode_coords`]), which is why the server's
//! outbound queue carries [`HubOutbound`] rather than bare events.
//!
//! Example text frames:
//!
//! ```text
//! {"method":"join","token":"6f1c…","role":"student"}
//! {"event":"JoinedAsStudent","token":"6f1c…"}
//! {"method":"sendOffer","token":"6f1c…","payload":{"sdp":"…"}}
//! {"event":"ReceiveOffer","payload":{"sdp":"…"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ids::{Role, SessionToken};
use crate::protocol::messages::CoordsFrame;

/// Kind of a signaling message relayed between the two participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    Ice,
}

impl SignalKind {
    /// The event the receiving peer gets for this kind of signal.
    pub fn into_event(self, payload: Value) -> HubEvent {
        match self {
            SignalKind::Offer => HubEvent::ReceiveOffer { payload },
            SignalKind::Answer => HubEvent::ReceiveAnswer { payload },
            SignalKind::Ice => HubEvent::ReceiveIce { payload },
        }
    }
}

/// A request sent by a client to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum HubRequest {
    /// Bind this connection to a room role.
    Join { token: SessionToken, role: Role },
    /// Teacher pushes a pointer position.
    SendCoords { token: SessionToken, x: f32, y: f32 },
    /// Refresh the bound room's activity.
    Heartbeat,
    /// Teacher closes the room.
    RemoveRoom { token: SessionToken },
    SendOffer { token: SessionToken, payload: Value },
    SendAnswer { token: SessionToken, payload: Value },
    SendIceCandidate { token: SessionToken, payload: Value },
}

impl HubRequest {
    /// Splits a signaling request into its parts.  Returns `None` for every
    /// other request.
    pub fn as_signal(&self) -> Option<(SessionToken, SignalKind, &Value)> {
        match self {
            HubRequest::SendOffer { token, payload } => Some((*token, SignalKind::Offer, payload)),
            HubRequest::SendAnswer { token, payload } => Some((*token, SignalKind::Answer, payload)),
            HubRequest::SendIceCandidate { token, payload } => {
                Some((*token, SignalKind::Ice, payload))
            }
            _ => None,
        }
    }
}

/// A notification sent by the hub to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum HubEvent {
    /// The token given to `join` does not name a room for that role.
    RoomNotFound,
    #[serde(rename_all = "camelCase")]
    JoinedAsTeacher {
        token: SessionToken,
        aspect_w: u32,
        aspect_h: u32,
    },
    JoinedAsStudent { token: SessionToken },
    /// Sent to the teacher when a student joins.
    StudentConnected,
    /// The other participant's hub connection closed.
    PeerDisconnected,
    /// Sent to the student when the teacher removed the room.
    RoomRemoved,
    /// Answer to a `removeRoom` request.
    RoomRemovalResult { removed: bool },
    ReceiveOffer { payload: Value },
    ReceiveAnswer { payload: Value },
    ReceiveIce { payload: Value },
}

/// One message queued for delivery on a hub connection.
#[derive(Debug, Clone, PartialEq)]
pub enum HubOutbound {
    /// Sent as a JSON text frame.
    Event(HubEvent),
    /// Sent as a binary coordinate frame.
    Coords(CoordsFrame),
}

impl From<HubEvent> for HubOutbound {
    fn from(event: HubEvent) -> Self {
        HubOutbound::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_request_parses_from_camel_case_json() {
        // Arrange
        let token = SessionToken::generate();
        let text = format!(r#"{{"method":"join","token":"{token}","role":"teacher"}}"#);

        // Act
        let request: HubRequest = serde_json::from_str(&text).unwrap();

        // Assert
        assert_eq!(request, HubRequest::Join { token, role: Role::Teacher });
    }

    #[test]
    fn test_send_coords_and_heartbeat_parse() {
        let token = SessionToken::generate();
        let coords: HubRequest = serde_json::from_value(json!({
            "method": "sendCoords", "token": token.to_string(), "x": 0.5, "y": 0.25
        }))
        .unwrap();
        assert_eq!(coords, HubRequest::SendCoords { token, x: 0.5, y: 0.25 });

        let heartbeat: HubRequest = serde_json::from_str(r#"{"method":"heartbeat"}"#).unwrap();
        assert_eq!(heartbeat, HubRequest::Heartbeat);
    }

    #[test]
    fn test_unknown_method_is_an_error() {
        assert!(serde_json::from_str::<HubRequest>(r#"{"method":"dance"}"#).is_err());
    }

    #[test]
    fn test_signal_requests_split_into_kind_and_payload() {
        let token = SessionToken::generate();
        let request = HubRequest::SendIceCandidate { token, payload: json!({"candidate": "a"}) };
        let (t, kind, payload) = request.as_signal().unwrap();
        assert_eq!(t, token);
        assert_eq!(kind, SignalKind::Ice);
        assert_eq!(payload, &json!({"candidate": "a"}));
        assert!(HubRequest::Heartbeat.as_signal().is_none());
    }

    #[test]
    fn test_joined_as_teacher_serializes_camel_case_aspect() {
        let token = SessionToken::generate();
        let event = HubEvent::JoinedAsTeacher { token, aspect_w: 16, aspect_h: 9 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "JoinedAsTeacher", "token": token.to_string(), "aspectW": 16, "aspectH": 9})
        );
    }

    #[test]
    fn test_unit_events_serialize_to_tag_only() {
        let value = serde_json::to_value(HubEvent::RoomNotFound).unwrap();
        assert_eq!(value, json!({"event": "RoomNotFound"}));
    }

    #[test]
    fn test_signal_kind_maps_to_receive_event() {
        let payload = json!({"sdp": "v=0"});
        assert_eq!(
            SignalKind::Answer.into_event(payload.clone()),
            HubEvent::ReceiveAnswer { payload }
        );
    }

    #[test]
    fn test_removal_result_round_trips_through_json() {
        let text = serde_json::to_string(&HubEvent::RoomRemovalResult { removed: true }).unwrap();
        let event: HubEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(event, HubEvent::RoomRemovalResult { removed: true });
    }
}
