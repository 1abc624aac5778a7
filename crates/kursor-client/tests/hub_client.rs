//! Tests for `HubClient` against a minimal in-test WebSocket hub.
//!
//! The fake hub records every text frame it receives and lets the test push
//! frames back, so the client's encoding and decoding can be checked without
//! the full server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kursor_client::{ClientEvent, ClientNetworkError, HubClient};
use kursor_core::protocol::codec::encode_coords;
use kursor_core::{CoordsFrame, HubEvent, Role, SessionToken};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(2);

/// Frames the fake hub received, and a sender for frames it should push.
struct FakeHub {
    url: String,
    received: mpsc::UnboundedReceiver<Value>,
    push: mpsc::UnboundedSender<Message>,
}

async fn fake_hub() -> FakeHub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (received_tx, received) = mpsc::unbounded_channel();
    let (push, mut push_rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        let (mut sink, mut stream) = ws.split();
        tokio::spawn(async move {
            while let Some(msg) = push_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
        });
        while let Some(Ok(msg)) = stream.next().await {
            if let Message::Text(text) = msg {
                let _ = received_tx.send(serde_json::from_str(&text).unwrap());
            }
        }
    });

    FakeHub { url, received, push }
}

async fn next_request(hub: &mut FakeHub) -> Value {
    tokio::time::timeout(WAIT, hub.received.recv())
        .await
        .expect("hub received nothing")
        .expect("hub stopped")
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("client received nothing")
        .expect("event stream ended")
}

#[tokio::test]
async fn test_requests_are_sent_as_camel_case_json() {
    // Arrange
    let mut hub = fake_hub().await;
    let (client, _events) = HubClient::connect(&hub.url).await.unwrap();
    let token = SessionToken::generate();

    // Act
    client.join(token, Role::Teacher).unwrap();
    client.send_coords(0.5, 0.25).unwrap();
    client.heartbeat().unwrap();
    client.send_offer(json!({ "sdp": "v=0" })).unwrap();
    client.remove_room().unwrap();

    // Assert
    let token = token.to_string();
    assert_eq!(
        next_request(&mut hub).await,
        json!({ "method": "join", "token": token, "role": "teacher" })
    );
    assert_eq!(
        next_request(&mut hub).await,
        json!({ "method": "sendCoords", "token": token, "x": 0.5, "y": 0.25 })
    );
    assert_eq!(next_request(&mut hub).await, json!({ "method": "heartbeat" }));
    assert_eq!(
        next_request(&mut hub).await,
        json!({ "method": "sendOffer", "token": token, "payload": { "sdp": "v=0" } })
    );
    assert_eq!(
        next_request(&mut hub).await,
        json!({ "method": "removeRoom", "token": token })
    );
}

#[tokio::test]
async fn test_room_requests_before_join_are_rejected() {
    let hub = fake_hub().await;
    let (client, _events) = HubClient::connect(&hub.url).await.unwrap();

    assert!(matches!(client.send_coords(0.1, 0.1), Err(ClientNetworkError::NotJoined)));
    assert!(matches!(client.remove_room(), Err(ClientNetworkError::NotJoined)));
    assert!(matches!(
        client.send_ice_candidate(json!({})),
        Err(ClientNetworkError::NotJoined)
    ));
    assert_eq!(client.token(), None);
}

#[tokio::test]
async fn test_events_and_coordinate_frames_are_decoded() {
    // Arrange
    let hub = fake_hub().await;
    let (_client, mut events) = HubClient::connect(&hub.url).await.unwrap();
    let frame = CoordsFrame::from_position(7, 1.0, 0.0);

    // Act – garbage in between must be skipped
    hub.push
        .send(Message::Text(r#"{"event":"StudentConnected"}"#.to_string()))
        .unwrap();
    hub.push.send(Message::Text("{broken".to_string())).unwrap();
    hub.push.send(Message::Binary(vec![1, 2])).unwrap();
    hub.push
        .send(Message::Binary(encode_coords(&frame).to_vec()))
        .unwrap();

    // Assert
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Event(HubEvent::StudentConnected)
    );
    match next_event(&mut events).await {
        ClientEvent::Coords(received) => assert_eq!(received.position(), (1.0, 0.0)),
        other => panic!("expected coordinates, got {other:?}"),
    }
}

#[tokio::test]
async fn test_event_stream_ends_when_hub_closes() {
    let hub = fake_hub().await;
    let (_client, mut events) = HubClient::connect(&hub.url).await.unwrap();

    hub.push.send(Message::Close(None)).unwrap();

    let end = tokio::time::timeout(WAIT, events.recv()).await.expect("stream did not end");
    assert_eq!(end, None);
}

#[tokio::test]
async fn test_connect_to_nothing_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let result = HubClient::connect(&url).await;

    assert!(matches!(result, Err(ClientNetworkError::Connect { .. })));
}
