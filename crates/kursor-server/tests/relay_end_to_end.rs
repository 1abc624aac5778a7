//! End-to-end tests for the datagram path.
//!
//! A real [`RelayServer`] is bound to loopback port 0.  Rooms are created and
//! joined through the HTTP API with hand-written HTTP/1.1 requests, and the
//! teacher and student are plain UDP sockets.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use kursor_core::protocol::codec::{current_timestamp_ms, decode_packet, encode_packet};
use kursor_core::{Opcode, RelayPacket, SessionToken};
use kursor_server::{RelayServer, ServerConfig};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Running {
    http: SocketAddr,
    udp: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), kursor_server::RelayError>>,
}

impl Running {
    async fn stop(self) {
        self.cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(2), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        tokio_test::assert_ok!(result);
    }
}

async fn start(config: ServerConfig) -> Running {
    let server = RelayServer::bind(config).await.expect("bind");
    let running_http = server.http_addr();
    let udp = server.udp_addr();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(server.serve(cancel.clone()));
    Running {
        http: running_http,
        udp,
        cancel,
        handle,
    }
}

fn loopback_config() -> ServerConfig {
    ServerConfig {
        bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        http_port: 0,
        udp_port: 0,
        hub_port: 0,
        ..ServerConfig::default()
    }
}

/// Sends one JSON request and returns the status code and parsed body.
async fn http_json(addr: SocketAddr, method: &str, path: &str, body: Value) -> (u16, Value) {
    let payload = body.to_string();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(request.as_bytes()).await.expect("write");
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read");
    let text = String::from_utf8(raw).expect("utf-8 response");

    let (head, body) = text.split_once("\r\n\r\n").expect("header terminator");
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("status code");
    let json = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).expect("JSON body")
    };
    (status, json)
}

fn token_of(value: &Value) -> SessionToken {
    value.as_str().expect("token string").parse().expect("token")
}

async fn recv_packet(socket: &UdpSocket, wait: Duration) -> Option<Vec<u8>> {
    let mut buf = [0u8; 128];
    match tokio::time::timeout(wait, socket.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(buf[..len].to_vec()),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_join_and_relay_cursor_byte_identical() {
    // Arrange – create and join over HTTP
    let server = start(loopback_config()).await;
    let (status, created) = http_json(server.http, "POST", "/rooms", json!({ "password": "pw" })).await;
    assert_eq!(status, 200);
    assert_eq!(created["udpPort"], server.udp.port());
    let room_id = created["roomId"].as_str().unwrap().to_string();
    let teacher_token = token_of(&created["teacherToken"]);

    let (status, joined) = http_json(
        server.http,
        "POST",
        &format!("/rooms/{room_id}/join"),
        json!({ "password": "pw" }),
    )
    .await;
    assert_eq!(status, 200);
    let student_token = token_of(&joined["studentToken"]);

    let teacher = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let student = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let cursor = encode_packet(&RelayPacket::cursor(
        teacher_token,
        1,
        current_timestamp_ms(),
        0.5,
        0.25,
    ));

    // Act – the student announces itself until a cursor comes through.
    let mut received = None;
    for _ in 0..50 {
        let keepalive = encode_packet(&RelayPacket::keepalive(student_token, 0, current_timestamp_ms()));
        student.send_to(&keepalive, server.udp).await.unwrap();
        teacher.send_to(&cursor, server.udp).await.unwrap();
        if let Some(bytes) = recv_packet(&student, Duration::from_millis(20)).await {
            received = Some(bytes);
            break;
        }
    }

    // Assert
    let received = received.expect("student never received the cursor");
    assert_eq!(received, cursor.to_vec());
    let packet = decode_packet(&received).unwrap();
    assert_eq!(packet.opcode, Opcode::Cursor);
    assert_eq!(packet.clamped_position(), (0.5, 0.25));

    server.stop().await;
}

#[tokio::test]
async fn test_student_cursor_never_reaches_teacher() {
    // Arrange
    let server = start(loopback_config()).await;
    let (_, created) = http_json(server.http, "POST", "/rooms", json!({ "password": "pw" })).await;
    let room_id = created["roomId"].as_str().unwrap().to_string();
    let teacher_token = token_of(&created["teacherToken"]);
    let (_, joined) = http_json(
        server.http,
        "POST",
        &format!("/rooms/{room_id}/join"),
        json!({ "password": "pw" }),
    )
    .await;
    let student_token = token_of(&joined["studentToken"]);

    let teacher = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let student = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for socket_token in [(&teacher, teacher_token), (&student, student_token)] {
        let keepalive = encode_packet(&RelayPacket::keepalive(socket_token.1, 0, 0));
        socket_token.0.send_to(&keepalive, server.udp).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Act – the student tries to drive the teacher's pointer
    let forged = encode_packet(&RelayPacket::cursor(student_token, 9, 0, 0.9, 0.9));
    student.send_to(&forged, server.udp).await.unwrap();

    // Assert
    assert_eq!(recv_packet(&teacher, Duration::from_millis(150)).await, None);
    server.stop().await;
}

#[tokio::test]
async fn test_wrong_password_and_unknown_room() {
    let server = start(loopback_config()).await;
    let (_, created) = http_json(server.http, "POST", "/rooms", json!({ "password": "right" })).await;
    let room_id = created["roomId"].as_str().unwrap().to_string();

    let (bad_pw, body) = http_json(
        server.http,
        "POST",
        &format!("/rooms/{room_id}/join"),
        json!({ "password": "wrong" }),
    )
    .await;
    let (unknown, _) = http_json(server.http, "POST", "/rooms/nope00/join", json!({ "password": "x" })).await;

    assert_eq!(bad_pw, 400);
    assert!(body["error"].is_string());
    assert_eq!(unknown, 404);
    server.stop().await;
}

#[tokio::test]
async fn test_unjoined_room_is_evicted_after_grace_ttl() {
    // Arrange – short timers so the sweep runs during the test
    let config = ServerConfig {
        room_grace_ttl: Duration::from_millis(100),
        sweep_interval: Duration::from_millis(20),
        ..loopback_config()
    };
    let server = start(config).await;
    let (_, created) = http_json(server.http, "POST", "/rooms", json!({ "password": "pw" })).await;
    let room_id = created["roomId"].as_str().unwrap().to_string();
    let teacher_token = created["teacherToken"].as_str().unwrap().to_string();

    // Act
    tokio::time::sleep(Duration::from_millis(400)).await;

    // Assert – the room is gone for HTTP and for heartbeats
    let (join, _) = http_json(
        server.http,
        "POST",
        &format!("/rooms/{room_id}/join"),
        json!({ "password": "pw" }),
    )
    .await;
    let (heartbeat, _) = http_json(
        server.http,
        "POST",
        &format!("/rooms/{room_id}/heartbeat"),
        json!({ "token": teacher_token }),
    )
    .await;
    assert_eq!(join, 404);
    assert_eq!(heartbeat, 404);
    server.stop().await;
}
