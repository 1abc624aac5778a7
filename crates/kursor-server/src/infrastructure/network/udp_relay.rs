//! UDP datagram relay loop.
//!
//! The loop does one thing: read the next datagram.  Every datagram is copied
//! out of the receive buffer and handed to its own Tokio task, which asks the
//! [`RelayEngine`] what to do and, for a forwarded cursor packet, sends the
//! **original bytes** to the student.  Nothing in the loop waits on routing or
//! on sending, so one slow `send_to` never delays the next `recv_from`.
//!
//! # Why forward the original bytes? (for beginners)
//!
//! The relay never re-encodes a packet.  The teacher's sequence number and
//! timestamp reach the student untouched, which lets the student measure
//! one-way delay and detect reordering on its own.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::application::relay::{RelayAction, RelayEngine};

/// Receive buffer size.  Larger than any valid datagram so oversized packets
/// are read whole and rejected by length instead of being truncated into a
/// valid-looking 37-byte packet.
const RECV_BUFFER_SIZE: usize = 2048;

/// Runs the datagram relay on `socket` until `cancel` fires.
///
/// Receive errors are logged and the loop continues; on some platforms an
/// ICMP "port unreachable" from a departed student surfaces as a receive
/// error on the next `recv_from`.
pub async fn run_udp_relay(socket: Arc<UdpSocket>, engine: Arc<RelayEngine>, cancel: CancellationToken) {
    match socket.local_addr() {
        Ok(addr) => info!("UDP relay listening on {addr}"),
        Err(e) => info!("UDP relay started (local address unavailable: {e})"),
    }

    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            r = socket.recv_from(&mut buf) => r,
        };

        match received {
            Ok((len, from)) => {
                let datagram = buf[..len].to_vec();
                let socket = Arc::clone(&socket);
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    handle_datagram(&socket, &engine, &datagram, from).await;
                });
            }
            Err(e) => error!("UDP receive error: {e}"),
        }
    }

    info!("UDP relay stopped");
}

/// Routes one datagram and performs the resulting send, if any.
async fn handle_datagram(socket: &UdpSocket, engine: &RelayEngine, datagram: &[u8], from: SocketAddr) {
    if let RelayAction::Forward(to) = engine.process(datagram, from) {
        if let Err(e) = socket.send_to(datagram, to).await {
            debug!(%to, "UDP forward failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use kursor_core::protocol::codec::encode_packet;
    use kursor_core::RelayPacket;

    use crate::application::metrics::NoopMetrics;
    use crate::application::room_registry::RoomRegistry;

    async fn loopback() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn test_cursor_is_relayed_byte_identical() {
        // Arrange
        let registry = Arc::new(RoomRegistry::default());
        let engine = Arc::new(RelayEngine::new(Arc::clone(&registry), Arc::new(NoopMetrics)));
        let relay = Arc::new(loopback().await);
        let relay_addr = relay.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_udp_relay(relay, engine, cancel.clone()));

        let room = registry.create_room("pw", None).unwrap();
        let teacher = loopback().await;
        let student = loopback().await;

        // Act – the student announces itself, then the teacher moves.
        let keepalive = encode_packet(&RelayPacket::keepalive(room.student_token(), 0, 0));
        student.send_to(&keepalive, relay_addr).await.unwrap();
        let cursor = encode_packet(&RelayPacket::cursor(room.teacher_token(), 7, 123, 0.5, 0.25));

        // The keepalive is processed on its own task; resend the cursor until
        // the endpoint has been learned.
        let mut buf = [0u8; 64];
        let mut received = None;
        for _ in 0..50 {
            teacher.send_to(&cursor, relay_addr).await.unwrap();
            if let Ok(Ok((len, _))) =
                tokio::time::timeout(Duration::from_millis(20), student.recv_from(&mut buf)).await
            {
                received = Some(buf[..len].to_vec());
                break;
            }
        }

        // Assert
        assert_eq!(received.as_deref(), Some(&cursor[..]));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("relay did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_relay_stops_on_cancel_while_idle() {
        let registry = Arc::new(RoomRegistry::default());
        let engine = Arc::new(RelayEngine::new(registry, Arc::new(NoopMetrics)));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_udp_relay(Arc::new(loopback().await), engine, cancel.clone()));

        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("relay did not stop")
            .unwrap();
    }
}
