//! UDP session with the datagram relay.
//!
//! # How does a participant use the relay? (for beginners)
//!
//! Each side binds its own UDP socket on an ephemeral port and sends every
//! packet to the server's relay port, stamped with its session token:
//!
//! ```text
//! teacher ──Cursor(teacher token)──►  relay  ──same bytes──►  student
//! student ──Keepalive(student token)──►  relay   (registers the student's address)
//! ```
//!
//! The server learns where to deliver by watching the source address of the
//! student's packets, so the student must keep sending keepalives (every 3
//! seconds by default) for as long as it wants to receive.  The teacher sends
//! keepalives too, which keeps its room from being evicted while the pointer
//! is still.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kursor_core::protocol::codec::current_timestamp_ms;
use kursor_core::protocol::SequenceCounter;
use kursor_core::{decode_packet, encode_packet, Opcode, RelayPacket, SessionToken};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ClientNetworkError;
use crate::application::sample_pointer::{PositionSink, SinkError};

/// How often [`RelaySession::run_keepalive`] refreshes the server's view of us.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(3000);

const RECV_BUFFER_SIZE: usize = 2048;

/// One participant's UDP socket, bound to an ephemeral local port.
#[derive(Debug)]
pub struct RelaySession {
    socket: UdpSocket,
    server: SocketAddr,
    token: SessionToken,
    seq: SequenceCounter,
}

impl RelaySession {
    /// Binds an ephemeral UDP port in the same address family as `server`.
    pub async fn connect(
        server: SocketAddr,
        token: SessionToken,
    ) -> Result<Self, ClientNetworkError> {
        let unspecified = match server.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let local = SocketAddr::new(unspecified, 0);
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| ClientNetworkError::Bind { addr: local, source })?;
        info!(
            "relay session bound to {} for server {server}",
            socket.local_addr()?
        );
        Ok(Self {
            socket,
            server,
            token,
            seq: SequenceCounter::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientNetworkError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Sends a keepalive for this session's token.
    pub async fn send_keepalive(&self) -> Result<(), ClientNetworkError> {
        let packet = RelayPacket::keepalive(self.token, self.seq.next(), current_timestamp_ms());
        self.send(&packet).await
    }

    /// Sends a pointer position.  The server only relays cursors that carry a
    /// teacher token.
    pub async fn send_cursor(&self, x: f32, y: f32) -> Result<(), ClientNetworkError> {
        let packet =
            RelayPacket::cursor(self.token, self.seq.next(), current_timestamp_ms(), x, y);
        self.send(&packet).await
    }

    async fn send(&self, packet: &RelayPacket) -> Result<(), ClientNetworkError> {
        let bytes = encode_packet(packet);
        self.socket.send_to(&bytes, self.server).await?;
        Ok(())
    }

    /// Waits for the next cursor datagram and returns its position, clamped
    /// to `[0, 1]`.
    ///
    /// Datagrams that do not decode and keepalives are skipped.
    pub async fn recv_position(&self) -> Result<(f32, f32), ClientNetworkError> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            match decode_packet(&buf[..len]) {
                Ok(packet) if packet.opcode == Opcode::Cursor => {
                    return Ok(packet.clamped_position());
                }
                Ok(_) => {}
                Err(e) => debug!("ignoring datagram from {from}: {e}"),
            }
        }
    }

    /// Sends a keepalive now and then every `interval` until `cancel` fires.
    ///
    /// Send failures are logged and retried on the next tick.
    pub async fn run_keepalive(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.send_keepalive().await {
                        debug!("keepalive failed: {e}");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl PositionSink for RelaySession {
    async fn send_position(&self, x: f32, y: f32) -> Result<(), SinkError> {
        self.send_cursor(x, y)
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}
