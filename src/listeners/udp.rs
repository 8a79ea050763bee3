//! auto_rx UDP broadcast listener.

use async_trait::async_trait;
use chrono::Utc;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use super::{Listener, RecordCallback};
use crate::core::config::ListenerKind;
use crate::core::telemetry::normalize_udp;
use crate::error::Result;

/// Largest datagram auto_rx sends is well under this
const MAX_DATAGRAM: usize = 65_535;

pub struct UdpListener {
    addr: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpListener {
    /// Listen on every interface at `port`
    pub fn new(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            socket: None,
        }
    }

    /// Use an already bound socket
    pub fn with_socket(socket: UdpSocket) -> Result<Self> {
        Ok(Self {
            addr: socket.local_addr()?,
            socket: Some(socket),
        })
    }
}

#[async_trait]
impl Listener for UdpListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Udp
    }

    async fn listen(
        &mut self,
        on_record: RecordCallback,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => {
                let socket = UdpSocket::bind(self.addr).await?;
                socket.set_broadcast(true)?;
                socket
            }
        };
        log::info!("Listening for UDP packets on {}", self.addr);

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    log::debug!("Closing UDP socket on {}", self.addr);
                    break;
                }
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, src)) => handle_datagram(&buf[..len], src, &on_record),
                        // Never fatal: ICMP errors and the like surface here on some platforms
                        Err(e) => log::warn!("UDP receive error: {}", e),
                    }
                }
            }
        }

        Ok(())
    }
}

fn handle_datagram(data: &[u8], src: SocketAddr, on_record: &RecordCallback) {
    match normalize_udp(data, Utc::now()) {
        Ok(Some(record)) => on_record(record),
        Ok(None) => log::trace!("Ignoring non-summary packet from {}", src),
        Err(e) => log::warn!("Discarding malformed packet from {}: {}", src, e),
    }
}
