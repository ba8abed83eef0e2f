// src/hal/udp_source.rs
//! UDP datagram transport, one record per datagram

use crate::config::constants::acquisition::MAX_DATAGRAM_BYTES;
use crate::hal::traits::{FrameSource, SourceEvent, SourceInfo, TransportKind};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum UdpSourceError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("UDP receive failed: {0}")]
    Receive(#[source] std::io::Error),
}

/// Listens for records on a UDP socket
pub struct UdpFrameSource {
    socket: UdpSocket,
    local_addr: SocketAddr,
    nominal_rate_hz: u32,
    pending: VecDeque<String>,
    buffer: Vec<u8>,
    last_peer: Option<SocketAddr>,
}

impl UdpFrameSource {
    /// Bind to `addr`; polls give up after `recv_timeout` and report [`SourceEvent::Idle`]
    pub fn bind(addr: &str, recv_timeout: Duration, nominal_rate_hz: u32) -> Result<Self, UdpSourceError> {
        let bind_err = |source| UdpSourceError::Bind {
            addr: addr.to_string(),
            source,
        };

        let socket = UdpSocket::bind(addr).map_err(bind_err)?;
        socket.set_read_timeout(Some(recv_timeout)).map_err(bind_err)?;
        let local_addr = socket.local_addr().map_err(bind_err)?;

        info!(addr = %local_addr, "Listening for Holter records");

        Ok(Self {
            socket,
            local_addr,
            nominal_rate_hz,
            pending: VecDeque::new(),
            buffer: vec![0u8; MAX_DATAGRAM_BYTES],
            last_peer: None,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl FrameSource for UdpFrameSource {
    type Error = UdpSourceError;

    fn poll(&mut self) -> Result<SourceEvent, Self::Error> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(SourceEvent::Line(line));
        }

        match self.socket.recv_from(&mut self.buffer) {
            Ok((len, peer)) => {
                if self.last_peer != Some(peer) {
                    info!(peer = %peer, "Receiving from new peer");
                    self.last_peer = Some(peer);
                }

                let text = String::from_utf8_lossy(&self.buffer[..len]);
                self.pending.extend(
                    text.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                );

                Ok(self
                    .pending
                    .pop_front()
                    .map(SourceEvent::Line)
                    .unwrap_or(SourceEvent::Idle))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                debug!("No datagram within receive timeout");
                Ok(SourceEvent::Idle)
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(SourceEvent::Idle),
            Err(e) => Err(UdpSourceError::Receive(e)),
        }
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: format!("udp://{}", self.local_addr),
            transport: TransportKind::Udp,
            nominal_rate_hz: self.nominal_rate_hz,
        }
    }
}
