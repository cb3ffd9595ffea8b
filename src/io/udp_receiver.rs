//! UDP receive socket for current readings.
//!
//! Bound once at startup; the ingest thread polls it with a short read
//! timeout so it can observe the shutdown flag between datagrams.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};

/// Maximum UDP datagram size (64KB for fragmented packets).
pub const MAX_DATAGRAM_SIZE: usize = 65536;

/// Broadcast-enabled UDP socket for incoming readings.
#[derive(Debug)]
pub struct UdpReceiver {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpReceiver {
    /// Bind the receive socket.
    ///
    /// Fails with [`Error::NetworkUnavailable`] if the address cannot be bound.
    pub fn bind(config: &NetworkConfig) -> Result<Self> {
        let addr = config.receive_address();
        let socket = UdpSocket::bind(&addr).map_err(|e| Error::network(&addr, e))?;

        socket
            .set_broadcast(true)
            .map_err(|e| Error::network(&addr, e))?;
        socket
            .set_read_timeout(Some(config.read_timeout()))
            .map_err(|e| Error::network(&addr, e))?;

        let local_addr = socket.local_addr().map_err(|e| Error::network(&addr, e))?;
        log::info!("UDP receiver bound to {}", local_addr);

        Ok(Self { socket, local_addr })
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the next datagram.
    ///
    /// Returns `Ok(None)` when the read timeout elapses without data.
    pub fn recv(&self, buffer: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buffer) {
            Ok(received) => Ok(Some(received)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
