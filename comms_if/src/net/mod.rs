//! # Network Module
//!
//! Non-blocking UDP endpoints used by the drive executable. Every receive drains the socket so
//! that only the most recent datagrams are acted on, stale ones queued while the control cycle
//! was busy are discarded.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::ErrorKind,
    net::{SocketAddr, UdpSocket},
};

use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest datagram that will be received, enough for a path update of about 1100 points.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network addresses used by the drive executable.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// Address on which ego frames (JSON) are received
    pub ego_frame_addr: SocketAddr,

    /// Address on which target speed packets are received
    pub target_speed_addr: SocketAddr,

    /// Address on which path update packets are received
    pub path_update_addr: SocketAddr,

    /// Address control commands (JSON) are sent to
    pub control_cmd_addr: SocketAddr,
}

/// A bound, non-blocking UDP socket.
pub struct UdpEndpoint {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Could not bind socket to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    #[error("Could not set socket options: {0}")]
    SocketOptionError(std::io::Error),

    #[error("Socket receive failed: {0}")]
    RecvError(std::io::Error),

    #[error("Socket send failed: {0}")]
    SendError(std::io::Error),

    #[error("Could not serialize message: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl UdpEndpoint {
    /// Bind a new endpoint to the given address.
    pub fn bind(addr: SocketAddr) -> Result<Self, NetError> {
        let socket = UdpSocket::bind(addr).map_err(|e| NetError::BindError(addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(NetError::SocketOptionError)?;

        Ok(Self {
            socket,
            buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    /// Bind an endpoint to an ephemeral local port, used for sending only.
    pub fn ephemeral() -> Result<Self, NetError> {
        Self::bind(SocketAddr::from(([0, 0, 0, 0], 0)))
    }

    /// Receive every pending datagram, returning them oldest first.
    pub fn recv_all(&mut self) -> Result<Vec<Vec<u8>>, NetError> {
        let mut datagrams = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((n, _)) => datagrams.push(self.buffer[..n].to_vec()),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(NetError::RecvError(e)),
            }
        }

        Ok(datagrams)
    }

    /// Receive the most recent pending datagram, discarding any older ones.
    pub fn recv_latest(&mut self) -> Result<Option<Vec<u8>>, NetError> {
        let mut datagrams = self.recv_all()?;
        if datagrams.len() > 1 {
            debug!("Discarding {} stale datagrams", datagrams.len() - 1);
        }
        Ok(datagrams.pop())
    }

    /// Receive the most recent pending JSON message which deserializes into `T`.
    ///
    /// Datagrams which don't deserialize are skipped.
    pub fn recv_latest_json<T: DeserializeOwned>(&mut self) -> Result<Option<T>, NetError> {
        let latest = self
            .recv_all()?
            .iter()
            .rev()
            .find_map(|d| match serde_json::from_slice(d) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("Skipping malformed JSON datagram: {}", e);
                    None
                }
            });

        Ok(latest)
    }

    /// Send a datagram to the given address.
    pub fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<(), NetError> {
        self.socket
            .send_to(data, addr)
            .map(|_| ())
            .map_err(NetError::SendError)
    }

    /// Serialize a message to JSON and send it to the given address.
    pub fn send_json<T: Serialize>(&self, msg: &T, addr: SocketAddr) -> Result<(), NetError> {
        let data = serde_json::to_vec(msg).map_err(NetError::SerializationError)?;
        self.send_to(&data, addr)
    }

    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.socket.local_addr().map_err(NetError::SocketOptionError)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive::{ControlCmd, Indicator};
    use std::{thread, time::Duration};

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[test]
    fn test_recv_latest_keeps_newest() {
        let mut rx = UdpEndpoint::bind(loopback()).unwrap();
        let tx = UdpEndpoint::bind(loopback()).unwrap();
        let rx_addr = rx.local_addr().unwrap();

        tx.send_to(&[1], rx_addr).unwrap();
        tx.send_to(&[2], rx_addr).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(rx.recv_latest().unwrap(), Some(vec![2]));
        assert_eq!(rx.recv_latest().unwrap(), None);
    }

    #[test]
    fn test_json_round_trip() {
        let mut rx = UdpEndpoint::bind(loopback()).unwrap();
        let tx = UdpEndpoint::bind(loopback()).unwrap();
        let rx_addr = rx.local_addr().unwrap();

        let cmd = ControlCmd {
            steering: -0.2,
            throttle: 0.4,
            brake: 0.0,
            indicator: Indicator::Left,
        };
        tx.send_json(&cmd, rx_addr).unwrap();
        tx.send_to(b"not json", rx_addr).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(rx.recv_latest_json::<ControlCmd>().unwrap(), Some(cmd));
    }
}
