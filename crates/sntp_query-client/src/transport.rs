// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! UDP transport for queries.
//!
//! One socket is opened per endpoint and reused for that endpoint's retries; dropping it
//! closes it. The traits here are the seam the engine is tested through: a fake transport
//! can answer, stay silent or fail without touching the network.

use async_trait::async_trait;
use log::debug;
use std::io;
use std::net::SocketAddr;

use crate::error::SntpError;
use crate::protocol;

/// Opens sockets towards endpoints.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The socket type produced by [`open`](Transport::open).
    type Socket: TransportSocket;

    /// Open a socket that sends to `target`.
    ///
    /// With `use_service_port` the local side binds to the NTP port instead of an
    /// ephemeral one. Failing to bind is reported as [`SntpError::Bind`].
    async fn open(
        &self,
        target: SocketAddr,
        use_service_port: bool,
    ) -> Result<Self::Socket, SntpError>;
}

/// A socket bound for one endpoint.
#[async_trait]
pub trait TransportSocket: Send {
    /// Send one datagram to the endpoint.
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Wait for the next datagram and report where it came from.
    async fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

/// Select the wildcard bind address matching the target's family.
pub(crate) fn bind_addr_for(target: &SocketAddr, port: u16) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], port)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], port)),
    }
}

/// Create and bind a non-blocking UDP socket.
///
/// `reuse_address` sets `SO_REUSEADDR` so a fixed local port can be shared with other
/// NTP software on the host.
pub(crate) fn bind_udp(
    bind_addr: SocketAddr,
    reuse_address: bool,
) -> io::Result<std::net::UdpSocket> {
    use socket2::{Domain, Protocol, Socket, Type};

    let domain = if bind_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if reuse_address {
        socket.set_reuse_address(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&bind_addr.into())?;
    Ok(socket.into())
}

/// Real UDP sockets on the tokio runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpTransport;

/// A tokio UDP socket connected to one endpoint.
#[derive(Debug)]
pub struct UdpTransportSocket {
    sock: tokio::net::UdpSocket,
}

#[async_trait]
impl Transport for UdpTransport {
    type Socket = UdpTransportSocket;

    async fn open(
        &self,
        target: SocketAddr,
        use_service_port: bool,
    ) -> Result<UdpTransportSocket, SntpError> {
        let port = if use_service_port { protocol::PORT } else { 0 };
        let std_sock = bind_udp(bind_addr_for(&target, port), use_service_port)
            .map_err(SntpError::Bind)?;
        let sock = tokio::net::UdpSocket::from_std(std_sock).map_err(SntpError::Bind)?;
        // Connecting lets the kernel report ICMP refusals on the next receive.
        sock.connect(target).await?;
        debug!("{:?} -> {}", sock.local_addr(), target);
        Ok(UdpTransportSocket { sock })
    }
}

#[async_trait]
impl TransportSocket for UdpTransportSocket {
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let sz = self.sock.send(buf).await?;
        debug!("sent: {}", sz);
        Ok(sz)
    }

    async fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let (len, src) = self.sock.recv_from(buf).await?;
        debug!("recv: {} bytes from {:?}", len, src);
        Ok((len, src))
    }
}
