// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Hostname and service resolution.
//!
//! The engine resolves once per query and walks the returned addresses in order. The
//! [`Resolver`] trait lets tests substitute a fixed address list for the system resolver.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;

use crate::error::{ResolveError, SntpError};
use crate::protocol;

/// Service used when the caller does not name one.
pub const DEFAULT_SERVICE: &str = "123";

/// Source of socket addresses for a hostname.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `host` to socket addresses carrying `port`, in the order they should be
    /// tried.
    async fn lookup(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// The operating system's resolver, via [`tokio::net::lookup_host`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok(tokio::net::lookup_host((host, port)).await?.collect())
    }
}

/// One resolved server address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Endpoint {
    addr: SocketAddr,
}

impl Endpoint {
    /// Wrap a resolved address.
    pub fn new(addr: SocketAddr) -> Self {
        Endpoint { addr }
    }

    /// The socket address to send to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The numeric IP address as text, as reported to handlers.
    pub fn ip_string(&self) -> String {
        self.addr.ip().to_string()
    }

    /// The port as text, as reported to handlers.
    pub fn port_string(&self) -> String {
        self.addr.port().to_string()
    }
}

/// Turn a service string into a UDP port.
///
/// Accepts a decimal port or one of the NTP service names. `None` means
/// [`DEFAULT_SERVICE`].
pub fn service_port(servname: Option<&str>) -> Result<u16, ResolveError> {
    let service = servname.unwrap_or(DEFAULT_SERVICE).trim();
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }
    match service.to_ascii_lowercase().as_str() {
        "ntp" | "sntp" => Ok(protocol::PORT),
        _ => Err(ResolveError::UnknownService {
            service: service.to_string(),
        }),
    }
}

/// Resolve `host` and `servname` into the ordered endpoint list for one query.
///
/// The list is never empty and keeps the resolver's order.
pub async fn resolve_endpoints<R: Resolver + ?Sized>(
    resolver: &R,
    host: &str,
    servname: Option<&str>,
) -> Result<Vec<Endpoint>, SntpError> {
    let port = service_port(servname)?;
    let addrs = resolver
        .lookup(host, port)
        .await
        .map_err(ResolveError::Lookup)?;
    if addrs.is_empty() {
        return Err(ResolveError::NoAddresses {
            host: host.to_string(),
        }
        .into());
    }
    Ok(addrs.into_iter().map(Endpoint::new).collect())
}
