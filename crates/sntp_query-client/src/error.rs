// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Result codes and error types for SNTP queries.
//!
//! Every outcome a handler sees is a [`QueryResult`]. Internally the engine works with
//! [`SntpError`] values, which carry the detail behind a failure and know how to
//! [`classify`](SntpError::classify) themselves into the public result taxonomy.
//!
//! `SntpError` also converts into `io::Error`, so callers that prefer the standard error
//! type can downcast via `io::Error::get_ref()`:
//!
//! ```
//! use sntp_client::error::{ProtocolError, SntpError};
//! use std::io;
//!
//! let err: io::Error = SntpError::Protocol(ProtocolError::OriginTimestampMismatch).into();
//! let inner = err.get_ref().and_then(|e| e.downcast_ref::<SntpError>());
//! assert!(matches!(inner, Some(SntpError::Protocol(_))));
//! ```

pub use sntp_proto::error::ParseError;

use std::fmt;
use std::io;

use crate::codec::kiss_code_result;
use crate::protocol::{KissCode, Mode};

/// The outcome of one endpoint, or of a whole query, as reported to a handler.
///
/// Failures are ordered by specificity; when several endpoints fail, the most specific
/// failure is the one reported for the query as a whole.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum QueryResult {
    /// A usable time sample was obtained.
    Success,
    /// The server requires authentication the client could not provide.
    Authorization,
    /// The server told the client to stop querying it.
    ServerKissOfDeath,
    /// The server told the client to slow down.
    ServerRateLimit,
    /// A reply arrived but could not be trusted.
    PacketUnusable,
    /// No usable reply was obtained from the server.
    ServerUnusable,
    /// The hostname or service could not be resolved.
    Dns,
    /// The local UDP socket could not be bound.
    CannotBindSocket,
    /// A local failure unrelated to any server.
    Internal,
}

impl QueryResult {
    /// Rank used when aggregating failures. Higher is more specific.
    ///
    /// `Success` ranks above every failure but is never aggregated.
    pub fn specificity(&self) -> u8 {
        match self {
            QueryResult::Success => 8,
            QueryResult::Authorization => 7,
            QueryResult::ServerKissOfDeath => 6,
            QueryResult::ServerRateLimit => 5,
            QueryResult::PacketUnusable => 4,
            QueryResult::ServerUnusable => 3,
            QueryResult::Dns => 2,
            QueryResult::CannotBindSocket => 1,
            QueryResult::Internal => 0,
        }
    }

    /// Whether this is [`QueryResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success)
    }

    /// Returns whichever of `self` and `other` is more specific.
    ///
    /// Ties keep `self`, so an earlier failure is never replaced by an equal one.
    pub fn most_specific(self, other: QueryResult) -> QueryResult {
        if other.specificity() > self.specificity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryResult::Success => "success",
            QueryResult::Authorization => "authorization required",
            QueryResult::ServerKissOfDeath => "server sent kiss-o'-death",
            QueryResult::ServerRateLimit => "server rate limited the request",
            QueryResult::PacketUnusable => "response packet unusable",
            QueryResult::ServerUnusable => "server unusable",
            QueryResult::Dns => "name resolution failed",
            QueryResult::CannotBindSocket => "cannot bind socket",
            QueryResult::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while querying a server.
#[derive(Debug)]
pub enum SntpError {
    /// The reply failed decoding or validation.
    Protocol(ProtocolError),
    /// No reply arrived before the attempt deadline.
    Timeout(TimeoutError),
    /// The query was configured with invalid parameters.
    Config(ConfigError),
    /// The server replied with a recognized kiss code.
    KissOfDeath(KissOfDeathError),
    /// Binding the local socket failed.
    Bind(io::Error),
    /// Resolving the hostname or service failed.
    Resolve(ResolveError),
    /// Sending or receiving failed.
    Io(io::Error),
}

/// Reply decoding and validation failures.
#[derive(Clone, Debug, PartialEq)]
pub enum ProtocolError {
    /// Reply shorter than the 48-byte header.
    ResponseTooShort {
        /// Number of bytes received.
        received: usize,
    },
    /// Reply mode cannot answer a client request.
    UnexpectedMode(Mode),
    /// Reply version is not 1 through 4.
    UnsupportedVersion {
        /// The version number carried by the reply.
        version: u8,
    },
    /// Origin timestamp does not echo the transmit timestamp of our request.
    OriginTimestampMismatch,
    /// Server transmit timestamp is zero.
    ZeroTransmitTimestamp,
    /// Server reports an unsynchronized clock (alarm leap indicator or stratum above 15).
    UnsynchronizedServer,
    /// Stratum-0 reply carrying a code that is not a known kiss code.
    UnknownKissCode([u8; 4]),
    /// Round-trip delay is negative, non-finite or larger than the protocol maximum.
    ImplausibleDelay {
        /// The computed delay in seconds.
        delay: f64,
    },
    /// Dispersion is negative, non-finite or larger than the protocol maximum.
    ImplausibleDispersion {
        /// The computed dispersion in seconds.
        dispersion: f64,
    },
    /// Generic protocol error.
    Other(String),
}

/// Timeout errors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TimeoutError {
    /// No reply arrived before the deadline of the given attempt.
    Attempt {
        /// 0-based attempt number.
        attempt: u32,
    },
}

/// Invalid query configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// Hostname was empty.
    EmptyHost,
    /// At least one attempt is required.
    ZeroAttempts,
    /// The attempt timeout must be non-zero.
    ZeroTimeout,
}

/// Name resolution failures.
#[derive(Debug)]
pub enum ResolveError {
    /// The service string is neither a port number nor a known service name.
    UnknownService {
        /// The service string as given.
        service: String,
    },
    /// The hostname resolved to no addresses.
    NoAddresses {
        /// The hostname that failed to resolve.
        host: String,
    },
    /// The system resolver reported an error.
    Lookup(io::Error),
}

/// Error returned when the server responds with a recognized kiss code.
///
/// Per RFC 5905 Section 7.4, recipients of kiss codes MUST inspect them and take the
/// described actions:
///
/// - **DENY / RSTR**: stop sending packets to this server.
/// - **RATE**: reduce the polling interval before retrying.
/// - **AUTH / CRYP / NKEY**: the server wants authentication.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct KissOfDeathError {
    /// The specific kiss code received from the server.
    pub code: KissCode,
}

// ── Display implementations ─────────────────────────────────────────

impl fmt::Display for SntpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SntpError::Protocol(e) => write!(f, "SNTP protocol error: {e}"),
            SntpError::Timeout(e) => write!(f, "SNTP timeout: {e}"),
            SntpError::Config(e) => write!(f, "SNTP config error: {e}"),
            SntpError::KissOfDeath(e) => write!(f, "{e}"),
            SntpError::Bind(e) => write!(f, "cannot bind socket: {e}"),
            SntpError::Resolve(e) => write!(f, "name resolution failed: {e}"),
            SntpError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::ResponseTooShort { received } => {
                write!(f, "NTP response too short ({received} bytes)")
            }
            ProtocolError::UnexpectedMode(mode) => {
                write!(f, "unexpected response mode {mode:?}")
            }
            ProtocolError::UnsupportedVersion { version } => {
                write!(f, "unsupported NTP version {version}")
            }
            ProtocolError::OriginTimestampMismatch => {
                write!(
                    f,
                    "origin timestamp mismatch: response does not match our request"
                )
            }
            ProtocolError::ZeroTransmitTimestamp => {
                write!(f, "server transmit timestamp is zero")
            }
            ProtocolError::UnsynchronizedServer => {
                write!(f, "server reports unsynchronized clock")
            }
            ProtocolError::UnknownKissCode(raw) => {
                write!(f, "unknown kiss code {:?}", String::from_utf8_lossy(raw))
            }
            ProtocolError::ImplausibleDelay { delay } => {
                write!(f, "implausible round-trip delay {delay}s")
            }
            ProtocolError::ImplausibleDispersion { dispersion } => {
                write!(f, "implausible dispersion {dispersion}s")
            }
            ProtocolError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutError::Attempt { attempt } => write!(f, "attempt {attempt} timed out"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyHost => write!(f, "hostname must not be empty"),
            ConfigError::ZeroAttempts => write!(f, "at least one attempt is required"),
            ConfigError::ZeroTimeout => write!(f, "attempt timeout must be non-zero"),
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnknownService { service } => write!(f, "unknown service {service:?}"),
            ResolveError::NoAddresses { host } => {
                write!(f, "{host} resolved to no socket addresses")
            }
            ResolveError::Lookup(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for KissOfDeathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            KissCode::Deny | KissCode::Rstr => write!(
                f,
                "server sent Kiss-o'-Death {}: access denied, stop querying this server",
                self.code
            ),
            KissCode::Rate => write!(f, "server sent Kiss-o'-Death RATE: reduce polling interval"),
            code => write!(f, "server sent Kiss-o'-Death {code}"),
        }
    }
}

// ── Error trait implementations ─────────────────────────────────────

impl std::error::Error for SntpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SntpError::Io(e) | SntpError::Bind(e) => Some(e),
            SntpError::KissOfDeath(e) => Some(e),
            SntpError::Resolve(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Lookup(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ProtocolError {}
impl std::error::Error for TimeoutError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for KissOfDeathError {}

// ── Classification ──────────────────────────────────────────────────

/// Whether an I/O error means the server definitely cannot be reached.
fn is_refusal(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
    )
}

impl SntpError {
    /// Map this error onto the public result taxonomy.
    pub fn classify(&self) -> QueryResult {
        match self {
            SntpError::Protocol(ProtocolError::UnsynchronizedServer)
            | SntpError::Protocol(ProtocolError::UnknownKissCode(_)) => QueryResult::ServerUnusable,
            SntpError::Protocol(_) => QueryResult::PacketUnusable,
            SntpError::Timeout(_) => QueryResult::ServerUnusable,
            SntpError::Config(_) => QueryResult::Internal,
            SntpError::KissOfDeath(e) => kiss_code_result(e.code),
            SntpError::Bind(_) => QueryResult::CannotBindSocket,
            SntpError::Resolve(_) => QueryResult::Dns,
            SntpError::Io(e) => match e.kind() {
                io::ErrorKind::WriteZero
                | io::ErrorKind::OutOfMemory
                | io::ErrorKind::Unsupported => QueryResult::Internal,
                _ => QueryResult::ServerUnusable,
            },
        }
    }

    /// Whether the error rules out further attempts against the same endpoint.
    ///
    /// Every stratum-0 reply is terminal, as is a definite refusal from the network.
    pub fn is_terminal_for_endpoint(&self) -> bool {
        match self {
            SntpError::KissOfDeath(_) | SntpError::Protocol(ProtocolError::UnknownKissCode(_)) => {
                true
            }
            SntpError::Io(e) => is_refusal(e.kind()) || self.classify() == QueryResult::Internal,
            SntpError::Bind(_) | SntpError::Config(_) | SntpError::Resolve(_) => true,
            _ => false,
        }
    }
}

// ── From conversions ────────────────────────────────────────────────

impl From<SntpError> for io::Error {
    fn from(err: SntpError) -> io::Error {
        let kind = match &err {
            SntpError::Protocol(_) => io::ErrorKind::InvalidData,
            SntpError::Timeout(_) => io::ErrorKind::TimedOut,
            SntpError::Config(_) => io::ErrorKind::InvalidInput,
            SntpError::KissOfDeath(_) => io::ErrorKind::ConnectionRefused,
            SntpError::Resolve(_) => io::ErrorKind::NotFound,
            SntpError::Bind(e) => e.kind(),
            SntpError::Io(e) => e.kind(),
        };
        // Preserve the original io::Error directly for the Io variant.
        if let SntpError::Io(e) = err {
            return e;
        }
        io::Error::new(kind, err)
    }
}

impl From<io::Error> for SntpError {
    fn from(err: io::Error) -> SntpError {
        SntpError::Io(err)
    }
}

impl From<ProtocolError> for SntpError {
    fn from(err: ProtocolError) -> SntpError {
        SntpError::Protocol(err)
    }
}

impl From<ConfigError> for SntpError {
    fn from(err: ConfigError) -> SntpError {
        SntpError::Config(err)
    }
}

impl From<ResolveError> for SntpError {
    fn from(err: ResolveError) -> SntpError {
        SntpError::Resolve(err)
    }
}

impl From<KissOfDeathError> for SntpError {
    fn from(err: KissOfDeathError) -> SntpError {
        SntpError::KissOfDeath(err)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
