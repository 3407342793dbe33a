// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Query sessions: resolve a hostname, walk its addresses, report each outcome.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() {
//! use sntp_client::{ExtendedHandler, QueryOutcome, QueryResult, SntpQuery};
//! use std::time::Duration;
//!
//! let query = SntpQuery::builder()
//!     .host("pool.ntp.org")
//!     .attempts(3)
//!     .attempt_timeout(Duration::from_secs(2))
//!     .build()
//!     .expect("valid configuration");
//!
//! let result = query
//!     .run(ExtendedHandler(|o: &QueryOutcome| {
//!         println!("{} {}:{} offset {:.6}s", o.result, o.ip, o.port, o.offset);
//!         // Stop at the first good sample.
//!         o.result != QueryResult::Success
//!     }))
//!     .await;
//! println!("query finished: {result}");
//! # }
//! ```

use std::time::Duration;
use tracing::{debug, warn};

use crate::aggregate::Aggregate;
use crate::attempt::{EndpointReport, run_endpoint};
use crate::dispatch::{
    BasicHandler, Continuation, Dispatcher, ExtendedHandler, QueryOutcome, ResultHandler,
    Timeval,
};
use crate::error::{ConfigError, QueryResult, SntpError};
use crate::resolver::{Endpoint, Resolver, SystemResolver, resolve_endpoints};
use crate::transport::{Transport, UdpTransport};

/// Per-attempt timeout used by [`query`] and by the builder unless overridden.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts per endpoint used by [`query`] and by the builder unless overridden.
pub const DEFAULT_ATTEMPTS: u32 = 1;

pub use crate::resolver::DEFAULT_SERVICE;

/// What to do when the local socket for an endpoint cannot be bound.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BindFailurePolicy {
    /// Report `CannotBindSocket` once and end the query.
    #[default]
    AbortSession,
    /// Report `CannotBindSocket` for the endpoint and move on to the next one.
    SkipEndpoint,
}

/// A configured query. Immutable once built; run it as many times as needed.
#[derive(Clone, Debug)]
pub struct SntpQuery {
    host: String,
    service: Option<String>,
    use_service_port: bool,
    attempts: u32,
    attempt_timeout: Duration,
    bind_failure_policy: BindFailurePolicy,
}

/// Builder for [`SntpQuery`].
#[derive(Clone, Debug)]
pub struct SntpQueryBuilder {
    host: String,
    service: Option<String>,
    use_service_port: bool,
    attempts: u32,
    attempt_timeout: Duration,
    bind_failure_policy: BindFailurePolicy,
}

impl SntpQueryBuilder {
    fn new() -> Self {
        SntpQueryBuilder {
            host: String::new(),
            service: None,
            use_service_port: false,
            attempts: DEFAULT_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            bind_failure_policy: BindFailurePolicy::default(),
        }
    }

    /// Hostname or IP literal of the server.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Service name or port (default: [`DEFAULT_SERVICE`]).
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Bind the local socket to the NTP port instead of an ephemeral one.
    pub fn use_service_port(mut self, enabled: bool) -> Self {
        self.use_service_port = enabled;
        self
    }

    /// Send/await cycles per endpoint (default: [`DEFAULT_ATTEMPTS`]).
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Deadline for each cycle (default: [`DEFAULT_ATTEMPT_TIMEOUT`]).
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Whether a bind failure ends the query or only skips the endpoint.
    pub fn bind_failure_policy(mut self, policy: BindFailurePolicy) -> Self {
        self.bind_failure_policy = policy;
        self
    }

    /// Validate the configuration.
    pub fn build(self) -> Result<SntpQuery, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(SntpQuery {
            host: self.host,
            service: self.service,
            use_service_port: self.use_service_port,
            attempts: self.attempts,
            attempt_timeout: self.attempt_timeout,
            bind_failure_policy: self.bind_failure_policy,
        })
    }
}

impl SntpQuery {
    /// Start configuring a query.
    pub fn builder() -> SntpQueryBuilder {
        SntpQueryBuilder::new()
    }

    /// The configured hostname.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Attempts per endpoint.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Deadline for each attempt.
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Run the query with the system resolver and real UDP sockets.
    ///
    /// The handler runs inline in the awaiting task. Returns `Success` if any endpoint
    /// succeeded, otherwise the failure reported for the query.
    pub async fn run<H: ResultHandler>(&self, handler: H) -> QueryResult {
        self.run_with(&SystemResolver, &UdpTransport, handler).await
    }

    /// Run the query on a tokio worker; the handler is invoked from that task.
    pub fn spawn<H>(self, handler: H) -> tokio::task::JoinHandle<QueryResult>
    where
        H: ResultHandler + 'static,
    {
        tokio::spawn(async move { self.run(handler).await })
    }

    /// Run the query with injected collaborators.
    pub async fn run_with<R, T, H>(&self, resolver: &R, transport: &T, handler: H) -> QueryResult
    where
        R: Resolver + ?Sized,
        T: Transport + ?Sized,
        H: ResultHandler,
    {
        let mut dispatcher = Dispatcher::new(handler);

        let endpoints =
            match resolve_endpoints(resolver, &self.host, self.service.as_deref()).await {
                Ok(endpoints) => endpoints,
                Err(e) => {
                    warn!(host = %self.host, "{e}");
                    let result = e.classify();
                    dispatcher.deliver(&QueryOutcome::session_failure(result));
                    return result;
                }
            };
        debug!(host = %self.host, endpoints = endpoints.len(), "resolved");

        let mut aggregate = Aggregate::new();
        let total = endpoints.len();
        for (i, endpoint) in endpoints.iter().enumerate() {
            let more_servers = i + 1 < total;

            let report = match transport.open(endpoint.addr(), self.use_service_port).await {
                Ok(mut socket) => {
                    run_endpoint(&mut socket, endpoint, self.attempts, self.attempt_timeout).await
                }
                Err(e) => {
                    let result = e.classify();
                    warn!(endpoint = %endpoint.addr(), "cannot open socket: {e}");
                    if result == QueryResult::CannotBindSocket
                        && self.bind_failure_policy == BindFailurePolicy::AbortSession
                    {
                        dispatcher.deliver(&QueryOutcome::session_failure(result));
                        return result;
                    }
                    EndpointReport {
                        result,
                        attempts: 0,
                        sample: None,
                        received_at: None,
                    }
                }
            };

            debug!(
                endpoint = %endpoint.addr(),
                result = %report.result,
                attempts = report.attempts,
                "endpoint finished"
            );
            if report.result == QueryResult::Internal {
                // Local failure: the remaining endpoints would fail the same way.
                dispatcher.deliver(&QueryOutcome::session_failure(QueryResult::Internal));
                return QueryResult::Internal;
            }
            aggregate.record(report.result);
            let outcome = endpoint_outcome(endpoint, &report, more_servers);
            if dispatcher.deliver(&outcome) == Continuation::Stop {
                debug!(delivered = dispatcher.delivered(), "handler stopped the query");
                return aggregate.overall();
            }
        }

        if let Some(failure) = aggregate.final_failure() {
            dispatcher.deliver(&QueryOutcome::session_failure(failure));
        }
        aggregate.overall()
    }
}

fn endpoint_outcome(
    endpoint: &Endpoint,
    report: &EndpointReport,
    more_servers: bool,
) -> QueryOutcome {
    let base = QueryOutcome {
        result: report.result,
        more_servers,
        ip: endpoint.ip_string(),
        port: endpoint.port_string(),
        retry_attempts: report.attempts,
        received_at: report.received_at,
        ..QueryOutcome::session_failure(report.result)
    };
    match &report.sample {
        Some(sample) => QueryOutcome {
            time: sample.time.into(),
            offset: sample.offset_seconds,
            delay: sample.delay_seconds,
            dispersion: sample.dispersion_seconds,
            ..base
        },
        None => base,
    }
}

fn report_config_error<H: ResultHandler>(err: ConfigError, handler: H) -> QueryResult {
    let err = SntpError::from(err);
    warn!("invalid query: {err}");
    let result = err.classify();
    Dispatcher::new(handler).deliver(&QueryOutcome::session_failure(result));
    result
}

/// Query every address of `host` once, with the default 5 second timeout.
///
/// The handler receives `(result, time, delay, dispersion, more_servers)` and returns
/// whether to continue with the next address.
pub async fn query<F>(host: &str, use_service_port: bool, handler: F) -> QueryResult
where
    F: FnMut(QueryResult, Timeval, f64, f64, bool) -> bool + Send,
{
    let handler = BasicHandler(handler);
    match SntpQuery::builder()
        .host(host)
        .use_service_port(use_service_port)
        .build()
    {
        Ok(q) => q.run(handler).await,
        Err(e) => report_config_error(e, handler),
    }
}

/// Query with the full configuration surface and the extended handler.
///
/// `servname` of `None` means [`DEFAULT_SERVICE`]. Invalid parameters are reported as a
/// single `Internal` outcome.
pub async fn query_extended<F>(
    hostname: &str,
    servname: Option<&str>,
    use_service_port: bool,
    attempts: u32,
    attempt_timeout: Duration,
    handler: F,
) -> QueryResult
where
    F: FnMut(&QueryOutcome) -> bool + Send,
{
    let handler = ExtendedHandler(handler);
    let mut builder = SntpQuery::builder()
        .host(hostname)
        .use_service_port(use_service_port)
        .attempts(attempts)
        .attempt_timeout(attempt_timeout);
    if let Some(service) = servname {
        builder = builder.service(service);
    }
    match builder.build() {
        Ok(q) => q.run(handler).await,
        Err(e) => report_config_error(e, handler),
    }
}
