// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Delivery of outcomes to the caller's handler.
//!
//! A handler is invoked once per finished endpoint and, when nothing succeeded, once more
//! with the query's aggregate failure. It may run on any tokio worker, but never
//! concurrently with itself. Its [`Continuation`] is only consulted while more servers
//! remain; the final call's answer is ignored.

use crate::error::QueryResult;
use crate::unix_time;

/// Whether the query should move on to the next endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Continuation {
    /// Try the next endpoint.
    Continue,
    /// Stop; no further endpoints are contacted and no further calls are made.
    Stop,
}

impl From<bool> for Continuation {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Continuation::Continue
        } else {
            Continuation::Stop
        }
    }
}

/// Wall-clock time as whole seconds and microseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Timeval {
    /// Seconds.
    pub tv_sec: i64,
    /// Microseconds, same sign as `tv_sec`.
    pub tv_usec: i32,
}

impl From<unix_time::Instant> for Timeval {
    fn from(t: unix_time::Instant) -> Self {
        Timeval {
            tv_sec: t.secs(),
            tv_usec: t.subsec_micros(),
        }
    }
}

/// Everything reported about one endpoint, or about the whole query.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryOutcome {
    /// `Success`, the endpoint's failure, or the aggregate failure.
    pub result: QueryResult,
    /// Estimated current time (`T4 + offset`); zero on failure.
    pub time: Timeval,
    /// Monotonic time the accepted reply arrived; `None` on failure.
    pub received_at: Option<std::time::Instant>,
    /// Clock offset in seconds; positive means the local clock is behind.
    pub offset: f64,
    /// Round-trip delay in seconds.
    pub delay: f64,
    /// Dispersion in seconds.
    pub dispersion: f64,
    /// Whether endpoints remain after this one.
    pub more_servers: bool,
    /// Numeric IP of the endpoint; empty for session-level outcomes.
    pub ip: String,
    /// Port of the endpoint; empty for session-level outcomes.
    pub port: String,
    /// Attempts consumed on the endpoint.
    pub retry_attempts: u32,
}

impl QueryOutcome {
    /// A session-level failure not tied to any endpoint.
    pub fn session_failure(result: QueryResult) -> Self {
        QueryOutcome {
            result,
            time: Timeval::default(),
            received_at: None,
            offset: 0.0,
            delay: 0.0,
            dispersion: 0.0,
            more_servers: false,
            ip: String::new(),
            port: String::new(),
            retry_attempts: 0,
        }
    }
}

/// Receives query outcomes.
pub trait ResultHandler: Send {
    /// Handle one outcome and say whether to keep going.
    fn handle(&mut self, outcome: &QueryOutcome) -> Continuation;
}

impl<H: ResultHandler + ?Sized> ResultHandler for &mut H {
    fn handle(&mut self, outcome: &QueryOutcome) -> Continuation {
        (**self).handle(outcome)
    }
}

impl<H: ResultHandler + ?Sized> ResultHandler for Box<H> {
    fn handle(&mut self, outcome: &QueryOutcome) -> Continuation {
        (**self).handle(outcome)
    }
}

/// Adapts a closure taking `(result, time, delay, dispersion, more_servers)`.
pub struct BasicHandler<F>(pub F);

impl<F> ResultHandler for BasicHandler<F>
where
    F: FnMut(QueryResult, Timeval, f64, f64, bool) -> bool + Send,
{
    fn handle(&mut self, o: &QueryOutcome) -> Continuation {
        (self.0)(o.result, o.time, o.delay, o.dispersion, o.more_servers).into()
    }
}

/// Adapts a closure that sees the whole [`QueryOutcome`].
pub struct ExtendedHandler<F>(pub F);

impl<F> ResultHandler for ExtendedHandler<F>
where
    F: FnMut(&QueryOutcome) -> bool + Send,
{
    fn handle(&mut self, o: &QueryOutcome) -> Continuation {
        (self.0)(o).into()
    }
}

/// Wraps a handler and applies the continuation rule.
pub(crate) struct Dispatcher<H> {
    handler: H,
    delivered: usize,
}

impl<H: ResultHandler> Dispatcher<H> {
    pub(crate) fn new(handler: H) -> Self {
        Dispatcher {
            handler,
            delivered: 0,
        }
    }

    /// Deliver an outcome. Returns `Stop` only when servers remain and the handler asked
    /// to stop.
    pub(crate) fn deliver(&mut self, outcome: &QueryOutcome) -> Continuation {
        self.delivered += 1;
        let decision = self.handler.handle(outcome);
        if outcome.more_servers {
            decision
        } else {
            Continuation::Continue
        }
    }

    pub(crate) fn delivered(&self) -> usize {
        self.delivered
    }
}
