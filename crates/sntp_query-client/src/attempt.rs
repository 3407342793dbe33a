// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Per-endpoint send/await/retry state machine.
//!
//! [`AttemptMachine`] is pure: it consumes [`AttemptEvent`]s and moves between
//! [`AttemptState`]s without touching sockets or clocks. [`run_endpoint`] is the async
//! driver that performs the I/O each state asks for and feeds the results back in.
//!
//! ```text
//! Idle -> Sending -> AwaitingResponse -> Validating -> DoneSuccess
//!            ^              |                 |
//!            +--- retry ----+-----------------+----> DoneFailure
//! ```

use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::codec::{self, Sample};
use crate::error::{ProtocolError, QueryResult, SntpError, TimeoutError};
use crate::protocol;
use crate::resolver::Endpoint;
use crate::transport::TransportSocket;
use crate::unix_time;

// Large enough for a header plus extension fields and a MAC.
const RECV_BUF_LEN: usize = 1024;

/// Where one endpoint is in its attempt sequence. `attempt` is 0-based.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttemptState {
    /// Nothing sent yet.
    Idle,
    /// A fresh request is about to be sent.
    Sending {
        /// Current attempt.
        attempt: u32,
    },
    /// A request is out; waiting for a reply or the deadline.
    AwaitingResponse {
        /// Current attempt.
        attempt: u32,
    },
    /// A datagram from the endpoint is being checked.
    Validating {
        /// Current attempt.
        attempt: u32,
    },
    /// A usable sample was obtained.
    DoneSuccess {
        /// Attempts consumed, including the successful one.
        attempts: u32,
    },
    /// The endpoint gave up.
    DoneFailure {
        /// Attempts consumed.
        attempts: u32,
        /// Most specific failure seen on this endpoint.
        result: QueryResult,
    },
}

impl AttemptState {
    /// Whether the endpoint is finished.
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            AttemptState::DoneSuccess { .. } | AttemptState::DoneFailure { .. }
        )
    }
}

/// A failed attempt step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Failure {
    /// How the failure classifies.
    pub result: QueryResult,
    /// Whether the endpoint must not be tried again.
    pub terminal: bool,
}

impl From<&SntpError> for Failure {
    fn from(err: &SntpError) -> Self {
        Failure {
            result: err.classify(),
            terminal: err.is_terminal_for_endpoint(),
        }
    }
}

/// Inputs to the state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttemptEvent {
    /// Begin the first attempt.
    Start,
    /// The request went out.
    Sent,
    /// A datagram arrived from the endpoint.
    Received,
    /// A datagram arrived from some other address; keep waiting.
    Stray,
    /// The endpoint answered something other than the outstanding request, such as a
    /// late reply to an earlier attempt. The failure is noted and the wait goes on.
    Superseded(Failure),
    /// The attempt deadline passed without a usable reply.
    TimedOut,
    /// The reply validated.
    Accepted,
    /// Sending, receiving or validation failed.
    Failed(Failure),
}

/// The pure per-endpoint state machine.
#[derive(Clone, Debug)]
pub struct AttemptMachine {
    state: AttemptState,
    max_attempts: u32,
    worst: Option<QueryResult>,
}

impl AttemptMachine {
    /// A machine allowing `max_attempts` send/await cycles (at least one).
    pub fn new(max_attempts: u32) -> Self {
        AttemptMachine {
            state: AttemptState::Idle,
            max_attempts: max_attempts.max(1),
            worst: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Apply an event and return the new state.
    ///
    /// Events that make no sense in the current state leave it unchanged.
    pub fn on(&mut self, event: AttemptEvent) -> AttemptState {
        use AttemptEvent as E;
        use AttemptState as S;

        self.state = match (self.state, event) {
            (S::Idle, E::Start) => S::Sending { attempt: 0 },
            (S::Sending { attempt }, E::Sent) => S::AwaitingResponse { attempt },
            (S::AwaitingResponse { attempt }, E::Received) => S::Validating { attempt },
            (S::AwaitingResponse { attempt }, E::Stray) => S::AwaitingResponse { attempt },
            (S::AwaitingResponse { attempt }, E::TimedOut) => self.retry_or_fail(
                attempt,
                Failure {
                    result: QueryResult::ServerUnusable,
                    terminal: false,
                },
            ),
            (S::Validating { attempt }, E::Accepted) => S::DoneSuccess {
                attempts: attempt + 1,
            },
            (S::Validating { attempt }, E::Superseded(failure)) => {
                self.note(failure.result);
                S::AwaitingResponse { attempt }
            }
            (
                S::Sending { attempt } | S::AwaitingResponse { attempt } | S::Validating { attempt },
                E::Failed(failure),
            ) => self.retry_or_fail(attempt, failure),
            (state, _) => state,
        };
        self.state
    }

    fn note(&mut self, result: QueryResult) -> QueryResult {
        let worst = match self.worst {
            Some(w) => w.most_specific(result),
            None => result,
        };
        self.worst = Some(worst);
        worst
    }

    fn retry_or_fail(&mut self, attempt: u32, failure: Failure) -> AttemptState {
        // A local resource failure ends the endpoint as is; no server is to blame.
        if failure.result == QueryResult::Internal {
            self.worst = Some(QueryResult::Internal);
            return AttemptState::DoneFailure {
                attempts: attempt + 1,
                result: QueryResult::Internal,
            };
        }
        let worst = self.note(failure.result);
        if !failure.terminal && attempt + 1 < self.max_attempts {
            AttemptState::Sending {
                attempt: attempt + 1,
            }
        } else {
            AttemptState::DoneFailure {
                attempts: attempt + 1,
                result: worst.most_specific(QueryResult::ServerUnusable),
            }
        }
    }
}

/// What one endpoint produced.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointReport {
    /// `Success` or the endpoint's failure.
    pub result: QueryResult,
    /// Attempts consumed.
    pub attempts: u32,
    /// The validated sample when `result` is `Success`.
    pub sample: Option<Sample>,
    /// Monotonic time the accepted reply was received.
    pub received_at: Option<std::time::Instant>,
}

struct Pending {
    sent: protocol::TimestampFormat,
    deadline: tokio::time::Instant,
}

/// Drive one endpoint to completion over an open socket.
pub async fn run_endpoint<S: TransportSocket + ?Sized>(
    socket: &mut S,
    endpoint: &Endpoint,
    max_attempts: u32,
    attempt_timeout: Duration,
) -> EndpointReport {
    let target = endpoint.addr();
    let mut machine = AttemptMachine::new(max_attempts);
    let mut pending: Option<Pending> = None;
    let mut datagram: Option<(usize, unix_time::Instant, std::time::Instant)> = None;
    let mut sample: Option<Sample> = None;
    let mut received_at = None;
    let mut recv_buf = [0u8; RECV_BUF_LEN];

    loop {
        let event = match machine.state() {
            AttemptState::Idle => AttemptEvent::Start,
            AttemptState::Sending { attempt } => {
                // Every attempt carries a fresh transmit timestamp.
                match send_request(socket, attempt_timeout).await {
                    Ok(p) => {
                        debug!(%target, attempt, "request sent");
                        pending = Some(p);
                        AttemptEvent::Sent
                    }
                    Err(e) => {
                        warn!(%target, attempt, "send failed: {e}");
                        AttemptEvent::Failed(Failure::from(&e))
                    }
                }
            }
            AttemptState::AwaitingResponse { attempt } => match &pending {
                None => AttemptEvent::TimedOut,
                Some(p) => {
                    let recv = socket.recv_from(&mut recv_buf);
                    match tokio::time::timeout_at(p.deadline, recv).await {
                        Err(_) => {
                            let e = SntpError::Timeout(TimeoutError::Attempt { attempt });
                            debug!(%target, "{e}");
                            AttemptEvent::TimedOut
                        }
                        Ok(Err(e)) => {
                            let e = SntpError::Io(e);
                            warn!(%target, attempt, "receive failed: {e}");
                            AttemptEvent::Failed(Failure::from(&e))
                        }
                        Ok(Ok((len, src))) => {
                            if is_from_endpoint(&src, &target) {
                                datagram = Some((
                                    len,
                                    unix_time::Instant::now(),
                                    std::time::Instant::now(),
                                ));
                                AttemptEvent::Received
                            } else {
                                debug!(%target, %src, "ignoring datagram from unexpected source");
                                AttemptEvent::Stray
                            }
                        }
                    }
                }
            },
            AttemptState::Validating { attempt } => {
                match (datagram.take(), &pending) {
                    (Some((len, destination, mono)), Some(p)) => {
                        let checked = codec::decode(&recv_buf[..len])
                            .and_then(|packet| codec::validate(&p.sent, &packet, destination));
                        match checked {
                            Ok(s) => {
                                sample = Some(s);
                                received_at = Some(mono);
                                AttemptEvent::Accepted
                            }
                            Err(
                                e @ SntpError::Protocol(ProtocolError::OriginTimestampMismatch),
                            ) => {
                                // Possibly a late answer to an earlier attempt.
                                debug!(%target, attempt, "ignoring reply: {e}");
                                AttemptEvent::Superseded(Failure::from(&e))
                            }
                            Err(e) => {
                                warn!(%target, attempt, "rejected reply: {e}");
                                AttemptEvent::Failed(Failure::from(&e))
                            }
                        }
                    }
                    _ => AttemptEvent::Failed(Failure {
                        result: QueryResult::Internal,
                        terminal: true,
                    }),
                }
            }
            AttemptState::DoneSuccess { attempts } => {
                return EndpointReport {
                    result: QueryResult::Success,
                    attempts,
                    sample,
                    received_at,
                };
            }
            AttemptState::DoneFailure { attempts, result } => {
                return EndpointReport {
                    result,
                    attempts,
                    sample: None,
                    received_at: None,
                };
            }
        };
        machine.on(event);
    }
}

async fn send_request<S: TransportSocket + ?Sized>(
    socket: &mut S,
    attempt_timeout: Duration,
) -> Result<Pending, SntpError> {
    let (send_buf, sent) = codec::encode(unix_time::Instant::now())?;
    let deadline = tokio::time::Instant::now() + attempt_timeout;
    socket.send(&send_buf).await?;
    Ok(Pending { sent, deadline })
}

/// Replies are matched by IP only; the source port may differ behind NAT.
fn is_from_endpoint(src: &SocketAddr, target: &SocketAddr) -> bool {
    src.ip().to_canonical() == target.ip().to_canonical()
}
