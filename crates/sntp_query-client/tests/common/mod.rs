// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for integration tests: a scripted resolver and transport.

// Integration test helpers are `pub` so each `tests/*.rs` file can import them
// via `mod common`, but not every file uses every helper.
#![allow(dead_code, unreachable_pub)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use sntp_client::error::SntpError;
use sntp_client::protocol::{
    Mode, Packet, ReadBytes, ReferenceIdentifier, Stratum, TimestampFormat, WriteBytes,
};
use sntp_client::{QueryOutcome, Resolver, Transport, TransportSocket};

/// How the fake server answers one request.
#[derive(Clone, Debug)]
pub enum Step {
    /// A valid stratum-2 reply echoing the request.
    Answer,
    /// A stratum-0 reply carrying the given code.
    Kiss([u8; 4]),
    /// A reply echoing the wrong origin timestamp.
    WrongOrigin,
    /// An unsynchronized (stratum 16) reply.
    Unsynchronized,
    /// A valid reply preceded by a datagram from another address.
    StrayThenAnswer,
    /// A datagram too short to be a reply.
    Truncated,
    /// No reply at all.
    Silent,
    /// The receive fails with `ConnectionRefused`.
    Refused,
    /// The answer to the previous request shows up late, followed by a valid reply.
    LateThenAnswer,
    /// The send itself fails with the given error.
    SendFails(io::ErrorKind),
}

/// Per-endpoint script.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    /// Binding the socket fails.
    pub bind_fails: bool,
    /// One step per request; missing steps are `Silent`.
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Plan {
            bind_fails: false,
            steps: steps.into_iter().collect(),
        }
    }

    pub fn bind_failure() -> Self {
        Plan {
            bind_fails: true,
            steps: Vec::new(),
        }
    }
}

/// Resolver returning a fixed list, or a failure.
pub struct FakeResolver {
    pub addrs: Option<Vec<IpAddr>>,
}

impl FakeResolver {
    pub fn new(ips: &[&str]) -> Self {
        FakeResolver {
            addrs: Some(ips.iter().map(|s| s.parse().unwrap()).collect()),
        }
    }

    pub fn failing() -> Self {
        FakeResolver { addrs: None }
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn lookup(&self, _host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        match &self.addrs {
            Some(ips) => Ok(ips.iter().map(|ip| SocketAddr::new(*ip, port)).collect()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such host")),
        }
    }
}

/// Transport answering according to per-IP plans and recording every request.
#[derive(Clone, Default)]
pub struct FakeTransport {
    plans: Arc<Mutex<HashMap<IpAddr, VecDeque<Step>>>>,
    bind_failures: Arc<Mutex<Vec<IpAddr>>>,
    sent: Arc<Mutex<Vec<IpAddr>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(self, ip: &str, plan: Plan) -> Self {
        let ip: IpAddr = ip.parse().unwrap();
        if plan.bind_fails {
            self.bind_failures.lock().unwrap().push(ip);
        }
        self.plans
            .lock()
            .unwrap()
            .insert(ip, plan.steps.into_iter().collect());
        self
    }

    /// Every request sent, in order, by destination IP.
    pub fn sent(&self) -> Vec<IpAddr> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of requests sent to one IP.
    pub fn sent_to(&self, ip: &str) -> usize {
        let ip: IpAddr = ip.parse().unwrap();
        self.sent().iter().filter(|a| **a == ip).count()
    }
}

enum Incoming {
    Datagram(Vec<u8>, SocketAddr),
    Error(io::ErrorKind),
}

pub struct FakeSocket {
    target: SocketAddr,
    transport: FakeTransport,
    incoming: VecDeque<Incoming>,
    previous: Option<Packet>,
}

#[async_trait]
impl Transport for FakeTransport {
    type Socket = FakeSocket;

    async fn open(
        &self,
        target: SocketAddr,
        _use_service_port: bool,
    ) -> Result<FakeSocket, SntpError> {
        if self.bind_failures.lock().unwrap().contains(&target.ip()) {
            return Err(SntpError::Bind(io::Error::from(io::ErrorKind::AddrInUse)));
        }
        Ok(FakeSocket {
            target,
            transport: self.clone(),
            incoming: VecDeque::new(),
            previous: None,
        })
    }
}

#[async_trait]
impl TransportSocket for FakeSocket {
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.transport.sent.lock().unwrap().push(self.target.ip());
        let step = self
            .transport
            .plans
            .lock()
            .unwrap()
            .get_mut(&self.target.ip())
            .and_then(|steps| steps.pop_front())
            .unwrap_or(Step::Silent);

        if let Step::SendFails(kind) = step {
            return Err(io::Error::from(kind));
        }

        let request: Packet = (&buf[..]).read_bytes()?;
        let previous = self.previous.replace(request);
        let from = self.target;
        match step {
            Step::Answer => self.push_reply(reply_to(&request), from),
            Step::Kiss(code) => {
                let mut pkt = reply_to(&request);
                pkt.stratum = Stratum::UNSPECIFIED;
                pkt.reference_id = ReferenceIdentifier::for_stratum(Stratum::UNSPECIFIED, code);
                self.push_reply(pkt, from);
            }
            Step::WrongOrigin => {
                let mut pkt = reply_to(&request);
                pkt.origin_timestamp.fraction ^= 0xFFFF;
                self.push_reply(pkt, from);
            }
            Step::Unsynchronized => {
                let mut pkt = reply_to(&request);
                pkt.stratum = Stratum::UNSYNCHRONIZED;
                self.push_reply(pkt, from);
            }
            Step::StrayThenAnswer => {
                let stray = SocketAddr::new("203.0.113.99".parse().unwrap(), from.port());
                self.push_reply(reply_to(&request), stray);
                self.push_reply(reply_to(&request), from);
            }
            Step::Truncated => self
                .incoming
                .push_back(Incoming::Datagram(vec![0x24; 20], from)),
            Step::Silent => {}
            Step::Refused => self
                .incoming
                .push_back(Incoming::Error(io::ErrorKind::ConnectionRefused)),
            Step::LateThenAnswer => {
                if let Some(earlier) = previous {
                    self.push_reply(reply_to(&earlier), from);
                }
                self.push_reply(reply_to(&request), from);
            }
            Step::SendFails(_) => unreachable!(),
        }
        Ok(buf.len())
    }

    async fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        match self.incoming.pop_front() {
            Some(Incoming::Datagram(data, from)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok((data.len(), from))
            }
            Some(Incoming::Error(kind)) => Err(io::Error::from(kind)),
            // Nothing will ever arrive; only the attempt deadline ends the wait.
            None => std::future::pending().await,
        }
    }
}

impl FakeSocket {
    fn push_reply(&mut self, pkt: Packet, from: SocketAddr) {
        let mut out = vec![0u8; 48];
        (&mut out[..]).write_bytes(pkt).unwrap();
        self.incoming.push_back(Incoming::Datagram(out, from));
    }
}

/// A synchronized server reply to `request` whose clock agrees with ours.
pub fn reply_to(request: &Packet) -> Packet {
    let t1 = request.transmit_timestamp;
    Packet {
        mode: Mode::Server,
        stratum: Stratum(2),
        precision: -20,
        reference_id: ReferenceIdentifier::Source([192, 0, 2, 1]),
        reference_timestamp: TimestampFormat {
            seconds: t1.seconds.wrapping_sub(64),
            fraction: 0,
        },
        origin_timestamp: t1,
        receive_timestamp: t1,
        transmit_timestamp: t1,
        ..Packet::default()
    }
}

/// Handler output recorded for assertions.
#[derive(Clone, Default)]
pub struct Recorder {
    pub outcomes: Arc<Mutex<Vec<QueryOutcome>>>,
}

impl Recorder {
    pub fn outcomes(&self) -> Vec<QueryOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    /// A handler that records every outcome and always continues.
    pub fn continuing(&self) -> impl FnMut(&QueryOutcome) -> bool + Send + 'static {
        let outcomes = self.outcomes.clone();
        move |o: &QueryOutcome| {
            outcomes.lock().unwrap().push(o.clone());
            true
        }
    }

    /// A handler that records every outcome and stops after the first success.
    pub fn until_success(&self) -> impl FnMut(&QueryOutcome) -> bool + Send + 'static {
        let outcomes = self.outcomes.clone();
        move |o: &QueryOutcome| {
            outcomes.lock().unwrap().push(o.clone());
            !o.result.is_success()
        }
    }
}
