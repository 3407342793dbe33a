// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

/*!
SNTP query engine on the tokio runtime.

A query resolves a hostname, asks each resulting address for the time in turn, and
reports every finished address (and, if none succeeded, the most specific failure seen)
to a caller-supplied handler. The handler decides after each report whether the query
moves on to the next address.

# Example

```rust,no_run
use chrono::TimeZone;
use sntp_client::QueryResult;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    sntp_client::query("pool.ntp.org", false, |result, time, delay, dispersion, more| {
        if result == QueryResult::Success {
            let local = chrono::Local
                .timestamp_opt(time.tv_sec, time.tv_usec as u32 * 1_000)
                .unwrap();
            println!("{local} (delay {delay:.6}s, dispersion {dispersion:.6}s)");
            return false;
        }
        println!("{result}, more servers: {more}");
        true
    })
    .await;
}
```

# Results

Each endpoint ends in one [`QueryResult`]. Failures are ranked, most specific first:
`Authorization`, `ServerKissOfDeath`, `ServerRateLimit`, `PacketUnusable`,
`ServerUnusable`, `Dns`, `CannotBindSocket`, `Internal`. Stratum-0 (kiss-o'-death)
replies are never retried against the same endpoint.
*/

#![warn(missing_docs)]

// Re-export protocol types from sntp_proto for convenience.
pub use sntp_proto::{protocol, unix_time};

/// Combining endpoint outcomes into the result of a whole query.
pub mod aggregate;

/// Per-endpoint attempt state machine and its async driver.
pub mod attempt;

/// Request construction and reply validation.
pub mod codec;

/// Handler traits and the outcome payload.
pub mod dispatch;

/// Result codes and error types.
pub mod error;

/// Query configuration and the session loop.
pub mod query;

/// Hostname and service resolution.
pub mod resolver;

/// UDP transport.
pub mod transport;

pub use dispatch::{
    BasicHandler, Continuation, ExtendedHandler, QueryOutcome, ResultHandler, Timeval,
};
pub use error::{QueryResult, SntpError};
pub use query::{
    BindFailurePolicy, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_ATTEMPTS, DEFAULT_SERVICE, SntpQuery,
    SntpQueryBuilder, query, query_extended,
};
pub use resolver::{Endpoint, Resolver, SystemResolver};
pub use transport::{Transport, TransportSocket, UdpTransport};
