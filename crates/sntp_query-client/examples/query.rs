// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Query every address of an NTP host and print each outcome.
//!
//! Run with: `RUST_LOG=debug cargo run --example query -- pool.ntp.org 3`

use chrono::{Local, TimeZone};
use sntp_client::{QueryOutcome, QueryResult};
use std::time::Duration;

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "pool.ntp.org".to_string());
    let attempts = args.next().and_then(|a| a.parse().ok()).unwrap_or(2);

    println!("Querying {host} ({attempts} attempts per address)...\n");

    let result = sntp_client::query_extended(
        &host,
        None,
        false,
        attempts,
        Duration::from_secs(2),
        |o: &QueryOutcome| {
            let who = if o.ip.is_empty() {
                "overall".to_string()
            } else {
                format!("{}:{}", o.ip, o.port)
            };
            if o.result == QueryResult::Success {
                let time = Local
                    .timestamp_opt(o.time.tv_sec, o.time.tv_usec as u32 * 1_000)
                    .single()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                println!(
                    "{who}: {time} offset={:+.6}s delay={:.6}s dispersion={:.6}s attempts={}",
                    o.offset, o.delay, o.dispersion, o.retry_attempts
                );
            } else {
                println!("{who}: {} after {} attempts", o.result, o.retry_attempts);
            }
            // Keep going so every address is shown.
            true
        },
    )
    .await;

    println!("\nResult: {result}");
}
