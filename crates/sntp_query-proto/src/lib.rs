// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! NTPv4 wire types and packet codec for the `sntp_query` engine.
//!
//! This crate holds the pieces of the Network Time Protocol (RFC 5905) that
//! a unicast SNTP client (RFC 4330) needs on the wire: the 48-byte packet
//! header, its field types, the kiss codes carried by stratum-0 replies, and
//! era-aware conversion between NTP timestamps and Unix time. It performs no
//! I/O.

#![warn(missing_docs)]

/// Header field decoding errors.
pub mod error;

/// NTP protocol types, constants, and the big-endian codec.
pub mod protocol;

/// Unix time conversion utilities for NTP timestamps.
pub mod unix_time;
