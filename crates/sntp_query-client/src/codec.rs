// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Request construction and reply validation.
//!
//! Everything here is pure computation; the attempt driver owns the socket and the clocks
//! and passes timestamps in.

use crate::error::{KissOfDeathError, ProtocolError, QueryResult, SntpError};
use crate::protocol::{self, ConstPackedSizeBytes, KissCode, ReadBytes, WriteBytes};
use crate::unix_time;
use std::io;

/// Precision of the local clock as a log2 exponent (about one microsecond).
pub const LOCAL_PRECISION: i8 = -20;

/// Size of a request and of the reply header.
pub const PACKET_LEN: usize = protocol::Packet::PACKED_SIZE_BYTES;

/// A validated reply with the values derived from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// The decoded reply.
    pub packet: protocol::Packet,
    /// T4: local wall-clock time when the reply was received.
    pub destination: unix_time::Instant,
    /// Best estimate of the current time, `T4 + offset`.
    pub time: unix_time::Instant,
    /// Clock offset `((T2 - T1) + (T3 - T4)) / 2`. Positive means the local clock is behind.
    pub offset_seconds: f64,
    /// Round-trip delay `(T4 - T1) - (T3 - T2)`.
    pub delay_seconds: f64,
    /// Error bound of the sample.
    pub dispersion_seconds: f64,
}

/// Map a kiss code onto the result taxonomy (RFC 5905 Section 7.4).
///
/// DENY and RSTR ask the client to go away and RATE asks it to slow down. AUTH, CRYP and
/// NKEY map to [`QueryResult::Authorization`] rather than a kiss-of-death class: the server
/// is not telling us to leave, it wants credentials we do not send. Any other code says the
/// server cannot serve us right now.
pub fn kiss_code_result(code: KissCode) -> QueryResult {
    match code {
        KissCode::Deny | KissCode::Rstr => QueryResult::ServerKissOfDeath,
        KissCode::Rate => QueryResult::ServerRateLimit,
        KissCode::Auth | KissCode::Cryp | KissCode::Nkey => QueryResult::Authorization,
        KissCode::Acst
        | KissCode::Auto
        | KissCode::Bcst
        | KissCode::Drop
        | KissCode::Init
        | KissCode::Mcst
        | KissCode::Rmot
        | KissCode::Step => QueryResult::ServerUnusable,
    }
}

/// Build an NTPv4 client request carrying `transmit_time` and serialize it.
///
/// Returns the serialized buffer and the transmit timestamp (T1) the reply must echo.
pub fn encode(
    transmit_time: unix_time::Instant,
) -> io::Result<([u8; PACKET_LEN], protocol::TimestampFormat)> {
    let packet = protocol::Packet {
        precision: LOCAL_PRECISION,
        transmit_timestamp: transmit_time.into(),
        ..protocol::Packet::default()
    };
    let t1 = packet.transmit_timestamp;
    let mut send_buf = [0u8; PACKET_LEN];
    (&mut send_buf[..]).write_bytes(packet)?;
    Ok((send_buf, t1))
}

/// Decode the fixed header of a reply. Extension fields and MACs after it are ignored.
pub fn decode(buf: &[u8]) -> Result<protocol::Packet, SntpError> {
    if buf.len() < PACKET_LEN {
        return Err(ProtocolError::ResponseTooShort {
            received: buf.len(),
        }
        .into());
    }
    let packet: protocol::Packet = (&buf[..PACKET_LEN])
        .read_bytes()
        .map_err(|e| ProtocolError::Other(e.to_string()))?;
    if !packet.version.is_known() {
        return Err(ProtocolError::UnsupportedVersion {
            version: packet.version.value(),
        }
        .into());
    }
    if !packet.mode.is_reply() {
        return Err(ProtocolError::UnexpectedMode(packet.mode).into());
    }
    Ok(packet)
}

/// Validate a decoded reply against the request it answers and compute the sample.
///
/// `sent` is the transmit timestamp of the most recent request to this endpoint and
/// `destination` is the local time the reply arrived. Timestamps are placed in the era
/// nearest `destination`.
pub fn validate(
    sent: &protocol::TimestampFormat,
    response: &protocol::Packet,
    destination: unix_time::Instant,
) -> Result<Sample, SntpError> {
    let is_kiss = response.stratum == protocol::Stratum::UNSPECIFIED;

    // Anti-replay (RFC 5905 Section 8). Kiss replies may leave the origin zero, but one
    // echoing some other request is not ours to honour.
    if response.origin_timestamp != *sent && !(is_kiss && response.origin_timestamp.is_zero())
    {
        return Err(ProtocolError::OriginTimestampMismatch.into());
    }

    if is_kiss {
        return Err(match response.reference_id {
            protocol::ReferenceIdentifier::KissOfDeath(code) => KissOfDeathError { code }.into(),
            other => ProtocolError::UnknownKissCode(other.as_bytes()).into(),
        });
    }

    if response.transmit_timestamp.is_zero() {
        return Err(ProtocolError::ZeroTransmitTimestamp.into());
    }

    if response.leap_indicator == protocol::LeapIndicator::Unknown
        || !response.stratum.is_synchronized()
    {
        return Err(ProtocolError::UnsynchronizedServer.into());
    }

    let t4_ts: protocol::TimestampFormat = destination.into();
    let fixed = |ts| unix_time::timestamp_to_ntp_fixed(ts, &destination);
    let t1 = fixed(*sent);
    let t2 = fixed(response.receive_timestamp);
    let t3 = fixed(response.transmit_timestamp);
    let t4 = fixed(t4_ts);

    let (offset_seconds, delay_seconds) = compute_offset_delay(t1, t2, t3, t4);
    let dispersion_seconds = response.root_dispersion.to_secs_f64()
        + unix_time::ntp_fixed_to_secs(t4 - t1) / 2.0
        + 2f64.powi(response.precision as i32)
        + 2f64.powi(LOCAL_PRECISION as i32);

    if !plausible(delay_seconds) {
        return Err(ProtocolError::ImplausibleDelay {
            delay: delay_seconds,
        }
        .into());
    }
    if !plausible(dispersion_seconds) {
        return Err(ProtocolError::ImplausibleDispersion {
            dispersion: dispersion_seconds,
        }
        .into());
    }

    Ok(Sample {
        packet: *response,
        destination,
        time: unix_time::Instant::from_secs_f64(destination.as_secs_f64() + offset_seconds),
        offset_seconds,
        delay_seconds,
        dispersion_seconds,
    })
}

/// Compute clock offset and round-trip delay from the four exchange timestamps, given as
/// era-resolved NTP fixed-point values.
pub fn compute_offset_delay(t1: i128, t2: i128, t3: i128, t4: i128) -> (f64, f64) {
    let offset = unix_time::ntp_fixed_to_secs((t2 - t1) + (t3 - t4)) / 2.0;
    let delay = unix_time::ntp_fixed_to_secs((t4 - t1) - (t3 - t2));
    (offset, delay)
}

fn plausible(secs: f64) -> bool {
    secs.is_finite() && (0.0..=protocol::MAXDISP).contains(&secs)
}
