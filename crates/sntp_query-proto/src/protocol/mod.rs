//! NTPv4 packet types and constants (RFC 5905, RFC 4330).
//!
//! Provides `ReadBytes` and `WriteBytes` implementations which extend the byteorder crate
//! `ReadBytesExt` and `WriteBytesExt` traits with the ability to read and write the packet
//! header and its fields in network byte order.

/// NTP service port number.
pub const PORT: u16 = 123;

/// Maximum dispersion (16 s). Larger delay or dispersion values are not plausible.
pub const MAXDISP: f64 = 16.0;

// Pack four ASCII bytes into a big-endian u32.
macro_rules! code_to_u32 {
    ($w:expr) => {
        u32::from_be_bytes(*$w)
    };
}

mod io;
mod traits;
mod types;

pub use self::traits::*;
pub use self::types::*;
