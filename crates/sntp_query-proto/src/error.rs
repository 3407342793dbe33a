// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Decoding errors for header fields.
//!
//! Truncated input surfaces as `io::ErrorKind::UnexpectedEof` straight from `byteorder`.
//! [`ParseError`] covers bytes that were present but meaningless, and travels inside an
//! [`std::io::Error`] of kind `InvalidData`.

use std::fmt;
use std::io;

/// A header field held a value with no defined meaning.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The named field could not be interpreted.
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Raw value found on the wire.
        value: u32,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidField { field, value } => {
                write!(f, "invalid {field} value: {value}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for io::Error {
    fn from(err: ParseError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}
