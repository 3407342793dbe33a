use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io;

/// Serialize header fields onto any `byteorder` writer, big-endian.
///
/// Implemented for every `W: WriteBytesExt`, including `&mut [u8]` and `Vec<u8>`.
pub trait WriteBytes {
    /// Write one header field or a whole [`Packet`](super::Packet).
    fn write_bytes<P: WriteToBytes>(&mut self, protocol: P) -> io::Result<()>;
}

/// Parse header fields from any `byteorder` reader, big-endian.
///
/// Implemented for every `R: ReadBytesExt`, including `&[u8]`.
pub trait ReadBytes {
    /// Read one header field or a whole [`Packet`](super::Packet).
    fn read_bytes<P: ReadFromBytes>(&mut self) -> io::Result<P>;
}

/// A header field with a wire encoding.
pub trait WriteToBytes {
    /// Encode `self` into `writer`.
    fn write_to_bytes<W: WriteBytesExt>(&self, writer: W) -> io::Result<()>;
}

/// A header field with a wire decoding.
pub trait ReadFromBytes: Sized {
    /// Decode a value from `reader`.
    fn read_from_bytes<R: ReadBytesExt>(reader: R) -> io::Result<Self>;
}

/// Fields whose encoding always has the same length.
pub trait ConstPackedSizeBytes {
    /// Encoded length in bytes.
    const PACKED_SIZE_BYTES: usize;
}
