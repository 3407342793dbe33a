use byteorder::{BE, ReadBytesExt, WriteBytesExt};
use std::io;

use super::{
    LeapIndicator, Mode, Packet, PacketByte1, ReadBytes, ReadFromBytes, ReferenceIdentifier,
    ShortFormat, Stratum, TimestampFormat, Version, WriteBytes, WriteToBytes,
};
use crate::error::ParseError;

impl<W: WriteBytesExt> WriteBytes for W {
    fn write_bytes<P: WriteToBytes>(&mut self, protocol: P) -> io::Result<()> {
        protocol.write_to_bytes(self)
    }
}

impl<R: ReadBytesExt> ReadBytes for R {
    fn read_bytes<P: ReadFromBytes>(&mut self) -> io::Result<P> {
        P::read_from_bytes(self)
    }
}

impl<P: WriteToBytes> WriteToBytes for &P {
    fn write_to_bytes<W: WriteBytesExt>(&self, writer: W) -> io::Result<()> {
        (**self).write_to_bytes(writer)
    }
}

// Fixed-point formats: seconds then fraction.

impl WriteToBytes for ShortFormat {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<BE>(self.to_u32())
    }
}

impl ReadFromBytes for ShortFormat {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        Ok(ShortFormat::from_u32(reader.read_u32::<BE>()?))
    }
}

impl WriteToBytes for TimestampFormat {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u64::<BE>(self.to_u64())
    }
}

impl ReadFromBytes for TimestampFormat {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        Ok(TimestampFormat::from_u64(reader.read_u64::<BE>()?))
    }
}

impl WriteToBytes for Stratum {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(self.0)
    }
}

impl ReadFromBytes for Stratum {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        reader.read_u8().map(Stratum)
    }
}

impl WriteToBytes for ReferenceIdentifier {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.as_bytes())
    }
}

// First header byte: LI (2 bits), VN (3 bits), mode (3 bits).

impl WriteToBytes for PacketByte1 {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        let (li, vn, mode) = *self;
        writer.write_u8((li as u8) << 6 | (vn.0 & 0b111) << 3 | mode as u8)
    }
}

impl ReadFromBytes for PacketByte1 {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let byte = reader.read_u8()?;
        let invalid = |field, value: u8| ParseError::InvalidField {
            field,
            value: value.into(),
        };
        let li = LeapIndicator::try_from(byte >> 6).map_err(|_| invalid("leap", byte >> 6))?;
        let mode = Mode::try_from(byte & 0b111).map_err(|_| invalid("mode", byte & 0b111))?;
        Ok((li, Version((byte >> 3) & 0b111), mode))
    }
}

impl WriteToBytes for Packet {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        writer.write_bytes((self.leap_indicator, self.version, self.mode))?;
        writer.write_bytes(self.stratum)?;
        writer.write_i8(self.poll)?;
        writer.write_i8(self.precision)?;
        writer.write_bytes(self.root_delay)?;
        writer.write_bytes(self.root_dispersion)?;
        writer.write_bytes(self.reference_id)?;
        for ts in [
            self.reference_timestamp,
            self.origin_timestamp,
            self.receive_timestamp,
            self.transmit_timestamp,
        ] {
            writer.write_bytes(ts)?;
        }
        Ok(())
    }
}

impl ReadFromBytes for Packet {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let (leap_indicator, version, mode): PacketByte1 = reader.read_bytes()?;
        let stratum: Stratum = reader.read_bytes()?;
        let poll = reader.read_i8()?;
        let precision = reader.read_i8()?;
        let root_delay = reader.read_bytes()?;
        let root_dispersion = reader.read_bytes()?;
        let mut raw_id = [0u8; 4];
        reader.read_exact(&mut raw_id)?;
        // The reference id can only be interpreted once the stratum is known.
        let reference_id = ReferenceIdentifier::for_stratum(stratum, raw_id);
        Ok(Packet {
            leap_indicator,
            version,
            mode,
            stratum,
            poll,
            precision,
            root_delay,
            root_dispersion,
            reference_id,
            reference_timestamp: reader.read_bytes()?,
            origin_timestamp: reader.read_bytes()?,
            receive_timestamp: reader.read_bytes()?,
            transmit_timestamp: reader.read_bytes()?,
        })
    }
}
