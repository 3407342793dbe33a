use std::fmt;

use super::ConstPackedSizeBytes;

/// **NTP Short Format** - used for the root delay and root dispersion header fields. A 16-bit
/// unsigned seconds field followed by a 16-bit binary fraction.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ShortFormat {
    /// Seconds component (16-bit unsigned).
    pub seconds: u16,
    /// Fractional seconds component (units of 2^-16 s).
    pub fraction: u16,
}

/// **NTP Timestamp Format** - 32-bit unsigned seconds since 1900-01-01 00:00:00 UTC followed by
/// a 32-bit binary fraction (about 232 picoseconds of resolution). The seconds field wraps every
/// 2^32 seconds; era 0 ends on 2036-02-07.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimestampFormat {
    /// Seconds since the start of the current NTP era.
    pub seconds: u32,
    /// Fractional seconds (units of 2^-32 s).
    pub fraction: u32,
}

/// A 2-bit leap second warning.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum LeapIndicator {
    /// No leap required.
    #[default]
    NoWarning = 0,
    /// Last minute of the day has 61 seconds.
    AddOne = 1,
    /// Last minute of the day has 59 seconds.
    SubOne = 2,
    /// Clock unsynchronized (alarm condition).
    Unknown = 3,
}

impl TryFrom<u8> for LeapIndicator {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LeapIndicator::NoWarning),
            1 => Ok(LeapIndicator::AddOne),
            2 => Ok(LeapIndicator::SubOne),
            3 => Ok(LeapIndicator::Unknown),
            _ => Err(()),
        }
    }
}

/// The 3-bit NTP version number.
///
/// Any 3-bit value can be decoded; [`Version::is_known`] tells whether it names a published
/// protocol version an SNTP client can talk to.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Version(pub(super) u8);

impl Version {
    /// NTP version 3 (RFC 1305).
    pub const V3: Self = Version(3);
    /// NTP version 4 (RFC 5905), sent in every request.
    pub const V4: Self = Version(4);

    /// Create a `Version` from a raw version number, or `None` outside 1..=4.
    pub fn new(v: u8) -> Option<Self> {
        if (1..=4).contains(&v) {
            Some(Version(v))
        } else {
            None
        }
    }

    /// Returns the raw version number.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether the version is one of the published NTP versions (1-4).
    pub fn is_known(&self) -> bool {
        (1..=4).contains(&self.0)
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::V4
    }
}

/// The 3-bit association mode.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Reserved (0).
    Reserved = 0,
    /// Symmetric active (1).
    SymmetricActive = 1,
    /// Symmetric passive (2).
    SymmetricPassive = 2,
    /// Client (3).
    #[default]
    Client = 3,
    /// Server (4).
    Server = 4,
    /// Broadcast (5).
    Broadcast = 5,
    /// NTP control message (6).
    NtpControlMessage = 6,
    /// Reserved for private use (7).
    ReservedForPrivateUse = 7,
}

impl Mode {
    /// Whether a packet in this mode can answer a unicast client request.
    pub fn is_reply(&self) -> bool {
        matches!(
            self,
            Mode::Server | Mode::SymmetricPassive | Mode::SymmetricActive
        )
    }
}

impl TryFrom<u8> for Mode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Reserved),
            1 => Ok(Mode::SymmetricActive),
            2 => Ok(Mode::SymmetricPassive),
            3 => Ok(Mode::Client),
            4 => Ok(Mode::Server),
            5 => Ok(Mode::Broadcast),
            6 => Ok(Mode::NtpControlMessage),
            7 => Ok(Mode::ReservedForPrivateUse),
            _ => Err(()),
        }
    }
}

/// An 8-bit stratum: 0 for kiss-o'-death, 1 for a primary server, 2-15 for secondaries,
/// 16 for unsynchronized. Anything above is reserved.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Stratum(pub u8);

impl Stratum {
    /// Unspecified or invalid; replies carrying it are kiss-o'-death packets.
    pub const UNSPECIFIED: Self = Stratum(0);
    /// Primary server.
    pub const PRIMARY: Self = Stratum(1);
    /// The highest stratum of a synchronized secondary server.
    pub const SECONDARY_MAX: Self = Stratum(15);
    /// Unsynchronized.
    pub const UNSYNCHRONIZED: Self = Stratum(16);

    /// Whether the stratum names a synchronized server (1-15).
    pub fn is_synchronized(&self) -> bool {
        Self::PRIMARY <= *self && *self <= Self::SECONDARY_MAX
    }
}

/// Kiss codes carried in the reference identifier of stratum-0 packets (RFC 5905 Section 7.4).
///
/// Codes are four ASCII characters, left justified and zero filled.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KissCode {
    /// The association belongs to a unicast server.
    Acst = code_to_u32!(b"ACST"),
    /// Server authentication failed.
    Auth = code_to_u32!(b"AUTH"),
    /// Autokey sequence failed.
    Auto = code_to_u32!(b"AUTO"),
    /// The association belongs to a broadcast server.
    Bcst = code_to_u32!(b"BCST"),
    /// Cryptographic authentication or identification failed.
    Cryp = code_to_u32!(b"CRYP"),
    /// Access denied by remote server.
    Deny = code_to_u32!(b"DENY"),
    /// Lost peer in symmetric mode.
    Drop = code_to_u32!(b"DROP"),
    /// Access denied due to local policy.
    Rstr = code_to_u32!(b"RSTR"),
    /// The association has not yet synchronized for the first time.
    Init = code_to_u32!(b"INIT"),
    /// The association belongs to a dynamically discovered server.
    Mcst = code_to_u32!(b"MCST"),
    /// No key found.
    Nkey = code_to_u32!(b"NKEY"),
    /// Rate exceeded; the server has temporarily denied access.
    Rate = code_to_u32!(b"RATE"),
    /// Alteration of association from a remote host running ntpdc.
    Rmot = code_to_u32!(b"RMOT"),
    /// A step change in system time has occurred.
    Step = code_to_u32!(b"STEP"),
}

impl KissCode {
    const ALL: [KissCode; 14] = [
        KissCode::Acst,
        KissCode::Auth,
        KissCode::Auto,
        KissCode::Bcst,
        KissCode::Cryp,
        KissCode::Deny,
        KissCode::Drop,
        KissCode::Rstr,
        KissCode::Init,
        KissCode::Mcst,
        KissCode::Nkey,
        KissCode::Rate,
        KissCode::Rmot,
        KissCode::Step,
    ];

    /// The four ASCII bytes of this code.
    pub fn bytes(&self) -> [u8; 4] {
        (*self as u32).to_be_bytes()
    }
}

impl TryFrom<u32> for KissCode {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        KissCode::ALL
            .iter()
            .copied()
            .find(|code| *code as u32 == value)
            .ok_or(())
    }
}

impl fmt::Display for KissCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.bytes() {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

/// The 32-bit reference identifier.
///
/// Its meaning depends on the stratum: at stratum 0 it carries a kiss code, otherwise it
/// names the server's reference clock or upstream server. Only the kiss-code interpretation
/// matters to a client, so everything else is kept as raw bytes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReferenceIdentifier {
    /// A recognized kiss code from a stratum-0 packet.
    KissOfDeath(KissCode),
    /// An unrecognized code from a stratum-0 packet.
    UnknownKiss([u8; 4]),
    /// Reference clock or upstream server identifier (stratum 1 and above).
    Source([u8; 4]),
}

impl ReferenceIdentifier {
    /// Returns the raw 4-byte representation.
    pub fn as_bytes(&self) -> [u8; 4] {
        match *self {
            ReferenceIdentifier::KissOfDeath(code) => code.bytes(),
            ReferenceIdentifier::UnknownKiss(arr) | ReferenceIdentifier::Source(arr) => arr,
        }
    }

    /// Interpret raw bytes for a packet of the given stratum.
    pub fn for_stratum(stratum: Stratum, raw: [u8; 4]) -> Self {
        if stratum == Stratum::UNSPECIFIED {
            match KissCode::try_from(u32::from_be_bytes(raw)) {
                Ok(code) => ReferenceIdentifier::KissOfDeath(code),
                Err(_) => ReferenceIdentifier::UnknownKiss(raw),
            }
        } else {
            ReferenceIdentifier::Source(raw)
        }
    }
}

impl Default for ReferenceIdentifier {
    fn default() -> Self {
        ReferenceIdentifier::Source([0; 4])
    }
}

/// The 48-byte NTP packet header.
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |LI | VN  |Mode |    Stratum     |     Poll      |  Precision   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Root Delay                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Root Dispersion                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          Reference ID                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// +                     Reference Timestamp (64)                  +
/// +                      Origin Timestamp (64)                    +
/// +                      Receive Timestamp (64)                   +
/// +                      Transmit Timestamp (64)                  +
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Extension fields and MACs that may follow the header are ignored by this crate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Packet {
    /// Leap indicator.
    pub leap_indicator: LeapIndicator,
    /// Protocol version.
    pub version: Version,
    /// Association mode.
    pub mode: Mode,
    /// Stratum of the sender.
    pub stratum: Stratum,
    /// Poll exponent, log2 seconds.
    pub poll: i8,
    /// Precision of the sender's clock, log2 seconds (-20 is about a microsecond).
    pub precision: i8,
    /// Total round-trip delay to the reference clock.
    pub root_delay: ShortFormat,
    /// Total dispersion to the reference clock.
    pub root_dispersion: ShortFormat,
    /// Reference identifier or kiss code.
    pub reference_id: ReferenceIdentifier,
    /// Time the sender's clock was last set.
    pub reference_timestamp: TimestampFormat,
    /// T1: client time when the request left, echoed by the server.
    pub origin_timestamp: TimestampFormat,
    /// T2: server time when the request arrived.
    pub receive_timestamp: TimestampFormat,
    /// T3 for replies, T1 for requests: time the packet left the sender.
    pub transmit_timestamp: TimestampFormat,
}

/// The bit-packed first byte of the header.
pub type PacketByte1 = (LeapIndicator, Version, Mode);

impl Default for Packet {
    /// An NTPv4 client request template with all timestamps zeroed.
    fn default() -> Self {
        Packet {
            leap_indicator: LeapIndicator::default(),
            version: Version::default(),
            mode: Mode::default(),
            stratum: Stratum::default(),
            poll: 0,
            precision: 0,
            root_delay: ShortFormat::default(),
            root_dispersion: ShortFormat::default(),
            reference_id: ReferenceIdentifier::default(),
            reference_timestamp: TimestampFormat::default(),
            origin_timestamp: TimestampFormat::default(),
            receive_timestamp: TimestampFormat::default(),
            transmit_timestamp: TimestampFormat::default(),
        }
    }
}

impl ShortFormat {
    /// The value in seconds.
    pub fn to_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.fraction as f64 / 65_536.0
    }

    /// The raw 32-bit fixed-point value.
    pub fn to_u32(&self) -> u32 {
        ((self.seconds as u32) << 16) | self.fraction as u32
    }

    /// Split a raw 32-bit fixed-point value.
    pub fn from_u32(raw: u32) -> Self {
        ShortFormat {
            seconds: (raw >> 16) as u16,
            fraction: raw as u16,
        }
    }
}

impl TimestampFormat {
    /// Whether both halves are zero, meaning "not set".
    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }

    /// The raw 64-bit fixed-point value.
    pub fn to_u64(&self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    /// Split a raw 64-bit fixed-point value.
    pub fn from_u64(raw: u64) -> Self {
        TimestampFormat {
            seconds: (raw >> 32) as u32,
            fraction: raw as u32,
        }
    }
}

impl ConstPackedSizeBytes for ShortFormat {
    const PACKED_SIZE_BYTES: usize = 4;
}

impl ConstPackedSizeBytes for TimestampFormat {
    const PACKED_SIZE_BYTES: usize = 8;
}

impl ConstPackedSizeBytes for Stratum {
    const PACKED_SIZE_BYTES: usize = 1;
}

impl ConstPackedSizeBytes for ReferenceIdentifier {
    const PACKED_SIZE_BYTES: usize = 4;
}

impl ConstPackedSizeBytes for PacketByte1 {
    const PACKED_SIZE_BYTES: usize = 1;
}

impl ConstPackedSizeBytes for Packet {
    const PACKED_SIZE_BYTES: usize = PacketByte1::PACKED_SIZE_BYTES
        + Stratum::PACKED_SIZE_BYTES
        + 2
        + ShortFormat::PACKED_SIZE_BYTES * 2
        + ReferenceIdentifier::PACKED_SIZE_BYTES
        + TimestampFormat::PACKED_SIZE_BYTES * 4;
}
