use sntp_proto::protocol::{
    ConstPackedSizeBytes, KissCode, LeapIndicator, Mode, Packet, ReadBytes,
    ReferenceIdentifier, ShortFormat, Stratum, TimestampFormat, Version, WriteBytes,
};
use sntp_proto::unix_time::{self, Instant};
use proptest::prelude::*;

/// Strategy that generates exactly 48 random bytes.
fn arb_48_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 48)
}

fn arb_timestamp() -> impl Strategy<Value = TimestampFormat> {
    (any::<u32>(), any::<u32>())
        .prop_map(|(seconds, fraction)| TimestampFormat { seconds, fraction })
}

fn arb_reply() -> impl Strategy<Value = Packet> {
    (
        prop_oneof![
            Just(LeapIndicator::NoWarning),
            Just(LeapIndicator::AddOne),
            Just(LeapIndicator::SubOne),
            Just(LeapIndicator::Unknown),
        ],
        prop_oneof![Just(Mode::Server), Just(Mode::SymmetricPassive)],
        1u8..=15,
        any::<[u8; 4]>(),
        arb_timestamp(),
        arb_timestamp(),
        arb_timestamp(),
    )
        .prop_map(|(li, mode, stratum, refid, origin, receive, transmit)| Packet {
            leap_indicator: li,
            mode,
            stratum: Stratum(stratum),
            reference_id: ReferenceIdentifier::Source(refid),
            origin_timestamp: origin,
            receive_timestamp: receive,
            transmit_timestamp: transmit,
            ..Packet::default()
        })
}

proptest! {
    #[test]
    fn short_format_roundtrip(seconds in any::<u16>(), fraction in any::<u16>()) {
        let sf = ShortFormat { seconds, fraction };
        let mut buf = [0u8; ShortFormat::PACKED_SIZE_BYTES];
        (&mut buf[..]).write_bytes(sf).unwrap();
        let parsed: ShortFormat = (&buf[..]).read_bytes().unwrap();
        prop_assert_eq!(sf, parsed);
    }

    /// Any 48 random bytes either parse or fail with an error, never a panic.
    #[test]
    fn packet_from_arbitrary_bytes_never_panics(bytes in arb_48_bytes()) {
        let _ = (&bytes[..]).read_bytes::<Packet>();
    }

    /// Buffers shorter than 48 bytes must always return Err.
    #[test]
    fn packet_from_short_buffer_always_errors(len in 0usize..48) {
        let buf = vec![0u8; len];
        prop_assert!((&buf[..]).read_bytes::<Packet>().is_err());
    }

    /// Parsing then re-serializing arbitrary bytes is lossless.
    #[test]
    fn packet_bytes_roundtrip(bytes in arb_48_bytes()) {
        let pkt: Packet = (&bytes[..]).read_bytes().unwrap();
        let mut out = [0u8; Packet::PACKED_SIZE_BYTES];
        (&mut out[..]).write_bytes(pkt).unwrap();
        prop_assert_eq!(&bytes[..], &out[..]);
    }

    #[test]
    fn reply_roundtrip(pkt in arb_reply()) {
        let mut buf = [0u8; Packet::PACKED_SIZE_BYTES];
        (&mut buf[..]).write_bytes(pkt).unwrap();
        let back: Packet = (&buf[..]).read_bytes().unwrap();
        prop_assert_eq!(back, pkt);
        prop_assert_eq!(back.version, Version::V4);
    }

    /// Stratum-0 replies surface their kiss code, known or not.
    #[test]
    fn kiss_reference_ids(raw in any::<[u8; 4]>()) {
        let id = ReferenceIdentifier::for_stratum(Stratum::UNSPECIFIED, raw);
        prop_assert_eq!(id.as_bytes(), raw);
        match id {
            ReferenceIdentifier::KissOfDeath(code) => {
                prop_assert_eq!(KissCode::try_from(u32::from_be_bytes(raw)), Ok(code));
            }
            ReferenceIdentifier::UnknownKiss(_) => {
                prop_assert!(KissCode::try_from(u32::from_be_bytes(raw)).is_err());
            }
            ReferenceIdentifier::Source(_) => {
                prop_assert!(false, "stratum 0 is never a source");
            }
        }
    }

    /// A transmit time survives encoding to the nearest fixed-point step.
    #[test]
    fn instant_timestamp_roundtrip(
        secs in -2_000_000_000i64..4_000_000_000,
        nanos in 0i32..1_000_000_000,
    ) {
        let nanos = if secs < 0 { -nanos } else { nanos };
        let original = Instant::new(secs, nanos).unwrap();
        let ts: TimestampFormat = original.into();
        let restored = unix_time::timestamp_to_instant(ts, &original);
        prop_assert_eq!(restored, original);
        let fixed = unix_time::timestamp_to_ntp_fixed(ts, &original);
        let unix = unix_time::ntp_fixed_to_secs(fixed) - unix_time::EPOCH_DELTA as f64;
        prop_assert!((unix - original.as_secs_f64()).abs() < 1e-6);
    }
}
