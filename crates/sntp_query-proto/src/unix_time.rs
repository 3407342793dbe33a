use crate::protocol;
use std::time;

/// The number of seconds from 1st January 1900 UTC to the start of the Unix epoch.
pub const EPOCH_DELTA: i64 = 2_208_988_800;

/// The number of seconds in one NTP era (2^32 seconds, approximately 136 years).
///
/// Era 0 spans from 1900-01-01 00:00:00 UTC to 2036-02-07 06:28:15 UTC.
/// Era 1 begins at 2036-02-07 06:28:16 UTC.
pub const ERA_SECONDS: i64 = 1 << 32;

// 2^32, the scale of the 32-bit NTP fraction.
const FRACTION_SCALE: f64 = 4_294_967_296.0;

/// A wall-clock instant relative to `UNIX_EPOCH` (00:00:00 UTC, 1 January 1970), in whole
/// seconds plus nanoseconds.
///
/// For instants before the epoch both components are negative (or zero), mirroring
/// `SystemTime::duration_since` on the other side of the epoch.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instant {
    secs: i64,
    subsec_nanos: i32,
}

impl Instant {
    /// Create a new **Instant** given its `secs` and `subsec_nanos` components.
    ///
    /// Returns `None` if the signs of the components disagree or `subsec_nanos` is a whole
    /// second or more.
    pub fn new(secs: i64, subsec_nanos: i32) -> Option<Instant> {
        if subsec_nanos.unsigned_abs() >= 1_000_000_000 {
            return None;
        }
        if (secs > 0 && subsec_nanos < 0) || (secs < 0 && subsec_nanos > 0) {
            return None;
        }
        Some(Instant { secs, subsec_nanos })
    }

    /// The current wall-clock time from `std::time::SystemTime`.
    pub fn now() -> Self {
        Instant::from(time::SystemTime::now())
    }

    /// Build an instant from floating point seconds since the Unix epoch.
    pub fn from_secs_f64(secs: f64) -> Self {
        let whole = secs.trunc();
        let nanos = ((secs - whole) * 1e9).round() as i64;
        // Rounding can carry into the next second.
        let (whole, nanos) = if nanos.abs() >= 1_000_000_000 {
            (whole as i64 + nanos.signum(), 0)
        } else {
            (whole as i64, nanos)
        };
        Instant {
            secs: whole,
            subsec_nanos: nanos as i32,
        }
    }

    /// The "seconds" component of the **Instant**.
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// The fractional component of the **Instant** in nanoseconds.
    pub fn subsec_nanos(&self) -> i32 {
        self.subsec_nanos
    }

    /// The fractional component of the **Instant** in microseconds.
    pub fn subsec_micros(&self) -> i32 {
        self.subsec_nanos / 1_000
    }

    /// Seconds since the Unix epoch as `f64`.
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + self.subsec_nanos as f64 / 1e9
    }
}

impl From<time::SystemTime> for Instant {
    fn from(t: time::SystemTime) -> Self {
        match t.duration_since(time::UNIX_EPOCH) {
            Ok(d) => Instant {
                secs: d.as_secs() as i64,
                subsec_nanos: d.subsec_nanos() as i32,
            },
            Err(e) => {
                let d = e.duration();
                Instant {
                    secs: -(d.as_secs() as i64),
                    subsec_nanos: -(d.subsec_nanos() as i32),
                }
            }
        }
    }
}

// Era-aware conversion helpers.

/// Given a raw 32-bit NTP seconds value and a pivot, return the absolute NTP seconds by
/// selecting the era that lands closest to the pivot.
///
/// Assumes the timestamp is within half an era (~68 years) of the pivot.
fn era_aware_ntp_seconds(raw_seconds: u32, pivot: &Instant) -> i64 {
    let pivot_ntp = pivot.secs + EPOCH_DELTA;
    let pivot_era = pivot_ntp.div_euclid(ERA_SECONDS);
    let candidate = pivot_era * ERA_SECONDS + raw_seconds as i64;

    let diff = candidate - pivot_ntp;
    if diff > ERA_SECONDS / 2 {
        candidate - ERA_SECONDS
    } else if diff < -(ERA_SECONDS / 2) {
        candidate + ERA_SECONDS
    } else {
        candidate
    }
}

/// Convert a [`protocol::TimestampFormat`] to an absolute NTP fixed-point value (units of
/// 2^-32 s since 1900-01-01), resolving the era against `pivot`.
///
/// Differences between values from the same exchange are exact, which keeps delay and
/// offset free of floating point cancellation.
pub fn timestamp_to_ntp_fixed(ts: protocol::TimestampFormat, pivot: &Instant) -> i128 {
    let ntp_secs = era_aware_ntp_seconds(ts.seconds, pivot);
    ((ntp_secs as i128) << 32) | ts.fraction as i128
}

/// Convert a difference of NTP fixed-point values to seconds.
pub fn ntp_fixed_to_secs(fixed: i128) -> f64 {
    fixed as f64 / FRACTION_SCALE
}

/// Convert a [`protocol::TimestampFormat`] to an [`Instant`] using the given pivot
/// for era disambiguation.
///
/// The 32-bit NTP timestamp is ambiguous across eras. This picks the era placing the
/// timestamp closest to the pivot. For live traffic pass the local receive time.
pub fn timestamp_to_instant(ts: protocol::TimestampFormat, pivot: &Instant) -> Instant {
    let ntp_secs = era_aware_ntp_seconds(ts.seconds, pivot);
    let secs = ntp_secs - EPOCH_DELTA;
    let nanos = ((ts.fraction as u64 * 1_000_000_000) >> 32) as i32;
    if secs < 0 && nanos > 0 {
        // Keep both components on the same side of the epoch.
        Instant {
            secs: secs + 1,
            subsec_nanos: nanos - 1_000_000_000,
        }
    } else {
        Instant {
            secs,
            subsec_nanos: nanos,
        }
    }
}

impl From<Instant> for protocol::TimestampFormat {
    /// Converts a Unix [`Instant`] to a 32-bit NTP timestamp.
    ///
    /// The era is dropped; receivers recover it with [`timestamp_to_instant`].
    fn from(t: Instant) -> Self {
        let mut ntp_secs = t.secs + EPOCH_DELTA;
        let mut nanos = t.subsec_nanos as i64;
        if nanos < 0 {
            ntp_secs -= 1;
            nanos += 1_000_000_000;
        }
        // Round up so that converting back never lands below the original nanosecond.
        let fraction = ((nanos << 32) + 999_999_999) / 1_000_000_000;
        let (ntp_secs, fraction) = if fraction > u32::MAX as i64 {
            (ntp_secs + 1, 0)
        } else {
            (ntp_secs, fraction)
        };
        protocol::TimestampFormat {
            seconds: ntp_secs.rem_euclid(ERA_SECONDS) as u32,
            fraction: fraction as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Instant {
        Instant::new(secs, 0).unwrap()
    }

    #[test]
    fn new_rejects_mixed_signs() {
        assert!(Instant::new(1, -1).is_none());
        assert!(Instant::new(-1, 1).is_none());
        assert!(Instant::new(0, 1_000_000_000).is_none());
        assert!(Instant::new(-1, -5).is_some());
    }

    #[test]
    fn era0_timestamp_to_instant() {
        // 2024-01-01 00:00:00 UTC: Unix=1704067200, NTP=3913056000
        let ts = protocol::TimestampFormat {
            seconds: 3_913_056_000,
            fraction: 0,
        };
        let result = timestamp_to_instant(ts, &at(1_704_067_200));
        assert_eq!(result.secs(), 1_704_067_200);
    }

    #[test]
    fn era1_timestamp_with_era1_pivot() {
        // Era 1, offset 100_000_000 => Unix = 2^32 + 100_000_000 - EPOCH_DELTA
        let ts = protocol::TimestampFormat {
            seconds: 100_000_000,
            fraction: 0,
        };
        let result = timestamp_to_instant(ts, &at(2_185_978_496));
        assert_eq!(result.secs(), 2_185_978_496);
    }

    #[test]
    fn era_boundary_pivot_before_ts_after() {
        // Pivot in Jan 2036 (era 0). NTP seconds 1000 belong to era 1.
        let ts = protocol::TimestampFormat {
            seconds: 1000,
            fraction: 0,
        };
        let result = timestamp_to_instant(ts, &at(2_082_758_400));
        assert_eq!(result.secs(), ERA_SECONDS + 1000 - EPOCH_DELTA);
    }

    #[test]
    fn era_boundary_pivot_after_ts_before() {
        // Pivot in Mar 2036 (era 1). A timestamp near u32::MAX is still era 0.
        let ts = protocol::TimestampFormat {
            seconds: u32::MAX,
            fraction: 0,
        };
        let result = timestamp_to_instant(ts, &at(2_087_942_400));
        assert_eq!(result.secs(), u32::MAX as i64 - EPOCH_DELTA);
    }

    #[test]
    fn fixed_point_across_rollover_is_continuous() {
        let pivot = at(ERA_SECONDS - EPOCH_DELTA);
        let before = protocol::TimestampFormat {
            seconds: u32::MAX,
            fraction: 0,
        };
        let after = protocol::TimestampFormat {
            seconds: 1,
            fraction: 1 << 31,
        };
        let diff =
            timestamp_to_ntp_fixed(after, &pivot) - timestamp_to_ntp_fixed(before, &pivot);
        assert_eq!(ntp_fixed_to_secs(diff), 2.5);
    }

    #[test]
    fn fixed_point_matches_unix_offset() {
        let pivot = at(0);
        let ts = protocol::TimestampFormat {
            seconds: EPOCH_DELTA as u32,
            fraction: 0,
        };
        assert_eq!(timestamp_to_ntp_fixed(ts, &pivot), (EPOCH_DELTA as i128) << 32);
    }

    #[test]
    fn timestamp_format_roundtrip_with_pivot() {
        let original = Instant::new(1_704_067_200, 123_456_789).unwrap();
        let ts: protocol::TimestampFormat = original.into();
        let restored = timestamp_to_instant(ts, &original);
        assert_eq!(restored, original);
    }

    #[test]
    fn pre_epoch_instant_roundtrip() {
        let original = Instant::new(-10, -250_000_000).unwrap();
        let ts: protocol::TimestampFormat = original.into();
        let restored = timestamp_to_instant(ts, &original);
        assert_eq!(restored, original);
    }

    #[test]
    fn from_secs_f64_carries() {
        let i = Instant::from_secs_f64(1.9999999999);
        assert_eq!(i.secs(), 2);
        assert_eq!(i.subsec_nanos(), 0);
        let i = Instant::from_secs_f64(10.25);
        assert_eq!(i.secs(), 10);
        assert_eq!(i.subsec_micros(), 250_000);
    }
}
