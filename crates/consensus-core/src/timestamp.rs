use bincode::{Decode, Encode};
use time::OffsetDateTime;

/// Microsecond-precision absolute timestamp, UTC.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(
            u64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1000)
                .expect("Can't fail before year 586524"),
        )
    }

    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }

    /// Median of a non-empty slice of timestamps (spec §4.3 consensus
    /// timestamp definition).
    pub fn median(mut timestamps: Vec<Timestamp>) -> Option<Timestamp> {
        if timestamps.is_empty() {
            return None;
        }
        timestamps.sort_unstable();
        Some(timestamps[timestamps.len() / 2])
    }
}
