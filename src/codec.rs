//! Partition-key codec
//!
//! The store repurposes its sortable partition key to encode time: the key
//! is the number of milliseconds since the Unix epoch rendered as a plain
//! decimal digit string. Range filters against the store compare these
//! strings lexicographically, which agrees with numeric order because the
//! encoder never emits a sign or separator.
//!
//! The encoding is accurate to the second only. Stored keys always end in
//! three millisecond digits, and [`decode`] discards the final three
//! characters before parsing, so any sub-second component supplied at
//! encode time does not survive a round trip. Callers must not rely on
//! sub-second precision.
//!
//! # Example
//!
//! ```rust
//! use aqsense::codec;
//! use chrono::{TimeZone, Utc};
//!
//! let ts = Utc.with_ymd_and_hms(2019, 5, 22, 13, 0, 15).unwrap();
//! let key = codec::encode(ts).unwrap();
//! assert_eq!(key.as_str(), "1558530015000");
//! assert_eq!(codec::decode(&key).unwrap(), ts);
//! ```

use chrono::{DateTime, Utc};

use crate::error::CodecError;
use crate::types::PartitionKey;

/// Number of trailing millisecond digits a stored key carries
const MILLI_DIGITS: usize = 3;

/// Encode a UTC timestamp as a partition key
///
/// Computes milliseconds since 1970-01-01T00:00:00Z, rounded to the
/// nearest integer, and renders them as a decimal digit string. Fails with
/// [`CodecError::PreEpochTimestamp`] for pre-epoch inputs, which would
/// need a sign character and break lexicographic ordering.
pub fn encode(ts: DateTime<Utc>) -> Result<PartitionKey, CodecError> {
    let secs = ts.timestamp();
    if secs < 0 {
        return Err(CodecError::PreEpochTimestamp {
            timestamp: ts.to_rfc3339(),
        });
    }

    // Round the sub-second component to the nearest millisecond rather
    // than truncating it.
    let millis = secs * 1000 + i64::from((ts.timestamp_subsec_nanos() + 500_000) / 1_000_000);
    Ok(PartitionKey(millis.to_string()))
}

/// Decode a partition key back to a UTC timestamp
///
/// Strips the final three characters (the millisecond digits) and parses
/// the remainder as integer seconds since the epoch. Fails with
/// [`CodecError::MalformedKey`] when the key is too short to hold a
/// seconds portion (fewer than four characters) or the seconds portion is
/// not a decimal integer.
pub fn decode(key: &PartitionKey) -> Result<DateTime<Utc>, CodecError> {
    let raw = key.as_str();
    // Digit check before slicing: it rejects signs and separators, and it
    // guarantees the byte slice below lands on character boundaries.
    if raw.len() <= MILLI_DIGITS || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::MalformedKey {
            key: raw.to_string(),
        });
    }

    let seconds_part = &raw[..raw.len() - MILLI_DIGITS];
    let secs: i64 = seconds_part
        .parse()
        .map_err(|_| CodecError::MalformedKey {
            key: raw.to_string(),
        })?;

    DateTime::from_timestamp(secs, 0).ok_or_else(|| CodecError::MalformedKey {
        key: raw.to_string(),
    })
}

/// Decode a slice of partition keys elementwise
///
/// Output preserves the length and order of the input; the first malformed
/// key aborts the whole batch.
pub fn decode_all(keys: &[PartitionKey]) -> Result<Vec<DateTime<Utc>>, CodecError> {
    keys.iter().map(decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn round_trip_whole_seconds() {
        let ts = Utc.with_ymd_and_hms(2019, 5, 22, 13, 0, 15).unwrap();
        let key = encode(ts).unwrap();
        assert_eq!(decode(&key).unwrap(), ts);
    }

    #[test]
    fn encode_renders_milliseconds_digits() {
        let ts = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 1).unwrap();
        assert_eq!(encode(ts).unwrap().as_str(), "1000");
    }

    #[test]
    fn sub_second_component_is_dropped_by_round_trip() {
        let base = Utc.with_ymd_and_hms(2019, 5, 22, 13, 0, 15).unwrap();
        let ts = base + Duration::milliseconds(398);
        let key = encode(ts).unwrap();
        assert_eq!(key.as_str(), "1558530015398");
        // Decode truncates to the whole second.
        assert_eq!(decode(&key).unwrap(), base);
    }

    #[test]
    fn encode_rounds_to_nearest_millisecond() {
        let base = Utc.with_ymd_and_hms(2019, 5, 22, 13, 0, 15).unwrap();
        let ts = base + Duration::nanoseconds(1_999_600);
        assert_eq!(encode(ts).unwrap().as_str(), "1558530015002");
    }

    #[test]
    fn encode_monotonic_under_string_comparison() {
        let mut previous: Option<PartitionKey> = None;
        for secs in [0_i64, 1, 59, 3600, 86_400, 1_546_300_800, 1_566_518_400] {
            let ts = DateTime::from_timestamp(secs, 0).unwrap();
            let key = encode(ts).unwrap();
            if let Some(prev) = previous {
                assert!(prev < key, "{} should sort before {}", prev, key);
            }
            previous = Some(key);
        }
    }

    #[test]
    fn encode_rejects_pre_epoch() {
        let ts = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 0).unwrap();
        assert!(matches!(
            encode(ts),
            Err(CodecError::PreEpochTimestamp { .. })
        ));
    }

    #[test]
    fn decode_rejects_short_keys() {
        for raw in ["", "1", "12", "123"] {
            let err = decode(&PartitionKey::from(raw)).unwrap_err();
            assert!(matches!(err, CodecError::MalformedKey { .. }), "{raw:?}");
        }
        // Four characters is the shortest decodable key: one seconds digit.
        let ts = decode(&PartitionKey::from("1000")).unwrap();
        assert_eq!(ts, DateTime::from_timestamp(1, 0).unwrap());
    }

    #[test]
    fn decode_rejects_non_numeric_keys() {
        for raw in ["12ab000", "+558530015000", "-558530015000", "1_558_530_015_000"] {
            let err = decode(&PartitionKey::from(raw)).unwrap_err();
            assert!(matches!(err, CodecError::MalformedKey { .. }), "{raw:?}");
        }
    }

    #[test]
    fn decode_all_preserves_order_and_length() {
        let keys: Vec<PartitionKey> = ["1558530015000", "1558530016000", "1558530017000"]
            .iter()
            .map(|s| PartitionKey::from(*s))
            .collect();
        let decoded = decode_all(&keys).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(decoded[0] < decoded[1] && decoded[1] < decoded[2]);
    }

    #[test]
    fn decode_all_fails_on_first_malformed_key() {
        let keys = vec![
            PartitionKey::from("1558530015000"),
            PartitionKey::from("bad"),
        ];
        assert!(decode_all(&keys).is_err());
    }
}
