//! Core data types used throughout the pipeline
//!
//! # Key Types
//!
//! - **`PartitionKey`**: the store's sortable string key, encoding time
//! - **`SensorReading`**: one raw row as returned by the table store
//! - **`Resolution`**: bin width for resampling (minutes, hours, days)
//! - **`TimeWindow`**: half-open `[start, end)` interval in UTC
//!
//! # Example
//!
//! ```rust
//! use aqsense::types::{Resolution, TimeWindow};
//! use chrono::{TimeZone, Utc};
//!
//! let res = Resolution::Minutes(15);
//! assert_eq!(res.len_secs(), 900);
//!
//! let window = TimeWindow::new(
//!     Utc.with_ymd_and_hms(2019, 6, 7, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2019, 6, 8, 0, 0, 0).unwrap(),
//! )
//! .unwrap();
//! assert!(window.contains(Utc.with_ymd_and_hms(2019, 6, 7, 12, 0, 0).unwrap()));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The store's native sortable key, a decimal digit string of milliseconds
/// since the Unix epoch
///
/// Range queries against the store rely on lexicographic ordering of these
/// strings, which holds because the codec only ever produces unsigned,
/// unpadded decimal digits. Conversion to and from timestamps lives in
/// [`crate::codec`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey(pub String);

impl PartitionKey {
    /// View the raw key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartitionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One raw row as returned by the table store
///
/// Field values arrive as strings regardless of how the store types them;
/// coercion to floats happens in [`crate::normalize`]. The `etag` is the
/// store's row-versioning handle and is never used semantically; the
/// normalizer drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Sensor identity as recorded by the store (`RowKey`)
    pub row_key: String,

    /// Time-encoding partition key (`PartitionKey`)
    pub partition_key: PartitionKey,

    /// Named field values in the order the store returned them
    pub fields: Vec<(String, String)>,

    /// Opaque row-versioning value, dropped during normalization
    pub etag: String,
}

impl SensorReading {
    /// Look up a field value by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Bin width for resampling
///
/// Bins are left-closed and aligned to the Unix epoch: bin `n` covers
/// `[n * len, (n + 1) * len)` seconds since 1970-01-01T00:00:00Z. Later
/// timestamps never map to an earlier bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Bins of `n` minutes
    Minutes(u32),
    /// Bins of `n` hours
    Hours(u32),
    /// Bins of `n` days
    Days(u32),
}

impl Resolution {
    /// Bin length in whole seconds
    pub fn len_secs(&self) -> i64 {
        match *self {
            Resolution::Minutes(n) => i64::from(n) * 60,
            Resolution::Hours(n) => i64::from(n) * 3600,
            Resolution::Days(n) => i64::from(n) * 86_400,
        }
    }

    /// Map a timestamp to the start of its bin
    ///
    /// Uses Euclidean division so the mapping stays monotonic even for
    /// pre-epoch inputs, although the rest of the pipeline never produces
    /// them.
    pub fn bin_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let len = self.len_secs();
        let floored = ts.timestamp().div_euclid(len) * len;
        DateTime::from_timestamp(floored, 0).expect("bin start within chrono range")
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Resolution::Minutes(n) => write!(f, "{}min", n),
            Resolution::Hours(n) => write!(f, "{}h", n),
            Resolution::Days(n) => write!(f, "{}d", n),
        }
    }
}

/// Half-open UTC interval `[start, end)`
///
/// Used for manual blank-out windows and anywhere a bounded range is
/// needed. `start` must precede `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting empty or inverted intervals
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Whether `ts` falls inside `[start, end)`
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}
