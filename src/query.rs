//! Query construction
//!
//! Translates a logical query (sensor identity, date range, column
//! subset, row cap) into the filter and projection strings the table
//! store understands. Timestamp bounds are encoded through the
//! partition-key codec, so range filters ride on the store's
//! lexicographic key ordering.
//!
//! # Example
//!
//! ```rust
//! use aqsense::query::QuerySpec;
//! use chrono::{TimeZone, Utc};
//!
//! let spec = QuerySpec::for_sensor("aq-deployment_nesta-7")
//!     .from(Utc.with_ymd_and_hms(2019, 5, 22, 13, 0, 15).unwrap())
//!     .columns(["pm25"]);
//!
//! let query = spec.build().unwrap();
//! assert_eq!(
//!     query.filter,
//!     "RowKey eq 'aq-deployment_nesta-7' and PartitionKey gt '1558530015000'"
//! );
//! assert_eq!(query.select.as_deref(), Some("RowKey,PartitionKey,pm25"));
//! ```

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::codec;
use crate::error::QueryBuildError;

/// Store-side column holding the sensor identity
pub const IDENTITY_COLUMN: &str = "RowKey";

/// Store-side column holding the time-encoding partition key
pub const PARTITION_COLUMN: &str = "PartitionKey";

/// A logical query over the sensor table
///
/// Plain data deriving `Hash + Eq`, so the full tuple of identity,
/// bounds, columns, and row cap can key a cache directly. Built into a
/// [`StoreQuery`] with [`QuerySpec::build`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QuerySpec {
    /// Sensor identity as stored (e.g. `aq-deployment_nesta-7`);
    /// `None` selects all sensors
    pub sensor_id: Option<String>,

    /// Only readings recorded strictly after this instant
    pub from: Option<DateTime<Utc>>,

    /// Only readings recorded strictly before this instant
    pub to: Option<DateTime<Utc>>,

    /// Columns to project; `None` returns all columns
    pub columns: Option<Vec<String>>,

    /// Maximum number of rows to return
    pub max_rows: Option<u32>,
}

impl QuerySpec {
    /// Query selecting all sensors
    pub fn all_sensors() -> Self {
        Self::default()
    }

    /// Query restricted to one stored identity
    pub fn for_sensor(sensor_id: impl Into<String>) -> Self {
        Self {
            sensor_id: Some(sensor_id.into()),
            ..Self::default()
        }
    }

    /// Restrict to readings after this instant
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Restrict to readings before this instant
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Project specific columns, in the given order
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Cap the number of returned rows
    pub fn max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Build the store-side filter and projection
    ///
    /// Clauses are joined with ` and ` in a fixed order (identity, lower
    /// bound, upper bound), which only affects readability of the emitted
    /// filter, but is part of the interface the store's filter grammar
    /// has always been exercised with.
    ///
    /// Fails with [`QueryBuildError::InvalidRange`] when both bounds are
    /// set to the same instant: an ambiguous empty-or-single-instant
    /// range that has always indicated a caller bug.
    pub fn build(&self) -> Result<StoreQuery, QueryBuildError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from == to {
                return Err(QueryBuildError::InvalidRange {
                    at: from.to_rfc3339(),
                });
            }
        }

        let mut filter = match &self.sensor_id {
            Some(id) => format!("{IDENTITY_COLUMN} eq '{id}'"),
            // Tautology: every row key matches, keeping the grammar uniform
            // when no identity filter applies.
            None => format!("{IDENTITY_COLUMN} ne '0'"),
        };

        if let Some(from) = self.from {
            let key = codec::encode(from)?;
            filter.push_str(&format!(" and {PARTITION_COLUMN} gt '{key}'"));
        }

        if let Some(to) = self.to {
            let key = codec::encode(to)?;
            filter.push_str(&format!(" and {PARTITION_COLUMN} lt '{key}'"));
        }

        let select = self.columns.as_ref().map(|cols| {
            let mut selected: Vec<&str> = Vec::with_capacity(cols.len() + 2);
            selected.push(IDENTITY_COLUMN);
            selected.push(PARTITION_COLUMN);
            selected.extend(cols.iter().map(String::as_str));
            selected.join(",")
        });

        debug!(filter = %filter, select = ?select, "built store query");

        Ok(StoreQuery {
            filter,
            select,
            limit: self.max_rows,
        })
    }
}

/// A query in the store's own terms: filter expression, optional
/// comma-joined projection, optional row cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    /// Filter expression in the store's grammar
    pub filter: String,

    /// Comma-joined column projection; `None` selects all columns
    pub select: Option<String>,

    /// Maximum number of rows to return
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn instant(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn identity_only_filter() {
        let query = QuerySpec::for_sensor("aq-deployment_nesta-7").build().unwrap();
        assert_eq!(query.filter, "RowKey eq 'aq-deployment_nesta-7'");
        assert_eq!(query.select, None);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn all_sensors_uses_tautology() {
        let query = QuerySpec::all_sensors().build().unwrap();
        assert_eq!(query.filter, "RowKey ne '0'");
    }

    #[test]
    fn range_clauses_in_fixed_order() {
        let query = QuerySpec::for_sensor("aq-deployment_nesta-7")
            .from(instant(1_558_530_015))
            .to(instant(1_558_560_612))
            .build()
            .unwrap();
        assert_eq!(
            query.filter,
            "RowKey eq 'aq-deployment_nesta-7' \
             and PartitionKey gt '1558530015000' \
             and PartitionKey lt '1558560612000'"
        );
    }

    #[test]
    fn equal_bounds_rejected() {
        let t = Utc.with_ymd_and_hms(2019, 7, 1, 0, 0, 0).unwrap();
        let err = QuerySpec::for_sensor("s1").from(t).to(t).build().unwrap_err();
        assert!(matches!(err, QueryBuildError::InvalidRange { .. }));
    }

    #[test]
    fn single_bound_is_fine() {
        let t = Utc.with_ymd_and_hms(2019, 7, 1, 0, 0, 0).unwrap();
        assert!(QuerySpec::for_sensor("s1").from(t).build().is_ok());
        assert!(QuerySpec::for_sensor("s1").to(t).build().is_ok());
    }

    #[test]
    fn projection_prepends_structural_columns() {
        let query = QuerySpec::for_sensor("s1").columns(["pm25"]).build().unwrap();
        assert_eq!(query.select.as_deref(), Some("RowKey,PartitionKey,pm25"));
        // Identity clause only, no range clauses.
        assert_eq!(query.filter, "RowKey eq 's1'");
    }

    #[test]
    fn projection_preserves_caller_order() {
        let query = QuerySpec::for_sensor("s1")
            .columns(["pm25", "humidity", "pm10"])
            .build()
            .unwrap();
        assert_eq!(
            query.select.as_deref(),
            Some("RowKey,PartitionKey,pm25,humidity,pm10")
        );
    }

    #[test]
    fn row_cap_passes_through() {
        let query = QuerySpec::all_sensors().max_rows(500).build().unwrap();
        assert_eq!(query.limit, Some(500));
    }

    #[test]
    fn spec_is_hashable_on_the_full_tuple() {
        fn hash_of(spec: &QuerySpec) -> u64 {
            let mut hasher = DefaultHasher::new();
            spec.hash(&mut hasher);
            hasher.finish()
        }

        let base = QuerySpec::for_sensor("s1")
            .from(instant(0))
            .columns(["pm25"]);
        assert_eq!(hash_of(&base), hash_of(&base.clone()));

        // Any component change must change equality.
        assert_ne!(base, base.clone().max_rows(10));
        assert_ne!(base, base.clone().to(instant(100)));
        assert_ne!(base, QuerySpec::for_sensor("s2").from(instant(0)).columns(["pm25"]));
    }
}
