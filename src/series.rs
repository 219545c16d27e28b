//! Timestamp-indexed tables
//!
//! Two shapes flow through the pipeline:
//!
//! - [`SensorTable`]: one sensor's readings, a sorted unique timestamp
//!   index over named numeric columns, with the store's identity column
//!   retained alongside until resampling drops it.
//! - [`WideTable`]: several single-column sensor series outer-joined on
//!   the union timestamp index, one column per sensor.
//!
//! Cells are `Option<f64>`; `None` means no observation. Rows live in a
//! `BTreeMap`, which gives the sorted unique index both shapes rely on.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::FrameError;

/// Timestamp-indexed table for a single sensor
///
/// Columns are the numeric fields requested from the store (or all fields
/// observed, when nothing was requested). The identity column survives
/// normalization as a parallel per-row value and is dropped by resampling,
/// mirroring how a mean over a mixed-type frame discards non-numeric
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTable {
    columns: Vec<String>,
    rows: BTreeMap<DateTime<Utc>, Vec<Option<f64>>>,
    /// Per-row identity values; empty after resampling
    ids: BTreeMap<DateTime<Utc>, String>,
}

impl SensorTable {
    /// Create an empty table with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
            ids: BTreeMap::new(),
        }
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Insert a row, replacing any existing row at the same timestamp
    ///
    /// The identity value is optional so resampled grids can stay
    /// identity-free.
    pub fn insert_row(
        &mut self,
        ts: DateTime<Utc>,
        sensor_id: Option<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), FrameError> {
        if values.len() != self.columns.len() {
            return Err(FrameError::ColumnMismatch {
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        if let Some(id) = sensor_id {
            self.ids.insert(ts, id);
        }
        self.rows.insert(ts, values);
        Ok(())
    }

    /// Cell value at `(ts, column)`; `None` for missing cells, absent rows,
    /// and unknown columns alike
    pub fn value(&self, ts: DateTime<Utc>, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(&ts).and_then(|row| row[idx])
    }

    /// Identity value recorded at `ts`, if the table still carries one
    pub fn sensor_id_at(&self, ts: DateTime<Utc>) -> Option<&str> {
        self.ids.get(&ts).map(String::as_str)
    }

    /// Whether the table still carries an identity column
    pub fn has_identity(&self) -> bool {
        !self.ids.is_empty()
    }

    /// Sorted row iterator
    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &Vec<Option<f64>>)> {
        self.rows.iter()
    }

    /// Sorted timestamps
    pub fn timestamps(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.rows.keys()
    }

    /// First timestamp in the index
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.keys().next().copied()
    }

    /// Last timestamp in the index
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.keys().next_back().copied()
    }

    /// Rename the single data column, used to label a per-sensor series
    /// with its short sensor id before combination
    ///
    /// Fails unless the table has exactly one data column.
    pub fn rename_single_column(&mut self, name: impl Into<String>) -> Result<(), FrameError> {
        if self.columns.len() != 1 {
            return Err(FrameError::NotSingleColumn {
                got: self.columns.len(),
            });
        }
        self.columns[0] = name.into();
        Ok(())
    }
}

/// Several per-sensor series outer-joined on the union timestamp index
///
/// One column per sensor. Produced by [`WideTable::combine`] and consumed
/// by the reconciler and the resampler. The join is commutative and
/// associative in sensor order; columns appear in the order the tables
/// were supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    columns: Vec<String>,
    rows: BTreeMap<DateTime<Utc>, Vec<Option<f64>>>,
}

impl WideTable {
    /// Create an empty wide table with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Outer-join single-column sensor tables on their timestamp indexes
    ///
    /// Each input must carry exactly one data column, whose name becomes
    /// the output column. A timestamp present in any input appears in the
    /// output; sensors without a reading there get `None`.
    pub fn combine(tables: &[SensorTable]) -> Result<Self, FrameError> {
        let mut columns = Vec::with_capacity(tables.len());
        for table in tables {
            if table.columns().len() != 1 {
                return Err(FrameError::NotSingleColumn {
                    got: table.columns().len(),
                });
            }
            let name = &table.columns()[0];
            if columns.contains(name) {
                return Err(FrameError::DuplicateColumn {
                    column: name.clone(),
                });
            }
            columns.push(name.clone());
        }

        let mut out = WideTable::new(columns);
        for (i, table) in tables.iter().enumerate() {
            for (ts, values) in table.iter() {
                let row = out
                    .rows
                    .entry(*ts)
                    .or_insert_with(|| vec![None; tables.len()]);
                row[i] = values[0];
            }
        }
        Ok(out)
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value at `(ts, column)`
    pub fn value(&self, ts: DateTime<Utc>, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(&ts).and_then(|row| row[idx])
    }

    /// Insert a row, replacing any existing row at the same timestamp
    pub fn insert_row(
        &mut self,
        ts: DateTime<Utc>,
        values: Vec<Option<f64>>,
    ) -> Result<(), FrameError> {
        if values.len() != self.columns.len() {
            return Err(FrameError::ColumnMismatch {
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        self.rows.insert(ts, values);
        Ok(())
    }

    /// Sorted row iterator
    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &Vec<Option<f64>>)> {
        self.rows.iter()
    }

    /// Sorted timestamps
    pub fn timestamps(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.rows.keys()
    }

    /// First timestamp in the index
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.keys().next().copied()
    }

    /// Last timestamp in the index
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.keys().next_back().copied()
    }
}
