//! Sensor-identity reconciliation and manual corrections
//!
//! Two sensors can be the same physical location recorded under different
//! identities: a failed unit gets replaced and the replacement reports
//! under a new name. [`merge_identities`] folds the replacement's series
//! into the original column: the primary identity's value wins wherever
//! it is present, the secondary only fills gaps, and the secondary column
//! disappears from the result.
//!
//! [`blank`] is the other manual correction: a known-bad excursion
//! (sensor fault, contractor dust cloud) gets forced to missing over a
//! time window without touching anything else.
//!
//! Which pairs to merge and which windows to blank are dataset facts, not
//! code: they ride in [`SiteCorrections`] and are applied in order by
//! [`apply_corrections`].

use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::series::WideTable;
use crate::types::TimeWindow;

/// A primary/secondary identity relation: same physical location, the
/// secondary superseded the primary temporally, the primary's column name
/// is canonical
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPair {
    /// Column whose name survives the merge
    pub primary: String,
    /// Column folded into the primary and then removed
    pub secondary: String,
}

/// A manual blank-out: force one column to missing inside a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlankWindow {
    /// Column to blank
    pub column: String,
    /// Half-open window to blank over
    #[serde(flatten)]
    pub window: TimeWindow,
}

/// Dataset-specific corrections, applied in order: identity merges first,
/// then blank-outs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCorrections {
    /// Identity pairs to merge
    #[serde(default)]
    pub identity_pairs: Vec<IdentityPair>,

    /// Windows to blank
    #[serde(default)]
    pub blank_windows: Vec<BlankWindow>,
}

/// Merge a split identity: per cell, the primary's value when present,
/// else the secondary's, else missing
///
/// The output keeps the primary's column name and drops the secondary
/// column entirely. Primary always wins when present, regardless of which
/// sensor reported more recently.
pub fn merge_identities(
    wide: &WideTable,
    primary: &str,
    secondary: &str,
) -> Result<WideTable, FrameError> {
    let primary_idx = wide
        .column_index(primary)
        .ok_or_else(|| FrameError::UnknownColumn {
            column: primary.to_string(),
        })?;
    let secondary_idx = wide
        .column_index(secondary)
        .ok_or_else(|| FrameError::UnknownColumn {
            column: secondary.to_string(),
        })?;

    let columns: Vec<String> = wide
        .columns()
        .iter()
        .filter(|c| c.as_str() != secondary)
        .cloned()
        .collect();
    let mut out = WideTable::new(columns);

    for (ts, values) in wide.iter() {
        let merged = values[primary_idx].or(values[secondary_idx]);
        let row: Vec<Option<f64>> = values
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != secondary_idx)
            .map(|(i, v)| if i == primary_idx { merged } else { *v })
            .collect();
        out.insert_row(*ts, row)?;
    }
    Ok(out)
}

/// Force one column to missing inside a half-open window
///
/// Cells in other columns and outside the window are untouched.
pub fn blank(wide: &WideTable, column: &str, window: TimeWindow) -> Result<WideTable, FrameError> {
    let idx = wide
        .column_index(column)
        .ok_or_else(|| FrameError::UnknownColumn {
            column: column.to_string(),
        })?;

    let mut out = WideTable::new(wide.columns().to_vec());
    for (ts, values) in wide.iter() {
        let mut row = values.clone();
        if window.contains(*ts) {
            row[idx] = None;
        }
        out.insert_row(*ts, row)?;
    }
    Ok(out)
}

/// Apply a correction set: every identity merge, then every blank window
pub fn apply_corrections(
    wide: &WideTable,
    corrections: &SiteCorrections,
) -> Result<WideTable, FrameError> {
    let mut table = wide.clone();
    for pair in &corrections.identity_pairs {
        table = merge_identities(&table, &pair.primary, &pair.secondary)?;
    }
    for bw in &corrections.blank_windows {
        table = blank(&table, &bw.column, bw.window)?;
    }
    Ok(table)
}
