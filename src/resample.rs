//! Resampling and rollups
//!
//! Regularizes a table onto a fixed-frequency grid by averaging within
//! contiguous, left-closed, epoch-aligned bins. The output grid runs from
//! the bin containing the first input row to the bin containing the last,
//! with every bin present: bins that received no input rows carry `None`
//! in every column rather than being omitted. A regular grid is essential
//! for later alignment across sensors with different native sampling
//! rates.
//!
//! The same rule produces coarser rollups (hourly, daily) from an
//! already-resampled table. Mean-of-bin-means equals the direct coarse
//! mean only when the finer bins are uniformly populated; gaps propagate
//! as missing (the mean of nothing is `None`).
//!
//! The identity column is non-numeric and is dropped prior to averaging;
//! resampled tables carry no per-row `sensor_id`.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::series::{SensorTable, WideTable};
use crate::types::Resolution;

/// Per-bin running sums, one slot per column
struct BinAccumulator {
    sums: Vec<f64>,
    counts: Vec<u32>,
}

impl BinAccumulator {
    fn new(width: usize) -> Self {
        Self {
            sums: vec![0.0; width],
            counts: vec![0; width],
        }
    }

    fn add(&mut self, values: &[Option<f64>]) {
        for (i, v) in values.iter().enumerate() {
            if let Some(v) = v {
                self.sums[i] += v;
                self.counts[i] += 1;
            }
        }
    }

    fn means(&self) -> Vec<Option<f64>> {
        self.sums
            .iter()
            .zip(&self.counts)
            .map(|(sum, count)| {
                if *count > 0 {
                    Some(sum / f64::from(*count))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Bin rows into epoch-aligned means over a regular grid
fn bin_means<'a, I>(rows: I, width: usize, resolution: Resolution) -> BTreeMap<DateTime<Utc>, Vec<Option<f64>>>
where
    I: Iterator<Item = (&'a DateTime<Utc>, &'a Vec<Option<f64>>)>,
{
    let len = resolution.len_secs();
    let mut bins: BTreeMap<i64, BinAccumulator> = BTreeMap::new();

    for (ts, values) in rows {
        let bin = ts.timestamp().div_euclid(len);
        bins.entry(bin)
            .or_insert_with(|| BinAccumulator::new(width))
            .add(values);
    }

    let mut out = BTreeMap::new();
    let (Some(first), Some(last)) = (
        bins.keys().next().copied(),
        bins.keys().next_back().copied(),
    ) else {
        return out;
    };

    for bin in first..=last {
        let ts = DateTime::from_timestamp(bin * len, 0).expect("bin start within chrono range");
        let values = match bins.get(&bin) {
            Some(acc) => acc.means(),
            // Interior gap: the grid stays regular, the cells go missing.
            None => vec![None; width],
        };
        out.insert(ts, values);
    }
    out
}

/// Resample a per-sensor table onto a regular grid of bin means
pub fn resample_sensor(table: &SensorTable, resolution: Resolution) -> SensorTable {
    let columns = table.columns().to_vec();
    let width = columns.len();
    let mut out = SensorTable::new(columns);
    for (ts, values) in bin_means(table.iter(), width, resolution) {
        out.insert_row(ts, None, values)
            .expect("binned row width matches columns");
    }
    out
}

/// Resample a wide table onto a regular grid of bin means
///
/// Used for the hourly and daily rollups of the combined multi-sensor
/// table; every column is averaged independently.
pub fn resample_wide(table: &WideTable, resolution: Resolution) -> WideTable {
    let columns = table.columns().to_vec();
    let width = columns.len();
    let mut out = WideTable::new(columns);
    for (ts, values) in bin_means(table.iter(), width, resolution) {
        out.insert_row(ts, values)
            .expect("binned row width matches columns");
    }
    out
}
