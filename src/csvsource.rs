//! Secondary CSV dataset
//!
//! Alongside the table store there is a second deployment of co-located
//! sensors whose 15-minute averages arrive as a CSV export: one row per
//! (site, timestamp), with per-field `<name>_mean` columns and a leading
//! unnamed index column. This loader pivots that long format into the
//! same [`WideTable`] shape the primary source produces, so both flow
//! through the same corrections and rollups.
//!
//! Timestamps are day-first (`07/03/2019 00:15`) and are treated as UTC.
//! Site names are lowercased so columns line up with the short sensor ids
//! used everywhere else.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::io::Read;

use crate::error::CsvError;
use crate::series::WideTable;

/// Day-first timestamp formats seen in the export, most specific first
const DATE_FORMATS: [&str; 2] = ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

fn parse_day_first(raw: &str) -> Result<DateTime<Utc>, CsvError> {
    for format in DATE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    // A bare date means midnight.
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return Ok(date.and_hms_opt(0, 0, 0).expect("midnight exists").and_utc());
    }
    Err(CsvError::BadTimestamp {
        value: raw.to_string(),
    })
}

/// Load the secondary dataset, pivoted to one column per site
///
/// `field` names the measurement without the `_mean` suffix (`pm25`
/// selects the `pm25_mean` column). Site columns appear in first-observed
/// order. Blank cells are missing values; anything else that fails to
/// parse as a number is a [`CsvError::TypeCoercion`].
pub fn load_secondary_csv<R: Read>(reader: R, field: &str) -> Result<WideTable, CsvError> {
    let mut csv_reader = csv::ReaderBuilder::new().from_reader(reader);

    let value_column = format!("{field}_mean");
    let headers = csv_reader.headers()?.clone();
    let position = |name: &str| -> Result<usize, CsvError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CsvError::MissingColumn {
                column: name.to_string(),
            })
    };
    let site_idx = position("site")?;
    let date_idx = position("date")?;
    let value_idx = position(&value_column)?;

    let mut sites: Vec<String> = Vec::new();
    let mut cells: BTreeMap<DateTime<Utc>, BTreeMap<usize, Option<f64>>> = BTreeMap::new();

    for record in csv_reader.records() {
        let record = record?;
        let site = record.get(site_idx).unwrap_or("").trim().to_lowercase();
        let raw_date = record.get(date_idx).unwrap_or("").trim();
        let raw_value = record.get(value_idx).unwrap_or("").trim();

        let ts = parse_day_first(raw_date)?;
        let value = if raw_value.is_empty() {
            None
        } else {
            Some(raw_value.parse::<f64>().map_err(|_| CsvError::TypeCoercion {
                column: value_column.clone(),
                value: raw_value.to_string(),
            })?)
        };

        let column = match sites.iter().position(|s| *s == site) {
            Some(idx) => idx,
            None => {
                sites.push(site);
                sites.len() - 1
            },
        };
        cells.entry(ts).or_default().insert(column, value);
    }

    let width = sites.len();
    let mut out = WideTable::new(sites);
    for (ts, row_cells) in cells {
        let mut row = vec![None; width];
        for (column, value) in row_cells {
            row[column] = value;
        }
        out.insert_row(ts, row).expect("row width matches site count");
    }
    Ok(out)
}
