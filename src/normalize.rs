//! Result normalization
//!
//! Turns the raw rows a store query returns into a [`SensorTable`]:
//! partition keys become the timestamp index, the row-versioning field is
//! dropped, the identity column is renamed to `sensor_id`, and every
//! remaining field is coerced to a float.
//!
//! An empty result set is a hard failure, not an empty table. In this
//! dataset a sensor that returns nothing has always meant the query was
//! wrong (a misspelled identity or the wrong table) and an empty table
//! flowing onward would silently corrupt downstream aggregates.

use std::collections::HashMap;

use crate::error::NormalizeError;
use crate::series::SensorTable;
use crate::types::SensorReading;
use crate::codec;

/// Normalize raw store rows into a timestamp-indexed table
///
/// The column set is the union of field names across all rows, in
/// first-observed order; rows missing a field get `None` in that cell.
/// Duplicate timestamps keep the last row (the store's key uniqueness
/// makes this unreachable with real data).
///
/// Fails with [`NormalizeError::EmptyResult`] when `rows` is empty and
/// [`NormalizeError::TypeCoercion`] on the first non-numeric field value.
pub fn normalize(rows: &[SensorReading]) -> Result<SensorTable, NormalizeError> {
    if rows.is_empty() {
        return Err(NormalizeError::EmptyResult);
    }

    // Union of field names, first-observed order.
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for reading in rows {
        for (name, _) in &reading.fields {
            if !positions.contains_key(name.as_str()) {
                positions.insert(name.as_str(), columns.len());
                columns.push(name.clone());
            }
        }
    }

    let width = columns.len();
    let mut table = SensorTable::new(columns);

    for reading in rows {
        let ts = codec::decode(&reading.partition_key)?;

        let mut values: Vec<Option<f64>> = vec![None; width];
        for (name, raw) in &reading.fields {
            let idx = positions[name.as_str()];
            let parsed: f64 = raw.trim().parse().map_err(|_| NormalizeError::TypeCoercion {
                column: name.clone(),
                value: raw.clone(),
            })?;
            values[idx] = Some(parsed);
        }

        // The etag never leaves this function; only the identity and the
        // decoded timestamp survive alongside the numeric fields.
        table
            .insert_row(ts, Some(reading.row_key.clone()), values)
            .expect("row width matches column union");
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PartitionKey;
    use chrono::{DateTime, Utc};

    fn reading(id: &str, key: &str, fields: &[(&str, &str)]) -> SensorReading {
        SensorReading {
            row_key: id.to_string(),
            partition_key: PartitionKey::from(key),
            fields: fields
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            etag: "W/\"datetime'2019-05-22'\"".to_string(),
        }
    }

    #[test]
    fn empty_result_is_fatal() {
        assert!(matches!(normalize(&[]), Err(NormalizeError::EmptyResult)));
    }

    #[test]
    fn single_row_round_trip() {
        let ts = Utc::now();
        let key = codec::encode(ts).unwrap();
        let rows = vec![SensorReading {
            row_key: "s1".to_string(),
            partition_key: key.clone(),
            fields: vec![("pm25".to_string(), "12.3".to_string())],
            etag: "x".to_string(),
        }];

        let table = normalize(&rows).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns(), ["pm25".to_string()]);

        let decoded = codec::decode(&key).unwrap();
        assert_eq!(table.value(decoded, "pm25"), Some(12.3));
        assert_eq!(table.sensor_id_at(decoded), Some("s1"));
    }

    #[test]
    fn index_is_decoded_and_sorted() {
        let rows = vec![
            reading("s1", "1558530020000", &[("pm25", "2.0")]),
            reading("s1", "1558530010000", &[("pm25", "1.0")]),
        ];
        let table = normalize(&rows).unwrap();
        let index: Vec<DateTime<Utc>> = table.timestamps().copied().collect();
        assert_eq!(index[0], DateTime::from_timestamp(1_558_530_010, 0).unwrap());
        assert_eq!(index[1], DateTime::from_timestamp(1_558_530_020, 0).unwrap());
    }

    #[test]
    fn sparse_rows_union_columns() {
        let rows = vec![
            reading("s1", "1558530010000", &[("pm25", "1.0")]),
            reading("s1", "1558530020000", &[("pm25", "2.0"), ("humidity", "60")]),
        ];
        let table = normalize(&rows).unwrap();
        assert_eq!(
            table.columns(),
            ["pm25".to_string(), "humidity".to_string()]
        );

        let first = DateTime::from_timestamp(1_558_530_010, 0).unwrap();
        assert_eq!(table.value(first, "pm25"), Some(1.0));
        assert_eq!(table.value(first, "humidity"), None);
    }

    #[test]
    fn non_numeric_value_names_column_and_value() {
        let rows = vec![reading("s1", "1558530010000", &[("pm25", "offline")])];
        match normalize(&rows) {
            Err(NormalizeError::TypeCoercion { column, value }) => {
                assert_eq!(column, "pm25");
                assert_eq!(value, "offline");
            },
            other => panic!("expected TypeCoercion, got {other:?}"),
        }
    }

    #[test]
    fn malformed_key_surfaces_as_codec_error() {
        let rows = vec![reading("s1", "abc", &[("pm25", "1.0")])];
        assert!(matches!(
            normalize(&rows),
            Err(NormalizeError::Codec(_))
        ));
    }
}
