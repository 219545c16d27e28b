//! In-memory table store
//!
//! Backs tests and fixtures. Honors exactly the filter grammar the query
//! builder emits (identity equality or the `ne '0'` tautology plus
//! partition-key range clauses) along with projection and the row cap.
//! Anything else in a filter is a [`StoreError::Rejected`], which keeps
//! fixture bugs loud.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::query::{StoreQuery, IDENTITY_COLUMN, PARTITION_COLUMN};
use crate::types::SensorReading;

use super::TableStore;

/// An in-memory store over a fixed set of rows, keyed by table name
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Vec<(String, Vec<SensorReading>)>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table of rows, replacing any table with the same name
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<SensorReading>) -> Self {
        let name = name.into();
        self.tables.retain(|(n, _)| *n != name);
        self.tables.push((name, rows));
        self
    }

    fn rows_for(&self, table: &str) -> Result<&[SensorReading], StoreError> {
        self.tables
            .iter()
            .find(|(n, _)| n == table)
            .map(|(_, rows)| rows.as_slice())
            .ok_or_else(|| StoreError::Rejected(format!("no such table: {table}")))
    }
}

/// One parsed `Field op 'value'` clause
struct Clause<'a> {
    field: &'a str,
    op: &'a str,
    value: &'a str,
}

fn parse_clause(raw: &str) -> Result<Clause<'_>, StoreError> {
    let mut parts = raw.splitn(3, ' ');
    let (Some(field), Some(op), Some(quoted)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(StoreError::Rejected(format!("unparseable clause: {raw}")));
    };
    let value = quoted
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .ok_or_else(|| StoreError::Rejected(format!("unquoted value in clause: {raw}")))?;
    Ok(Clause { field, op, value })
}

fn matches(reading: &SensorReading, clause: &Clause<'_>) -> Result<bool, StoreError> {
    let lhs = match clause.field {
        IDENTITY_COLUMN => reading.row_key.as_str(),
        PARTITION_COLUMN => reading.partition_key.as_str(),
        other => {
            return Err(StoreError::Rejected(format!(
                "unsupported filter field: {other}"
            )))
        },
    };
    // Range comparisons are plain string comparisons, exactly like the
    // real store's lexicographic key ordering.
    let ok = match clause.op {
        "eq" => lhs == clause.value,
        "ne" => lhs != clause.value,
        "gt" => lhs > clause.value,
        "lt" => lhs < clause.value,
        other => {
            return Err(StoreError::Rejected(format!(
                "unsupported filter operator: {other}"
            )))
        },
    };
    Ok(ok)
}

fn project(reading: &SensorReading, select: Option<&str>) -> SensorReading {
    let Some(select) = select else {
        return reading.clone();
    };
    let wanted: Vec<&str> = select.split(',').collect();
    SensorReading {
        row_key: reading.row_key.clone(),
        partition_key: reading.partition_key.clone(),
        fields: reading
            .fields
            .iter()
            .filter(|(name, _)| wanted.contains(&name.as_str()))
            .cloned()
            .collect(),
        etag: reading.etag.clone(),
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn query_rows(
        &self,
        table: &str,
        query: &StoreQuery,
    ) -> Result<Vec<SensorReading>, StoreError> {
        let clauses: Vec<Clause<'_>> = query
            .filter
            .split(" and ")
            .map(parse_clause)
            .collect::<Result<_, _>>()?;

        let mut out = Vec::new();
        for reading in self.rows_for(table)? {
            let mut keep = true;
            for clause in &clauses {
                if !matches(reading, clause)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.push(project(reading, query.select.as_deref()));
            }
        }

        // The real store hands rows back in partition-key order.
        out.sort_by(|a, b| {
            a.partition_key
                .cmp(&b.partition_key)
                .then_with(|| a.row_key.cmp(&b.row_key))
        });

        if let Some(limit) = query.limit {
            out.truncate(limit as usize);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::query::QuerySpec;
    use chrono::{TimeZone, Utc};

    fn reading(id: &str, secs: i64, pm25: f64) -> SensorReading {
        let ts = chrono::DateTime::from_timestamp(secs, 0).unwrap();
        SensorReading {
            row_key: id.to_string(),
            partition_key: codec::encode(ts).unwrap(),
            fields: vec![
                ("pm25".to_string(), pm25.to_string()),
                ("humidity".to_string(), "60".to_string()),
            ],
            etag: "etag".to_string(),
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_table(
            "PublicData",
            vec![
                reading("aq-deployment_nesta-7", 2_000, 9.0),
                reading("aq-deployment_nesta-7", 1_000, 8.0),
                reading("aq-deployment_nesta-4", 1_500, 7.0),
            ],
        )
    }

    #[tokio::test]
    async fn identity_filter_selects_one_sensor() {
        let query = QuerySpec::for_sensor("aq-deployment_nesta-7").build().unwrap();
        let rows = store().query_rows("PublicData", &query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.row_key == "aq-deployment_nesta-7"));
        // Partition-key order.
        assert!(rows[0].partition_key < rows[1].partition_key);
    }

    #[tokio::test]
    async fn tautology_returns_everything() {
        let query = QuerySpec::all_sensors().build().unwrap();
        let rows = store().query_rows("PublicData", &query).await.unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn range_bounds_are_strict() {
        let from = Utc.timestamp_opt(1_000, 0).unwrap();
        let to = Utc.timestamp_opt(2_000, 0).unwrap();
        let query = QuerySpec::all_sensors().from(from).to(to).build().unwrap();
        let rows = store().query_rows("PublicData", &query).await.unwrap();
        // Both boundary readings are excluded by the strict comparisons.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_key, "aq-deployment_nesta-4");
    }

    #[tokio::test]
    async fn projection_drops_unselected_fields() {
        let query = QuerySpec::for_sensor("aq-deployment_nesta-7")
            .columns(["pm25"])
            .build()
            .unwrap();
        let rows = store().query_rows("PublicData", &query).await.unwrap();
        for row in &rows {
            assert_eq!(row.fields.len(), 1);
            assert_eq!(row.fields[0].0, "pm25");
        }
    }

    #[tokio::test]
    async fn row_cap_truncates() {
        let query = QuerySpec::all_sensors().max_rows(2).build().unwrap();
        let rows = store().query_rows("PublicData", &query).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn unknown_table_is_rejected() {
        let query = QuerySpec::all_sensors().build().unwrap();
        let err = store().query_rows("Elsewhere", &query).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn foreign_filter_grammar_is_rejected() {
        let query = StoreQuery {
            filter: "Timestamp ge datetime'2019-01-01'".to_string(),
            select: None,
            limit: None,
        };
        let err = store().query_rows("PublicData", &query).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[test]
    fn clause_parser_requires_quotes() {
        assert!(parse_clause("RowKey eq 'x'").is_ok());
        assert!(parse_clause("RowKey eq x").is_err());
        assert!(parse_clause("RowKey").is_err());
    }

    #[test]
    fn with_table_replaces_existing() {
        let store = MemoryStore::new()
            .with_table("T", vec![reading("a", 1_000, 1.0)])
            .with_table("T", vec![]);
        assert!(store.rows_for("T").unwrap().is_empty());
    }
}
