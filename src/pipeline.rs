//! Pipeline orchestration
//!
//! Ties the stages together for a configured fleet of sensors:
//!
//! ```text
//! build query -> store -> normalize -> resample (base grid)   per sensor
//!          \-> cache consult/fill
//! combine (outer join) -> corrections -> hourly/daily rollups
//! ```
//!
//! Per-sensor fetches are independent and the combination step is
//! commutative and associative in sensor order, so the sequential loop
//! here is a choice of simplicity, not a requirement.
//!
//! The secondary CSV deployment flows through the same combination path
//! via [`Pipeline::combine_secondary`], so both sources get identical
//! corrections and rollups.

use std::io::Read;

use tracing::{debug, info};

use crate::cache::{CacheStatsSnapshot, QueryCache};
use crate::config::Config;
use crate::csvsource::load_secondary_csv;
use crate::error::Result;
use crate::normalize::normalize;
use crate::query::QuerySpec;
use crate::reconcile::apply_corrections;
use crate::resample::{resample_sensor, resample_wide};
use crate::series::{SensorTable, WideTable};
use crate::store::TableStore;
use crate::types::Resolution;

/// The combined fleet table with its standard rollups
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSeries {
    /// Fleet table on the base grid, corrections applied
    pub base: WideTable,
    /// Hourly mean rollup of `base`
    pub hourly: WideTable,
    /// Daily mean rollup of `base`
    pub daily: WideTable,
}

/// Orchestrates fetching, alignment, and reconciliation over a store
pub struct Pipeline<S> {
    store: S,
    config: Config,
    cache: QueryCache,
}

impl<S: TableStore> Pipeline<S> {
    /// Pipeline over `store` configured by `config`
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store,
            config,
            cache: QueryCache::default(),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cache counters
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    /// Fetch one logical query: the cache first, else store, normalize,
    /// and resample onto the base grid
    pub async fn fetch(&self, spec: &QuerySpec) -> Result<SensorTable> {
        if let Some(hit) = self.cache.get(spec) {
            debug!(sensor = ?spec.sensor_id, "serving table from cache");
            return Ok(hit);
        }

        let query = spec.build()?;
        let rows = self
            .store
            .query_rows(&self.config.store.table_name, &query)
            .await?;
        info!(
            sensor = ?spec.sensor_id,
            rows = rows.len(),
            "fetched rows from store"
        );

        let table = normalize(&rows)?;
        let table = resample_sensor(&table, self.config.resample.base);
        self.cache.insert(spec.clone(), table.clone());
        Ok(table)
    }

    /// Fetch one sensor by short id, projected to a single field and
    /// labeled with the short id
    ///
    /// The stored identity is the configured deployment prefix plus the
    /// short id; the query starts at the fleet's deployment date. When
    /// the result has exactly one data column it is renamed to the short
    /// id, ready for combination.
    pub async fn fetch_sensor(&self, short_id: &str, field: &str) -> Result<SensorTable> {
        let spec = QuerySpec::for_sensor(self.config.stored_identity(short_id))
            .from(self.config.fleet.deployed_since)
            .columns([field]);

        let mut table = self.fetch(&spec).await?;
        if table.columns().len() == 1 {
            table.rename_single_column(short_id)?;
        }
        Ok(table)
    }

    /// Fetch the whole fleet for one field and produce the combined
    /// table with corrections applied, plus hourly and daily rollups
    pub async fn fetch_combined(&self, field: &str) -> Result<CombinedSeries> {
        let mut tables = Vec::with_capacity(self.config.fleet.sensors.len());
        for short_id in &self.config.fleet.sensors {
            tables.push(self.fetch_sensor(short_id, field).await?);
        }

        let wide = WideTable::combine(&tables)?;
        self.finish(wide)
    }

    /// Run the secondary CSV deployment through the same corrections and
    /// rollups as the primary source
    pub fn combine_secondary<R: Read>(&self, reader: R, field: &str) -> Result<CombinedSeries> {
        let wide = load_secondary_csv(reader, field)?;
        self.finish(wide)
    }

    fn finish(&self, wide: WideTable) -> Result<CombinedSeries> {
        let base = apply_corrections(&wide, &self.config.corrections)?;
        let hourly = resample_wide(&base, Resolution::Hours(1));
        let daily = resample_wide(&base, Resolution::Days(1));
        info!(
            columns = base.columns().len(),
            rows = base.len(),
            "combined fleet table ready"
        );
        Ok(CombinedSeries { base, hourly, daily })
    }
}
