//! Table-store client seam
//!
//! The remote store is an external collaborator with a deliberately
//! narrow interface: hand it a prebuilt filter, an optional projection,
//! and an optional row cap, get raw rows back. Connectivity and auth
//! failures surface unmodified as [`StoreError`]; the core never retries.
//!
//! Connection details are explicit configuration
//! ([`crate::config::StoreSettings`]) passed to whichever client
//! implements the trait, never read from the process environment inside
//! core logic.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::query::StoreQuery;
use crate::types::SensorReading;

mod memory;

pub use memory::MemoryStore;

/// Core trait for table-store backends
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Return raw rows matching a prebuilt query against `table`
    async fn query_rows(
        &self,
        table: &str,
        query: &StoreQuery,
    ) -> Result<Vec<SensorReading>, StoreError>;
}
