//! Storage seam for funnel records.
//!
//! [`FunnelStore`] is the minimal persistence surface the import and
//! dashboard paths need. Chunking and the per-record fallback live above the
//! trait in [`insert_chunked`], so every backend gets the same
//! partial-failure behavior.

mod memory;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::record::{FilterOptions, FunnelFilters, FunnelRecord};

pub use memory::MemoryFunnelStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The backend was reachable but rejected the operation.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

#[async_trait::async_trait]
pub trait FunnelStore: Send + Sync + 'static {
    /// Insert all records in one atomic operation. Returns the row count.
    async fn insert_records(&self, records: &[FunnelRecord]) -> Result<u64, StoreError>;

    /// Subset of `dates` that already have at least one stored record.
    async fn existing_dates(&self, dates: &[NaiveDate]) -> Result<Vec<NaiveDate>, StoreError>;

    /// Every date with stored records, most recent first.
    async fn known_dates(&self) -> Result<Vec<NaiveDate>, StoreError>;

    /// Delete every record whose date is in `dates`. Returns the row count.
    async fn delete_dates(&self, dates: &[NaiveDate]) -> Result<u64, StoreError>;

    /// Delete every record dated within `[start, end]`. Returns the row count.
    async fn delete_date_range(&self, start: NaiveDate, end: NaiveDate)
        -> Result<u64, StoreError>;

    async fn list_records(&self, filters: &FunnelFilters) -> Result<Vec<FunnelRecord>, StoreError>;

    async fn filter_options(&self) -> Result<FilterOptions, StoreError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Chunked insert
// ---------------------------------------------------------------------------

/// What to do when a whole chunk fails to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertFailurePolicy {
    /// Retry the chunk record by record, skipping and counting failures.
    BestEffort,
    /// Stop at the first failed chunk.
    Abort,
}

/// Upper bound for [`InsertOptions::chunk_size`]. A chunk is one multi-row
/// `INSERT` binding 13 parameters per record, and Postgres accepts at most
/// 65535 bind parameters per statement (13 × 5000 = 65000).
pub const MAX_INSERT_CHUNK_SIZE: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOptions {
    pub chunk_size: usize,
    pub failure_policy: InsertFailurePolicy,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            failure_policy: InsertFailurePolicy::BestEffort,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertReport {
    pub inserted: u64,
    pub failed: u64,
}

/// A chunked insert stopped early under [`InsertFailurePolicy::Abort`].
/// `report` counts what had already been written.
#[derive(Debug, Error)]
#[error("bulk insert aborted after {} records: {source}", report.inserted)]
pub struct InsertAborted {
    pub report: InsertReport,
    #[source]
    pub source: StoreError,
}

/// Insert `records` in chunks of `options.chunk_size`.
///
/// A failed chunk is either retried record by record (best effort) or ends
/// the insert (abort). Best effort never returns `Err`; individual failures
/// are counted in [`InsertReport::failed`].
///
/// # Errors
///
/// Returns [`InsertAborted`] when a chunk fails under the abort policy.
pub async fn insert_chunked<S>(
    store: &S,
    records: &[FunnelRecord],
    options: InsertOptions,
) -> Result<InsertReport, InsertAborted>
where
    S: FunnelStore + ?Sized,
{
    let mut report = InsertReport::default();

    for (index, chunk) in records.chunks(options.chunk_size.max(1)).enumerate() {
        match store.insert_records(chunk).await {
            Ok(count) => report.inserted += count,
            Err(source) => {
                tracing::warn!(
                    chunk = index,
                    size = chunk.len(),
                    error = %source,
                    "bulk insert of chunk failed"
                );
                match options.failure_policy {
                    InsertFailurePolicy::Abort => return Err(InsertAborted { report, source }),
                    InsertFailurePolicy::BestEffort => {
                        for record in chunk {
                            match store.insert_records(std::slice::from_ref(record)).await {
                                Ok(count) => report.inserted += count,
                                Err(error) => {
                                    report.failed += 1;
                                    tracing::debug!(
                                        campaign = %record.campaign,
                                        date = %record.date,
                                        error = %error,
                                        "record skipped after insert failure"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    if report.failed > 0 {
        tracing::warn!(
            inserted = report.inserted,
            failed = report.failed,
            "insert finished with skipped records"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: &str) -> NaiveDate {
        NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()
    }

    fn records(n: usize) -> Vec<FunnelRecord> {
        (0..n)
            .map(|i| FunnelRecord::new(format!("CAMP-{i}"), date("2025-01-15")))
            .collect()
    }

    #[tokio::test]
    async fn inserts_all_chunks() {
        let store = MemoryFunnelStore::new();
        let options = InsertOptions {
            chunk_size: 2,
            failure_policy: InsertFailurePolicy::BestEffort,
        };
        let report = insert_chunked(&store, &records(5), options).await.unwrap();
        assert_eq!(report, InsertReport { inserted: 5, failed: 0 });
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn best_effort_skips_only_bad_records() {
        let store = MemoryFunnelStore::new().reject_campaign("CAMP-3");
        let options = InsertOptions {
            chunk_size: 2,
            failure_policy: InsertFailurePolicy::BestEffort,
        };
        let report = insert_chunked(&store, &records(5), options).await.unwrap();
        assert_eq!(report, InsertReport { inserted: 4, failed: 1 });
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn abort_stops_at_failed_chunk() {
        let store = MemoryFunnelStore::new().reject_campaign("CAMP-3");
        let options = InsertOptions {
            chunk_size: 2,
            failure_policy: InsertFailurePolicy::Abort,
        };
        let err = insert_chunked(&store, &records(5), options).await.unwrap_err();
        assert_eq!(err.report.inserted, 2);
        assert_eq!(store.len(), 2);
    }
}
