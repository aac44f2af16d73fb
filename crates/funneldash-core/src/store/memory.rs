use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::{FunnelStore, StoreError};
use crate::record::{FilterOptions, FunnelFilters, FunnelRecord};

/// In-process [`FunnelStore`] used by tests and local demos.
///
/// Supports simple fault injection: rejecting inserts that contain given
/// campaigns, and taking the whole store offline.
#[derive(Debug, Default)]
pub struct MemoryFunnelStore {
    records: Mutex<Vec<FunnelRecord>>,
    rejected_campaigns: HashSet<String>,
    offline: AtomicBool,
}

impl MemoryFunnelStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(records: Vec<FunnelRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Fail any insert call that contains a record for `campaign`.
    #[must_use]
    pub fn reject_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.rejected_campaigns.insert(campaign.into());
        self
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |records| records.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored record, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FunnelRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Vec<FunnelRecord>>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl FunnelStore for MemoryFunnelStore {
    async fn insert_records(&self, records: &[FunnelRecord]) -> Result<u64, StoreError> {
        let mut stored = self.guard()?;
        if let Some(bad) = records
            .iter()
            .find(|r| self.rejected_campaigns.contains(&r.campaign))
        {
            return Err(StoreError::Operation(format!(
                "insert rejected for campaign {}",
                bad.campaign
            )));
        }
        stored.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn existing_dates(&self, dates: &[NaiveDate]) -> Result<Vec<NaiveDate>, StoreError> {
        let stored = self.guard()?;
        let wanted: BTreeSet<NaiveDate> = dates.iter().copied().collect();
        let found: BTreeSet<NaiveDate> = stored
            .iter()
            .map(|r| r.date)
            .filter(|d| wanted.contains(d))
            .collect();
        Ok(found.into_iter().collect())
    }

    async fn known_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let stored = self.guard()?;
        let dates: BTreeSet<NaiveDate> = stored.iter().map(|r| r.date).collect();
        Ok(dates.into_iter().rev().collect())
    }

    async fn delete_dates(&self, dates: &[NaiveDate]) -> Result<u64, StoreError> {
        let mut stored = self.guard()?;
        let doomed: HashSet<NaiveDate> = dates.iter().copied().collect();
        let before = stored.len();
        stored.retain(|r| !doomed.contains(&r.date));
        Ok((before - stored.len()) as u64)
    }

    async fn delete_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64, StoreError> {
        let mut stored = self.guard()?;
        let before = stored.len();
        stored.retain(|r| r.date < start || r.date > end);
        Ok((before - stored.len()) as u64)
    }

    async fn list_records(&self, filters: &FunnelFilters) -> Result<Vec<FunnelRecord>, StoreError> {
        let stored = self.guard()?;
        Ok(stored.iter().filter(|r| filters.matches(r)).cloned().collect())
    }

    async fn filter_options(&self) -> Result<FilterOptions, StoreError> {
        let stored = self.guard()?;
        Ok(FilterOptions::from_records(&stored))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.guard().map(|_| ())
    }
}
