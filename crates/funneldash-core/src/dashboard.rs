//! Read path for the presentation layer.
//!
//! Every method degrades to an empty default when storage fails, logging the
//! failure at `warn`, so a storage outage renders as "no data" rather than an
//! error page.

use chrono::NaiveDate;

use crate::aggregate::{self, DailyTotal, FunnelMatrix, GroupedRow, Totals};
use crate::record::{FilterOptions, FunnelFilters, FunnelRecord, SchemaVersion};
use crate::store::FunnelStore;

pub struct Dashboard<'a, S: FunnelStore + ?Sized> {
    store: &'a S,
    schema: SchemaVersion,
}

impl<'a, S: FunnelStore + ?Sized> Dashboard<'a, S> {
    pub fn new(store: &'a S, schema: SchemaVersion) -> Self {
        Self { store, schema }
    }

    async fn records(&self, filters: &FunnelFilters) -> Vec<FunnelRecord> {
        match self.store.list_records(filters).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "listing records failed; returning empty set");
                Vec::new()
            }
        }
    }

    pub async fn grouped_rows(&self, filters: &FunnelFilters) -> Vec<GroupedRow> {
        let records = self.records(filters).await;
        aggregate::group_rows(&records, self.schema.identity_fields())
    }

    pub async fn matrix(&self, filters: &FunnelFilters) -> FunnelMatrix {
        aggregate::pivot(&self.grouped_rows(filters).await)
    }

    pub async fn totals(&self, filters: &FunnelFilters) -> Totals {
        aggregate::totals(&self.records(filters).await)
    }

    pub async fn daily_totals(&self, filters: &FunnelFilters) -> Vec<DailyTotal> {
        aggregate::daily_totals(&self.records(filters).await)
    }

    pub async fn filter_options(&self) -> FilterOptions {
        match self.store.filter_options().await {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!(error = %e, "loading filter options failed");
                FilterOptions::default()
            }
        }
    }

    /// Dates with stored data, most recent first.
    pub async fn known_dates(&self) -> Vec<NaiveDate> {
        match self.store.known_dates().await {
            Ok(dates) => dates,
            Err(e) => {
                tracing::warn!(error = %e, "loading known dates failed");
                Vec::new()
            }
        }
    }

    /// Which of `dates` already have stored data, ascending.
    pub async fn check_dates(&self, dates: &[NaiveDate]) -> Vec<NaiveDate> {
        match self.store.existing_dates(dates).await {
            Ok(mut existing) => {
                existing.sort_unstable();
                existing.dedup();
                existing
            }
            Err(e) => {
                tracing::warn!(error = %e, "checking dates failed");
                Vec::new()
            }
        }
    }
}
