//! [`FunnelStore`] backed by Postgres.

use chrono::NaiveDate;
use sqlx::PgPool;

use funneldash_core::{FilterOptions, FunnelFilters, FunnelRecord, FunnelStore, StoreError};

use crate::{funnel_data, DbError};

#[derive(Debug, Clone)]
pub struct PgFunnelStore {
    pool: PgPool,
}

impl PgFunnelStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        if err.is_unavailable() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Operation(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl FunnelStore for PgFunnelStore {
    async fn insert_records(&self, records: &[FunnelRecord]) -> Result<u64, StoreError> {
        Ok(funnel_data::insert_records(&self.pool, records).await?)
    }

    async fn existing_dates(&self, dates: &[NaiveDate]) -> Result<Vec<NaiveDate>, StoreError> {
        Ok(funnel_data::existing_dates(&self.pool, dates).await?)
    }

    async fn known_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        Ok(funnel_data::known_dates(&self.pool).await?)
    }

    async fn delete_dates(&self, dates: &[NaiveDate]) -> Result<u64, StoreError> {
        Ok(funnel_data::delete_dates(&self.pool, dates).await?)
    }

    async fn delete_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64, StoreError> {
        Ok(funnel_data::delete_date_range(&self.pool, start, end).await?)
    }

    async fn list_records(&self, filters: &FunnelFilters) -> Result<Vec<FunnelRecord>, StoreError> {
        Ok(funnel_data::list_records(&self.pool, filters).await?)
    }

    async fn filter_options(&self) -> Result<FilterOptions, StoreError> {
        Ok(funnel_data::filter_options(&self.pool).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::ping(&self.pool)
            .await
            .map_err(|e| StoreError::from(DbError::from(e)))
    }
}
