//! Database operations for the `funnel_data` table.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use funneldash_core::{FilterOptions, FunnelFilters, FunnelRecord};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `funnel_data` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FunnelDataRow {
    pub id: i64,
    pub campaign: String,
    pub manager: Option<String>,
    pub channel: Option<String>,
    pub niche: Option<String>,
    pub advertiser: Option<String>,
    pub variant: Option<String>,
    pub product: Option<String>,
    pub record_date: NaiveDate,
    pub cost: Decimal,
    pub profit: Decimal,
    pub roi: Decimal,
    /// `CHECK (purchases >= 0)` in the schema.
    pub purchases: i32,
    pub initiate_checkout_cpa: Decimal,
    pub created_at: DateTime<Utc>,
}

impl FunnelDataRow {
    #[must_use]
    pub fn into_record(self) -> FunnelRecord {
        FunnelRecord {
            campaign: self.campaign,
            manager: self.manager,
            channel: self.channel,
            niche: self.niche,
            advertiser: self.advertiser,
            variant: self.variant,
            product: self.product,
            date: self.record_date,
            cost: self.cost,
            profit: self.profit,
            roi: self.roi,
            purchases: u32::try_from(self.purchases).unwrap_or(0),
            initiate_checkout_cpa: self.initiate_checkout_cpa,
        }
    }
}

const SELECT_COLUMNS: &str = "id, campaign, manager, channel, niche, advertiser, variant, \
     product, record_date, cost, profit, roi, purchases, initiate_checkout_cpa, created_at";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Bind parameters per record in [`insert_records`].
pub const INSERT_COLUMNS: usize = 13;

/// Postgres limit on bind parameters in one statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Inserts every record in a single multi-row `INSERT`, so the batch is
/// committed or rejected as a whole.
///
/// Each record binds [`INSERT_COLUMNS`] parameters, so callers keep batches
/// under `65535 / INSERT_COLUMNS` rows; the configured chunk size is capped
/// at [`funneldash_core::MAX_INSERT_CHUNK_SIZE`] for this reason.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_records(pool: &PgPool, records: &[FunnelRecord]) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO funnel_data \
             (campaign, manager, channel, niche, advertiser, variant, product, \
              record_date, cost, profit, roi, purchases, initiate_checkout_cpa) ",
    );
    builder.push_values(records, |mut row, record| {
        row.push_bind(&record.campaign)
            .push_bind(&record.manager)
            .push_bind(&record.channel)
            .push_bind(&record.niche)
            .push_bind(&record.advertiser)
            .push_bind(&record.variant)
            .push_bind(&record.product)
            .push_bind(record.date)
            .push_bind(record.cost)
            .push_bind(record.profit)
            .push_bind(record.roi)
            .push_bind(i32::try_from(record.purchases).unwrap_or(i32::MAX))
            .push_bind(record.initiate_checkout_cpa);
    });

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Deletes every record whose date is in `dates`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_dates(pool: &PgPool, dates: &[NaiveDate]) -> Result<u64, DbError> {
    if dates.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM funnel_data WHERE record_date = ANY($1)")
        .bind(dates)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Deletes every record dated within `[start, end]`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_date_range(
    pool: &PgPool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<u64, DbError> {
    let result =
        sqlx::query("DELETE FROM funnel_data WHERE record_date >= $1 AND record_date <= $2")
            .bind(start)
            .bind(end)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns the subset of `dates` that already have stored records, ascending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn existing_dates(pool: &PgPool, dates: &[NaiveDate]) -> Result<Vec<NaiveDate>, DbError> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT DISTINCT record_date FROM funnel_data \
         WHERE record_date = ANY($1) \
         ORDER BY record_date",
    )
    .bind(dates)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns every date with stored records, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn known_dates(pool: &PgPool) -> Result<Vec<NaiveDate>, DbError> {
    let rows = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT DISTINCT record_date FROM funnel_data ORDER BY record_date DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns records matching `filters`, ordered by date then insertion order.
///
/// Each filter is optional; a `NULL` bind disables it. Date bounds are
/// inclusive.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_records(
    pool: &PgPool,
    filters: &FunnelFilters,
) -> Result<Vec<FunnelRecord>, DbError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM funnel_data \
         WHERE ($1::TEXT IS NULL OR manager = $1) \
           AND ($2::TEXT IS NULL OR channel = $2) \
           AND ($3::TEXT IS NULL OR niche = $3) \
           AND ($4::TEXT IS NULL OR advertiser = $4) \
           AND ($5::TEXT IS NULL OR variant = $5) \
           AND ($6::TEXT IS NULL OR product = $6) \
           AND ($7::DATE IS NULL OR record_date >= $7) \
           AND ($8::DATE IS NULL OR record_date <= $8) \
         ORDER BY record_date, id"
    );
    let rows = sqlx::query_as::<_, FunnelDataRow>(&sql)
        .bind(&filters.manager)
        .bind(&filters.channel)
        .bind(&filters.niche)
        .bind(&filters.advertiser)
        .bind(&filters.variant)
        .bind(&filters.product)
        .bind(filters.start_date)
        .bind(filters.end_date)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(FunnelDataRow::into_record).collect())
}

async fn distinct_values(pool: &PgPool, column: &'static str) -> Result<Vec<String>, DbError> {
    let sql = format!(
        "SELECT DISTINCT {column} FROM funnel_data \
         WHERE {column} IS NOT NULL AND {column} <> '' \
         ORDER BY {column}"
    );
    let rows = sqlx::query_scalar::<_, String>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Returns the distinct non-empty values of every categorical column.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn filter_options(pool: &PgPool) -> Result<FilterOptions, DbError> {
    Ok(FilterOptions {
        managers: distinct_values(pool, "manager").await?,
        channels: distinct_values(pool, "channel").await?,
        niches: distinct_values(pool, "niche").await?,
        advertisers: distinct_values(pool, "advertiser").await?,
        variants: distinct_values(pool, "variant").await?,
        products: distinct_values(pool, "product").await?,
    })
}
