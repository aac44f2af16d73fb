//! Conversion of RedTrack report rows into canonical funnel records.
//!
//! Two row layouts exist. The current one (`v2`) reads every identity
//! field from the campaign name. The legacy layout (`v1`) reads the funnel
//! dimensions from the `sub1..sub5` columns, falling back to the campaign
//! name for the manager. Both keep only rows whose manager token is
//! allow-listed and whose cost is positive.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use funneldash_core::money;
use funneldash_core::{CampaignDelimiter, FunnelRecord, SchemaVersion};
use funneldash_ingest::coerce::parse_date;
use funneldash_ingest::FieldExtractor;

use crate::types::ReportRow;

/// Records approved from one report, with row accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedReport {
    pub records: Vec<FunnelRecord>,
    pub accepted: usize,
    pub rejected: usize,
}

impl NormalizedReport {
    pub fn extend(&mut self, other: NormalizedReport) {
        self.records.extend(other.records);
        self.accepted += other.accepted;
        self.rejected += other.rejected;
    }
}

#[derive(Debug, Clone)]
pub struct ReportNormalizer {
    extractor: Arc<FieldExtractor>,
    schema: SchemaVersion,
    delimiter: CampaignDelimiter,
}

impl ReportNormalizer {
    #[must_use]
    pub fn new(
        extractor: Arc<FieldExtractor>,
        schema: SchemaVersion,
        delimiter: CampaignDelimiter,
    ) -> Self {
        Self {
            extractor,
            schema,
            delimiter,
        }
    }

    /// Normalize `rows`. `day` is the date the report was fetched for; when
    /// `None` (ranged fetch) each row's own `date` column is used and rows
    /// without one are rejected.
    #[must_use]
    pub fn normalize(&self, rows: &[ReportRow], day: Option<NaiveDate>) -> NormalizedReport {
        let mut report = NormalizedReport::default();
        for row in rows {
            match self.normalize_row(row, day) {
                Some(record) => {
                    report.accepted += 1;
                    report.records.push(record);
                }
                None => report.rejected += 1,
            }
        }
        report
    }

    fn normalize_row(&self, row: &ReportRow, day: Option<NaiveDate>) -> Option<FunnelRecord> {
        let Some(date) = day.or_else(|| row.date.as_deref().and_then(parse_date)) else {
            tracing::debug!(campaign = %row.campaign, "rejected: row has no date");
            return None;
        };

        let fields = self.extractor.positional(&row.campaign, self.delimiter);
        let token = match self.schema {
            SchemaVersion::V2 => fields.manager.clone(),
            SchemaVersion::V1 => row.sub1.clone().or_else(|| fields.manager.clone()),
        }
        .unwrap_or_default();

        if !self.extractor.taxonomy().is_redtrack_manager_allowed(&token) {
            tracing::debug!(token = %token, cost = %row.cost, "rejected: manager not allowed");
            return None;
        }
        if row.cost <= Decimal::ZERO {
            tracing::debug!(token = %token, cost = %row.cost, "rejected: no spend");
            return None;
        }
        tracing::debug!(token = %token, cost = %row.cost, "approved");

        let mut record = self.base_record(row, date);
        record.manager = Some(self.extractor.manager_display(&token));
        record.product = fields.product;
        match self.schema {
            SchemaVersion::V2 => {
                record.niche = fields.niche;
                record.channel = fields.site;
            }
            SchemaVersion::V1 => {
                record.channel.clone_from(&row.sub2);
                record.niche.clone_from(&row.sub3);
                record.advertiser.clone_from(&row.sub4);
                record.variant.clone_from(&row.sub5);
                record.purchases = row.conversions;
                record.initiate_checkout_cpa = money::money(row.cpa);
            }
        }
        Some(record)
    }

    fn base_record(&self, row: &ReportRow, date: NaiveDate) -> FunnelRecord {
        let mut record = FunnelRecord::new(row.campaign.clone(), date);
        record.cost = money::money(row.cost);
        record.profit = money::money(row.profit);
        record.roi = money::roi(record.profit, record.cost);
        record
    }
}
