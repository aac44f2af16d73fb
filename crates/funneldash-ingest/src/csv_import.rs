//! CSV record parser.
//!
//! Expected header (case and whitespace insensitive):
//! `Campaign, Prelanding, Landing, Date, Cost, Profit, Total ROI, Purchase, InitiateCheckout CPA`.
//! Quoting follows RFC 4180 (embedded commas, `""` escapes, quoted newlines).

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use funneldash_core::money;
use funneldash_core::{FunnelRecord, ImportBatch};

use crate::coerce::{parse_amount, parse_count, parse_date};
use crate::error::CsvImportError;
use crate::extract::FieldExtractor;

/// Where a record's `roi` comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoiPolicy {
    /// `profit / cost`, zero when cost is zero.
    #[default]
    Computed,
    /// The `Total ROI` column, read as a percentage (`25%` → `0.2500`).
    Reported,
}

impl std::str::FromStr for RoiPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "computed" => Ok(RoiPolicy::Computed),
            "reported" => Ok(RoiPolicy::Reported),
            other => Err(format!("expected computed or reported; got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Campaign,
    Prelanding,
    Landing,
    Date,
    Cost,
    Profit,
    Roi,
    Purchases,
    InitiateCheckoutCpa,
}

fn column_for(header: &str) -> Option<Column> {
    let key: String = header
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    match key.as_str() {
        "campaign" => Some(Column::Campaign),
        "prelanding" => Some(Column::Prelanding),
        "landing" => Some(Column::Landing),
        "date" => Some(Column::Date),
        "cost" => Some(Column::Cost),
        "profit" => Some(Column::Profit),
        "totalroi" | "roi" => Some(Column::Roi),
        "purchase" | "purchases" => Some(Column::Purchases),
        "initiatecheckoutcpa" => Some(Column::InitiateCheckoutCpa),
        _ => None,
    }
}

fn cell<'r>(
    row: &'r csv::StringRecord,
    columns: &HashMap<Column, usize>,
    column: Column,
) -> &'r str {
    columns
        .get(&column)
        .and_then(|&index| row.get(index))
        .unwrap_or_default()
}

/// Parsed records plus row accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub records: Vec<FunnelRecord>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

impl ParsedCsv {
    #[must_use]
    pub fn into_batch(self) -> ImportBatch {
        ImportBatch {
            records: self.records,
            rows_skipped: self.rows_skipped,
        }
    }
}

pub struct CsvParser<'a> {
    extractor: &'a FieldExtractor,
    roi_policy: RoiPolicy,
}

impl<'a> CsvParser<'a> {
    #[must_use]
    pub fn new(extractor: &'a FieldExtractor) -> Self {
        Self {
            extractor,
            roi_policy: RoiPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_roi_policy(mut self, roi_policy: RoiPolicy) -> Self {
        self.roi_policy = roi_policy;
        self
    }

    /// Parse CSV text into canonical records.
    ///
    /// Rows shorter than the header, or whose date cannot be parsed, are
    /// skipped and counted. Unparseable numbers default to zero.
    ///
    /// # Errors
    ///
    /// - [`CsvImportError::Empty`] for blank input.
    /// - [`CsvImportError::NoValidRecords`] when no row survives, including
    ///   header-only input.
    /// - [`CsvImportError::Malformed`] when the reader fails.
    pub fn parse(&self, content: &str) -> Result<ParsedCsv, CsvImportError> {
        if content.trim().is_empty() {
            return Err(CsvImportError::Empty);
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader.headers()?.clone();
        let width = headers.len();
        let columns: HashMap<Column, usize> = headers
            .iter()
            .enumerate()
            .filter_map(|(index, header)| column_for(header).map(|column| (column, index)))
            .collect();

        let mut records = Vec::new();
        let mut rows_read = 0usize;
        let mut rows_skipped = 0usize;

        for row in reader.records() {
            let row = row?;
            rows_read += 1;

            if row.len() < width {
                rows_skipped += 1;
                continue;
            }

            let Some(date) = parse_date(cell(&row, &columns, Column::Date)) else {
                rows_skipped += 1;
                continue;
            };

            records.push(self.build_record(&row, &columns, date));
        }

        if records.is_empty() {
            tracing::info!(rows_read, "CSV contained no valid records");
            return Err(CsvImportError::NoValidRecords { rows_read });
        }

        tracing::debug!(
            rows_read,
            rows_skipped,
            records = records.len(),
            "CSV parsed"
        );
        Ok(ParsedCsv {
            records,
            rows_read,
            rows_skipped,
        })
    }

    fn build_record(
        &self,
        row: &csv::StringRecord,
        columns: &HashMap<Column, usize>,
        date: NaiveDate,
    ) -> FunnelRecord {
        let campaign = cell(row, columns, Column::Campaign);
        let prelanding = cell(row, columns, Column::Prelanding);
        let landing = cell(row, columns, Column::Landing);
        let landing_fields = self.extractor.landing(landing);

        let mut record = FunnelRecord::new(campaign, date);
        record.manager = self.extractor.manager(campaign);
        record.channel = self.extractor.channel(campaign);
        record.advertiser = self.extractor.advertiser(prelanding);
        record.variant = landing_fields.variant;
        record.product = landing_fields.product;
        record.niche = landing_fields.niche;

        record.cost = money::money(parse_amount(cell(row, columns, Column::Cost)));
        record.profit = money::money(parse_amount(cell(row, columns, Column::Profit)));
        record.roi = match self.roi_policy {
            RoiPolicy::Computed => money::roi(record.profit, record.cost),
            RoiPolicy::Reported => {
                let percent = parse_amount(cell(row, columns, Column::Roi));
                money::ratio(percent / Decimal::ONE_HUNDRED)
            }
        };
        record.purchases = parse_count(cell(row, columns, Column::Purchases));
        record.initiate_checkout_cpa =
            money::money(parse_amount(cell(row, columns, Column::InitiateCheckoutCpa)));
        record
    }
}

#[cfg(test)]
#[path = "csv_import_test.rs"]
mod tests;
