//! RedTrack `/report` response types.
//!
//! RedTrack returns either a bare JSON array of rows or an object with an
//! `items` array. Rows are read permissively: every field is optional, and a
//! field with an unexpected type falls back to its default instead of
//! rejecting the row.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use funneldash_ingest::coerce::{parse_amount, parse_count};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ReportEnvelope {
    Rows(Vec<Value>),
    Items {
        #[serde(default)]
        items: Vec<Value>,
    },
}

impl ReportEnvelope {
    pub(crate) fn into_rows(self) -> Vec<ReportRow> {
        let values = match self {
            ReportEnvelope::Rows(values) | ReportEnvelope::Items { items: values } => values,
        };
        values.iter().map(ReportRow::from_value).collect()
    }
}

/// One row of a RedTrack report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRow {
    pub campaign: String,
    /// Present when the report is grouped by date.
    pub date: Option<String>,
    pub sub1: Option<String>,
    pub sub2: Option<String>,
    pub sub3: Option<String>,
    pub sub4: Option<String>,
    pub sub5: Option<String>,
    pub cost: Decimal,
    pub profit: Decimal,
    pub roi: Decimal,
    pub conversions: u32,
    pub cpa: Decimal,
}

fn text(row: &Value, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decimal(row: &Value, key: &str) -> Decimal {
    match row.get(key) {
        Some(Value::Number(n)) => parse_amount(&n.to_string()),
        Some(Value::String(s)) => parse_amount(s),
        _ => Decimal::ZERO,
    }
}

fn count(row: &Value, key: &str) -> u32 {
    match row.get(key) {
        Some(Value::Number(n)) => parse_count(&n.to_string()),
        Some(Value::String(s)) => parse_count(s),
        _ => 0,
    }
}

impl ReportRow {
    /// Build a row from arbitrary JSON. Non-object values yield an empty row.
    #[must_use]
    pub fn from_value(row: &Value) -> Self {
        Self {
            campaign: text(row, "campaign").unwrap_or_default(),
            date: text(row, "date"),
            sub1: text(row, "sub1"),
            sub2: text(row, "sub2"),
            sub3: text(row, "sub3"),
            sub4: text(row, "sub4"),
            sub5: text(row, "sub5"),
            cost: decimal(row, "cost"),
            profit: decimal(row, "profit"),
            roi: decimal(row, "roi"),
            conversions: count(row, "conversions"),
            cpa: decimal(row, "cpa"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    #[test]
    fn bare_array_and_items_object_are_both_accepted() {
        let bare: ReportEnvelope = serde_json::from_value(json!([{ "campaign": "A" }])).unwrap();
        assert_eq!(bare.into_rows()[0].campaign, "A");

        let wrapped: ReportEnvelope =
            serde_json::from_value(json!({ "items": [{ "campaign": "B" }], "total": {} }))
                .unwrap();
        assert_eq!(wrapped.into_rows()[0].campaign, "B");

        let empty: ReportEnvelope = serde_json::from_value(json!({ "total": {} })).unwrap();
        assert!(empty.into_rows().is_empty());
    }

    #[test]
    fn malformed_fields_are_defaulted() {
        let row = ReportRow::from_value(&json!({
            "campaign": 123,
            "cost": "12.5",
            "profit": null,
            "roi": { "nested": true },
            "conversions": "4",
            "sub1": "",
        }));
        assert_eq!(row.campaign, "123");
        assert_eq!(row.cost, Decimal::from_str("12.5").unwrap());
        assert_eq!(row.profit, Decimal::ZERO);
        assert_eq!(row.roi, Decimal::ZERO);
        assert_eq!(row.conversions, 4);
        assert_eq!(row.sub1, None);
    }

    #[test]
    fn non_object_row_is_empty() {
        assert_eq!(ReportRow::from_value(&json!("oops")), ReportRow::default());
    }

    #[test]
    fn float_amounts_keep_their_digits() {
        let row = ReportRow::from_value(&json!({ "cost": 10.15, "cpa": 3 }));
        assert_eq!(row.cost, Decimal::from_str("10.15").unwrap());
        assert_eq!(row.cpa, Decimal::from(3));
    }
}
