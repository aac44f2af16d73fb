//! Pure aggregation over record sets: grouped rows, the funnel-by-date
//! matrix, overall totals and per-day totals.
//!
//! Everything here is derived on demand from the records passed in; none of
//! these views are persisted.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::money;
use crate::record::{FunnelIdentity, FunnelRecord, IdentityField};

#[derive(Debug, Default, Clone, Copy)]
struct Acc {
    cost: Decimal,
    profit: Decimal,
    purchases: u64,
}

impl Acc {
    fn add(&mut self, record: &FunnelRecord) {
        self.cost += record.cost;
        self.profit += record.profit;
        self.purchases += u64::from(record.purchases);
    }

    fn merge(&mut self, other: &Acc) {
        self.cost += other.cost;
        self.profit += other.profit;
        self.purchases += other.purchases;
    }
}

// ---------------------------------------------------------------------------
// Grouped rows
// ---------------------------------------------------------------------------

/// One funnel on one date, summed over every record that shares both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedRow {
    #[serde(flatten)]
    pub identity: FunnelIdentity,
    pub date: NaiveDate,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub roi: Decimal,
    pub purchases: u64,
}

/// Group records by (identity, date).
///
/// Rows are ordered by `total_cost` descending, then date ascending, then
/// identity, so equal-cost rows come out in a stable order.
#[must_use]
pub fn group_rows(records: &[FunnelRecord], fields: &[IdentityField]) -> Vec<GroupedRow> {
    let mut groups: BTreeMap<(FunnelIdentity, NaiveDate), Acc> = BTreeMap::new();
    for record in records {
        groups
            .entry((FunnelIdentity::project(record, fields), record.date))
            .or_default()
            .add(record);
    }

    let mut rows: Vec<GroupedRow> = groups
        .into_iter()
        .map(|((identity, date), acc)| GroupedRow {
            identity,
            date,
            total_cost: money::money(acc.cost),
            total_profit: money::money(acc.profit),
            roi: money::roi(acc.profit, acc.cost),
            purchases: acc.purchases,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_cost
            .cmp(&a.total_cost)
            .then_with(|| a.date.cmp(&b.date))
            .then_with(|| a.identity.cmp(&b.identity))
    });
    rows
}

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

/// Metrics of one funnel on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayMetrics {
    pub cost: Decimal,
    pub profit: Decimal,
    pub roi: Decimal,
    pub purchases: u64,
}

/// One funnel's row in the matrix. `days[i]` lines up with
/// `FunnelMatrix::dates[i]` and is `None` when the funnel had no data that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelSeries {
    #[serde(flatten)]
    pub identity: FunnelIdentity,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub roi: Decimal,
    pub total_purchases: u64,
    pub days: Vec<Option<DayMetrics>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunnelMatrix {
    pub dates: Vec<NaiveDate>,
    pub funnels: Vec<FunnelSeries>,
}

/// Pivot grouped rows into funnels × dates.
///
/// Dates are ascending. Funnels are ordered by total cost descending, ties by
/// identity.
#[must_use]
pub fn pivot(rows: &[GroupedRow]) -> FunnelMatrix {
    let dates: Vec<NaiveDate> = rows
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_identity: BTreeMap<&FunnelIdentity, BTreeMap<NaiveDate, Acc>> = BTreeMap::new();
    for row in rows {
        let cell = by_identity
            .entry(&row.identity)
            .or_default()
            .entry(row.date)
            .or_default();
        cell.merge(&Acc {
            cost: row.total_cost,
            profit: row.total_profit,
            purchases: row.purchases,
        });
    }

    let mut funnels: Vec<FunnelSeries> = by_identity
        .into_iter()
        .map(|(identity, cells)| {
            let mut total = Acc::default();
            for acc in cells.values() {
                total.merge(acc);
            }
            let days = dates
                .iter()
                .map(|date| {
                    cells.get(date).map(|acc| DayMetrics {
                        cost: money::money(acc.cost),
                        profit: money::money(acc.profit),
                        roi: money::roi(acc.profit, acc.cost),
                        purchases: acc.purchases,
                    })
                })
                .collect();
            FunnelSeries {
                identity: identity.clone(),
                total_cost: money::money(total.cost),
                total_profit: money::money(total.profit),
                roi: money::roi(total.profit, total.cost),
                total_purchases: total.purchases,
                days,
            }
        })
        .collect();

    funnels.sort_by(|a, b| {
        b.total_cost
            .cmp(&a.total_cost)
            .then_with(|| a.identity.cmp(&b.identity))
    });

    FunnelMatrix { dates, funnels }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub roi: Decimal,
    pub total_purchases: u64,
}

#[must_use]
pub fn totals(records: &[FunnelRecord]) -> Totals {
    let mut acc = Acc::default();
    for record in records {
        acc.add(record);
    }
    Totals {
        total_cost: money::money(acc.cost),
        total_profit: money::money(acc.profit),
        roi: money::roi(acc.profit, acc.cost),
        total_purchases: acc.purchases,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub cost: Decimal,
    pub profit: Decimal,
    pub roi: Decimal,
    pub purchases: u64,
}

/// Per-date totals, ascending by date.
#[must_use]
pub fn daily_totals(records: &[FunnelRecord]) -> Vec<DailyTotal> {
    let mut by_date: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_default().add(record);
    }
    by_date
        .into_iter()
        .map(|(date, acc)| DailyTotal {
            date,
            cost: money::money(acc.cost),
            profit: money::money(acc.profit),
            roi: money::roi(acc.profit, acc.cost),
            purchases: acc.purchases,
        })
        .collect()
}
