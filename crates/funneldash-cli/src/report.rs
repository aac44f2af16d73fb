//! Read-only report commands.
//!
//! Unlike the HTTP read endpoints these surface storage errors instead of
//! degrading to empty output.

use rust_decimal::Decimal;
use serde_json::json;

use funneldash_core::{daily_totals, totals, DailyTotal, FunnelFilters, FunnelStore, Totals};

/// Print every date with stored records, most recent first.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub(crate) async fn run_dates<S>(store: &S) -> anyhow::Result<()>
where
    S: FunnelStore + ?Sized,
{
    let dates = store.known_dates().await?;
    if dates.is_empty() {
        println!("no stored records; run `import csv` or `import redtrack` first");
        return Ok(());
    }
    for date in &dates {
        println!("{date}");
    }
    Ok(())
}

/// Print overall and per-day totals for records matching `filters`.
///
/// # Errors
///
/// Returns an error if the store query or JSON encoding fails.
pub(crate) async fn run_report<S>(
    store: &S,
    filters: &FunnelFilters,
    as_json: bool,
) -> anyhow::Result<()>
where
    S: FunnelStore + ?Sized,
{
    let records = store.list_records(filters).await?;
    let overall = totals(&records);
    let daily = daily_totals(&records);

    if as_json {
        let body = json!({ "totals": overall, "daily": daily });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", render_report(&overall, &daily));
    }
    Ok(())
}

pub(crate) fn render_report(overall: &Totals, daily: &[DailyTotal]) -> String {
    let mut out = format!(
        "{:<12}{:>14}{:>14}{:>10}{:>11}\n",
        "DATE", "COST", "PROFIT", "ROI", "PURCHASES"
    );
    for day in daily {
        out.push_str(&row(
            &day.date.to_string(),
            &day.cost.to_string(),
            &day.profit.to_string(),
            &percent(day.roi),
            day.purchases,
        ));
    }
    out.push_str(&row(
        "TOTAL",
        &overall.total_cost.to_string(),
        &overall.total_profit.to_string(),
        &percent(overall.roi),
        overall.total_purchases,
    ));
    out
}

fn row(label: &str, cost: &str, profit: &str, roi: &str, purchases: u64) -> String {
    format!("{label:<12}{cost:>14}{profit:>14}{roi:>10}{purchases:>11}\n")
}

/// ROI is stored as a ratio; display it as a percentage with two places.
fn percent(roi: Decimal) -> String {
    format!("{}%", (roi * Decimal::ONE_HUNDRED).round_dp(2))
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
