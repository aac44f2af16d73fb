//! Import command handlers for the CLI.
//!
//! Both handlers print a one-line summary on success and return an error for
//! any non-imported outcome so the process exits non-zero.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use funneldash_core::{FunnelStore, ImportOutcome, InsertOptions};
use funneldash_ingest::{import_csv, CsvParser, FieldExtractor, RoiPolicy};
use funneldash_redtrack::{NormalizedReport, RedTrackImporter};

/// Parse CSV `content` and commit it to `store`.
///
/// # Errors
///
/// Returns an error if the import does not end in
/// [`ImportOutcome::Imported`].
pub(crate) async fn run_import_csv<S>(
    store: &S,
    extractor: &FieldExtractor,
    content: &str,
    replace: bool,
    roi_policy: RoiPolicy,
    options: InsertOptions,
) -> anyhow::Result<()>
where
    S: FunnelStore + ?Sized,
{
    let parser = CsvParser::new(extractor).with_roi_policy(roi_policy);
    let outcome = import_csv(store, &parser, content, replace, options).await;
    println!("{}", summarize_outcome(&outcome)?);
    Ok(())
}

/// Import `start..=end` from RedTrack, or only fetch and summarize it when
/// `dry_run` is set.
///
/// # Errors
///
/// Returns an error if RedTrack is not configured, the fetch fails on a dry
/// run, or the import does not end in [`ImportOutcome::Imported`].
pub(crate) async fn run_import_redtrack<S>(
    store: &S,
    importer: Option<&RedTrackImporter>,
    start: NaiveDate,
    end: NaiveDate,
    replace: bool,
    dry_run: bool,
    options: InsertOptions,
) -> anyhow::Result<()>
where
    S: FunnelStore + ?Sized,
{
    let Some(importer) = importer else {
        anyhow::bail!("REDTRACK_API_KEY is not set; cannot import from RedTrack");
    };

    if dry_run {
        let report = importer
            .fetch_records(start, end)
            .await
            .map_err(|e| anyhow::anyhow!("RedTrack fetch failed: {e}"))?;
        print!("{}", render_dry_run(&report));
        return Ok(());
    }

    tracing::info!(
        %start,
        %end,
        replace,
        strategy = ?importer.strategy(),
        "importing from RedTrack"
    );
    let outcome = importer
        .import_range(store, start, end, replace, options)
        .await;
    println!("{}", summarize_outcome(&outcome)?);
    Ok(())
}

/// Human-readable summary of a successful import.
///
/// # Errors
///
/// Conflicts and failures become errors carrying the outcome message. A
/// conflict also suggests `--replace`.
pub(crate) fn summarize_outcome(outcome: &ImportOutcome) -> anyhow::Result<String> {
    match outcome {
        ImportOutcome::Imported {
            dates_imported,
            records_replaced,
            message,
            ..
        } => {
            let mut summary = message.clone();
            if *records_replaced > 0 {
                summary.push_str(&format!("; {records_replaced} stored records replaced"));
            }
            if let (Some(first), Some(last)) = (dates_imported.first(), dates_imported.last()) {
                summary.push_str(&format!(
                    "; {} date(s) from {first} to {last}",
                    dates_imported.len()
                ));
            }
            Ok(summary)
        }
        ImportOutcome::Conflict { message, .. } => {
            anyhow::bail!("{message}; re-run with --replace to overwrite")
        }
        ImportOutcome::Failed { reason, message } => {
            let code = serde_json::to_value(reason)?;
            let code = code.as_str().unwrap_or("failed");
            anyhow::bail!("import failed ({code}): {message}")
        }
    }
}

fn render_dry_run(report: &NormalizedReport) -> String {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in &report.records {
        *per_day.entry(record.date).or_default() += 1;
    }

    let mut out = format!(
        "dry-run: {} rows accepted, {} rejected\n",
        report.accepted, report.rejected
    );
    for (date, count) in per_day {
        out.push_str(&format!("{date}  {count}\n"));
    }
    out
}

#[cfg(test)]
#[path = "imports_test.rs"]
mod tests;
