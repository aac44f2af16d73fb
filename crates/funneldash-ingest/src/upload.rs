use funneldash_core::{commit_import, FunnelStore, ImportOutcome, InsertOptions, ReplaceScope};

use crate::csv_import::CsvParser;

/// Parse `content` and commit it through the duplicate-date guard.
///
/// Parser failures become [`ImportOutcome::Failed`] with a user-facing
/// message. With `replace`, only the batch dates that already exist are
/// cleared before the insert.
pub async fn import_csv<S>(
    store: &S,
    parser: &CsvParser<'_>,
    content: &str,
    replace: bool,
    options: InsertOptions,
) -> ImportOutcome
where
    S: FunnelStore + ?Sized,
{
    let parsed = match parser.parse(content) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "CSV upload rejected");
            return ImportOutcome::failed(e.reason(), e.user_message());
        }
    };

    tracing::info!(
        rows_read = parsed.rows_read,
        rows_skipped = parsed.rows_skipped,
        records = parsed.records.len(),
        replace,
        "committing CSV upload"
    );
    commit_import(
        store,
        parsed.into_batch(),
        replace,
        ReplaceScope::OverlappingDates,
        options,
    )
    .await
}
