//! Committing an import batch: the duplicate-date guard, optional
//! replacement, and the structured outcome returned to callers.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::FunnelRecord;
use crate::store::{insert_chunked, FunnelStore, InsertOptions};

/// Canonical records produced by one parse or fetch, plus how many source
/// rows were dropped on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    pub records: Vec<FunnelRecord>,
    pub rows_skipped: usize,
}

impl ImportBatch {
    /// Distinct dates in the batch, ascending.
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// What existing data a replacing import removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceScope {
    /// Exactly the batch dates that already have stored records.
    OverlappingDates,
    /// Every stored record inside the requested range, inclusive.
    Range { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    EmptyCsv,
    NoValidRecords,
    MalformedCsv,
    Upstream,
    Storage,
    NotConfigured,
    InvalidRequest,
}

/// Result of any mutating import operation. Serializes with an `outcome`
/// tag so clients can branch without inspecting the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported {
        records_imported: u64,
        records_failed: u64,
        rows_skipped: usize,
        dates_imported: Vec<NaiveDate>,
        records_replaced: u64,
        message: String,
    },
    /// Nothing was written; re-run with replace to overwrite these dates.
    Conflict {
        duplicate_dates: Vec<NaiveDate>,
        message: String,
    },
    Failed {
        reason: FailureReason,
        message: String,
    },
}

impl ImportOutcome {
    #[must_use]
    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        ImportOutcome::Failed {
            reason,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(duplicate_dates: Vec<NaiveDate>) -> Self {
        let listed = duplicate_dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ImportOutcome::Conflict {
            message: format!("Datas já existentes: {listed}"),
            duplicate_dates,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Imported { .. })
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ImportOutcome::Imported { message, .. }
            | ImportOutcome::Conflict { message, .. }
            | ImportOutcome::Failed { message, .. } => message,
        }
    }
}

fn imported_message(imported: u64, failed: u64, skipped: usize) -> String {
    let mut message = format!("{imported} registros importados com sucesso");
    if failed > 0 {
        message.push_str(&format!(" ({failed} registros falharam ao gravar)"));
    }
    if skipped > 0 {
        message.push_str(&format!(" ({skipped} linhas ignoradas)"));
    }
    message
}

/// Commit `batch` to `store`, guarding against overwriting existing dates.
///
/// Without `replace`, any overlap between the batch dates and stored dates
/// returns [`ImportOutcome::Conflict`] and nothing is written. With
/// `replace`, existing data in `scope` is deleted before the insert.
/// Storage failures are reported as [`ImportOutcome::Failed`], never
/// swallowed.
pub async fn commit_import<S>(
    store: &S,
    batch: ImportBatch,
    replace: bool,
    scope: ReplaceScope,
    options: InsertOptions,
) -> ImportOutcome
where
    S: FunnelStore + ?Sized,
{
    if batch.records.is_empty() {
        return ImportOutcome::failed(
            FailureReason::NoValidRecords,
            "Nenhum registro válido encontrado",
        );
    }

    let dates = batch.dates();
    let checked = match scope {
        ReplaceScope::OverlappingDates => store.existing_dates(&dates).await,
        ReplaceScope::Range { start, end } => store.known_dates().await.map(|known| {
            let mut in_range: Vec<NaiveDate> = known
                .into_iter()
                .filter(|d| *d >= start && *d <= end)
                .collect();
            in_range.sort_unstable();
            in_range
        }),
    };
    let existing = match checked {
        Ok(existing) => existing,
        Err(e) => {
            tracing::error!(error = %e, "duplicate-date check failed");
            return ImportOutcome::failed(
                FailureReason::Storage,
                format!("Erro ao verificar datas existentes: {e}"),
            );
        }
    };

    if !existing.is_empty() && !replace {
        tracing::info!(dates = ?existing, "import rejected: dates already present");
        return ImportOutcome::conflict(existing);
    }

    let mut records_replaced = 0;
    if replace && !existing.is_empty() {
        let deleted = match scope {
            ReplaceScope::OverlappingDates => store.delete_dates(&existing).await,
            ReplaceScope::Range { start, end } => store.delete_date_range(start, end).await,
        };
        match deleted {
            Ok(count) => {
                tracing::info!(dates = ?existing, deleted = count, "replaced existing dates");
                records_replaced = count;
            }
            Err(e) => {
                tracing::error!(error = %e, "delete before replace failed");
                return ImportOutcome::failed(
                    FailureReason::Storage,
                    format!("Erro ao remover dados existentes: {e}"),
                );
            }
        }
    }

    match insert_chunked(store, &batch.records, options).await {
        Ok(report) => {
            tracing::info!(
                inserted = report.inserted,
                failed = report.failed,
                skipped = batch.rows_skipped,
                "import committed"
            );
            ImportOutcome::Imported {
                records_imported: report.inserted,
                records_failed: report.failed,
                rows_skipped: batch.rows_skipped,
                dates_imported: dates,
                records_replaced,
                message: imported_message(report.inserted, report.failed, batch.rows_skipped),
            }
        }
        Err(aborted) => {
            tracing::error!(error = %aborted, "import aborted");
            ImportOutcome::failed(
                FailureReason::Storage,
                format!(
                    "Erro ao gravar registros: {} (registros gravados antes da falha: {})",
                    aborted.source, aborted.report.inserted
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InsertFailurePolicy, MemoryFunnelStore};

    fn date(d: &str) -> NaiveDate {
        NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()
    }

    fn batch(days: &[&str]) -> ImportBatch {
        ImportBatch {
            records: days
                .iter()
                .map(|d| FunnelRecord::new(format!("NEW-{d}"), date(d)))
                .collect(),
            rows_skipped: 0,
        }
    }

    fn existing_store() -> MemoryFunnelStore {
        MemoryFunnelStore::with_records(vec![
            FunnelRecord::new("OLD-A", date("2025-01-02")),
            FunnelRecord::new("OLD-B", date("2025-01-02")),
            FunnelRecord::new("OLD-C", date("2024-12-31")),
        ])
    }

    #[tokio::test]
    async fn conflict_leaves_storage_unchanged() {
        let store = existing_store();
        let outcome = commit_import(
            &store,
            batch(&["2025-01-01", "2025-01-02", "2025-01-03"]),
            false,
            ReplaceScope::OverlappingDates,
            InsertOptions::default(),
        )
        .await;

        assert_eq!(
            outcome,
            ImportOutcome::Conflict {
                duplicate_dates: vec![date("2025-01-02")],
                message: "Datas já existentes: 2025-01-02".to_string(),
            }
        );
        assert!(!outcome.is_success());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn replace_deletes_only_overlapping_dates() {
        let store = existing_store();
        let outcome = commit_import(
            &store,
            batch(&["2025-01-01", "2025-01-02", "2025-01-03"]),
            true,
            ReplaceScope::OverlappingDates,
            InsertOptions::default(),
        )
        .await;

        assert!(outcome.is_success(), "{outcome:?}");
        let ImportOutcome::Imported {
            records_imported,
            records_replaced,
            dates_imported,
            ..
        } = outcome
        else {
            panic!("expected Imported");
        };
        assert_eq!(records_imported, 3);
        assert_eq!(records_replaced, 2);
        assert_eq!(dates_imported.len(), 3);

        let remaining = store.snapshot();
        assert!(remaining.iter().any(|r| r.campaign == "OLD-C"));
        assert!(!remaining.iter().any(|r| r.campaign.starts_with("OLD-A")));
        assert_eq!(
            store.known_dates().await.unwrap(),
            vec![
                date("2025-01-03"),
                date("2025-01-02"),
                date("2025-01-01"),
                date("2024-12-31")
            ]
        );
    }

    #[tokio::test]
    async fn check_after_import_reports_imported_dates() {
        let store = MemoryFunnelStore::new();
        let incoming = batch(&["2025-02-01", "2025-02-02"]);
        let dates = incoming.dates();
        let outcome = commit_import(
            &store,
            incoming,
            false,
            ReplaceScope::OverlappingDates,
            InsertOptions::default(),
        )
        .await;
        assert!(outcome.is_success());
        assert_eq!(store.existing_dates(&dates).await.unwrap(), dates);
    }

    #[tokio::test]
    async fn range_replace_clears_whole_range() {
        let store = MemoryFunnelStore::with_records(vec![
            FunnelRecord::new("OLD", date("2025-01-02")),
            FunnelRecord::new("OUTSIDE", date("2025-01-09")),
        ]);
        let outcome = commit_import(
            &store,
            batch(&["2025-01-01"]),
            true,
            ReplaceScope::Range {
                start: date("2025-01-01"),
                end: date("2025-01-03"),
            },
            InsertOptions::default(),
        )
        .await;
        assert!(outcome.is_success());
        let campaigns: Vec<String> = store.snapshot().into_iter().map(|r| r.campaign).collect();
        assert!(campaigns.contains(&"OUTSIDE".to_string()));
        assert!(!campaigns.contains(&"OLD".to_string()));
    }

    #[tokio::test]
    async fn range_conflict_reports_dates_in_range() {
        let store = MemoryFunnelStore::with_records(vec![FunnelRecord::new(
            "OLD",
            date("2025-01-02"),
        )]);
        let outcome = commit_import(
            &store,
            batch(&["2025-01-01"]),
            false,
            ReplaceScope::Range {
                start: date("2025-01-01"),
                end: date("2025-01-03"),
            },
            InsertOptions::default(),
        )
        .await;
        assert!(matches!(
            outcome,
            ImportOutcome::Conflict { ref duplicate_dates, .. } if duplicate_dates == &vec![date("2025-01-02")]
        ));
    }

    #[tokio::test]
    async fn storage_outage_is_reported_as_failure() {
        let store = existing_store();
        store.set_offline(true);
        let outcome = commit_import(
            &store,
            batch(&["2025-01-05"]),
            false,
            ReplaceScope::OverlappingDates,
            InsertOptions::default(),
        )
        .await;
        assert!(matches!(
            outcome,
            ImportOutcome::Failed {
                reason: FailureReason::Storage,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn partial_insert_failures_are_counted() {
        let store = MemoryFunnelStore::new().reject_campaign("NEW-2025-03-02");
        let outcome = commit_import(
            &store,
            batch(&["2025-03-01", "2025-03-02", "2025-03-03"]),
            false,
            ReplaceScope::OverlappingDates,
            InsertOptions {
                chunk_size: 10,
                failure_policy: InsertFailurePolicy::BestEffort,
            },
        )
        .await;
        let ImportOutcome::Imported {
            records_imported,
            records_failed,
            message,
            ..
        } = outcome
        else {
            panic!("expected Imported");
        };
        assert_eq!(records_imported, 2);
        assert_eq!(records_failed, 1);
        assert!(message.contains("1 registros falharam"));
    }

    #[tokio::test]
    async fn abort_policy_surfaces_partial_write() {
        let store = MemoryFunnelStore::new().reject_campaign("NEW-2025-03-02");
        let outcome = commit_import(
            &store,
            batch(&["2025-03-01", "2025-03-02"]),
            false,
            ReplaceScope::OverlappingDates,
            InsertOptions {
                chunk_size: 1,
                failure_policy: InsertFailurePolicy::Abort,
            },
        )
        .await;
        assert!(matches!(
            outcome,
            ImportOutcome::Failed { reason: FailureReason::Storage, ref message } if message.contains("1)")
        ));
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(ImportOutcome::conflict(vec![date("2025-01-02")])).unwrap();
        assert_eq!(json["outcome"], "conflict");
        assert_eq!(json["duplicate_dates"][0], "2025-01-02");
    }
}
