//! Date-range import from RedTrack into a [`FunnelStore`].

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use funneldash_core::{
    commit_import, AppConfig, CampaignDelimiter, FailureReason, FunnelStore, ImportBatch,
    ImportOutcome, InsertOptions, RedTrackFetchMode, ReplaceScope, SchemaVersion,
};
use funneldash_ingest::FieldExtractor;

use crate::client::{RedTrackClient, RedTrackSettings, ReportQuery};
use crate::error::RedTrackError;
use crate::normalize::{NormalizedReport, ReportNormalizer};

/// How a date range is requested from RedTrack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// One request per day, sequentially, pausing `delay` between days.
    PerDay { delay: Duration },
    /// A single request grouped by date.
    Ranged,
}

impl FetchStrategy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        match config.redtrack_fetch_mode {
            RedTrackFetchMode::PerDay => FetchStrategy::PerDay {
                delay: Duration::from_millis(config.redtrack_day_delay_ms),
            },
            RedTrackFetchMode::Ranged => FetchStrategy::Ranged,
        }
    }
}

fn report_group(schema: SchemaVersion) -> &'static str {
    match schema {
        SchemaVersion::V2 => "campaign,sub1,sub2,sub3",
        SchemaVersion::V1 => "campaign,sub1,sub2,sub3,sub4,sub5",
    }
}

#[derive(Debug)]
pub struct RedTrackImporter {
    client: RedTrackClient,
    normalizer: ReportNormalizer,
    schema: SchemaVersion,
    strategy: FetchStrategy,
}

impl RedTrackImporter {
    #[must_use]
    pub fn new(
        client: RedTrackClient,
        extractor: Arc<FieldExtractor>,
        schema: SchemaVersion,
        delimiter: CampaignDelimiter,
        strategy: FetchStrategy,
    ) -> Self {
        Self {
            client,
            normalizer: ReportNormalizer::new(extractor, schema, delimiter),
            schema,
            strategy,
        }
    }

    /// Build an importer from application config. Returns `Ok(None)` when no
    /// API key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RedTrackError`] if the HTTP client cannot be built.
    pub fn from_app_config(
        config: &AppConfig,
        extractor: Arc<FieldExtractor>,
    ) -> Result<Option<Self>, RedTrackError> {
        let Some(api_key) = config.redtrack_api_key.as_deref() else {
            return Ok(None);
        };
        let client = RedTrackClient::new(api_key, RedTrackSettings::from_app_config(config))?;
        Ok(Some(Self::new(
            client,
            extractor,
            config.schema_version,
            config.campaign_delimiter,
            FetchStrategy::from_app_config(config),
        )))
    }

    #[must_use]
    pub fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    pub async fn probe(&self) -> bool {
        self.client.probe().await
    }

    /// Fetch and normalize every approved record for `start..=end`.
    ///
    /// # Errors
    ///
    /// - [`RedTrackError::InvalidRange`] if `start` is after `end`.
    /// - Any client error; a failing day aborts the whole range.
    pub async fn fetch_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<NormalizedReport, RedTrackError> {
        if start > end {
            return Err(RedTrackError::InvalidRange { start, end });
        }
        let group = report_group(self.schema);

        match self.strategy {
            FetchStrategy::Ranged => {
                let rows = self
                    .client
                    .fetch_report(&ReportQuery {
                        date_from: start,
                        date_to: end,
                        group: format!("date,{group}"),
                        total: true,
                    })
                    .await?;
                let report = self.normalizer.normalize(&rows, None);
                tracing::info!(
                    %start,
                    %end,
                    rows = rows.len(),
                    accepted = report.accepted,
                    rejected = report.rejected,
                    "RedTrack range fetched"
                );
                Ok(report)
            }
            FetchStrategy::PerDay { delay } => {
                let mut report = NormalizedReport::default();
                let days: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
                for (index, day) in days.iter().enumerate() {
                    if index > 0 && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let rows = self
                        .client
                        .fetch_report(&ReportQuery {
                            date_from: *day,
                            date_to: *day,
                            group: group.to_string(),
                            total: true,
                        })
                        .await?;
                    let day_report = self.normalizer.normalize(&rows, Some(*day));
                    tracing::info!(
                        %day,
                        rows = rows.len(),
                        accepted = day_report.accepted,
                        rejected = day_report.rejected,
                        "RedTrack day fetched"
                    );
                    report.extend(day_report);
                }
                Ok(report)
            }
        }
    }

    /// Import `start..=end` into `store`.
    ///
    /// Without `replace`, stored dates inside the range are checked before
    /// any request is made and produce a conflict. With `replace`, every
    /// stored record in the range is deleted before the insert, even for
    /// days RedTrack returned nothing for.
    pub async fn import_range<S>(
        &self,
        store: &S,
        start: NaiveDate,
        end: NaiveDate,
        replace: bool,
        options: InsertOptions,
    ) -> ImportOutcome
    where
        S: FunnelStore + ?Sized,
    {
        if start > end {
            return ImportOutcome::failed(
                FailureReason::InvalidRequest,
                "Data inicial deve ser anterior ou igual à data final",
            );
        }

        if !replace {
            match store.known_dates().await {
                Ok(known) => {
                    let mut duplicates: Vec<NaiveDate> = known
                        .into_iter()
                        .filter(|d| (start..=end).contains(d))
                        .collect();
                    if !duplicates.is_empty() {
                        duplicates.sort_unstable();
                        tracing::info!(
                            count = duplicates.len(),
                            "RedTrack import conflicts with stored dates"
                        );
                        return ImportOutcome::conflict(duplicates);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to check stored dates");
                    return ImportOutcome::failed(
                        FailureReason::Storage,
                        format!("Erro ao verificar datas existentes: {e}"),
                    );
                }
            }
        }

        let report = match self.fetch_records(start, end).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, %start, %end, "RedTrack fetch failed");
                return ImportOutcome::failed(
                    FailureReason::Upstream,
                    format!("Erro na API RedTrack: {e}"),
                );
            }
        };

        if report.records.is_empty() {
            return ImportOutcome::failed(
                FailureReason::NoValidRecords,
                "Nenhum registro válido retornado pela RedTrack para o período",
            );
        }

        let batch = ImportBatch {
            records: report.records,
            rows_skipped: report.rejected,
        };
        commit_import(
            store,
            batch,
            replace,
            ReplaceScope::Range { start, end },
            options,
        )
        .await
    }
}
