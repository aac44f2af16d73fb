pub mod aggregate;
mod app_config;
mod config;
pub mod dashboard;
pub mod import;
pub mod money;
pub mod record;
pub mod store;
pub mod taxonomy;

use thiserror::Error;

pub use aggregate::{
    daily_totals, group_rows, pivot, totals, DailyTotal, DayMetrics, FunnelMatrix, FunnelSeries,
    GroupedRow, Totals,
};
pub use app_config::{AppConfig, Environment, RedTrackFetchMode};
pub use config::{load_app_config, load_app_config_from_env};
pub use dashboard::Dashboard;
pub use import::{commit_import, FailureReason, ImportBatch, ImportOutcome, ReplaceScope};
pub use record::{
    CampaignDelimiter, FilterOptions, FunnelFilters, FunnelIdentity, FunnelRecord, IdentityField,
    SchemaVersion,
};
pub use store::{
    insert_chunked, FunnelStore, InsertAborted, InsertFailurePolicy, InsertOptions, InsertReport,
    MemoryFunnelStore, StoreError, MAX_INSERT_CHUNK_SIZE,
};
pub use taxonomy::{load_taxonomy, parse_taxonomy, ManagerAlias, ManagerCode, ProductNiche, Taxonomy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read taxonomy file {path}: {source}")]
    TaxonomyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse taxonomy file: {0}")]
    TaxonomyFileParse(#[from] serde_yaml::Error),

    #[error("taxonomy validation failed: {0}")]
    Validation(String),
}
