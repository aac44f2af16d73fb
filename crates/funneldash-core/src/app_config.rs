use std::net::SocketAddr;
use std::path::PathBuf;

use crate::record::{CampaignDelimiter, SchemaVersion};
use crate::store::{InsertFailurePolicy, InsertOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How RedTrack report data is requested for a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedTrackFetchMode {
    /// One request per calendar day, paced by `redtrack_day_delay_ms`.
    PerDay,
    /// A single request for the whole range, grouped by date upstream.
    Ranged,
}

impl std::fmt::Display for RedTrackFetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedTrackFetchMode::PerDay => write!(f, "per_day"),
            RedTrackFetchMode::Ranged => write!(f, "ranged"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub taxonomy_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub schema_version: SchemaVersion,
    pub campaign_delimiter: CampaignDelimiter,
    pub insert_chunk_size: usize,
    pub insert_failure_policy: InsertFailurePolicy,
    pub redtrack_api_url: String,
    pub redtrack_api_key: Option<String>,
    pub redtrack_request_timeout_secs: u64,
    pub redtrack_fetch_mode: RedTrackFetchMode,
    pub redtrack_day_delay_ms: u64,
    pub redtrack_rows_per_request: u32,
    pub redtrack_campaign_filter: String,
    pub redtrack_max_retries: u32,
    pub redtrack_retry_backoff_base_ms: u64,
}

impl AppConfig {
    #[must_use]
    pub fn insert_options(&self) -> InsertOptions {
        InsertOptions {
            chunk_size: self.insert_chunk_size,
            failure_policy: self.insert_failure_policy,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("taxonomy_path", &self.taxonomy_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("schema_version", &self.schema_version)
            .field("campaign_delimiter", &self.campaign_delimiter)
            .field("insert_chunk_size", &self.insert_chunk_size)
            .field("insert_failure_policy", &self.insert_failure_policy)
            .field("redtrack_api_url", &self.redtrack_api_url)
            .field(
                "redtrack_api_key",
                &self.redtrack_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "redtrack_request_timeout_secs",
                &self.redtrack_request_timeout_secs,
            )
            .field("redtrack_fetch_mode", &self.redtrack_fetch_mode)
            .field("redtrack_day_delay_ms", &self.redtrack_day_delay_ms)
            .field("redtrack_rows_per_request", &self.redtrack_rows_per_request)
            .field("redtrack_campaign_filter", &self.redtrack_campaign_filter)
            .field("redtrack_max_retries", &self.redtrack_max_retries)
            .field(
                "redtrack_retry_backoff_base_ms",
                &self.redtrack_retry_backoff_base_ms,
            )
            .finish()
    }
}
