use crate::app_config::{AppConfig, Environment, RedTrackFetchMode};
use crate::record::{CampaignDelimiter, SchemaVersion};
use crate::store::{InsertFailurePolicy, MAX_INSERT_CHUNK_SIZE};
use crate::ConfigError;

/// Lowest pacing accepted between per-day RedTrack requests.
const MIN_REDTRACK_DAY_DELAY_MS: u64 = 1000;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Tests drive this with a `HashMap` lookup instead of mutating the process env.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("FUNNELDASH_ENV", "development"))?;

    let bind_addr = or_default("FUNNELDASH_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("FUNNELDASH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("FUNNELDASH_LOG_LEVEL", "info");
    let taxonomy_path = PathBuf::from(or_default(
        "FUNNELDASH_TAXONOMY_PATH",
        "./config/taxonomy.yaml",
    ));

    let db_max_connections = parse_u32("FUNNELDASH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FUNNELDASH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FUNNELDASH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let schema_version = or_default("FUNNELDASH_SCHEMA_VERSION", "v2")
        .parse::<SchemaVersion>()
        .map_err(|reason| invalid("FUNNELDASH_SCHEMA_VERSION", reason))?;
    let campaign_delimiter = or_default("FUNNELDASH_CAMPAIGN_DELIMITER", "pipe")
        .parse::<CampaignDelimiter>()
        .map_err(|reason| invalid("FUNNELDASH_CAMPAIGN_DELIMITER", reason))?;

    let insert_chunk_size = or_default("FUNNELDASH_INSERT_CHUNK_SIZE", "500")
        .parse::<usize>()
        .map_err(|e| invalid("FUNNELDASH_INSERT_CHUNK_SIZE", e.to_string()))?;
    if insert_chunk_size == 0 || insert_chunk_size > MAX_INSERT_CHUNK_SIZE {
        return Err(invalid(
            "FUNNELDASH_INSERT_CHUNK_SIZE",
            format!("must be between 1 and {MAX_INSERT_CHUNK_SIZE}"),
        ));
    }
    let insert_failure_policy =
        parse_failure_policy(&or_default("FUNNELDASH_INSERT_FAILURE_POLICY", "best_effort"))?;

    let redtrack_api_url = or_default("REDTRACK_API_URL", "https://api.redtrack.io");
    let redtrack_api_key = lookup("REDTRACK_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let redtrack_request_timeout_secs = parse_u64("REDTRACK_REQUEST_TIMEOUT_SECS", "30")?;
    let redtrack_fetch_mode = parse_fetch_mode(&or_default("REDTRACK_FETCH_STRATEGY", "per_day"))?;
    let redtrack_day_delay_ms = parse_u64("REDTRACK_DAY_DELAY_MS", "2500")?;
    if redtrack_day_delay_ms < MIN_REDTRACK_DAY_DELAY_MS {
        return Err(invalid(
            "REDTRACK_DAY_DELAY_MS",
            format!("must be at least {MIN_REDTRACK_DAY_DELAY_MS}"),
        ));
    }
    let redtrack_rows_per_request = parse_u32("REDTRACK_ROWS_PER_REQUEST", "1000")?;
    if redtrack_rows_per_request == 0 {
        return Err(invalid(
            "REDTRACK_ROWS_PER_REQUEST",
            "must be greater than zero".to_string(),
        ));
    }
    let redtrack_campaign_filter = or_default("REDTRACK_CAMPAIGN_FILTER", "NT");
    let redtrack_max_retries = parse_u32("REDTRACK_MAX_RETRIES", "3")?;
    let redtrack_retry_backoff_base_ms = parse_u64("REDTRACK_RETRY_BACKOFF_BASE_MS", "1000")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        taxonomy_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        schema_version,
        campaign_delimiter,
        insert_chunk_size,
        insert_failure_policy,
        redtrack_api_url,
        redtrack_api_key,
        redtrack_request_timeout_secs,
        redtrack_fetch_mode,
        redtrack_day_delay_ms,
        redtrack_rows_per_request,
        redtrack_campaign_filter,
        redtrack_max_retries,
        redtrack_retry_backoff_base_ms,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FUNNELDASH_ENV".to_string(),
            reason: format!("expected development, test, or production; got {other:?}"),
        }),
    }
}

fn parse_failure_policy(s: &str) -> Result<InsertFailurePolicy, ConfigError> {
    match s {
        "best_effort" => Ok(InsertFailurePolicy::BestEffort),
        "abort" => Ok(InsertFailurePolicy::Abort),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FUNNELDASH_INSERT_FAILURE_POLICY".to_string(),
            reason: format!("expected best_effort or abort; got {other:?}"),
        }),
    }
}

fn parse_fetch_mode(s: &str) -> Result<RedTrackFetchMode, ConfigError> {
    match s {
        "per_day" => Ok(RedTrackFetchMode::PerDay),
        "ranged" => Ok(RedTrackFetchMode::Ranged),
        other => Err(ConfigError::InvalidEnvVar {
            var: "REDTRACK_FETCH_STRATEGY".to_string(),
            reason: format!("expected per_day or ranged; got {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
