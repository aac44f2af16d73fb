use chrono::NaiveDate;
use thiserror::Error;

/// Errors returned by the RedTrack report client.
#[derive(Debug, Error)]
pub enum RedTrackError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// RedTrack answered with a non-success status. `message` is the
    /// upstream `message` field when present, otherwise the raw body.
    #[error("RedTrack API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid RedTrack base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}
