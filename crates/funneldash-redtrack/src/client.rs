//! HTTP client for the RedTrack `/report` endpoint.
//!
//! Wraps `reqwest` with API key handling, retry on transient failures and
//! permissive row decoding. Upstream errors keep the HTTP status and the
//! upstream `message` field.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, Url};

use funneldash_core::AppConfig;

use crate::error::RedTrackError;
use crate::retry::retry_with_backoff;
use crate::types::{ReportEnvelope, ReportRow};

const DEFAULT_BASE_URL: &str = "https://api.redtrack.io";

/// Connection and paging settings for [`RedTrackClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedTrackSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub campaign_filter: String,
    pub rows_per_request: u32,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl Default for RedTrackSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            campaign_filter: "NT".to_string(),
            rows_per_request: 1000,
            max_retries: 3,
            retry_backoff_base_ms: 1000,
        }
    }
}

impl RedTrackSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.redtrack_api_url.clone(),
            timeout_secs: config.redtrack_request_timeout_secs,
            campaign_filter: config.redtrack_campaign_filter.clone(),
            rows_per_request: config.redtrack_rows_per_request,
            max_retries: config.redtrack_max_retries,
            retry_backoff_base_ms: config.redtrack_retry_backoff_base_ms,
        }
    }
}

/// One `/report` request: which dimensions to group by and whether
/// RedTrack should add its totals row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub group: String,
    pub total: bool,
}

pub struct RedTrackClient {
    client: Client,
    api_key: String,
    base_url: Url,
    settings: RedTrackSettings,
}

impl std::fmt::Debug for RedTrackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedTrackClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[redacted]")
            .field("settings", &self.settings)
            .finish()
    }
}

impl RedTrackClient {
    /// # Errors
    ///
    /// Returns [`RedTrackError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RedTrackError::InvalidBaseUrl`] if
    /// `settings.base_url` does not parse.
    pub fn new(api_key: &str, settings: RedTrackSettings) -> Result<Self, RedTrackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("funneldash/0.1 (report-import)")
            .build()?;

        // One trailing slash so `join("report")` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", settings.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| RedTrackError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            settings,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &RedTrackSettings {
        &self.settings
    }

    /// Fetch one report, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`RedTrackError::Api`] on a non-2xx response, with the upstream message.
    /// - [`RedTrackError::Http`] on network failure.
    /// - [`RedTrackError::Deserialize`] if the body is neither a row array nor
    ///   an object.
    pub async fn fetch_report(&self, query: &ReportQuery) -> Result<Vec<ReportRow>, RedTrackError> {
        let url = self.report_url(query, true)?;
        let context = format!("report {}..{}", query.date_from, query.date_to);

        let body = retry_with_backoff(
            self.settings.max_retries,
            self.settings.retry_backoff_base_ms,
            || self.request_json(&url, &context),
        )
        .await?;

        let envelope: ReportEnvelope =
            serde_json::from_value(body).map_err(|e| RedTrackError::Deserialize {
                context: context.clone(),
                source: e,
            })?;
        Ok(envelope.into_rows())
    }

    /// Lightweight credentials check: today's date, grouped only by
    /// campaign, no totals. Never fails; returns whether RedTrack answered
    /// with success.
    pub async fn probe(&self) -> bool {
        let today = chrono::Utc::now().date_naive();
        let query = ReportQuery {
            date_from: today,
            date_to: today,
            group: "campaign".to_string(),
            total: false,
        };

        let result = match self.report_url(&query, false) {
            Ok(url) => self.request_json(&url, "probe").await.map(|_| ()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!("RedTrack connection test succeeded");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "RedTrack connection test failed");
                false
            }
        }
    }

    /// Builds the `/report` URL with percent-encoded query parameters.
    /// The campaign filter and page size are only sent for data fetches.
    fn report_url(&self, query: &ReportQuery, paged: bool) -> Result<Url, RedTrackError> {
        let mut url = self
            .base_url
            .join("report")
            .map_err(|e| RedTrackError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &self.api_key);
            pairs.append_pair("group", &query.group);
            pairs.append_pair("date_from", &query.date_from.format("%Y-%m-%d").to_string());
            pairs.append_pair("date_to", &query.date_to.format("%Y-%m-%d").to_string());
            pairs.append_pair("total", if query.total { "true" } else { "false" });
            if paged {
                pairs.append_pair("rt_campaign", &self.settings.campaign_filter);
                pairs.append_pair("per", &self.settings.rows_per_request.to_string());
            }
        }
        Ok(url)
    }

    /// Sends a GET request and parses the body as JSON.
    ///
    /// Non-2xx responses become [`RedTrackError::Api`] carrying the upstream
    /// `message` field, or the raw body when there is none.
    async fn request_json(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<serde_json::Value, RedTrackError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(redact_url)?;
        let status = response.status();
        let body = response.text().await.map_err(redact_url)?;

        if !status.is_success() {
            return Err(RedTrackError::Api {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| RedTrackError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}

// The request URL carries the API key as a query parameter.
fn redact_url(error: reqwest::Error) -> RedTrackError {
    RedTrackError::Http(error.without_url())
}

fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> RedTrackClient {
        RedTrackClient::new(
            "test-key",
            RedTrackSettings {
                base_url: base_url.to_string(),
                ..RedTrackSettings::default()
            },
        )
        .expect("client construction should not fail")
    }

    fn day(d: &str) -> NaiveDate {
        NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn report_url_carries_all_fetch_params() {
        let client = test_client("https://api.redtrack.io");
        let query = ReportQuery {
            date_from: day("2025-01-15"),
            date_to: day("2025-01-15"),
            group: "campaign,sub1,sub2,sub3".to_string(),
            total: true,
        };
        let url = client.report_url(&query, true).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.redtrack.io/report?api_key=test-key&group=campaign%2Csub1%2Csub2%2Csub3\
             &date_from=2025-01-15&date_to=2025-01-15&total=true&rt_campaign=NT&per=1000"
        );
    }

    #[test]
    fn probe_url_omits_paging() {
        let client = test_client("https://api.redtrack.io/");
        let query = ReportQuery {
            date_from: day("2025-01-15"),
            date_to: day("2025-01-15"),
            group: "campaign".to_string(),
            total: false,
        };
        let url = client.report_url(&query, false).unwrap();
        assert!(url.as_str().ends_with("&total=false"), "{url}");
        assert!(!url.as_str().contains("rt_campaign"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = RedTrackClient::new(
            "k",
            RedTrackSettings {
                base_url: "not a url".to_string(),
                ..RedTrackSettings::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, RedTrackError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let client = test_client("https://api.redtrack.io");
        assert!(!format!("{client:?}").contains("test-key"));
    }

    #[test]
    fn upstream_message_prefers_message_field() {
        assert_eq!(upstream_message(r#"{"message":"invalid api key"}"#), "invalid api key");
        assert_eq!(upstream_message(r#"{"error":"nope"}"#), "nope");
        assert_eq!(upstream_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(upstream_message(""), "empty response body");
    }
}
