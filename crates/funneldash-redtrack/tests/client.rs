//! Integration tests for `RedTrackClient` and `RedTrackImporter` using
//! wiremock HTTP mocks.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use funneldash_core::{
    parse_taxonomy, CampaignDelimiter, FailureReason, FunnelRecord, FunnelStore, ImportOutcome,
    InsertOptions, MemoryFunnelStore, SchemaVersion,
};
use funneldash_ingest::FieldExtractor;
use funneldash_redtrack::{
    FetchStrategy, RedTrackClient, RedTrackError, RedTrackImporter, RedTrackSettings, ReportQuery,
};
use rust_decimal::Decimal;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TAXONOMY: &str = r"
managers:
  - { code: ERICK, name: Erick }
  - { code: BARROS, name: Barros }
manager_prefixes: [NTE-]
channels: [NB]
products:
  - { product: memorylift, niche: Memória }
redtrack_allowed_managers: [NTE-ERICK, NTE-BARROS]
";

fn settings(base_url: &str) -> RedTrackSettings {
    RedTrackSettings {
        base_url: base_url.to_string(),
        max_retries: 2,
        retry_backoff_base_ms: 1,
        ..RedTrackSettings::default()
    }
}

fn test_client(base_url: &str) -> RedTrackClient {
    RedTrackClient::new("test-key", settings(base_url))
        .expect("client construction should not fail")
}

fn importer(base_url: &str, strategy: FetchStrategy) -> RedTrackImporter {
    let extractor = FieldExtractor::new(parse_taxonomy(TAXONOMY).unwrap()).unwrap();
    RedTrackImporter::new(
        test_client(base_url),
        Arc::new(extractor),
        SchemaVersion::V2,
        CampaignDelimiter::Underscore,
        strategy,
    )
}

fn per_day() -> FetchStrategy {
    FetchStrategy::PerDay {
        delay: Duration::from_millis(5),
    }
}

fn day(d: &str) -> NaiveDate {
    NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn query(from: &str, to: &str) -> ReportQuery {
    ReportQuery {
        date_from: day(from),
        date_to: day(to),
        group: "campaign,sub1,sub2,sub3".to_string(),
        total: true,
    }
}

#[tokio::test]
async fn fetch_report_sends_params_and_parses_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/report"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("group", "campaign,sub1,sub2,sub3"))
        .and(query_param("date_from", "2025-01-15"))
        .and(query_param("date_to", "2025-01-15"))
        .and(query_param("total", "true"))
        .and(query_param("rt_campaign", "NT"))
        .and(query_param("per", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "campaign": "NT_NTE-ERICK_fb_Memoria_siteA_memorylift", "cost": 100.5, "profit": "20" },
            { "campaign": "NT_NTE-LUIGI_fb_Memoria_siteA_memorylift", "cost": 10 }
        ])))
        .mount(&server)
        .await;

    let rows = test_client(&server.uri())
        .fetch_report(&query("2025-01-15", "2025-01-15"))
        .await
        .expect("should parse rows");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].cost, dec("100.5"));
    assert_eq!(rows[0].profit, dec("20"));
    assert_eq!(rows[1].profit, Decimal::ZERO);
}

#[tokio::test]
async fn fetch_report_accepts_items_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{ "campaign": "A", "cost": 1 }],
            "total": { "cost": 1 }
        })))
        .mount(&server)
        .await;

    let rows = test_client(&server.uri())
        .fetch_report(&query("2025-01-15", "2025-01-15"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].campaign, "A");
}

#[tokio::test]
async fn api_error_carries_status_and_upstream_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "message": "invalid api key" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .fetch_report(&query("2025-01-15", "2025-01-15"))
        .await
        .unwrap_err();

    match err {
        RedTrackError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid api key");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let rows = test_client(&server.uri())
        .fetch_report(&query("2025-01-15", "2025-01-15"))
        .await
        .expect("second attempt should succeed");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn non_json_body_is_deserialize_error_without_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .fetch_report(&query("2025-01-15", "2025-01-15"))
        .await
        .unwrap_err();
    assert!(matches!(err, RedTrackError::Deserialize { .. }));
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn probe_reports_success_and_failure() {
    let ok = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("group", "campaign"))
        .and(query_param("total", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&ok)
        .await;
    assert!(test_client(&ok.uri()).probe().await);

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&failing)
        .await;
    assert!(!test_client(&failing.uri()).probe().await);
}

#[tokio::test]
async fn per_day_import_filters_and_commits_range() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("date_from", "2025-01-15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "campaign": "NT_NTE-ERICK_fb_Memoria_siteA_memorylift", "cost": 100, "profit": 50 },
            { "campaign": "NT_NTE-LUIGI_fb_Memoria_siteA_memorylift", "cost": 100, "profit": 50 },
            { "campaign": "NT_NTE-BARROS_fb_Memoria_siteB_memorylift", "cost": 0, "profit": 0 }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("date_from", "2025-01-16"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "campaign": "NT_NTE-BARROS_fb_Memoria_siteB_memorylift", "cost": 40, "profit": -10 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryFunnelStore::new();
    let outcome = importer(&server.uri(), per_day())
        .import_range(
            &store,
            day("2025-01-15"),
            day("2025-01-16"),
            false,
            InsertOptions::default(),
        )
        .await;

    match outcome {
        ImportOutcome::Imported {
            records_imported,
            rows_skipped,
            dates_imported,
            ..
        } => {
            assert_eq!(records_imported, 2);
            assert_eq!(rows_skipped, 2);
            assert_eq!(dates_imported, vec![day("2025-01-15"), day("2025-01-16")]);
        }
        other => panic!("expected import, got: {other:?}"),
    }

    let stored = store.snapshot();
    let barros = stored
        .iter()
        .find(|r| r.manager.as_deref() == Some("Barros"))
        .expect("Barros record stored");
    assert_eq!(barros.date, day("2025-01-16"));
    assert_eq!(barros.channel.as_deref(), Some("siteB"));
    assert_eq!(barros.roi, dec("-0.25"));
}

#[tokio::test]
async fn ranged_import_groups_by_date() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("group", "date,campaign,sub1,sub2,sub3"))
        .and(query_param("date_from", "2025-01-15"))
        .and(query_param("date_to", "2025-01-16"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "date": "2025-01-15", "campaign": "NT_NTE-ERICK_fb_M_s_p", "cost": 1 },
            { "date": "2025-01-16", "campaign": "NT_NTE-ERICK_fb_M_s_p", "cost": 2 },
            { "campaign": "NT_NTE-ERICK_fb_M_s_p", "cost": 3 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let report = importer(&server.uri(), FetchStrategy::Ranged)
        .fetch_records(day("2025-01-15"), day("2025-01-16"))
        .await
        .unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected, 1);
}

#[tokio::test]
async fn existing_dates_conflict_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let store = MemoryFunnelStore::with_records(vec![FunnelRecord::new("X", day("2025-01-16"))]);
    let outcome = importer(&server.uri(), per_day())
        .import_range(
            &store,
            day("2025-01-15"),
            day("2025-01-17"),
            false,
            InsertOptions::default(),
        )
        .await;

    assert_eq!(outcome, ImportOutcome::conflict(vec![day("2025-01-16")]));
}

#[tokio::test]
async fn replace_clears_whole_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("date_from", "2025-01-15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "campaign": "NT_NTE-ERICK_fb_M_s_p", "cost": 5 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("date_from", "2025-01-16"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let store = MemoryFunnelStore::with_records(vec![
        FunnelRecord::new("old", day("2025-01-15")),
        FunnelRecord::new("old", day("2025-01-16")),
        FunnelRecord::new("outside", day("2025-01-20")),
    ]);
    let outcome = importer(&server.uri(), per_day())
        .import_range(
            &store,
            day("2025-01-15"),
            day("2025-01-16"),
            true,
            InsertOptions::default(),
        )
        .await;

    assert!(outcome.is_success(), "{outcome:?}");
    let mut dates = store.known_dates().await.unwrap();
    dates.sort_unstable();
    assert_eq!(dates, vec![day("2025-01-15"), day("2025-01-20")]);
    assert!(store.snapshot().iter().all(|r| r.campaign != "old"));
}

#[tokio::test]
async fn upstream_failure_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "message": "bad group"
        })))
        .mount(&server)
        .await;

    let store = MemoryFunnelStore::new();
    let outcome = importer(&server.uri(), per_day())
        .import_range(
            &store,
            day("2025-01-15"),
            day("2025-01-15"),
            false,
            InsertOptions::default(),
        )
        .await;

    match outcome {
        ImportOutcome::Failed { reason, message } => {
            assert_eq!(reason, FailureReason::Upstream);
            assert!(message.starts_with("Erro na API RedTrack"), "{message}");
            assert!(message.contains("bad group"));
        }
        other => panic!("expected failure, got: {other:?}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn no_approved_rows_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "campaign": "NT_NTE-LUIGI_fb_M_s_p", "cost": 5 }
        ])))
        .mount(&server)
        .await;

    let outcome = importer(&server.uri(), per_day())
        .import_range(
            &MemoryFunnelStore::new(),
            day("2025-01-15"),
            day("2025-01-15"),
            false,
            InsertOptions::default(),
        )
        .await;
    assert!(matches!(
        outcome,
        ImportOutcome::Failed {
            reason: FailureReason::NoValidRecords,
            ..
        }
    ));
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let outcome = importer("http://127.0.0.1:9", per_day())
        .import_range(
            &MemoryFunnelStore::new(),
            day("2025-01-16"),
            day("2025-01-15"),
            false,
            InsertOptions::default(),
        )
        .await;
    assert!(matches!(
        outcome,
        ImportOutcome::Failed {
            reason: FailureReason::InvalidRequest,
            ..
        }
    ));
}
