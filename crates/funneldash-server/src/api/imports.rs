//! Mutating endpoints: CSV upload and RedTrack range import, plus the
//! RedTrack connection probe.

use std::str::FromStr;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use funneldash_core::{FailureReason, ImportOutcome};
use funneldash_ingest::{import_csv, CsvParser, RoiPolicy};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

const REDTRACK_NOT_CONFIGURED: &str = "Integração RedTrack não configurada (REDTRACK_API_KEY)";

/// Import outcome plus an explicit `success` flag for clients that do not
/// branch on the `outcome` tag.
#[derive(Debug, Serialize)]
pub(super) struct ImportResult {
    success: bool,
    #[serde(flatten)]
    outcome: ImportOutcome,
}

fn outcome_status(outcome: &ImportOutcome) -> StatusCode {
    match outcome {
        ImportOutcome::Imported { .. } => StatusCode::OK,
        ImportOutcome::Conflict { .. } => StatusCode::CONFLICT,
        ImportOutcome::Failed { reason, .. } => match reason {
            FailureReason::EmptyCsv
            | FailureReason::NoValidRecords
            | FailureReason::MalformedCsv
            | FailureReason::InvalidRequest => StatusCode::UNPROCESSABLE_ENTITY,
            FailureReason::Upstream => StatusCode::BAD_GATEWAY,
            FailureReason::Storage | FailureReason::NotConfigured => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        },
    }
}

fn outcome_response(outcome: ImportOutcome, request_id: String) -> Response {
    let status = outcome_status(&outcome);
    let body = ImportResult {
        success: outcome.is_success(),
        outcome,
    };
    (status, Json(ApiResponse::new(body, request_id))).into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadRequest {
    csv: String,
    #[serde(default)]
    replace: bool,
    /// `computed` (default) or `reported`.
    roi_policy: Option<String>,
}

pub(super) async fn upload_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<UploadRequest>,
) -> Result<Response, ApiError> {
    let roi_policy = match body.roi_policy.as_deref() {
        None => RoiPolicy::default(),
        Some(raw) => RoiPolicy::from_str(raw)
            .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e))?,
    };

    let parser = CsvParser::new(&state.extractor).with_roi_policy(roi_policy);
    let outcome = import_csv(
        state.store.as_ref(),
        &parser,
        &body.csv,
        body.replace,
        state.insert_options,
    )
    .await;
    Ok(outcome_response(outcome, req_id.0))
}

#[derive(Debug, Deserialize)]
pub(super) struct RedTrackImportRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default)]
    replace: bool,
}

pub(super) async fn import_redtrack(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RedTrackImportRequest>,
) -> Response {
    let Some(importer) = state.redtrack.as_ref() else {
        let outcome = ImportOutcome::failed(FailureReason::NotConfigured, REDTRACK_NOT_CONFIGURED);
        return outcome_response(outcome, req_id.0);
    };

    tracing::info!(
        start = %body.start_date,
        end = %body.end_date,
        replace = body.replace,
        "RedTrack import requested"
    );
    let outcome = importer
        .import_range(
            state.store.as_ref(),
            body.start_date,
            body.end_date,
            body.replace,
            state.insert_options,
        )
        .await;
    outcome_response(outcome, req_id.0)
}

#[derive(Debug, Serialize)]
pub(super) struct ProbeData {
    success: bool,
    message: &'static str,
}

pub(super) async fn probe_redtrack(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ProbeData>> {
    let data = match state.redtrack.as_ref() {
        None => ProbeData {
            success: false,
            message: REDTRACK_NOT_CONFIGURED,
        },
        Some(importer) => {
            if importer.probe().await {
                ProbeData {
                    success: true,
                    message: "Conexão com a RedTrack estabelecida",
                }
            } else {
                ProbeData {
                    success: false,
                    message: "Falha ao conectar com a RedTrack",
                }
            }
        }
    };
    Json(ApiResponse::new(data, req_id.0))
}
