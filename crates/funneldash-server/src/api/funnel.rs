//! Read endpoints. Storage failures degrade to empty payloads inside
//! [`Dashboard`], so these handlers never return a storage error.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use funneldash_core::{
    DailyTotal, Dashboard, FilterOptions, FunnelFilters, FunnelMatrix, GroupedRow, Totals,
};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

const MAX_CHECK_DATES: usize = 366;

fn dashboard(state: &AppState) -> Dashboard<'_, dyn funneldash_core::FunnelStore> {
    Dashboard::new(state.store.as_ref(), state.schema)
}

pub(super) async fn list_rows(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(filters): Query<FunnelFilters>,
) -> Json<ApiResponse<Vec<GroupedRow>>> {
    let rows = dashboard(&state).grouped_rows(&filters.normalized()).await;
    Json(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn get_matrix(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(filters): Query<FunnelFilters>,
) -> Json<ApiResponse<FunnelMatrix>> {
    let matrix = dashboard(&state).matrix(&filters.normalized()).await;
    Json(ApiResponse::new(matrix, req_id.0))
}

pub(super) async fn get_totals(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(filters): Query<FunnelFilters>,
) -> Json<ApiResponse<Totals>> {
    let totals = dashboard(&state).totals(&filters.normalized()).await;
    Json(ApiResponse::new(totals, req_id.0))
}

pub(super) async fn list_daily_totals(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(filters): Query<FunnelFilters>,
) -> Json<ApiResponse<Vec<DailyTotal>>> {
    let daily = dashboard(&state).daily_totals(&filters.normalized()).await;
    Json(ApiResponse::new(daily, req_id.0))
}

pub(super) async fn get_filter_options(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<FilterOptions>> {
    let options = dashboard(&state).filter_options().await;
    Json(ApiResponse::new(options, req_id.0))
}

pub(super) async fn list_known_dates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<NaiveDate>>> {
    let dates = dashboard(&state).known_dates().await;
    Json(ApiResponse::new(dates, req_id.0))
}

#[derive(Debug, Deserialize)]
pub(super) struct CheckDatesRequest {
    dates: Vec<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(super) struct CheckDatesData {
    existing: Vec<NaiveDate>,
}

pub(super) async fn check_dates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CheckDatesRequest>,
) -> Result<Json<ApiResponse<CheckDatesData>>, ApiError> {
    if body.dates.len() > MAX_CHECK_DATES {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("at most {MAX_CHECK_DATES} dates per request"),
        ));
    }
    let existing = dashboard(&state).check_dates(&body.dates).await;
    Ok(Json(ApiResponse::new(CheckDatesData { existing }, req_id.0)))
}
