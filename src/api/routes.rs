use crate::advisor::AdvisoryError;
use crate::analyzer::{MAX_REDUCTION_PERCENT, MIN_REDUCTION_PERCENT};
use crate::calculator::{CalculationError, CategoryBreakdown};
use crate::climate::ClimateContext;
use crate::context::{AdviceOutcome, AdviceRequest, AppContext, Calculation, FootprintSelection};
use crate::db::{
    FootprintRow, InsightRow, MAX_WINDOW_DAYS, TrendPoint, WindowStatistics, format_timestamp,
};
use crate::emissions::EmissionFactorTable;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const MAX_LIST_LIMIT: usize = 500;

#[derive(Clone)]
pub struct ApiState {
    pub context: Arc<AppContext>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/factors", get(factors))
        .route("/api/v1/climate", get(climate))
        .route("/api/v1/footprints/calculate", post(calculate))
        .route("/api/v1/footprints", get(footprints).post(save_footprint))
        .route("/api/v1/footprints/:id", get(footprint_by_id))
        .route("/api/v1/statistics", get(statistics))
        .route("/api/v1/trend", get(trend))
        .route("/api/v1/breakdown", get(breakdown))
        .route("/api/v1/advice", post(advice))
        .route("/api/v1/insights", get(insights))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SavePayload {
    #[serde(flatten)]
    selection: FootprintSelection,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct SavedPayload {
    id: i64,
    calculation: Calculation,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    version: &'static str,
    last_footprint_at: Option<String>,
    region: String,
    stats_window_days: u32,
    live_data_enabled: bool,
    grid_strategies: Vec<&'static str>,
    advisory_model: String,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct BreakdownPayload {
    period_days: u32,
    averages: Option<CategoryBreakdown>,
}

#[derive(Debug, Serialize)]
struct TrendPayload {
    period_days: u32,
    points: Vec<TrendPoint>,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let context = &state.context;
    let config = context.config();
    let database = context.open_database()?;

    Ok(Json(StatusPayload {
        version: env!("CARGO_PKG_VERSION"),
        last_footprint_at: database
            .latest_footprint_timestamp()?
            .map(|timestamp| format_timestamp(&timestamp)),
        region: config.region.clone(),
        stats_window_days: config.stats_window_days,
        live_data_enabled: config.live_data_enabled,
        grid_strategies: context.resolver().strategy_names(),
        advisory_model: context.advisor().model().to_string(),
        api_port: config.api_port,
    }))
}

async fn factors(State(state): State<ApiState>) -> Json<EmissionFactorTable> {
    Json(state.context.factors().clone())
}

async fn climate(State(state): State<ApiState>) -> Json<ClimateContext> {
    let context = &state.context;
    Json(
        context
            .climate()
            .climate_context(context.factors().paris_daily_target()),
    )
}

async fn calculate(
    State(state): State<ApiState>,
    Json(selection): Json<FootprintSelection>,
) -> ApiResult<Json<Calculation>> {
    Ok(Json(state.context.calculate(&selection)?))
}

async fn save_footprint(
    State(state): State<ApiState>,
    Json(payload): Json<SavePayload>,
) -> ApiResult<(StatusCode, Json<SavedPayload>)> {
    let calculation = state.context.calculate(&payload.selection)?;
    let id = state.context.save_footprint(
        &calculation,
        payload.location.as_deref(),
        payload.notes.as_deref(),
    )?;

    Ok((StatusCode::CREATED, Json(SavedPayload { id, calculation })))
}

async fn footprints(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<FootprintRow>>> {
    let limit = list_limit(query.limit, 20)?;
    let rows = state.context.open_database()?.recent_footprints(limit)?;
    Ok(Json(rows))
}

async fn footprint_by_id(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<FootprintRow>> {
    state
        .context
        .open_database()?
        .footprint(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No footprint with id {id}")))
}

async fn statistics(
    State(state): State<ApiState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<WindowStatistics>> {
    let days = window_days(&state, query.days)?;
    let summary = state.context.open_database()?.statistics(days)?;
    Ok(Json(summary))
}

async fn trend(
    State(state): State<ApiState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<TrendPayload>> {
    let period_days = window_days(&state, query.days)?;
    let points = state.context.open_database()?.trend(period_days)?;
    Ok(Json(TrendPayload {
        period_days,
        points,
    }))
}

async fn breakdown(
    State(state): State<ApiState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<BreakdownPayload>> {
    let period_days = window_days(&state, query.days)?;
    let averages = state
        .context
        .open_database()?
        .category_breakdown(period_days)?;
    Ok(Json(BreakdownPayload {
        period_days,
        averages,
    }))
}

async fn advice(
    State(state): State<ApiState>,
    Json(request): Json<AdviceRequest>,
) -> ApiResult<Json<AdviceOutcome>> {
    let out_of_range = request
        .reduction_percent
        .is_some_and(|reduction| {
            !(MIN_REDUCTION_PERCENT..=MAX_REDUCTION_PERCENT).contains(&reduction)
        });
    if out_of_range {
        return Err(ApiError::BadRequest(format!(
            "reduction_percent must be between {MIN_REDUCTION_PERCENT} and {MAX_REDUCTION_PERCENT}"
        )));
    }

    Ok(Json(state.context.advise(&request).await?))
}

async fn insights(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<InsightRow>>> {
    let limit = list_limit(query.limit, 5)?;
    let rows = state.context.open_database()?.recent_insights(limit)?;
    Ok(Json(rows))
}

fn window_days(state: &ApiState, requested: Option<u32>) -> ApiResult<u32> {
    let days = requested.unwrap_or(state.context.config().stats_window_days);
    if (1..=MAX_WINDOW_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ApiError::BadRequest(format!(
            "days must be between 1 and {MAX_WINDOW_DAYS}"
        )))
    }
}

fn list_limit(requested: Option<usize>, default: usize) -> ApiResult<usize> {
    let limit = requested.unwrap_or(default);
    if (1..=MAX_LIST_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )))
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(anyhow::Error),
}

impl From<CalculationError> for ApiError {
    fn from(value: CalculationError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        if let Some(error) = value.downcast_ref::<CalculationError>() {
            return Self::BadRequest(error.to_string());
        }
        if let Some(error) = value.downcast_ref::<AdvisoryError>() {
            return Self::BadGateway(error.to_string());
        }
        Self::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal(error) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{error:#}")),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
