use super::charts::{SVG_CONTENT_TYPE, render_line_chart};
use super::models::{DashboardView, HistoricalQuery, Metric, RealtimeQuery};
use super::services::{historical_view, realtime_view};
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_realtime))
        .routes(routes!(get_realtime_chart))
        .routes(routes!(get_historical))
        .routes(routes!(get_historical_chart))
        .with_state(state.clone())
}

fn svg_response(view: &DashboardView, metric: Metric) -> Response {
    let svg = render_line_chart(
        metric,
        view.selected_plant.as_deref(),
        view.series(metric),
        view.notice.as_ref(),
    );
    ([(header::CONTENT_TYPE, SVG_CONTENT_TYPE)], svg).into_response()
}

async fn historical(state: &AppState, query: &HistoricalQuery) -> DashboardView {
    historical_view(
        state.storage.as_ref(),
        &state.config.s3_key_prefix,
        query.plant.as_deref(),
        query.start,
        query.end,
        Utc::now().date_naive(),
    )
    .await
}

/// Most recent readings of one plant from the operational store
#[utoipa::path(
    get,
    path = "/realtime",
    params(RealtimeQuery),
    responses(
        (status = OK, description = "Real-time view; problems are reported in `notice`", body = DashboardView)
    ),
    tag = "dashboard"
)]
pub async fn get_realtime(
    State(state): State<AppState>,
    Query(query): Query<RealtimeQuery>,
) -> Json<DashboardView> {
    Json(realtime_view(&state.db, query.plant.as_deref(), state.config.realtime_window).await)
}

#[utoipa::path(
    get,
    path = "/realtime/chart/{metric}",
    params(
        ("metric" = Metric, Path, description = "temperature or soil_moisture"),
        RealtimeQuery
    ),
    responses(
        (status = OK, description = "SVG line chart", content_type = "image/svg+xml", body = String)
    ),
    tag = "dashboard"
)]
pub async fn get_realtime_chart(
    State(state): State<AppState>,
    Path(metric): Path<Metric>,
    Query(query): Query<RealtimeQuery>,
) -> Response {
    let view =
        realtime_view(&state.db, query.plant.as_deref(), state.config.realtime_window).await;
    svg_response(&view, metric)
}

/// Archived readings of one plant over a range of days
#[utoipa::path(
    get,
    path = "/historical",
    params(HistoricalQuery),
    responses(
        (status = OK, description = "Historical view; problems are reported in `notice`", body = DashboardView)
    ),
    tag = "dashboard"
)]
pub async fn get_historical(
    State(state): State<AppState>,
    Query(query): Query<HistoricalQuery>,
) -> Json<DashboardView> {
    Json(historical(&state, &query).await)
}

#[utoipa::path(
    get,
    path = "/historical/chart/{metric}",
    params(
        ("metric" = Metric, Path, description = "temperature or soil_moisture"),
        HistoricalQuery
    ),
    responses(
        (status = OK, description = "SVG line chart", content_type = "image/svg+xml", body = String)
    ),
    tag = "dashboard"
)]
pub async fn get_historical_chart(
    State(state): State<AppState>,
    Path(metric): Path<Metric>,
    Query(query): Query<HistoricalQuery>,
) -> Response {
    let view = historical(&state, &query).await;
    svg_response(&view, metric)
}
