use super::models::HealthCheck;
use crate::common::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(healthz))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = OK, description = "Dashboard and operational store are reachable", body = HealthCheck),
        (status = SERVICE_UNAVAILABLE, description = "Operational store did not answer a ping", body = HealthCheck)
    )
)]
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    if let Err(err) = state.db.ping().await {
        tracing::warn!("Health check could not ping the database: {err}");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthCheck {
                status: "error".to_string(),
                app_name: state.config.app_name.clone(),
                database: "unreachable".to_string(),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(HealthCheck {
            status: "ok".to_string(),
            app_name: state.config.app_name.clone(),
            database: "ok".to_string(),
        }),
    )
}
