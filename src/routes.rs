use crate::common::state::AppState;
use crate::config::Config;
use crate::dashboard;
use crate::external::s3::ColdStorage;
use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

pub fn build_router(
    db: &DatabaseConnection,
    config: &Config,
    storage: Arc<dyn ColdStorage>,
) -> Router {
    #[derive(OpenApi)]
    #[openapi(info(
        title = "Plant monitor",
        description = "Real-time and archived sensor readings of the botanical collection"
    ))]
    struct ApiDoc;

    let app_state = AppState::new(db.clone(), config.clone(), storage);

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(crate::common::views::router(&app_state))
        .nest("/api", dashboard::views::router(&app_state))
        .split_for_parts();

    router.merge(Scalar::with_url("/api/docs", api))
}
