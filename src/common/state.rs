use crate::config::Config;
use crate::external::s3::ColdStorage;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub storage: Arc<dyn ColdStorage>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, storage: Arc<dyn ColdStorage>) -> Self {
        Self {
            db,
            config,
            storage,
        }
    }
}
