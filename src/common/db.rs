use crate::common::errors::{DbErrorExt, PipelineError};
use crate::config::Config;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection};

/// Open the operational store, point it at the configured schema and make
/// sure the botanist/plant/recording tables exist.
///
/// Batch runs pass `max_connections = 1`: one connection per run, closed
/// explicitly by the caller when the run ends.
///
/// # Errors
///
/// Returns `PipelineError::Database` if the connection, schema creation or
/// migrations fail.
pub async fn connect(
    config: &Config,
    max_connections: u32,
) -> Result<DatabaseConnection, PipelineError> {
    let mut options = ConnectOptions::new(config.db_url.clone());
    options
        .max_connections(max_connections)
        .min_connections(1)
        .sqlx_logging(false);
    if is_postgres_url(&config.db_url) {
        options.set_schema_search_path(config.db_schema.clone());
    }

    let db = Database::connect(options).await.map_err(|e| {
        tracing::error!("Failed to connect to the database: {e}");
        e.to_pipeline_error("connect")
    })?;
    tracing::info!("Database connection established");

    if db.get_database_backend() == DatabaseBackend::Postgres {
        // The name was checked against the allow-list and identifier rules in Config
        db.execute_unprepared(&format!(
            "CREATE SCHEMA IF NOT EXISTS \"{}\"",
            config.db_schema
        ))
        .await
        .map_err(|e| e.to_pipeline_error("schema creation"))?;
    }

    Migrator::up(&db, None).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {e}");
        e.to_pipeline_error("migrations")
    })?;

    Ok(db)
}

/// Close a connection opened by [`connect`], logging instead of failing so
/// it can run on early-exit paths too.
pub async fn close(db: DatabaseConnection) {
    match db.close().await {
        Ok(()) => tracing::info!("Database connection closed"),
        Err(e) => tracing::warn!("Error while closing database connection: {e}"),
    }
}

fn is_postgres_url(url: &str) -> bool {
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_url_detection() {
        assert!(is_postgres_url("postgresql://u:p@localhost:5432/plants"));
        assert!(is_postgres_url("postgres://u:p@localhost/plants"));
        assert!(!is_postgres_url("sqlite::memory:"));
    }

    #[tokio::test]
    async fn test_connect_runs_migrations() {
        let db = test_helpers::setup_test_db().await;
        let result = db
            .execute_unprepared("SELECT COUNT(*) FROM main.recording")
            .await;
        assert!(result.is_ok(), "recording table missing: {result:?}");
        close(db).await;
    }
}
