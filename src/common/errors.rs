use sea_orm::DbErr;
use std::fmt;

/// Errors that abort a pipeline, archive or seeding run.
///
/// Data-validity problems never show up here: bad rows are filtered out by
/// the transform stage and source API failures are skipped per plant.
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Connection or statement failure in the operational store
    Database { stage: String, message: String },
    /// Upload/download failure against cold storage
    Storage {
        operation: String,
        key: String,
        message: String,
    },
    /// The requested snapshot does not exist in cold storage
    NotFound { key: String },
    /// Parquet encoding or decoding failed
    Snapshot { message: String },
    /// Local file handling (temporary snapshot file, CSV audit files)
    Io { message: String },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Database { stage, message } => {
                write!(f, "Database error during {stage}: {message}")
            }
            PipelineError::Storage {
                operation,
                key,
                message,
            } => {
                write!(f, "Cold storage {operation} of '{key}' failed: {message}")
            }
            PipelineError::NotFound { key } => {
                write!(f, "Snapshot '{key}' not found in cold storage")
            }
            PipelineError::Snapshot { message } => write!(f, "Snapshot error: {message}"),
            PipelineError::Io { message } => write!(f, "I/O error: {message}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    pub fn storage(operation: &str, key: &str, err: impl fmt::Display) -> Self {
        PipelineError::Storage {
            operation: operation.to_string(),
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn snapshot(err: impl fmt::Display) -> Self {
        PipelineError::Snapshot {
            message: err.to_string(),
        }
    }

    pub fn io(err: impl fmt::Display) -> Self {
        PipelineError::Io {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::io(err)
    }
}

/// Extension trait to tag a `DbErr` with the stage it happened in
pub trait DbErrorExt {
    fn to_pipeline_error(self, stage: &str) -> PipelineError;
}

impl DbErrorExt for DbErr {
    fn to_pipeline_error(self, stage: &str) -> PipelineError {
        PipelineError::Database {
            stage: stage.to_string(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_stage_and_key() {
        let err = DbErr::Custom("connection reset".to_string()).to_pipeline_error("plant upsert");
        let message = err.to_string();
        assert!(message.starts_with("Database error during plant upsert: "));
        assert!(message.contains("connection reset"));

        let err = PipelineError::storage("upload", "plant_data/2024-11-25.parquet", "denied");
        assert_eq!(
            err.to_string(),
            "Cold storage upload of 'plant_data/2024-11-25.parquet' failed: denied"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let err: PipelineError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file").into();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert_eq!(err.to_string(), "I/O error: no such file");
    }
}
