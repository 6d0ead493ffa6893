use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidsqlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for VidsqlError {
    fn from(e: sqlx::Error) -> Self {
        VidsqlError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VidsqlError>;
