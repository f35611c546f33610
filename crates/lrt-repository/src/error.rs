use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no row found for citation {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
