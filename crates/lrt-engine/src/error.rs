use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fetch error: {0}")]
    Fetch(#[from] lrt_fetch::FetchError),

    #[error("parse error: {0}")]
    Parse(#[from] lrt_parse::ParseError),

    #[error("repository error: {0}")]
    Repository(#[from] lrt_repository::RepositoryError),

    #[error("core error: {0}")]
    Core(#[from] lrt_core::CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("cancelled by client")]
    Cancelled,
}

pub type EngineResult<T> = Result<T, EngineError>;
