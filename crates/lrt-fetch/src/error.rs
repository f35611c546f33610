use thiserror::Error;

/// The three outcome kinds a [`crate::Fetcher`] can report. Callers branch
/// on the kind, not on the underlying transport error, so `ReqwestFetcher`
/// and `StubFetcher` can disagree on transport but agree on meaning.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient error fetching {path}: {reason}")]
    Transient { path: String, reason: String },

    #[error("fatal error fetching {path}: {reason}")]
    Fatal { path: String, reason: String },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
