//! An in-memory [`Fetcher`] for deterministic tests: no network, no timing.

use crate::error::{FetchError, FetchResult};
use crate::Fetcher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A canned response for one path.
#[derive(Debug, Clone)]
pub enum StubResponse {
    Ok(Vec<u8>),
    NotFound,
    Transient,
    Fatal,
}

/// Maps request paths to canned [`StubResponse`]s. Paths not present in the
/// map resolve to `NotFound`, matching how a real server would behave for
/// an unregistered route.
#[derive(Default)]
pub struct StubFetcher {
    responses: HashMap<String, StubResponse>,
    /// Call counts per path, for tests asserting retry behavior.
    calls: Mutex<HashMap<String, u32>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, path: impl Into<String>, response: StubResponse) -> Self {
        self.responses.insert(path.into(), response);
        self
    }

    pub fn call_count(&self, path: &str) -> u32 {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, path: &str) -> FetchResult<Vec<u8>> {
        *self.calls.lock().unwrap().entry(path.to_string()).or_insert(0) += 1;

        match self.responses.get(path) {
            Some(StubResponse::Ok(bytes)) => Ok(bytes.clone()),
            Some(StubResponse::NotFound) | None => Err(FetchError::NotFound(path.to_string())),
            Some(StubResponse::Transient) => Err(FetchError::Transient {
                path: path.to_string(),
                reason: "stubbed transient failure".to_string(),
            }),
            Some(StubResponse::Fatal) => Err(FetchError::Fatal {
                path: path.to_string(),
                reason: "stubbed fatal failure".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unregistered_path_resolves_to_not_found() {
        let stub = StubFetcher::new();
        let err = stub.fetch("uksi/2024/1/data.xml").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn records_call_counts_per_path() {
        let stub = StubFetcher::new().with_response("x", StubResponse::Ok(vec![1]));
        stub.fetch("x").await.unwrap();
        stub.fetch("x").await.unwrap();
        assert_eq!(stub.call_count("x"), 2);
    }
}
