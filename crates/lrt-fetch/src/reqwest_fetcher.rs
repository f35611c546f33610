//! The production [`Fetcher`](crate::Fetcher): a `reqwest::Client` with
//! exponential-backoff retry for transient failures.

use crate::error::{FetchError, FetchResult};
use crate::Fetcher;
use async_trait::async_trait;
use std::time::Duration;

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const BACKOFF_FACTOR: u32 = 2;
const MAX_ATTEMPTS: u32 = 4;
const BACKOFF_CAP: Duration = Duration::from_secs(4);

/// Fetches documents from legislation.gov.uk (or any base URL with the same
/// path conventions) over HTTPS, retrying transient failures with
/// exponential backoff.
pub struct ReqwestFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn fetch_once(&self, path: &str) -> FetchResult<Vec<u8>> {
        let url = self.url_for(path);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                FetchError::Transient {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            } else {
                FetchError::Fatal {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(path.to_string()));
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Transient {
                path: path.to_string(),
                reason: format!("upstream status {status}"),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Fatal {
                path: path.to_string(),
                reason: format!("upstream status {status}"),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Transient {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, path: &str) -> FetchResult<Vec<u8>> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.fetch_once(path).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        target: "lrt::fetch",
                        path,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * BACKOFF_FACTOR).min(BACKOFF_CAP);
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| FetchError::Fatal {
            path: path.to_string(),
            reason: "exhausted retries with no recorded error".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_joins_base_and_path_cleanly() {
        let fetcher = ReqwestFetcher::new("https://www.legislation.gov.uk/");
        assert_eq!(
            fetcher.url_for("/uksi/2024/1001/data.xml"),
            "https://www.legislation.gov.uk/uksi/2024/1001/data.xml"
        );
    }
}
