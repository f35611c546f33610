//! LRT-Fetch: the HTTP fetch contract for upstream legislation documents.
//!
//! Every parser stage reaches legislation.gov.uk content through a
//! `Fetcher`, never through a raw client, so that tests can swap in
//! [`StubFetcher`] and the engine can swap in [`ReqwestFetcher`] without
//! either side knowing about the other.

mod error;
pub mod reqwest_fetcher;
pub mod stub_fetcher;

pub use error::{FetchError, FetchResult};
pub use reqwest_fetcher::ReqwestFetcher;
pub use stub_fetcher::{StubFetcher, StubResponse};

use async_trait::async_trait;

/// Fetches the raw bytes at `path`, a path relative to the fetcher's base
/// URL (e.g. `uksi/2024/1001/introduction/data.xml`).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> FetchResult<Vec<u8>>;

    /// Fetches an introduction document, retrying against the `/made/`
    /// path segment when the initial request 404s - the documented
    /// redirect shape for statutory instruments whose introduction text
    /// is only published once the instrument is made.
    async fn fetch_introduction(&self, path: &str) -> FetchResult<Vec<u8>> {
        match self.fetch(path).await {
            Err(FetchError::NotFound(_)) => {
                let made_path = insert_made_segment(path);
                self.fetch(&made_path).await
            }
            other => other,
        }
    }
}

/// Rewrites `<type>/<year>/<number>/introduction/data.xml` into
/// `<type>/<year>/<number>/made/introduction/data.xml`.
fn insert_made_segment(path: &str) -> String {
    match path.find("/introduction/") {
        Some(idx) => {
            let (head, tail) = path.split_at(idx);
            format!("{head}/made{tail}")
        }
        None => format!("{path}/made"),
    }
}
