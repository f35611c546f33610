//! Engine-wide configuration, loadable from a TOML file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EngineResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            max_attempts: default_max_attempts(),
            backoff_cap_ms: default_backoff_cap_ms(),
        }
    }
}

fn default_initial_backoff_ms() -> u64 {
    250
}
fn default_backoff_factor() -> u32 {
    2
}
fn default_max_attempts() -> u32 {
    4
}
fn default_backoff_cap_ms() -> u64 {
    4_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default = "default_taxa_largeness_threshold")]
    pub taxa_largeness_threshold: usize,

    #[serde(default = "default_sessions_root")]
    pub sessions_root: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            retry: RetryPolicy::default(),
            taxa_largeness_threshold: default_taxa_largeness_threshold(),
            sessions_root: default_sessions_root(),
        }
    }
}

fn default_worker_count() -> usize {
    4
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_taxa_largeness_threshold() -> usize {
    200_000
}
fn default_sessions_root() -> String {
    "sessions".to_string()
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub async fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&text)
    }
}
