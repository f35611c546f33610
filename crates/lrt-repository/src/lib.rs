//! LRT-Repository: storage backends for the LRT and LAT tables.
//!
//! `Repository` and `LatRepository` are the seams `lrt-engine` depends on;
//! `memory` gives an in-memory implementation for tests and small runs,
//! `sqlite` (behind the `sqlite` feature) gives a durable one.

pub mod error;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::{InMemoryLatRepository, InMemoryRepository};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use lrt_core::{FunctionMap, LatRow, LrtRow};
use std::collections::HashMap;

/// Storage for LRT rows, keyed by canonical citation name.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get(&self, name: &str) -> RepositoryResult<Option<LrtRow>>;

    /// Persists `row`. A row already on file is merged with `row` via
    /// `lrt_core::merge_rows` rather than overwritten outright, so a later
    /// partial parse can never clobber an earlier, more complete field with
    /// an absence.
    async fn put(&self, row: LrtRow) -> RepositoryResult<()>;

    /// All rows, in the order they were first inserted.
    async fn all(&self) -> RepositoryResult<Vec<LrtRow>>;

    async fn delete(&self, name: &str) -> RepositoryResult<()>;

    /// `is_making` for every name in `names`, as one query. The default
    /// implementation is a fallback for backends with no faster batched
    /// path; `SqliteRepository` overrides it with a single `IN (...)` query.
    async fn lookup_is_making(&self, names: &[String]) -> RepositoryResult<HashMap<String, bool>> {
        let mut result = HashMap::with_capacity(names.len());
        for name in names {
            if let Some(row) = self.get(name).await? {
                result.insert(name.clone(), row.is_making);
            }
        }
        Ok(result)
    }

    /// Extends a parent's `enacting` array (and refreshes its `is_enacting`
    /// flag and function map) after a child law newly cites it as an
    /// enabling power. A missing parent is left unwritten - creating one is
    /// the cascade sweep's fetch-and-add step, not this call's job. Default
    /// implementation round-trips through `get`/`put`; a backend with a
    /// direct `UPDATE` path may override it.
    async fn update_enacting(
        &self,
        name: &str,
        enacting: Vec<String>,
        is_enacting: bool,
        function: Option<FunctionMap>,
    ) -> RepositoryResult<()> {
        if let Some(mut row) = self.get(name).await? {
            row.enacting = enacting;
            row.is_enacting = is_enacting;
            row.function = function;
            self.put(row).await?;
        }
        Ok(())
    }
}

/// Storage for LAT rows. A law's structural rows are always replaced as a
/// unit - a reparse discards the previous set rather than patching it.
#[async_trait]
pub trait LatRepository: Send + Sync {
    async fn replace_rows(&self, law_name: &str, rows: Vec<LatRow>) -> RepositoryResult<()>;

    async fn rows_for(&self, law_name: &str) -> RepositoryResult<Vec<LatRow>>;

    async fn delete_rows(&self, law_name: &str) -> RepositoryResult<()>;
}
