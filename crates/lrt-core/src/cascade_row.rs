//! The cascade affected-law row. The update semantics live in
//! `lrt-engine::cascade_tracker`; this crate only owns the row shape so
//! both the tracker and the repository layer can agree on it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Reparse,
    EnactingLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStatus {
    Pending,
    Processed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeRow {
    pub session_id: String,
    pub affected_law: String,
    pub update_type: UpdateType,
    /// Duplicates suppressed, insertion order preserved.
    pub source_laws: Vec<String>,
    pub status: CascadeStatus,
}

impl CascadeRow {
    pub fn new(
        session_id: impl Into<String>,
        affected_law: impl Into<String>,
        update_type: UpdateType,
        source_law: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            affected_law: affected_law.into(),
            update_type,
            source_laws: vec![source_law.into()],
            status: CascadeStatus::Pending,
        }
    }

    /// Appends `source_law` iff not already present (dedup, order preserved).
    pub fn add_source(&mut self, source_law: &str) {
        if !self.source_laws.iter().any(|s| s == source_law) {
            self.source_laws.push(source_law.to_string());
        }
    }

    /// `enacting_link` may be promoted to `reparse`, never the reverse.
    pub fn upgrade_to_reparse(&mut self) {
        self.update_type = UpdateType::Reparse;
    }

    pub fn mark_processed(&mut self) {
        self.status = CascadeStatus::Processed;
    }
}
