//! Per-session bookkeeping of laws that need a downstream update as a result
//! of a newly-parsed law. State lives entirely in memory for the duration of
//! a session; nothing here is persisted beyond the session scratchpad's
//! legacy `affected_laws.json` accumulator, which `SessionStore` writes
//! separately and which this tracker supersedes.

use indexmap::IndexMap;
use lrt_core::{CascadeRow, CascadeStatus, UpdateType};
use std::sync::Mutex;

#[derive(Default)]
pub struct CascadeTracker {
    // Keyed by (session_id, affected_law); IndexMap keeps insertion order for queries.
    rows: Mutex<IndexMap<(String, String), CascadeRow>>,
}

impl CascadeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds or creates the `(session, affected_law)` row. An existing row
    /// gains `source_law` (deduplicated) and is promoted to `reparse` if the
    /// new update is `reparse` and the stored one was only `enacting_link`.
    pub fn record(
        &self,
        session_id: &str,
        affected_law: &str,
        update_type: UpdateType,
        source_law: &str,
    ) {
        let key = (session_id.to_string(), affected_law.to_string());
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&key) {
            Some(row) => {
                row.add_source(source_law);
                if update_type == UpdateType::Reparse && row.update_type == UpdateType::EnactingLink
                {
                    row.upgrade_to_reparse();
                }
            }
            None => {
                rows.insert(
                    key,
                    CascadeRow::new(session_id, affected_law, update_type, source_law),
                );
            }
        }
    }

    pub fn upgrade_to_reparse(&self, session_id: &str, affected_law: &str) {
        let key = (session_id.to_string(), affected_law.to_string());
        if let Some(row) = self.rows.lock().unwrap().get_mut(&key) {
            row.upgrade_to_reparse();
        }
    }

    pub fn mark_processed(&self, session_id: &str, affected_law: &str) {
        let key = (session_id.to_string(), affected_law.to_string());
        if let Some(row) = self.rows.lock().unwrap().get_mut(&key) {
            row.mark_processed();
        }
    }

    pub fn by_session(&self, session_id: &str) -> Vec<CascadeRow> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn by_session_and_type(&self, session_id: &str, update_type: UpdateType) -> Vec<CascadeRow> {
        self.by_session(session_id)
            .into_iter()
            .filter(|r| r.update_type == update_type)
            .collect()
    }

    pub fn by_session_and_status(&self, session_id: &str, status: CascadeStatus) -> Vec<CascadeRow> {
        self.by_session(session_id)
            .into_iter()
            .filter(|r| r.status == status)
            .collect()
    }

    pub fn pending_for_session(&self, session_id: &str) -> Vec<CascadeRow> {
        self.by_session_and_status(session_id, CascadeStatus::Pending)
    }

    pub fn by_session_and_law(&self, session_id: &str, affected_law: &str) -> Option<CascadeRow> {
        self.rows
            .lock()
            .unwrap()
            .get(&(session_id.to_string(), affected_law.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_records_dedup_source_laws_and_preserve_order() {
        let tracker = CascadeTracker::new();
        tracker.record("s1", "UK_ukpga_1974_37", UpdateType::EnactingLink, "UK_uksi_2024_1");
        tracker.record("s1", "UK_ukpga_1974_37", UpdateType::EnactingLink, "UK_uksi_2024_2");
        tracker.record("s1", "UK_ukpga_1974_37", UpdateType::EnactingLink, "UK_uksi_2024_1");

        let row = tracker.by_session_and_law("s1", "UK_ukpga_1974_37").unwrap();
        assert_eq!(
            row.source_laws,
            vec!["UK_uksi_2024_1".to_string(), "UK_uksi_2024_2".to_string()]
        );
    }

    #[test]
    fn reparse_promotes_existing_enacting_link_row() {
        let tracker = CascadeTracker::new();
        tracker.record("s1", "UK_uksi_2024_5", UpdateType::EnactingLink, "UK_uksi_2024_1");
        tracker.record("s1", "UK_uksi_2024_5", UpdateType::Reparse, "UK_uksi_2024_2");

        let row = tracker.by_session_and_law("s1", "UK_uksi_2024_5").unwrap();
        assert_eq!(row.update_type, UpdateType::Reparse);
    }

    #[test]
    fn reparse_never_demoted_back_to_enacting_link() {
        let tracker = CascadeTracker::new();
        tracker.record("s1", "UK_uksi_2024_5", UpdateType::Reparse, "UK_uksi_2024_1");
        tracker.record("s1", "UK_uksi_2024_5", UpdateType::EnactingLink, "UK_uksi_2024_2");

        let row = tracker.by_session_and_law("s1", "UK_uksi_2024_5").unwrap();
        assert_eq!(row.update_type, UpdateType::Reparse);
    }

    #[test]
    fn mark_processed_is_terminal_and_filters_pending_queries() {
        let tracker = CascadeTracker::new();
        tracker.record("s1", "UK_uksi_2024_5", UpdateType::Reparse, "UK_uksi_2024_1");
        tracker.mark_processed("s1", "UK_uksi_2024_5");

        assert!(tracker.pending_for_session("s1").is_empty());
        assert_eq!(
            tracker
                .by_session_and_status("s1", CascadeStatus::Processed)
                .len(),
            1
        );
    }

    #[test]
    fn sessions_are_isolated_from_each_other() {
        let tracker = CascadeTracker::new();
        tracker.record("s1", "UK_uksi_2024_5", UpdateType::Reparse, "UK_uksi_2024_1");
        tracker.record("s2", "UK_uksi_2024_5", UpdateType::Reparse, "UK_uksi_2024_9");

        assert_eq!(tracker.by_session("s1").len(), 1);
        assert_eq!(tracker.by_session("s2").len(), 1);
        assert_eq!(
            tracker.by_session_and_law("s1", "UK_uksi_2024_5").unwrap().source_laws,
            vec!["UK_uksi_2024_1".to_string()]
        );
    }
}
