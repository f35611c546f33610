//! The Legal Register Table row: one row per law.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-force status of a law, with the literal strings the registry persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Live {
    #[serde(rename = "✔ In force")]
    InForce,
    #[serde(rename = "✗ Revoked")]
    Revoked,
    #[serde(rename = "Partially revoked")]
    PartiallyRevoked,
    /// Neither side had a usable signal.
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Live {
    /// Severity ranking used by live-status reconciliation when two stages disagree.
    pub fn severity(&self) -> u8 {
        match self {
            Live::Revoked => 3,
            Live::PartiallyRevoked => 2,
            Live::InForce => 1,
            Live::Unknown => 0,
        }
    }

    pub fn from_severity(severity: u8) -> Self {
        match severity {
            3 => Live::Revoked,
            2 => Live::PartiallyRevoked,
            1 => Live::InForce,
            _ => Live::Unknown,
        }
    }
}

impl std::fmt::Display for Live {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Live::InForce => "\u{2714} In force",
            Live::Revoked => "\u{2717} Revoked",
            Live::PartiallyRevoked => "Partially revoked",
            Live::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// Which stage's signal `live` was ultimately taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveSource {
    Both,
    Changes,
    Metadata,
}

/// Persisted when `amended_by`/`repeal_revoke` disagree on severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictDetail {
    pub reason: String,
    pub winner: LiveSource,
    pub changes_severity: u8,
    pub metadata_severity: u8,
}

/// One entry in the record-change log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub at: DateTime<Utc>,
    pub field: String,
    pub previous: Option<serde_json::Value>,
    pub new: Option<serde_json::Value>,
}

/// Per-counterparty amendment statistics, keyed by the counterparty's canonical name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmendmentStats {
    pub title: String,
    pub count: u32,
    pub details: Vec<AmendmentDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmendmentDetail {
    pub target: String,
    pub affect: String,
    pub applied: Option<bool>,
}

/// The eight possible function keys. Stored as an ordered map so
/// write order (Making/Commencing first, relationship-derived keys after)
/// survives a round trip; only `true` entries are ever inserted.
pub type FunctionMap = IndexMap<String, bool>;

pub const FN_MAKING: &str = "Making";
pub const FN_COMMENCING: &str = "Commencing";
pub const FN_ENACTING: &str = "Enacting";
pub const FN_ENACTING_MAKER: &str = "Enacting Maker";
pub const FN_AMENDING: &str = "Amending";
pub const FN_AMENDING_MAKER: &str = "Amending Maker";
pub const FN_REVOKING: &str = "Revoking";
pub const FN_REVOKING_MAKER: &str = "Revoking Maker";

/// A single row in the Legal Register Table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LrtRow {
    pub type_code: String,
    pub year: i32,
    pub number: String,
    pub name: String,

    pub title_en: Option<String>,

    pub live: Live,
    pub live_source: Option<LiveSource>,
    pub live_conflict: bool,
    pub live_conflict_detail: Option<ConflictDetail>,

    pub family: Option<String>,
    pub family_ii: Option<String>,

    pub function: Option<FunctionMap>,

    pub amending: Vec<String>,
    pub amended_by: Vec<String>,
    pub rescinding: Vec<String>,
    pub rescinded_by: Vec<String>,
    pub enacting: Vec<String>,
    pub enacted_by: Vec<String>,

    pub amending_stats: HashMap<String, AmendmentStats>,
    pub amended_by_stats: HashMap<String, AmendmentStats>,

    pub is_making: bool,
    pub is_commencing: bool,
    pub is_amending: bool,
    pub is_rescinding: bool,
    pub is_enacting: bool,

    pub geo_extent: Option<String>,
    pub geo_region: Vec<String>,
    pub geo_detail: Option<String>,

    pub popimar: Vec<String>,
    pub duty_holder: Vec<String>,
    pub rights_holder: Vec<String>,
    pub responsibility_holder: Vec<String>,
    pub power_holder: Vec<String>,

    pub change_log: Vec<ChangeLogEntry>,
}

impl LrtRow {
    pub fn new(type_code: impl Into<String>, year: i32, number: impl Into<String>) -> Self {
        let type_code = type_code.into();
        let number = number.into();
        let name = format!("UK_{type_code}_{year}_{number}");
        Self {
            type_code,
            year,
            number,
            name,
            title_en: None,
            live: Live::Unknown,
            live_source: None,
            live_conflict: false,
            live_conflict_detail: None,
            family: None,
            family_ii: None,
            function: None,
            amending: Vec::new(),
            amended_by: Vec::new(),
            rescinding: Vec::new(),
            rescinded_by: Vec::new(),
            enacting: Vec::new(),
            enacted_by: Vec::new(),
            amending_stats: HashMap::new(),
            amended_by_stats: HashMap::new(),
            is_making: false,
            is_commencing: false,
            is_amending: false,
            is_rescinding: false,
            is_enacting: false,
            geo_extent: None,
            geo_region: Vec::new(),
            geo_detail: None,
            popimar: Vec::new(),
            duty_holder: Vec::new(),
            rights_holder: Vec::new(),
            responsibility_holder: Vec::new(),
            power_holder: Vec::new(),
            change_log: Vec::new(),
        }
    }

    /// `is_enacting` tracks whether `enacting` is non-empty.
    pub fn sync_is_enacting(&mut self) {
        self.is_enacting = !self.enacting.is_empty();
    }
}

/// Repository-level counterpart of [`crate::normalize::ParsedLaw::merge`]:
/// a field on `new` only overwrites `existing` when it isn't `None`, an
/// empty list, or (for scalars with no such notion, e.g. booleans and
/// `live`) unconditionally, since those have no "absent" representation to
/// treat as weak. Used by every `Repository::put` so a later partial parse
/// can never clobber an earlier, more complete value with an absence.
pub fn merge_rows(existing: &LrtRow, new: LrtRow) -> LrtRow {
    let mut merged = existing.clone();

    merged.type_code = new.type_code;
    merged.year = new.year;
    merged.number = new.number;
    merged.name = new.name;

    if new.title_en.is_some() {
        merged.title_en = new.title_en;
    }

    merged.live = new.live;
    if new.live_source.is_some() {
        merged.live_source = new.live_source;
    }
    merged.live_conflict = new.live_conflict;
    if new.live_conflict_detail.is_some() {
        merged.live_conflict_detail = new.live_conflict_detail;
    }

    if new.family.is_some() {
        merged.family = new.family;
    }
    if new.family_ii.is_some() {
        merged.family_ii = new.family_ii;
    }

    if new.function.is_some() {
        merged.function = new.function;
    }

    if !new.amending.is_empty() {
        merged.amending = new.amending;
    }
    if !new.amended_by.is_empty() {
        merged.amended_by = new.amended_by;
    }
    if !new.rescinding.is_empty() {
        merged.rescinding = new.rescinding;
    }
    if !new.rescinded_by.is_empty() {
        merged.rescinded_by = new.rescinded_by;
    }
    if !new.enacting.is_empty() {
        merged.enacting = new.enacting;
    }
    if !new.enacted_by.is_empty() {
        merged.enacted_by = new.enacted_by;
    }

    if !new.amending_stats.is_empty() {
        merged.amending_stats = new.amending_stats;
    }
    if !new.amended_by_stats.is_empty() {
        merged.amended_by_stats = new.amended_by_stats;
    }

    merged.is_making = new.is_making;
    merged.is_commencing = new.is_commencing;
    merged.is_amending = new.is_amending;
    merged.is_rescinding = new.is_rescinding;
    merged.is_enacting = new.is_enacting;

    if new.geo_extent.is_some() {
        merged.geo_extent = new.geo_extent;
    }
    if !new.geo_region.is_empty() {
        merged.geo_region = new.geo_region;
    }
    if new.geo_detail.is_some() {
        merged.geo_detail = new.geo_detail;
    }

    if !new.popimar.is_empty() {
        merged.popimar = new.popimar;
    }
    if !new.duty_holder.is_empty() {
        merged.duty_holder = new.duty_holder;
    }
    if !new.rights_holder.is_empty() {
        merged.rights_holder = new.rights_holder;
    }
    if !new.responsibility_holder.is_empty() {
        merged.responsibility_holder = new.responsibility_holder;
    }
    if !new.power_holder.is_empty() {
        merged.power_holder = new.power_holder;
    }

    if !new.change_log.is_empty() {
        merged.change_log = new.change_log;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_severity_ordering() {
        assert!(Live::Revoked.severity() > Live::PartiallyRevoked.severity());
        assert!(Live::PartiallyRevoked.severity() > Live::InForce.severity());
        assert!(Live::InForce.severity() > Live::Unknown.severity());
    }

    #[test]
    fn live_severity_round_trip() {
        for live in [Live::Revoked, Live::PartiallyRevoked, Live::InForce, Live::Unknown] {
            assert_eq!(Live::from_severity(live.severity()), live);
        }
    }

    #[test]
    fn new_row_derives_canonical_name() {
        let row = LrtRow::new("uksi", 2024, "1234");
        assert_eq!(row.name, "UK_uksi_2024_1234");
    }

    #[test]
    fn sync_is_enacting_follows_enacting_array() {
        let mut row = LrtRow::new("ukpga", 1974, "37");
        assert!(!row.is_enacting);
        row.enacting.push("UK_uksi_2024_1".to_string());
        row.sync_is_enacting();
        assert!(row.is_enacting);
    }

    #[test]
    fn merge_keeps_existing_title_when_new_is_absent() {
        let mut existing = LrtRow::new("uksi", 2024, "1");
        existing.title_en = Some("The Existing Title".to_string());
        existing.amending = vec!["UK_ukpga_1974_37".to_string()];

        let mut new = LrtRow::new("uksi", 2024, "1");
        new.title_en = None;
        new.amending = Vec::new();

        let merged = merge_rows(&existing, new);
        assert_eq!(merged.title_en, Some("The Existing Title".to_string()));
        assert_eq!(merged.amending, vec!["UK_ukpga_1974_37".to_string()]);
    }

    #[test]
    fn merge_takes_new_when_non_weak() {
        let existing = LrtRow::new("uksi", 2024, "1");
        let mut new = LrtRow::new("uksi", 2024, "1");
        new.amending = vec!["UK_ukpga_1974_37".to_string(), "UK_ukpga_1974_40".to_string()];

        let merged = merge_rows(&existing, new);
        assert_eq!(
            merged.amending,
            vec!["UK_ukpga_1974_37".to_string(), "UK_ukpga_1974_40".to_string()]
        );
    }
}
