//! The orchestrator: a fixed seven-stage pipeline per law, each stage
//! fetching (except `taxa`, which is CPU-bound), parsing, and merging its
//! output into the working record.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use lrt_core::{Citation, ConflictDetail, Live, LiveSource, LrtRow, ParsedLaw};
use lrt_fetch::{FetchError, Fetcher};
use lrt_parse::{AmendingParser, EnactingParser, ExtentParser, LatParser, MetadataParser};
use lrt_taxa::TaxaClassifier;
use serde_json::Value;

use crate::citation_builder::CitationBuilder;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

pub const STAGE_ORDER: &[&str] = &[
    "metadata",
    "extent",
    "enacted_by",
    "amending",
    "amended_by",
    "repeal_revoke",
    "taxa",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Ok,
    Error,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StageResult {
    pub status: StageStatus,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl StageResult {
    fn ok(data: Value) -> Self {
        Self {
            status: StageStatus::Ok,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Error,
            data: None,
            error: Some(message.into()),
        }
    }

    fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skipped,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub enum ProgressEvent<'a> {
    StageStart {
        stage: &'a str,
        index: usize,
        total: usize,
    },
    StageComplete {
        stage: &'a str,
        result: &'a StageResult,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressControl {
    Continue,
    Abort,
}

pub struct ParseOutcome {
    pub record: ParsedLaw,
    pub stages: IndexMap<String, StageResult>,
    pub cancelled: bool,
    pub row: LrtRow,
}

pub struct StagedParser<'a> {
    fetcher: &'a dyn Fetcher,
    config: &'a EngineConfig,
}

impl<'a> StagedParser<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, config: &'a EngineConfig) -> Self {
        Self { fetcher, config }
    }

    /// Runs all seven stages for `citation`. `existing_title`, if the
    /// repository already has a non-empty one, is pinned onto the working
    /// record before any stage runs so a re-parse can never clobber it.
    pub async fn parse(
        &self,
        citation: &Citation,
        existing_title: Option<String>,
        mut on_progress: impl FnMut(ProgressEvent<'_>) -> ProgressControl,
    ) -> EngineResult<ParseOutcome> {
        let name = citation.name();
        let span = tracing::info_span!("staged_parser.parse", name = %name);
        let _enter = span.enter();
        let start = Instant::now();

        let mut record = ParsedLaw::new();
        record.set("type_code", Value::String(citation.type_code.clone()));
        record.set("year", Value::Number(citation.year.into()));
        record.set("number", Value::String(citation.number.clone()));
        if let Some(title) = existing_title.filter(|t| !t.is_empty()) {
            record.set("title_en", Value::String(title));
        }

        let mut stages = IndexMap::new();
        let mut cancelled = false;

        for (index, stage) in STAGE_ORDER.iter().enumerate() {
            if on_progress(ProgressEvent::StageStart {
                stage,
                index,
                total: STAGE_ORDER.len(),
            }) == ProgressControl::Abort
            {
                for remaining in &STAGE_ORDER[index..] {
                    stages.insert((*remaining).to_string(), StageResult::skipped("Cancelled by client"));
                }
                cancelled = true;
                break;
            }

            let result = self.run_stage(stage, citation, &mut record).await?;
            on_progress(ProgressEvent::StageComplete {
                stage,
                result: &result,
            });
            stages.insert((*stage).to_string(), result);
        }

        if !cancelled {
            self.reconcile_live_status(&mut record, &stages);
            tracing::info!(
                target: "lrt::staged_parser",
                name = %name,
                duration_us = start.elapsed().as_micros() as u64,
                "[staged_parser, parse, complete]"
            );
        }

        let row = self.record_to_row(citation, &record);
        Ok(ParseOutcome {
            record,
            stages,
            cancelled,
            row,
        })
    }

    async fn run_stage(
        &self,
        stage: &str,
        citation: &Citation,
        record: &mut ParsedLaw,
    ) -> EngineResult<StageResult> {
        match stage {
            "metadata" => self.run_metadata_stage(citation, record).await,
            "extent" => Ok(self.run_parse_stage(record, self.fetch_xml(&CitationBuilder::contents_path(citation)).await, ExtentParser::parse)),
            "enacted_by" => {
                if !citation.is_secondary() {
                    return Ok(StageResult::skipped("not applicable to primary legislation"));
                }
                Ok(self.run_parse_stage(
                    record,
                    self.fetch_xml(&CitationBuilder::introduction_path(citation)).await,
                    EnactingParser::parse,
                ))
            }
            "amending" => Ok(self.run_amending_stage(
                record,
                self.fetch_html(&CitationBuilder::affecting_path(citation)).await,
                AmendingParser::parse_affecting,
            )),
            "amended_by" => Ok(self.run_amending_stage(
                record,
                self.fetch_html(&CitationBuilder::affected_path(citation)).await,
                AmendingParser::parse_affected,
            )),
            "repeal_revoke" => Ok(self.run_repeal_revoke_stage(citation, record).await),
            "taxa" => Ok(self.run_taxa_stage(citation, record).await),
            _ => unreachable!("stage name must come from STAGE_ORDER"),
        }
    }

    /// The `metadata` stage builds the base record; a `NotFound` on the
    /// introduction XML means no record can be built at all and surfaces
    /// as a fatal error for this law rather than a per-stage one.
    async fn run_metadata_stage(
        &self,
        citation: &Citation,
        record: &mut ParsedLaw,
    ) -> EngineResult<StageResult> {
        let path = CitationBuilder::introduction_path(citation);
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);
        let bytes = match tokio::time::timeout(timeout, self.fetcher.fetch_introduction(&path)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(FetchError::NotFound(p))) => return Err(EngineError::Fetch(FetchError::NotFound(p))),
            Ok(Err(other)) => return Ok(StageResult::error(other.to_string())),
            Err(_) => return Ok(StageResult::error("timeout")),
        };
        match MetadataParser::parse(&bytes) {
            Ok(map) => {
                let new = ParsedLaw::from_map(Value::Object(map));
                let title_preserved = record.get("title_en").cloned();
                let merged = ParsedLaw::merge(record, &new);
                *record = merged;
                if let Some(title) = title_preserved {
                    record.set("title_en", title);
                }
                Ok(StageResult::ok(record.to_db()))
            }
            Err(e) => Ok(StageResult::error(e.to_string())),
        }
    }

    fn run_parse_stage(
        &self,
        record: &mut ParsedLaw,
        fetched: Result<Vec<u8>, StageResult>,
        parse: fn(&[u8]) -> lrt_parse::ParseResult<serde_json::Map<String, Value>>,
    ) -> StageResult {
        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(result) => return result,
        };
        match parse(&bytes) {
            Ok(map) => {
                let new = ParsedLaw::from_map(Value::Object(map));
                *record = ParsedLaw::merge(record, &new);
                StageResult::ok(record.to_db())
            }
            Err(e) => StageResult::error(e.to_string()),
        }
    }

    fn run_amending_stage(
        &self,
        record: &mut ParsedLaw,
        fetched: Result<String, StageResult>,
        parse: fn(&str) -> serde_json::Map<String, Value>,
    ) -> StageResult {
        let html = match fetched {
            Ok(html) => html,
            Err(result) => return result,
        };
        let map = parse(&html);
        let new = ParsedLaw::from_map(Value::Object(map));
        *record = ParsedLaw::merge(record, &new);
        StageResult::ok(record.to_db())
    }

    /// The `repeal_revoke` stage is the metadata side of live reconciliation:
    /// it re-reads the introduction document looking for an explicit status
    /// marker (the same literal upstream uses on the law's front page) and
    /// records it under `live_from_metadata`, independent of whatever
    /// `amended_by` derived from the affected-changes table.
    async fn run_repeal_revoke_stage(&self, citation: &Citation, record: &mut ParsedLaw) -> StageResult {
        let fetched = self.fetch_xml(&CitationBuilder::introduction_path(citation)).await;
        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(result) => return result,
        };
        let text = String::from_utf8_lossy(&bytes);
        let live = scan_status_marker(&text);
        let literal = live.to_string();
        record.set("live_from_metadata", Value::String(literal.clone()));
        StageResult::ok(serde_json::json!({ "live": literal }))
    }

    async fn run_taxa_stage(&self, citation: &Citation, record: &mut ParsedLaw) -> StageResult {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);
        let body_path = CitationBuilder::body_path(citation);
        let (text, source_tag) = match tokio::time::timeout(timeout, self.fetcher.fetch(&body_path)).await {
            Ok(Ok(bytes)) => (String::from_utf8_lossy(&bytes).into_owned(), "body"),
            _ => {
                let fallback = record
                    .get("md_description")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                (fallback, "introduction")
            }
        };

        let sections = LatParser::parse(text.as_bytes(), &citation.name(), &citation.type_code)
            .map(|rows| {
                rows.into_iter()
                    .filter(|r| matches!(r.section_type, lrt_core::SectionType::Section | lrt_core::SectionType::Article))
                    .map(|r| (r.section_id, r.text))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let classifier = TaxaClassifier::new(lrt_taxa::TaxaConfig {
            largeness_threshold: self.config.taxa_largeness_threshold,
        });
        let classified = classifier.classify(&text, source_tag, &citation.name(), &sections);

        let new = ParsedLaw::from_map(serde_json::to_value(&classified).unwrap_or(Value::Null));
        *record = ParsedLaw::merge(record, &new);

        // A law "makes" in the glossary sense -- creates substantive duties --
        // iff the classifier found any holder to attach them to.
        let creates_duties = ["duty_holder", "rights_holder", "responsibility_holder", "power_holder"]
            .iter()
            .any(|key| matches!(record.get(*key), Some(Value::Array(items)) if !items.is_empty()));
        record.set("is_making", Value::Bool(creates_duties));

        tracing::debug!(
            target: "lrt::staged_parser",
            stage = "taxa",
            duration_us = start.elapsed().as_micros() as u64,
            "[staged_parser, stage, complete]"
        );
        StageResult::ok(record.to_db())
    }

    async fn fetch_xml(&self, path: &str) -> Result<Vec<u8>, StageResult> {
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);
        match tokio::time::timeout(timeout, self.fetcher.fetch(path)).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(StageResult::error(e.to_string())),
            Err(_) => Err(StageResult::error("timeout")),
        }
    }

    async fn fetch_html(&self, path: &str) -> Result<String, StageResult> {
        self.fetch_xml(path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Assigns `live`/`live_source`/`live_conflict` from the severity of the
    /// `amended_by` (changes-side) signal against the `metadata` signal,
    /// after both have run.
    fn reconcile_live_status(&self, record: &mut ParsedLaw, stages: &IndexMap<String, StageResult>) {
        let changes_live = record
            .get("live_from_changes")
            .and_then(|v| v.as_str())
            .map(parse_live_literal)
            .unwrap_or(Live::InForce);

        let metadata_live = record
            .get("live_from_metadata")
            .and_then(|v| v.as_str())
            .map(parse_live_literal)
            .unwrap_or(Live::InForce);

        let changes_failed = stages
            .get("amended_by")
            .map(|r| r.status == StageStatus::Error)
            .unwrap_or(false);
        let changes_live = if changes_failed { Live::InForce } else { changes_live };
        let metadata_failed = stages
            .get("repeal_revoke")
            .map(|r| r.status == StageStatus::Error)
            .unwrap_or(false);
        let metadata_live = if metadata_failed { Live::InForce } else { metadata_live };

        let changes_severity = changes_live.severity();
        let metadata_severity = metadata_live.severity();

        let (live, source) = if changes_severity == metadata_severity {
            (changes_live, LiveSource::Both)
        } else if changes_severity > metadata_severity {
            (changes_live, LiveSource::Changes)
        } else {
            (metadata_live, LiveSource::Metadata)
        };

        let conflict = changes_severity != metadata_severity;
        record.set("live", serde_json::to_value(&live).unwrap_or(Value::Null));
        record.set("live_source", serde_json::to_value(source).unwrap_or(Value::Null));
        record.set("live_conflict", Value::Bool(conflict));
        if conflict {
            let detail = ConflictDetail {
                reason: "amended_by and metadata signals disagreed on severity".to_string(),
                winner: source,
                changes_severity,
                metadata_severity,
            };
            record.set("live_conflict_detail", serde_json::to_value(&detail).unwrap_or(Value::Null));
        }
    }

    /// Folds every field the stages contributed to `record` onto a fresh
    /// [`LrtRow`]. `enacting` is deliberately left empty here - it is only
    /// ever grown by a cascade step on the parent record, never by a law's
    /// own parse.
    fn record_to_row(&self, citation: &Citation, record: &ParsedLaw) -> LrtRow {
        let mut row = LrtRow::new(citation.type_code.clone(), citation.year, citation.number.clone());

        if let Some(Value::String(s)) = record.get("title_en") {
            row.title_en = Some(s.clone());
        }
        if let Some(live) = record.get("live").and_then(|v| serde_json::from_value(v.clone()).ok()) {
            row.live = live;
        }
        if let Some(source) = record
            .get("live_source")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
        {
            row.live_source = Some(source);
        }
        if let Some(Value::Bool(conflict)) = record.get("live_conflict") {
            row.live_conflict = *conflict;
        }
        if let Some(detail) = record
            .get("live_conflict_detail")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
        {
            row.live_conflict_detail = Some(detail);
        }

        row.amending = string_list(record, "amending");
        row.amended_by = string_list(record, "amended_by");
        row.rescinding = string_list(record, "rescinding");
        row.rescinded_by = string_list(record, "rescinded_by");
        row.enacted_by = string_list(record, "enacted_by");

        if let Some(stats) = record
            .get("amending_stats")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
        {
            row.amending_stats = stats;
        }
        if let Some(stats) = record
            .get("amended_by_stats")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
        {
            row.amended_by_stats = stats;
        }

        if let Some(Value::String(s)) = record.get("geo_pan_region") {
            row.geo_extent = Some(s.clone());
        }
        row.geo_region = string_list(record, "geo_region");
        if let Some(Value::String(s)) = record.get("geo_detail") {
            row.geo_detail = Some(s.clone());
        }

        row.popimar = string_list(record, "popimar");
        row.duty_holder = string_list(record, "duty_holder");
        row.rights_holder = string_list(record, "rights_holder");
        row.responsibility_holder = string_list(record, "responsibility_holder");
        row.power_holder = string_list(record, "power_holder");

        if let Some(Value::Bool(b)) = record.get("is_making") {
            row.is_making = *b;
        }
        if let Some(Value::Bool(b)) = record.get("is_commencing") {
            row.is_commencing = *b;
        }
        if let Some(Value::String(s)) = record.get("family") {
            row.family = Some(s.clone());
        }
        if let Some(Value::String(s)) = record.get("family_ii") {
            row.family_ii = Some(s.clone());
        }

        row.is_amending = !row.amending.is_empty();
        row.is_rescinding = !row.rescinding.is_empty();
        row.sync_is_enacting();
        row
    }
}

/// Reads a `ParsedLaw` field already unwrapped to a plain string array
/// (everything except the `to_db`-wrapped representation).
fn string_list(record: &ParsedLaw, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_live_literal(raw: &str) -> Live {
    match raw {
        "\u{2717} Revoked" => Live::Revoked,
        "Partially revoked" => Live::PartiallyRevoked,
        "\u{2714} In force" => Live::InForce,
        _ => Live::Unknown,
    }
}

/// Scans the introduction document for the status marker upstream prints on
/// a law's front page; checked most-severe first since a document can carry
/// stray mentions of "in force" even when it has since been revoked.
fn scan_status_marker(text: &str) -> Live {
    if text.contains("Revoked") {
        Live::Revoked
    } else if text.contains("Partially revoked") || text.contains("Partially Revoked") {
        Live::PartiallyRevoked
    } else if text.contains("In force") || text.contains("In Force") {
        Live::InForce
    } else {
        Live::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrt_fetch::{StubFetcher, StubResponse};

    fn introduction_xml(title: &str) -> Vec<u8> {
        format!(
            r#"<Legislation><Metadata><dc:title>{title}</dc:title></Metadata></Legislation>"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn metadata_not_found_is_fatal_for_the_law() {
        let stub = StubFetcher::new().with_response(
            "uksi/2024/1/introduction/data.xml",
            StubResponse::NotFound,
        );
        let config = EngineConfig::default();
        let parser = StagedParser::new(&stub, &config);
        let citation = Citation::new("uksi", 2024, "1");

        let result = parser.parse(&citation, None, |_| ProgressControl::Continue).await;
        assert!(matches!(result, Err(EngineError::Fetch(FetchError::NotFound(_)))));
    }

    #[tokio::test]
    async fn abort_on_first_stage_skips_everything_and_sets_cancelled() {
        let stub = StubFetcher::new().with_response(
            "uksi/2024/1/introduction/data.xml",
            StubResponse::Ok(introduction_xml("Example Regulations")),
        );
        let config = EngineConfig::default();
        let parser = StagedParser::new(&stub, &config);
        let citation = Citation::new("uksi", 2024, "1");

        let outcome = parser
            .parse(&citation, None, |event| match event {
                ProgressEvent::StageStart { stage, .. } if stage == "metadata" => ProgressControl::Abort,
                _ => ProgressControl::Continue,
            })
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.stages.len(), STAGE_ORDER.len());
        assert!(outcome
            .stages
            .values()
            .all(|s| s.status == StageStatus::Skipped));
    }

    #[tokio::test]
    async fn existing_title_is_never_overwritten_by_a_reparse() {
        let stub = StubFetcher::new()
            .with_response(
                "uksi/2024/1/introduction/data.xml",
                StubResponse::Ok(introduction_xml("New Upstream Title")),
            )
            .with_response("uksi/2024/1/contents/data.xml", StubResponse::NotFound)
            .with_response(
                "changes/affecting/uksi/2024/1?results-count=1000&sort=affecting-year-number",
                StubResponse::NotFound,
            )
            .with_response(
                "changes/affected/uksi/2024/1?results-count=1000&sort=affected-year-number",
                StubResponse::NotFound,
            )
            .with_response("uksi/2024/1/data.xml", StubResponse::NotFound);
        let config = EngineConfig::default();
        let parser = StagedParser::new(&stub, &config);
        let citation = Citation::new("uksi", 2024, "1");

        let outcome = parser
            .parse(&citation, Some("The Existing Title".to_string()), |_| {
                ProgressControl::Continue
            })
            .await
            .unwrap();

        assert_eq!(outcome.row.title_en, Some("The Existing Title".to_string()));
    }

    #[tokio::test]
    async fn metadata_revocation_outranks_an_in_force_changes_signal() {
        let stub = StubFetcher::new();
        let config = EngineConfig::default();
        let parser = StagedParser::new(&stub, &config);

        let mut record = ParsedLaw::new();
        record.set(
            "live_from_changes",
            Value::String("\u{2714} In force".to_string()),
        );
        record.set(
            "live_from_metadata",
            Value::String("\u{2717} Revoked".to_string()),
        );

        let mut stages = IndexMap::new();
        stages.insert("amended_by".to_string(), StageResult::ok(Value::Bool(true)));
        stages.insert("repeal_revoke".to_string(), StageResult::ok(Value::Bool(true)));

        parser.reconcile_live_status(&mut record, &stages);

        assert_eq!(
            record.get("live").and_then(|v| v.as_str()),
            Some("\u{2717} Revoked")
        );
        assert_eq!(
            record.get("live_source").and_then(|v| v.as_str()),
            Some("metadata")
        );
        assert_eq!(record.get("live_conflict"), Some(&Value::Bool(true)));
        let detail = record.get("live_conflict_detail").cloned().unwrap();
        assert_eq!(detail["winner"], "metadata");
        assert_eq!(detail["changes_severity"], 1);
        assert_eq!(detail["metadata_severity"], 3);
    }

    #[test]
    fn record_to_row_carries_making_commencing_and_family_through() {
        let stub = StubFetcher::new();
        let config = EngineConfig::default();
        let parser = StagedParser::new(&stub, &config);
        let citation = Citation::new("uksi", 2024, "1");

        let mut record = ParsedLaw::new();
        record.set("is_making", Value::Bool(true));
        record.set("is_commencing", Value::Bool(true));
        record.set("family", Value::String("Health and Safety".to_string()));
        record.set("family_ii", Value::String("Environmental Protection".to_string()));

        let row = parser.record_to_row(&citation, &record);

        assert!(row.is_making);
        assert!(row.is_commencing);
        assert_eq!(row.family, Some("Health and Safety".to_string()));
        assert_eq!(row.family_ii, Some("Environmental Protection".to_string()));
    }
}
