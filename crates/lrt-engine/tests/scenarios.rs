//! End-to-end scenarios exercising the orchestrator, cascade tracker,
//! function calculator, and LAT parser together as they'd actually be
//! driven by a scrape session.

use lrt_core::{CascadeStatus, Citation, Live, LrtRow, UpdateType};
use lrt_engine::{CascadeTracker, EngineConfig, FunctionCalculator, ProgressControl, StagedParser};
use lrt_fetch::{StubFetcher, StubResponse};
use lrt_parse::LatParser;
use lrt_repository::{InMemoryRepository, Repository};

fn introduction_xml_with(extra: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0"?>
<Legislation xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:ukm="http://www.legislation.gov.uk/namespaces/metadata">
  <Metadata>
    <dc:title>The Example Regulations 2024</dc:title>
    <dc:description>An Order to consolidate and update existing provisions.</dc:description>
    <dc:subject scheme="SIheading">ENVIRONMENT;POLLUTION</dc:subject>
    <ukm:EnactmentDate Date="2024-12-01"/>
    <ukm:NumberOfProvisions Value="250"/>
    {extra}
  </Metadata>
</Legislation>"#
    )
    .into_bytes()
}

/// A simple SI parse: description, paragraph count, SI codes, and
/// enactment date all land in the final record under the citation's
/// canonical name.
#[tokio::test]
async fn simple_si_parse_lands_metadata_under_the_canonical_name() {
    let stub = StubFetcher::new()
        .with_response(
            "uksi/2024/1234/introduction/data.xml",
            StubResponse::Ok(introduction_xml_with("")),
        )
        .with_response("uksi/2024/1234/contents/data.xml", StubResponse::NotFound)
        .with_response(
            "changes/affecting/uksi/2024/1234?results-count=1000&sort=affecting-year-number",
            StubResponse::NotFound,
        )
        .with_response(
            "changes/affected/uksi/2024/1234?results-count=1000&sort=affected-year-number",
            StubResponse::NotFound,
        )
        .with_response("uksi/2024/1234/data.xml", StubResponse::NotFound);
    let config = EngineConfig::default();
    let parser = StagedParser::new(&stub, &config);
    let citation = Citation::new("uksi", 2024, "1234");

    let outcome = parser
        .parse(&citation, None, |_| ProgressControl::Continue)
        .await
        .unwrap();

    assert_eq!(citation.name(), "UK_uksi_2024_1234");
    let description = outcome
        .record
        .get("md_description")
        .and_then(|v| v.as_str())
        .unwrap();
    assert!(description.contains("consolidate and update"));
    assert_eq!(
        outcome.record.get("md_paragraph_count").and_then(|v| v.as_i64()),
        Some(250)
    );
    assert_eq!(
        outcome.record.get("enactment_date").and_then(|v| v.as_str()),
        Some("2024-12-01")
    );

    let db = outcome.record.to_db();
    assert_eq!(
        db["si_code"],
        serde_json::json!({"values": ["ENVIRONMENT", "POLLUTION"]})
    );
}

/// Three successive cascade records against the same session/law pair
/// collapse into one row whose source list preserves arrival order with no
/// duplicates.
#[test]
fn repeated_cascade_records_dedup_into_one_row() {
    let tracker = CascadeTracker::new();
    tracker.record("X", "UK_ukpga_1974_37", UpdateType::Reparse, "UK_uksi_2025_A");
    tracker.record("X", "UK_ukpga_1974_37", UpdateType::Reparse, "UK_uksi_2025_B");
    tracker.record("X", "UK_ukpga_1974_37", UpdateType::Reparse, "UK_uksi_2025_C");

    let rows = tracker.by_session("X");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].source_laws,
        vec![
            "UK_uksi_2025_A".to_string(),
            "UK_uksi_2025_B".to_string(),
            "UK_uksi_2025_C".to_string(),
        ]
    );
}

/// An `enacting_link` row seen again as `reparse` is upgraded in place,
/// never creating a second row and never demoting back down.
#[test]
fn enacting_link_upgrades_to_reparse_on_a_later_record() {
    let tracker = CascadeTracker::new();
    tracker.record("X", "L", UpdateType::EnactingLink, "UK_uksi_2025_A");
    tracker.record("X", "L", UpdateType::Reparse, "UK_uksi_2025_B");

    let rows = tracker.by_session("X");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].update_type, UpdateType::Reparse);
    assert_eq!(
        rows[0].source_laws,
        vec!["UK_uksi_2025_A".to_string(), "UK_uksi_2025_B".to_string()]
    );
    assert_eq!(rows[0].status, CascadeStatus::Pending);
}

/// Function from the amending array: one batched `is_making` lookup
/// for the whole set, and the maker bit only follows the targets that are
/// themselves makers.
#[tokio::test]
async fn function_from_amending_array_carries_the_maker_bit() {
    let repo = InMemoryRepository::new();
    let mut maker = LrtRow::new("ukpga", 1974, "37");
    maker.is_making = true;
    repo.put(maker).await.unwrap();
    let non_maker = LrtRow::new("uksi", 2016, "1154");
    repo.put(non_maker).await.unwrap();

    let mut row = LrtRow::new("uksi", 2024, "1");
    row.amending = vec![
        "UK_uksi_2016_1154".to_string(),
        "UK_ukpga_1974_37".to_string(),
    ];

    let calculator = FunctionCalculator::new(&repo);
    let computed = calculator.compute_deferred_batch(&[row]).await.unwrap();
    let function = &computed["UK_uksi_2024_1"];

    assert_eq!(function.get(lrt_core::FN_AMENDING), Some(&true));
    assert_eq!(function.get(lrt_core::FN_AMENDING_MAKER), Some(&true));
}

/// Parallel extents: two sibling provisions differing only by
/// `RestrictExtent` become two LAT rows whose section ids and sort keys
/// carry the distinguishing suffix.
#[test]
fn parallel_extent_siblings_become_two_distinct_rows() {
    let xml = r#"<Body>
      <P1 Number="23" RestrictExtent="E+W+S"><Text>England, Wales and Scotland text.</Text></P1>
      <P1 Number="23" RestrictExtent="NI"><Text>Northern Ireland text.</Text></P1>
    </Body>"#;

    let rows = LatParser::parse(xml.as_bytes(), "UK_ukpga_2024_50", "ukpga").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].section_id, "UK_ukpga_2024_50:s.23[E+W+S]");
    assert_eq!(rows[1].section_id, "UK_ukpga_2024_50:s.23[NI]");
    assert!(rows[0].sort_key.ends_with("~E+W+S"));
    assert!(rows[1].sort_key.ends_with("~NI"));
}

/// A callback that aborts at the first stage skips every stage
/// (including the one already in progress) and never emits a completed
/// parse.
#[tokio::test]
async fn abort_at_first_stage_skips_every_stage() {
    let stub = StubFetcher::new().with_response(
        "ukpga/2024/1/introduction/data.xml",
        StubResponse::Ok(introduction_xml_with("")),
    );
    let config = EngineConfig::default();
    let parser = StagedParser::new(&stub, &config);
    let citation = Citation::new("ukpga", 2024, "1");

    let outcome = parser
        .parse(&citation, None, |event| match event {
            lrt_engine::ProgressEvent::StageStart { stage, .. } if stage == "metadata" => {
                ProgressControl::Abort
            }
            _ => ProgressControl::Continue,
        })
        .await
        .unwrap();

    assert!(outcome.cancelled);
    let metadata = outcome.stages.get("metadata").unwrap();
    assert_eq!(metadata.status, lrt_engine::StageStatus::Skipped);
    assert_eq!(metadata.error.as_deref(), Some("Cancelled by client"));
    assert!(outcome
        .stages
        .values()
        .all(|s| s.status == lrt_engine::StageStatus::Skipped));
}

/// Live reconciliation: the metadata side (`repeal_revoke`) reporting
/// revoked outranks the changes side (`amended_by`) reporting in-force, and
/// the conflict is recorded with both severities.
#[tokio::test]
async fn metadata_revocation_outranks_an_in_force_changes_signal() {
    let revoked_introduction = introduction_xml_with("<ukm:Status>Revoked</ukm:Status>");
    let affected_html = r#"<table>
      <tr><td><a href="/uksi/2025/2">Some Amending Instrument 2025</a></td><td>Regulation 4</td><td>amended</td><td>Yes</td></tr>
    </table>"#;

    let stub = StubFetcher::new()
        .with_response(
            "uksi/2024/1/introduction/data.xml",
            StubResponse::Ok(revoked_introduction),
        )
        .with_response("uksi/2024/1/contents/data.xml", StubResponse::NotFound)
        .with_response(
            "changes/affecting/uksi/2024/1?results-count=1000&sort=affecting-year-number",
            StubResponse::NotFound,
        )
        .with_response(
            "changes/affected/uksi/2024/1?results-count=1000&sort=affected-year-number",
            StubResponse::Ok(affected_html.as_bytes().to_vec()),
        )
        .with_response("uksi/2024/1/data.xml", StubResponse::NotFound);
    let config = EngineConfig::default();
    let parser = StagedParser::new(&stub, &config);
    let citation = Citation::new("uksi", 2024, "1");

    let outcome = parser
        .parse(&citation, None, |_| ProgressControl::Continue)
        .await
        .unwrap();

    assert_eq!(outcome.row.live, Live::Revoked);
    assert_eq!(
        outcome.record.get("live_source").and_then(|v| v.as_str()),
        Some("metadata")
    );
    assert_eq!(
        outcome.record.get("live_conflict"),
        Some(&serde_json::Value::Bool(true))
    );
    let detail = outcome.record.get("live_conflict_detail").unwrap();
    assert_eq!(detail["winner"], "metadata");
    assert_eq!(detail["changes_severity"], 1);
    assert_eq!(detail["metadata_severity"], 3);
}
