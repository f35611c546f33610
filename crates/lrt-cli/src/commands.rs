//! Subcommand bodies. Kept separate from argument parsing so `main.rs` stays
//! a pure wiring layer.

use anyhow::{Context, Result};
use lrt_core::{CascadeRow, CascadeStatus, Citation, UpdateType};
use lrt_engine::{CascadeTracker, EngineConfig, FunctionCalculator, ProgressControl, SessionStore, StagedParser};
use lrt_fetch::ReqwestFetcher;
use lrt_repository::{InMemoryRepository, Repository};
use serde_json::Value;

/// Parses every requested citation, writes each raw record and group file
/// into the session scratchpad, then runs a single deferred function pass
/// and cascade sweep over the whole batch.
pub async fn handle_scrape(
    date: &str,
    citations: &[String],
    base_url: &str,
    session_store: &SessionStore,
) -> Result<()> {
    let config = EngineConfig::default();
    let fetcher = ReqwestFetcher::new(base_url);
    let parser = StagedParser::new(&fetcher, &config);
    let repository = InMemoryRepository::new();
    let tracker = CascadeTracker::new();

    let mut rows = Vec::with_capacity(citations.len());
    for short_path in citations {
        let citation = Citation::parse(short_path)
            .with_context(|| format!("not a recognizable citation: {short_path}"))?;

        let outcome = parser
            .parse(&citation, None, |_| ProgressControl::Continue)
            .await?;

        session_store.append_raw(date, outcome.record.to_db()).await?;

        let has_si_code = outcome
            .record
            .get("si_code")
            .and_then(|v| v.as_array())
            .map(|a| !a.is_empty())
            .unwrap_or(false);
        if has_si_code {
            session_store.append_group1(date, outcome.record.to_db()).await?;
        } else {
            session_store.append_group2(date, outcome.record.to_db()).await?;
        }

        for target in outcome.row.amending.iter().chain(outcome.row.rescinding.iter()) {
            tracker.record(date, target, UpdateType::Reparse, &outcome.row.name);
        }
        for parent in &outcome.row.enacted_by {
            tracker.record(date, parent, UpdateType::EnactingLink, &outcome.row.name);
        }

        repository.put(outcome.row.clone()).await?;
        rows.push(outcome.row);
    }

    let functions = FunctionCalculator::new(&repository)
        .compute_deferred_batch(&rows)
        .await?;
    for mut row in rows {
        if let Some(map) = functions.get(&row.name) {
            row.function = Some(map.clone());
        }
        repository.put(row).await?;
    }

    for cascade_row in tracker.by_session(date) {
        session_store
            .record_legacy_affected(date, serde_json::to_value(&cascade_row)?)
            .await?;
    }

    println!(
        "scraped {} citation(s) into session {date}; {} cascade target(s) recorded",
        citations.len(),
        tracker.by_session(date).len()
    );
    Ok(())
}

/// Prints every scratchpad file a session carries, in the order
/// [`lrt_engine::SCRATCHPAD_FILES`] lists them.
pub async fn handle_session_show(id: &str, session_store: &SessionStore) -> Result<()> {
    for file_name in lrt_engine::SCRATCHPAD_FILES {
        let value = session_store.read_back(id, file_name).await?;
        if value.is_null() {
            continue;
        }
        println!("== {file_name} ==");
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

/// `CascadeTracker` lives only in the process that ran `scrape`, so a
/// separate invocation has no choice but to read the legacy log `scrape`
/// wrote alongside it, then work the three-step sweep over whatever is
/// still `pending`: reparse an affected law already on file, fetch-and-add
/// one that isn't, and extend a parent's `enacting` array and function map
/// for an `enacting_link` row. The repository this sweep builds is local to
/// the invocation - nothing persists it across runs yet - so "reparse" and
/// "fetch-and-add" end up doing the same fetch; the distinction stays
/// meaningful once a durable repository is wired into the CLI.
pub async fn handle_cascade_sweep(
    session: &str,
    base_url: &str,
    session_store: &SessionStore,
) -> Result<()> {
    let value = session_store
        .read_back(session, lrt_engine::AFFECTED_LAWS_FILE)
        .await?;
    let mut entries: Vec<CascadeRow> = value
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
        .context("malformed affected_laws.json entry")?;

    if entries.is_empty() {
        println!("no cascade entries recorded for session {session}");
        return Ok(());
    }

    let config = EngineConfig::default();
    let fetcher = ReqwestFetcher::new(base_url);
    let parser = StagedParser::new(&fetcher, &config);
    let repository = InMemoryRepository::new();

    let mut reparsed = 0usize;
    let mut fetched = 0usize;
    let mut extended = 0usize;

    for entry in entries
        .iter_mut()
        .filter(|e| e.status == CascadeStatus::Pending)
    {
        let citation = Citation::parse(&entry.affected_law)
            .with_context(|| format!("not a recognizable citation: {}", entry.affected_law))?;

        match entry.update_type {
            UpdateType::Reparse => {
                let outcome = parser
                    .parse(&citation, None, |_| ProgressControl::Continue)
                    .await?;
                repository.put(outcome.row).await?;
                reparsed += 1;
            }
            UpdateType::EnactingLink => {
                if repository.get(&entry.affected_law).await?.is_none() {
                    let outcome = parser
                        .parse(&citation, None, |_| ProgressControl::Continue)
                        .await?;
                    repository.put(outcome.row).await?;
                    fetched += 1;
                }

                if let Some(mut parent) = repository.get(&entry.affected_law).await? {
                    let mut function = parent.function.clone();
                    for child in &entry.source_laws {
                        if !parent.enacting.iter().any(|e| e == child) {
                            parent.enacting.push(child.clone());
                        }
                        let child_is_making = repository
                            .get(child)
                            .await?
                            .map(|row| row.is_making)
                            .unwrap_or(false);
                        function = Some(FunctionCalculator::add_child_to_enacting(
                            function,
                            child,
                            child_is_making,
                        ));
                    }
                    parent.sync_is_enacting();
                    repository
                        .update_enacting(
                            &entry.affected_law,
                            parent.enacting.clone(),
                            parent.is_enacting,
                            function,
                        )
                        .await?;
                    extended += 1;
                }
            }
        }

        entry.mark_processed();
    }

    let updated: Vec<Value> = entries
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()?;
    session_store
        .overwrite_legacy_affected(session, Value::Array(updated))
        .await?;

    println!(
        "cascade sweep for session {session}: {reparsed} reparsed, {fetched} fetched, {extended} enacting link(s) extended"
    );
    Ok(())
}
