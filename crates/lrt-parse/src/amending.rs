//! Scrapes the `/changes/affecting/<path>` and `/changes/affected/<path>`
//! HTML tables into the law's amendment relationships and per-counterparty
//! statistics.

use lrt_core::Citation;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Which side of the relationship a scraped table represents: `Affecting`
/// is what this law does to others, `Affected` is what was done to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Affecting,
    Affected,
}

#[derive(Debug, Clone)]
pub struct ChangeRow {
    pub title_en: String,
    pub path: String,
    pub type_code: String,
    pub year: i32,
    pub number: String,
    pub name: String,
    pub target: String,
    pub affect: String,
    pub applied: Option<bool>,
}

fn is_revoking(affect: &str) -> bool {
    let lower = affect.to_ascii_lowercase();
    lower.contains("revoked") || lower.contains("repealed")
}

/// Parses `<tr>` rows out of a changes table. Expects each row's first cell
/// to link to `/type/year/number`, with target, affect, and an optional
/// applied-status cell following.
pub fn parse_rows(html: &str) -> Vec<ChangeRow> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("table tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();
    let link_selector = Selector::parse("a").unwrap();

    let mut rows = Vec::new();
    for row in document.select(&row_selector) {
        let cells: Vec<_> = row.select(&cell_selector).collect();
        if cells.len() < 3 {
            continue;
        }
        let Some(link) = cells[0].select(&link_selector).next() else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or_default();
        let Some(citation) = Citation::parse(href.trim_start_matches('/')) else {
            continue;
        };
        let title_en = link.text().collect::<String>().trim().to_string();
        let target = cells[1].text().collect::<String>().trim().to_string();
        let affect = cells[2].text().collect::<String>().trim().to_string();
        let applied = cells.get(3).map(|c| {
            let text = c.text().collect::<String>().to_ascii_lowercase();
            text.contains("yes")
        });

        rows.push(ChangeRow {
            title_en,
            path: citation.short_path(),
            type_code: citation.type_code.clone(),
            year: citation.year,
            number: citation.number.clone(),
            name: citation.name(),
            target,
            affect,
            applied,
        });
    }
    rows
}

/// Folds parsed rows into the `{amending|amended_by|rescinding|rescinded_by,
/// *_stats, live_from_changes?}` field set for one direction.
pub fn build_fields(rows: &[ChangeRow], direction: Direction) -> Map<String, Value> {
    let (plain_key, stats_key) = match direction {
        Direction::Affecting => ("amending", "amending_stats"),
        Direction::Affected => ("amended_by", "amended_by_stats"),
    };
    let (revoking_key, revoking_stats_key) = match direction {
        Direction::Affecting => ("rescinding", None),
        Direction::Affected => ("rescinded_by", None),
    };
    let _ = revoking_stats_key;

    let mut plain: Vec<String> = Vec::new();
    let mut revoking: Vec<String> = Vec::new();
    let mut stats: HashMap<String, (String, u32, Vec<Value>)> = HashMap::new();
    let mut whole_law_revocation = false;

    for row in rows {
        let bucket = stats.entry(row.name.clone()).or_insert_with(|| {
            (row.title_en.clone(), 0, Vec::new())
        });
        bucket.1 += 1;
        let mut detail = Map::new();
        detail.insert("target".to_string(), Value::String(row.target.clone()));
        detail.insert("affect".to_string(), Value::String(row.affect.clone()));
        if let Some(applied) = row.applied {
            detail.insert("applied".to_string(), Value::Bool(applied));
        }
        bucket.2.push(Value::Object(detail));

        if is_revoking(&row.affect) {
            if !revoking.contains(&row.name) {
                revoking.push(row.name.clone());
            }
            if direction == Direction::Affected
                && (row.target.is_empty() || row.target.eq_ignore_ascii_case("whole"))
            {
                whole_law_revocation = true;
            }
        } else if !plain.contains(&row.name) {
            plain.push(row.name.clone());
        }
    }

    let mut fields = Map::new();
    fields.insert(
        plain_key.to_string(),
        Value::Array(plain.into_iter().map(Value::String).collect()),
    );
    fields.insert(
        revoking_key.to_string(),
        Value::Array(revoking.into_iter().map(Value::String).collect()),
    );

    let stats_json: Map<String, Value> = stats
        .into_iter()
        .map(|(name, (title, count, details))| {
            let mut entry = Map::new();
            entry.insert("title".to_string(), Value::String(title));
            entry.insert("count".to_string(), Value::Number(count.into()));
            entry.insert("details".to_string(), Value::Array(details));
            (name, Value::Object(entry))
        })
        .collect();
    fields.insert(stats_key.to_string(), Value::Object(stats_json));

    if whole_law_revocation {
        fields.insert(
            "live_from_changes".to_string(),
            Value::String("\u{2717} Revoked".to_string()),
        );
    }

    fields
}

pub struct AmendingParser;

impl AmendingParser {
    pub fn parse_affecting(html: &str) -> Map<String, Value> {
        build_fields(&parse_rows(html), Direction::Affecting)
    }

    pub fn parse_affected(html: &str) -> Map<String, Value> {
        build_fields(&parse_rows(html), Direction::Affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AFFECTED_HTML: &str = r#"
    <table>
      <tr><td><a href="/uksi/2016/1154">The Workplace Regs 2016</a></td><td>reg. 5</td><td>inserted</td><td>Yes</td></tr>
      <tr><td><a href="/ukpga/1974/37">Health and Safety at Work etc. Act 1974</a></td><td>whole</td><td>revoked</td><td></td></tr>
    </table>"#;

    #[test]
    fn routes_revoking_rows_separately() {
        let fields = AmendingParser::parse_affected(AFFECTED_HTML);
        assert_eq!(
            fields["rescinded_by"],
            Value::Array(vec![Value::String("UK_ukpga_1974_37".to_string())])
        );
        assert_eq!(
            fields["amended_by"],
            Value::Array(vec![Value::String("UK_uksi_2016_1154".to_string())])
        );
    }

    #[test]
    fn detects_whole_law_revocation_as_live_from_changes() {
        let fields = AmendingParser::parse_affected(AFFECTED_HTML);
        assert_eq!(
            fields["live_from_changes"],
            Value::String("\u{2717} Revoked".to_string())
        );
    }

    #[test]
    fn builds_stats_per_counterparty() {
        let fields = AmendingParser::parse_affected(AFFECTED_HTML);
        let stats = fields["amended_by_stats"].as_object().unwrap();
        let entry = stats["UK_uksi_2016_1154"].as_object().unwrap();
        assert_eq!(entry["count"], Value::Number(1.into()));
    }
}
