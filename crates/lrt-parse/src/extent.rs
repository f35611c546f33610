//! Walks `<ContentsItem ContentRef RestrictExtent>` pairs in a contents
//! document and derives the law's overall geographic extent.

use crate::error::{ParseError, ParseResult};
use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

/// The four constituent-country letters, in the display order `geo_region`
/// always uses.
const REGION_LETTERS: [(&str, &str); 4] = [
    ("E", "England"),
    ("W", "Wales"),
    ("S", "Scotland"),
    ("NI", "Northern Ireland"),
];

fn normalize_extent_code(raw: &str) -> String {
    raw.replace("N.I.", "NI").replace("n.i.", "NI")
}

fn extent_letters(code: &str) -> Vec<&'static str> {
    let normalized = normalize_extent_code(code);
    let mut found = Vec::new();
    for (letter, _) in REGION_LETTERS {
        if normalized.split('+').any(|tok| tok.trim() == letter) {
            found.push(letter);
        }
    }
    found
}

fn pan_region_for(letters: &[&str]) -> &'static str {
    let mut sorted = letters.to_vec();
    sorted.sort_unstable();
    match sorted.as_slice() {
        ["E", "NI", "S", "W"] => "UK",
        ["E", "S", "W"] => "GB",
        ["E", "W"] => "E+W",
        ["E"] => "E",
        ["W"] => "W",
        ["S"] => "S",
        ["NI"] => "NI",
        [] => "UK",
        _ => "UK",
    }
}

pub struct ExtentParser;

impl ExtentParser {
    /// Parses a `contents/data.xml` document into `{geo_region,
    /// geo_pan_region, geo_detail}`.
    pub fn parse(xml: &[u8]) -> ParseResult<Map<String, Value>> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        // extent code (normalized) -> ordered list of content refs
        let mut by_extent: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(e) | Event::Empty(e) => {
                    let name = e.name();
                    if local_name(name.into_inner()) == b"ContentsItem" {
                        let mut content_ref = None;
                        let mut restrict_extent = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            match local_name(attr.key.as_ref()) {
                                b"ContentRef" => {
                                    content_ref =
                                        Some(attr.unescape_value()?.into_owned());
                                }
                                b"RestrictExtent" => {
                                    restrict_extent =
                                        Some(normalize_extent_code(&attr.unescape_value()?));
                                }
                                _ => {}
                            }
                        }
                        if let (Some(content_ref), Some(extent)) = (content_ref, restrict_extent) {
                            by_extent.entry(extent).or_default().push(content_ref);
                        }
                    }
                }
                _ => {}
            }
            buf.clear();
        }

        let mut present_letters: Vec<&'static str> = Vec::new();
        for extent in by_extent.keys() {
            for letter in extent_letters(extent) {
                if !present_letters.contains(&letter) {
                    present_letters.push(letter);
                }
            }
        }
        present_letters.sort_by_key(|l| REGION_LETTERS.iter().position(|(k, _)| k == l).unwrap());

        let geo_region: Vec<Value> = present_letters
            .iter()
            .map(|letter| {
                let name = REGION_LETTERS.iter().find(|(k, _)| k == letter).unwrap().1;
                Value::String(name.to_string())
            })
            .collect();

        let geo_pan_region = pan_region_for(&present_letters);

        let geo_detail = by_extent
            .iter()
            .map(|(extent, refs)| format!("{extent} \u{2192} {}", refs.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");

        let mut fields = Map::new();
        fields.insert("geo_region".to_string(), Value::Array(geo_region));
        fields.insert("geo_pan_region".to_string(), Value::String(geo_pan_region.to_string()));
        if !geo_detail.is_empty() {
            fields.insert("geo_detail".to_string(), Value::String(geo_detail));
        }
        Ok(fields)
    }
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}
