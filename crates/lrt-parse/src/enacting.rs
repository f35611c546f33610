//! Parses the enacting-authority text of secondary legislation: the
//! `<IntroductoryText>`/`<EnactingText>` elements and the footnote citations
//! they reference, resolving both into a deduplicated `enacted_by` list.

use crate::error::ParseResult;
use lrt_core::Citation;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Canonical parent-law phrases recognized verbatim in enacting text,
/// mapped to their `type/year/number` short path. A small curated set,
/// grown as new recurring citations are found in practice.
const PARENT_LAW_PHRASES: &[(&str, &str)] = &[
    ("Health and Safety at Work etc. Act 1974", "ukpga/1974/37"),
    ("European Communities Act 1972", "ukpga/1972/68"),
    ("Environmental Protection Act 1990", "ukpga/1990/43"),
    ("Climate Change Act 2008", "ukpga/2008/27"),
];

fn footnote_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/id/(european/directive|[a-z]+)/(\d{4})/([A-Za-z0-9]+)").unwrap()
    })
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn url_to_citation(url: &str) -> Option<Citation> {
    let captures = footnote_url_regex().captures(url)?;
    let type_segment = captures.get(1)?.as_str();
    let year: i32 = captures.get(2)?.as_str().parse().ok()?;
    let number = captures.get(3)?.as_str().to_string();
    let type_code = if type_segment == "european/directive" {
        "eudr".to_string()
    } else {
        type_segment.to_string()
    };
    Some(Citation::new(type_code, year, number))
}

pub struct EnactingParser;

impl EnactingParser {
    /// `type_code` gates the whole-method call: secondary legislation only.
    pub fn applies_to(type_code: &str) -> bool {
        !matches!(type_code, "ukpga" | "asp" | "anaw" | "nia")
    }

    /// Parses a body document containing `<IntroductoryText>`,
    /// `<EnactingText>`, and a `<Footnotes>` block, producing
    /// `{enacted_by, enacted_by_meta}`.
    pub fn parse(xml: &[u8]) -> ParseResult<Map<String, Value>> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut footnotes: HashMap<String, Vec<String>> = HashMap::new();
        let mut current_footnote: Option<String> = None;
        let mut body_text = String::new();
        let mut referenced_footnotes: Vec<String> = Vec::new();
        let mut in_relevant_text = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(e) | Event::Empty(e) => {
                    let name = local_name(&e.name().into_inner()).to_vec();
                    match name.as_slice() {
                        b"IntroductoryText" | b"EnactingText" => in_relevant_text = true,
                        b"Footnote" => {
                            for attr in e.attributes() {
                                let attr = attr?;
                                if local_name(attr.key.as_ref()) == b"id" {
                                    current_footnote =
                                        Some(attr.unescape_value()?.into_owned());
                                }
                            }
                        }
                        b"Citation" => {
                            if let Some(id) = current_footnote.clone() {
                                for attr in e.attributes() {
                                    let attr = attr?;
                                    if local_name(attr.key.as_ref()) == b"URI" {
                                        footnotes
                                            .entry(id.clone())
                                            .or_default()
                                            .push(attr.unescape_value()?.into_owned());
                                    }
                                }
                            }
                        }
                        b"FootnoteRef" => {
                            if in_relevant_text {
                                for attr in e.attributes() {
                                    let attr = attr?;
                                    if local_name(attr.key.as_ref()) == b"Ref" {
                                        referenced_footnotes
                                            .push(attr.unescape_value()?.into_owned());
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    if in_relevant_text {
                        body_text.push_str(&e.unescape()?);
                        body_text.push(' ');
                    }
                }
                Event::End(e) => {
                    let name = local_name(&e.name().into_inner());
                    if name == b"IntroductoryText" || name == b"EnactingText" {
                        in_relevant_text = false;
                    }
                    if name == b"Footnote" {
                        current_footnote = None;
                    }
                }
                _ => {}
            }
            buf.clear();
        }

        let mut enacted_by: Vec<String> = Vec::new();
        let mut enacted_by_meta: Map<String, Value> = Map::new();

        for (phrase, short_path) in PARENT_LAW_PHRASES {
            if body_text.contains(phrase) {
                if let Some(citation) = Citation::parse(short_path) {
                    let name = citation.name();
                    if !enacted_by.contains(&name) {
                        enacted_by.push(name);
                    }
                }
            }
        }

        for footnote_id in referenced_footnotes {
            let Some(urls) = footnotes.get(&footnote_id) else {
                continue;
            };
            for url in urls {
                if let Some(citation) = url_to_citation(url) {
                    let name = citation.name();
                    if !enacted_by.contains(&name) {
                        enacted_by.push(name.clone());
                    }
                    enacted_by_meta
                        .entry(name)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Some(Value::Array(urls)) = enacted_by_meta.get_mut(&citation.name()) {
                        urls.push(Value::String(url.clone()));
                    }
                }
            }
        }

        let mut fields = Map::new();
        fields.insert(
            "enacted_by".to_string(),
            Value::Array(enacted_by.into_iter().map(Value::String).collect()),
        );
        fields.insert("enacted_by_meta".to_string(), Value::Object(enacted_by_meta));
        Ok(fields)
    }
}
