//! Parses the Dublin-Core-annotated introduction XML into a raw attribute
//! map, ready to be folded into a [`lrt_core::ParsedLaw`] by the caller.

use crate::dates::parse_free_text_date;
use crate::error::{ParseError, ParseResult};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

/// Geographic qualifier suffixes stripped from the end of a subject heading,
/// e.g. "Health and Safety, England and Wales" -> "Health and Safety".
const GEOGRAPHIC_SUFFIXES: &[&str] = &[
    ", england and wales",
    ", england, wales and scotland",
    ", scotland",
    ", northern ireland",
    ", wales",
    ", england",
];

fn strip_geographic_suffix(subject: &str) -> String {
    let lower = subject.to_ascii_lowercase();
    for suffix in GEOGRAPHIC_SUFFIXES {
        if lower.ends_with(suffix) {
            return subject[..subject.len() - suffix.len()].to_string();
        }
    }
    subject.to_string()
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &str) -> ParseResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if local_name(attr.key.as_ref()) == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parses an introduction `data.xml` document.
pub struct MetadataParser;

impl MetadataParser {
    pub fn parse(xml: &[u8]) -> ParseResult<Map<String, Value>> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut fields: Map<String, Value> = Map::new();
        let mut subjects: Vec<String> = Vec::new();
        let mut si_code: Vec<String> = Vec::new();
        let mut date_text: Option<String> = None;
        let mut buf = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        let mut pending_subject_scheme: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(e) | Event::Empty(e) => {
                    let name = local_name(&e.name().into_inner()).to_vec();
                    match name.as_slice() {
                        b"EnactmentDate" => {
                            if let Some(date) = attr_value(&e, "Date")? {
                                fields.insert("enactment_date".to_string(), Value::String(date));
                            }
                        }
                        b"Made" => {
                            if let Some(date) = attr_value(&e, "Date")? {
                                fields.insert("made_date".to_string(), Value::String(date));
                            }
                        }
                        b"ComingIntoForce" | b"DateTime" => {
                            if let Some(date) = attr_value(&e, "Date")? {
                                fields
                                    .entry("coming_into_force_date".to_string())
                                    .or_insert(Value::String(date));
                                fields.insert("is_commencing".to_string(), Value::Bool(true));
                            }
                        }
                        b"Family" => {
                            if let Some(v) = attr_value(&e, "Value")? {
                                let key = if fields.contains_key("family") {
                                    "family_ii"
                                } else {
                                    "family"
                                };
                                fields.insert(key.to_string(), Value::String(v));
                            }
                        }
                        b"RestrictExtent" => {
                            if let Some(v) = attr_value(&e, "Value")? {
                                fields.insert("md_restrict_extent".to_string(), Value::String(v));
                            }
                        }
                        b"RestrictStartDate" => {
                            if let Some(v) = attr_value(&e, "Value")? {
                                fields
                                    .insert("md_restrict_start_date".to_string(), Value::String(v));
                            }
                        }
                        b"NumberOfProvisions" => {
                            if let Some(v) = attr_value(&e, "Value")? {
                                if let Ok(n) = v.parse::<i64>() {
                                    fields.insert(
                                        "md_paragraph_count".to_string(),
                                        Value::Number(n.into()),
                                    );
                                }
                            }
                        }
                        b"link" => {
                            let rel = attr_value(&e, "type")?.unwrap_or_default();
                            if rel.contains("pdf") {
                                if let Some(href) = attr_value(&e, "href")? {
                                    fields.insert("pdf_href".to_string(), Value::String(href));
                                }
                            }
                        }
                        b"subject" => {
                            pending_subject_scheme = attr_value(&e, "scheme")?;
                        }
                        _ => {}
                    }
                    current = Some(name);
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(ParseError::Xml)?
                        .into_owned();
                    if let Some(name) = current.as_deref() {
                        match name {
                            b"title" => {
                                fields
                                    .entry("title_en".to_string())
                                    .or_insert(Value::String(text));
                            }
                            b"description" => {
                                fields
                                    .entry("md_description".to_string())
                                    .or_insert(Value::String(text));
                            }
                            b"modified" => {
                                fields
                                    .entry("md_modified".to_string())
                                    .or_insert(Value::String(text));
                            }
                            b"subject" => {
                                if let Some(scheme) = pending_subject_scheme.take() {
                                    if scheme.eq_ignore_ascii_case("SIheading") {
                                        si_code
                                            .extend(text.split(';').map(|s| s.trim().to_string()));
                                        continue;
                                    }
                                }
                                subjects.push(strip_geographic_suffix(text.trim()));
                            }
                            b"DateText" => {
                                date_text = Some(text);
                            }
                            b"Images" => {
                                if let Ok(n) = text.trim().parse::<i64>() {
                                    fields
                                        .insert("md_images".to_string(), Value::Number(n.into()));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Event::End(_) => {
                    current = None;
                }
                _ => {}
            }
            buf.clear();
        }

        if !subjects.is_empty() {
            fields.insert(
                "md_subjects".to_string(),
                Value::Array(subjects.into_iter().map(Value::String).collect()),
            );
        }
        if !si_code.is_empty() {
            fields.insert(
                "si_code".to_string(),
                Value::Array(si_code.into_iter().filter(|s| !s.is_empty()).map(Value::String).collect()),
            );
        }

        if !fields.contains_key("enactment_date") {
            if let Some(text) = date_text.as_deref() {
                if let Some(date) = parse_free_text_date(text) {
                    fields.insert(
                        "enactment_date".to_string(),
                        Value::String(date.format("%Y-%m-%d").to_string()),
                    );
                }
            }
        }

        Ok(fields)
    }
}
