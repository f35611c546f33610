//! LRT-Taxa: dictionary-driven classification of legislative text into
//! duties, rights, responsibilities, and powers.

mod dictionary;

pub use dictionary::{Category, Hit};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// One classified occurrence: a holder bound to a duty/right/responsibility/
/// power type, with the clause it was found in and (in chunked mode) the
/// section it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub holder: String,
    pub duty_type: String,
    pub clause: String,
    pub article: Option<String>,
}

/// The JSON-object shape shared by `duties`/`rights`/`responsibilities`/`powers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntrySet {
    pub articles: Vec<String>,
    pub entries: Vec<Entry>,
    pub holders: Vec<String>,
}

impl EntrySet {
    fn push(&mut self, entry: Entry) {
        if let Some(article) = &entry.article {
            if !self.articles.contains(article) {
                self.articles.push(article.clone());
            }
        }
        if !self.holders.contains(&entry.holder) {
            self.holders.push(entry.holder.clone());
        }
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    fn extend(&mut self, other: EntrySet) {
        for entry in other.entries {
            self.push(entry);
        }
    }
}

/// The full result of classifying one law's text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyResult {
    pub role: Vec<String>,
    pub role_gvt: Vec<String>,
    pub duty_type: Vec<String>,
    pub duty_holder: Vec<String>,
    pub rights_holder: Vec<String>,
    pub responsibility_holder: Vec<String>,
    pub power_holder: Vec<String>,
    pub popimar: Vec<String>,
    pub duties: EntrySet,
    pub rights: EntrySet,
    pub responsibilities: EntrySet,
    pub powers: EntrySet,
    pub purpose: Option<String>,
    pub taxa_text_source: String,
    pub taxa_text_length: usize,
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Classifies one block of text (a whole law or a single section) with no
/// knowledge of chunk boundaries. `article` tags every produced entry -
/// `None` for a whole-law call, `Some(section_id)` from
/// [`TaxaClassifier::classify_text_chunked`].
fn classify_block(text: &str, article: Option<&str>) -> ClassifyResult {
    let mut result = ClassifyResult::default();
    for hit in dictionary::scan(text) {
        let entry = Entry {
            holder: hit.holder.to_string(),
            duty_type: hit.label.to_string(),
            clause: hit.clause,
            article: article.map(str::to_string),
        };
        match hit.category {
            Category::Duty => {
                push_unique(&mut result.duty_type, hit.label);
                push_unique(&mut result.duty_holder, hit.holder);
                result.duties.push(entry);
            }
            Category::Right => {
                push_unique(&mut result.rights_holder, hit.holder);
                result.rights.push(entry);
            }
            Category::Responsibility => {
                push_unique(&mut result.responsibility_holder, hit.holder);
                result.responsibilities.push(entry);
            }
            Category::Power => {
                push_unique(&mut result.power_holder, hit.holder);
                result.powers.push(entry);
            }
            Category::Popimar => {
                push_unique(&mut result.popimar, hit.label);
            }
        }
        if hit.is_government_actor {
            push_unique(&mut result.role_gvt, hit.holder);
        } else {
            push_unique(&mut result.role, hit.holder);
        }
    }
    result.purpose = dictionary::extract_purpose(text);
    result
}

/// Gates whole-text vs. per-section classification and records telemetry.
#[derive(Debug, Clone, Copy)]
pub struct TaxaConfig {
    pub largeness_threshold: usize,
}

impl Default for TaxaConfig {
    fn default() -> Self {
        Self {
            largeness_threshold: 200_000,
        }
    }
}

pub struct TaxaClassifier {
    config: TaxaConfig,
}

impl TaxaClassifier {
    pub fn new(config: TaxaConfig) -> Self {
        Self { config }
    }

    /// Classifies `text`, preferring the law's body over its introduction -
    /// the body carries more actors. `source_tag` (`"body"` or
    /// `"introduction"`) is recorded verbatim as `taxa_text_source`.
    pub fn classify_text(&self, text: &str, source_tag: &str, law_name: &str) -> ClassifyResult {
        let start = Instant::now();
        let large_law = text.len() >= self.config.largeness_threshold;

        let mut result = classify_block(text, None);
        result.taxa_text_source = source_tag.to_string();
        result.taxa_text_length = text.len();

        tracing::info!(
            target: "lrt::taxa",
            law_name,
            duration_us = start.elapsed().as_micros() as u64,
            text_length = text.len(),
            large_law,
            popimar_skipped = false,
            "[taxa, classify, complete]"
        );
        result
    }

    /// Chunked mode: classifies each `(section_id, section_text)` pair
    /// independently (in parallel via `rayon`, since sections are
    /// mutually independent), tagging every produced entry with its
    /// section id, then merges per-label articles and dedups entries by
    /// `(holder, duty_type, clause, article)`. Actor extraction
    /// (`role`/`role_gvt`) and `purpose` are drawn from the full,
    /// unchunked text, since they aren't meaningfully scoped to one section.
    pub fn classify_text_chunked(
        &self,
        full_text: &str,
        source_tag: &str,
        law_name: &str,
        p1_sections: &[(String, String)],
    ) -> ClassifyResult {
        let start = Instant::now();
        let large_law = full_text.len() >= self.config.largeness_threshold;

        let partials: Vec<ClassifyResult> = p1_sections
            .par_iter()
            .map(|(section_id, section_text)| classify_block(section_text, Some(section_id)))
            .collect();

        let mut merged = ClassifyResult::default();
        for partial in partials {
            merged.duties.extend(partial.duties);
            merged.rights.extend(partial.rights);
            merged.responsibilities.extend(partial.responsibilities);
            merged.powers.extend(partial.powers);
            for label in partial.duty_type {
                push_unique(&mut merged.duty_type, &label);
            }
            for holder in partial.duty_holder {
                push_unique(&mut merged.duty_holder, &holder);
            }
            for holder in partial.rights_holder {
                push_unique(&mut merged.rights_holder, &holder);
            }
            for holder in partial.responsibility_holder {
                push_unique(&mut merged.responsibility_holder, &holder);
            }
            for holder in partial.power_holder {
                push_unique(&mut merged.power_holder, &holder);
            }
            for label in partial.popimar {
                push_unique(&mut merged.popimar, &label);
            }
        }

        let actors = classify_block(full_text, None);
        merged.role = actors.role;
        merged.role_gvt = actors.role_gvt;
        merged.purpose = dictionary::extract_purpose(full_text);
        merged.taxa_text_source = source_tag.to_string();
        merged.taxa_text_length = full_text.len();

        tracing::info!(
            target: "lrt::taxa",
            law_name,
            duration_us = start.elapsed().as_micros() as u64,
            text_length = full_text.len(),
            large_law,
            popimar_skipped = false,
            "[taxa, classify, complete]"
        );
        merged
    }

    /// Picks chunked vs. whole-text mode based on the largeness threshold
    /// and runs the appropriate classification.
    pub fn classify(
        &self,
        text: &str,
        source_tag: &str,
        law_name: &str,
        p1_sections: &[(String, String)],
    ) -> ClassifyResult {
        if text.len() >= self.config.largeness_threshold && !p1_sections.is_empty() {
            self.classify_text_chunked(text, source_tag, law_name, p1_sections)
        } else {
            self.classify_text(text, source_tag, law_name)
        }
    }
}

#[allow(dead_code)]
fn unique_labels(labels: &[String]) -> HashSet<&str> {
    labels.iter().map(String::as_str).collect()
}
