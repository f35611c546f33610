//! The Legal Articles Table row: one row per structural unit of text.

use serde::{Deserialize, Serialize};

/// The kind of structural unit a [`LatRow`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Title,
    Part,
    Chapter,
    Heading,
    Section,
    SubSection,
    Article,
    SubArticle,
    Paragraph,
    SubParagraph,
    Schedule,
    Commencement,
    Table,
    Note,
    Signed,
}

/// Per-row commentary-code counters, driven by the commentary reference scan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CommentaryCounts {
    pub amendment: u32,
    pub modification: u32,
    pub commencement: u32,
    pub extent_editorial: u32,
}

impl CommentaryCounts {
    /// Bumps the counter for a raw commentary-reference type letter. `E`
    /// (extent) and `X` (editorial) share one bucket - the register doesn't
    /// distinguish them downstream.
    pub fn bump(&mut self, ref_letter: char) {
        match ref_letter {
            'F' => self.amendment += 1,
            'C' | 'M' => self.modification += 1,
            'I' => self.commencement += 1,
            'E' | 'X' => self.extent_editorial += 1,
            _ => {}
        }
    }
}

/// A single row in the Legal Articles Table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatRow {
    pub section_id: String,
    pub law_name: String,
    pub sort_key: String,
    pub position: u32,
    pub section_type: SectionType,
    pub hierarchy_path: String,
    pub depth: u32,

    pub part: Option<String>,
    pub chapter: Option<String>,
    pub heading_group: Option<String>,
    pub provision: Option<String>,
    pub paragraph: Option<String>,
    pub sub_paragraph: Option<String>,
    pub schedule: Option<String>,

    pub text: String,
    pub extent_code: Option<String>,

    pub commentary: CommentaryCounts,
    pub commentary_refs: Vec<String>,
}

/// Zero-pads each numeric run in a citation segment and keeps letter runs
/// verbatim, so lexicographic string order matches document order:
/// `pad_segment("10", 4) == "0010"`, so `"0010"` sorts after `"0002"`.
pub fn pad_numeric(segment: &str, width: usize) -> String {
    let mut out = String::new();
    let mut digits = String::new();
    for ch in segment.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                out.push_str(&format!("{:0>width$}", digits, width = width));
                digits.clear();
            }
            out.push(ch);
        }
    }
    if !digits.is_empty() {
        out.push_str(&format!("{:0>width$}", digits, width = width));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_numeric_preserves_letters_and_orders_numbers() {
        assert_eq!(pad_numeric("10", 4), "0010");
        assert_eq!(pad_numeric("2", 4), "0002");
        assert!(pad_numeric("2", 4) < pad_numeric("10", 4));
        assert_eq!(pad_numeric("10A", 4), "0010A");
        assert!(pad_numeric("10", 4) < pad_numeric("10A", 4));
    }

    #[test]
    fn commentary_counts_bump_routes_by_letter() {
        let mut counts = CommentaryCounts::default();
        counts.bump('F');
        counts.bump('C');
        counts.bump('M');
        counts.bump('I');
        counts.bump('E');
        counts.bump('X');
        assert_eq!(counts.amendment, 1);
        assert_eq!(counts.modification, 2);
        assert_eq!(counts.commencement, 1);
        assert_eq!(counts.extent_editorial, 2);
    }
}
