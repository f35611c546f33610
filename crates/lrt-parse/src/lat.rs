//! The hierarchical walk that turns a body XML document into Legal
//! Articles Table rows: one row per structural unit, in document order.

use crate::error::ParseResult;
use crate::xmltree::{parse_tree, XmlNode};
use lrt_core::lat_row::{pad_numeric, CommentaryCounts, LatRow, SectionType};
use std::collections::HashMap;

/// Element names that emit their own row and therefore stop a parent's
/// "own text" collection from descending into them.
const ROW_TAGS: &[&str] = &[
    "Part", "Chapter", "Pblock", "P1", "P2", "P3", "P4", "P5", "P6", "Schedule", "Tabular",
    "Signed",
];

const SKIPPED_SUBTREES: &[&str] = &["BlockAmendment", "Versions"];

#[derive(Clone, Default)]
struct Context {
    part: Option<String>,
    chapter: Option<String>,
    heading_group: Option<String>,
    provision: Option<String>,
    sub: Option<String>,
    paragraph: Option<String>,
    sub_paragraph: Option<String>,
    schedule: Option<String>,
    extent_code: Option<String>,
    depth: u32,
    path: Vec<String>,
}

impl Context {
    fn child(&self) -> Self {
        Self {
            part: self.part.clone(),
            chapter: self.chapter.clone(),
            heading_group: self.heading_group.clone(),
            provision: self.provision.clone(),
            sub: self.sub.clone(),
            paragraph: self.paragraph.clone(),
            sub_paragraph: self.sub_paragraph.clone(),
            schedule: self.schedule.clone(),
            extent_code: self.extent_code.clone(),
            depth: self.depth + 1,
            path: self.path.clone(),
        }
    }

    fn hierarchy_path(&self) -> String {
        let dims = [
            &self.part,
            &self.chapter,
            &self.heading_group,
            &self.schedule,
            &self.provision,
            &self.sub,
            &self.paragraph,
            &self.sub_paragraph,
        ];
        dims.iter()
            .filter_map(|d| d.as_deref())
            .collect::<Vec<_>>()
            .join("/")
    }
}

struct Walker<'a> {
    law_name: &'a str,
    is_act: bool,
    rows: Vec<LatRow>,
    position: u32,
    base_id_seen: HashMap<String, String>,
}

impl<'a> Walker<'a> {
    fn next_position(&mut self) -> u32 {
        self.position += 1;
        self.position
    }

    /// Builds `section_id`/`sort_key`, applying the parallel-extent suffix
    /// when this exact base id has already been emitted under a different
    /// `RestrictExtent`.
    fn ids_for(&mut self, path: &[String], extent_code: Option<&str>) -> (String, String) {
        let base_id = format!("{}:{}", self.law_name, path.join("."));
        let mut section_id = base_id.clone();
        let mut sort_suffix = String::new();

        if let Some(extent) = extent_code {
            match self.base_id_seen.get(&base_id) {
                Some(previous) if previous != extent => {
                    section_id = format!("{base_id}[{extent}]");
                    sort_suffix = format!("~{extent}");
                }
                Some(_) => {}
                None => {
                    self.base_id_seen.insert(base_id.clone(), extent.to_string());
                }
            }
        }

        let sort_key = format!("{}{}", pad_numeric(&section_id, 4), sort_suffix);
        (section_id, sort_key)
    }

    fn emit(
        &mut self,
        path: &[String],
        ctx: &Context,
        section_type: SectionType,
        text: String,
        commentary: CommentaryCounts,
        commentary_refs: Vec<String>,
    ) {
        let (section_id, sort_key) = self.ids_for(path, ctx.extent_code.as_deref());
        self.rows.push(LatRow {
            section_id,
            law_name: self.law_name.to_string(),
            sort_key,
            position: self.next_position(),
            section_type,
            hierarchy_path: ctx.hierarchy_path(),
            depth: ctx.depth,
            part: ctx.part.clone(),
            chapter: ctx.chapter.clone(),
            heading_group: ctx.heading_group.clone(),
            provision: ctx.provision.clone(),
            paragraph: ctx.paragraph.clone(),
            sub_paragraph: ctx.sub_paragraph.clone(),
            schedule: ctx.schedule.clone(),
            text,
            extent_code: ctx.extent_code.clone(),
            commentary,
            commentary_refs,
        });
    }
}

/// Gathers the text owned directly by `node` - its own text plus any
/// descendant text that isn't nested inside another row-emitting element -
/// along with commentary reference counts scanned over that same subtree.
fn own_text_and_commentary(node: &XmlNode) -> (String, CommentaryCounts, Vec<String>) {
    let mut text = node.own_text.clone();
    let mut counts = CommentaryCounts::default();
    let mut refs = Vec::new();
    collect_recursive(node, &mut text, &mut counts, &mut refs);
    (text.trim().to_string(), counts, refs)
}

fn collect_recursive(node: &XmlNode, text: &mut String, counts: &mut CommentaryCounts, refs: &mut Vec<String>) {
    for child in &node.children {
        if child.name == "CommentaryRef" {
            if let Some(r) = child.attr("Ref") {
                refs.push(r.to_string());
                if let Some(letter) = r.chars().find(|c| c.is_ascii_alphabetic()) {
                    counts.bump(letter);
                }
            }
            continue;
        }
        if ROW_TAGS.contains(&child.name.as_str()) {
            continue;
        }
        if !child.own_text.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&child.own_text);
        }
        collect_recursive(child, text, counts, refs);
    }
}

fn normalize_extent(raw: &str) -> String {
    raw.replace("N.I.", "NI")
}

fn walk_children(node: &XmlNode, ctx: &Context, walker: &mut Walker<'_>) {
    for child in &node.children {
        if SKIPPED_SUBTREES.contains(&child.name.as_str()) {
            continue;
        }

        let mut child_ctx = ctx.child();
        if let Some(extent) = child.attr("RestrictExtent") {
            child_ctx.extent_code = Some(normalize_extent(extent));
        }

        match child.name.as_str() {
            "Part" => {
                let number = child.attr("Number").unwrap_or_default().to_string();
                child_ctx.part = Some(format!("part.{number}"));
                let mut path = ctx.path.clone();
                path.push(format!("part.{number}"));
                child_ctx.path = path.clone();
                let (text, commentary, refs) = own_text_and_commentary(child);
                walker.emit(&path, &child_ctx, SectionType::Part, text, commentary, refs);
                walk_children(child, &child_ctx, walker);
            }
            "Chapter" => {
                let number = child.attr("Number").unwrap_or_default().to_string();
                child_ctx.chapter = Some(format!("chapter.{number}"));
                let mut path = ctx.path.clone();
                path.push(format!("chapter.{number}"));
                child_ctx.path = path.clone();
                let (text, commentary, refs) = own_text_and_commentary(child);
                walker.emit(&path, &child_ctx, SectionType::Chapter, text, commentary, refs);
                walk_children(child, &child_ctx, walker);
            }
            "Pblock" => {
                if let Some(number) = child.attr("Number") {
                    // Participates as a provision: carries the numbering
                    // forward without emitting its own row.
                    child_ctx.heading_group = child.attr("Title").map(|t| t.to_string());
                    let mut path = ctx.path.clone();
                    path.push(format!("block.{number}"));
                    child_ctx.path = path;
                    walk_children(child, &child_ctx, walker);
                } else {
                    let title = child.attr("Title").unwrap_or_default().to_string();
                    child_ctx.heading_group = Some(title.clone());
                    let position = walker.position + 1;
                    let mut path = ctx.path.clone();
                    path.push(format!("heading.{position}"));
                    let (text, commentary, refs) = own_text_and_commentary(child);
                    walker.emit(&path, &child_ctx, SectionType::Heading, text, commentary, refs);
                    child_ctx.path = path;
                    walk_children(child, &child_ctx, walker);
                }
            }
            "P1" => {
                let number = child.attr("Number").unwrap_or_default().to_string();
                let in_schedule = ctx.schedule.is_some();
                let (section_type, prefix, dim) = if in_schedule {
                    (SectionType::Paragraph, "para", "paragraph")
                } else if walker.is_act {
                    (SectionType::Section, "sec", "provision")
                } else {
                    (SectionType::Article, "art", "provision")
                };
                let mut path = ctx.path.clone();
                path.push(format!("{prefix}.{number}"));
                child_ctx.path = path.clone();
                if dim == "provision" {
                    child_ctx.provision = Some(format!("{prefix}.{number}"));
                } else {
                    child_ctx.paragraph = Some(format!("{prefix}.{number}"));
                }
                let (text, commentary, refs) = own_text_and_commentary(child);
                walker.emit(&path, &child_ctx, section_type, text, commentary, refs);
                walk_children(child, &child_ctx, walker);
            }
            "P2" => {
                let number = child.attr("Number").unwrap_or_default().to_string();
                let in_schedule = ctx.schedule.is_some();
                let section_type = if in_schedule {
                    SectionType::SubParagraph
                } else if walker.is_act {
                    SectionType::SubSection
                } else {
                    SectionType::SubArticle
                };
                let mut path = ctx.path.clone();
                path.push(format!("({number})"));
                child_ctx.path = path.clone();
                if in_schedule {
                    child_ctx.sub_paragraph = Some(format!("({number})"));
                } else {
                    child_ctx.sub = Some(format!("({number})"));
                }
                let (text, commentary, refs) = own_text_and_commentary(child);
                walker.emit(&path, &child_ctx, section_type, text, commentary, refs);
                walk_children(child, &child_ctx, walker);
            }
            "P3" | "P4" | "P5" | "P6" => {
                let number = child.attr("Number").unwrap_or_default().to_string();
                let is_first_sub_level = ctx.paragraph.is_none() && child.name == "P3";
                let section_type = if is_first_sub_level {
                    SectionType::Paragraph
                } else {
                    SectionType::SubParagraph
                };
                let mut path = ctx.path.clone();
                path.push(format!("({number})"));
                child_ctx.path = path.clone();
                if is_first_sub_level {
                    child_ctx.paragraph = Some(format!("({number})"));
                } else {
                    child_ctx.sub_paragraph = Some(format!("({number})"));
                }
                let (text, commentary, refs) = own_text_and_commentary(child);
                walker.emit(&path, &child_ctx, section_type, text, commentary, refs);
                walk_children(child, &child_ctx, walker);
            }
            "Schedule" => {
                let number = child.attr("Number").unwrap_or_default().to_string();
                child_ctx.schedule = Some(format!("sch.{number}"));
                child_ctx.part = None;
                child_ctx.chapter = None;
                child_ctx.provision = None;
                child_ctx.sub = None;
                child_ctx.paragraph = None;
                let mut path = ctx.path.clone();
                path.push(format!("sch.{number}"));
                child_ctx.path = path.clone();
                let (text, commentary, refs) = own_text_and_commentary(child);
                walker.emit(&path, &child_ctx, SectionType::Schedule, text, commentary, refs);
                walk_children(child, &child_ctx, walker);
            }
            "Tabular" => {
                let mut path = ctx.path.clone();
                path.push(format!("tbl.{}", walker.position + 1));
                child_ctx.path = path.clone();
                let (text, commentary, refs) = own_text_and_commentary(child);
                walker.emit(&path, &child_ctx, SectionType::Table, text, commentary, refs);
            }
            "Signed" => {
                let mut path = ctx.path.clone();
                path.push("signed".to_string());
                child_ctx.path = path.clone();
                let (text, commentary, refs) = own_text_and_commentary(child);
                walker.emit(&path, &child_ctx, SectionType::Signed, text, commentary, refs);
            }
            _ => {
                walk_children(child, &child_ctx, walker);
            }
        }
    }
}

pub struct LatParser;

impl LatParser {
    /// `type_code` selects section-vs-article emission for `<P1>` rows
    /// (Acts get `Section`, everything else gets `Article`).
    pub fn parse(xml: &[u8], law_name: &str, type_code: &str) -> ParseResult<Vec<LatRow>> {
        let root = parse_tree(xml)?;
        let is_act = matches!(type_code, "ukpga" | "asp" | "anaw" | "nia");
        let mut walker = Walker {
            law_name,
            is_act,
            rows: Vec::new(),
            position: 0,
            base_id_seen: HashMap::new(),
        };
        let ctx = Context::default();
        walk_children(&root, &ctx, &mut walker);
        Ok(walker.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACT_XML: &str = r#"<Body>
      <Part Number="1">
        <P1 Number="1"><Text>Short title.</Text></P1>
        <P1 Number="2">
          <P2 Number="1"><Text>First sub-section.</Text></P2>
        </P1>
      </Part>
      <Schedule Number="1">
        <P1 Number="1"><Text>Paragraph one.</Text></P1>
      </Schedule>
    </Body>"#;

    #[test]
    fn emits_section_rows_for_an_act() {
        let rows = LatParser::parse(ACT_XML.as_bytes(), "UK_ukpga_1974_37", "ukpga").unwrap();
        let section_types: Vec<_> = rows.iter().map(|r| r.section_type).collect();
        assert!(section_types.contains(&SectionType::Part));
        assert!(section_types.contains(&SectionType::Section));
        assert!(section_types.contains(&SectionType::SubSection));
    }

    #[test]
    fn schedule_descendants_become_paragraphs() {
        let rows = LatParser::parse(ACT_XML.as_bytes(), "UK_ukpga_1974_37", "ukpga").unwrap();
        let schedule_row = rows.iter().find(|r| r.section_type == SectionType::Paragraph && r.schedule.is_some());
        assert!(schedule_row.is_some());
        assert!(schedule_row.unwrap().section_id.contains("sch.1.para.1"));
    }

    #[test]
    fn position_is_strictly_document_order() {
        let rows = LatParser::parse(ACT_XML.as_bytes(), "UK_ukpga_1974_37", "ukpga").unwrap();
        let positions: Vec<u32> = rows.iter().map(|r| r.position).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn skips_block_amendment_subtrees() {
        let xml = r#"<Body><BlockAmendment><P1 Number="99"><Text>inserted text</Text></P1></BlockAmendment></Body>"#;
        let rows = LatParser::parse(xml.as_bytes(), "UK_uksi_2024_1", "uksi").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn parallel_extent_siblings_get_suffixed_ids() {
        let xml = r#"<Body>
          <P1 Number="5" RestrictExtent="E+W"><Text>England and Wales text.</Text></P1>
          <P1 Number="5" RestrictExtent="S"><Text>Scotland text.</Text></P1>
        </Body>"#;
        let rows = LatParser::parse(xml.as_bytes(), "UK_uksi_2024_1", "uksi").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].section_id.ends_with("art.5"));
        assert!(rows[1].section_id.contains("[S]"));
        assert!(rows[1].sort_key.contains("~S"));
    }

    #[test]
    fn commentary_refs_bump_counts_from_own_text_only() {
        let xml = r#"<Body><P1 Number="1">
          <Text>Some text<CommentaryRef Ref="F00001CITATION"/></Text>
        </P1></Body>"#;
        let rows = LatParser::parse(xml.as_bytes(), "UK_uksi_2024_1", "uksi").unwrap();
        assert_eq!(rows[0].commentary.amendment, 1);
        assert_eq!(rows[0].commentary_refs, vec!["F00001CITATION".to_string()]);
    }
}
