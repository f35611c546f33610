//! Builds the upstream request paths from a [`Citation`], kept separate from
//! `MetadataParser`/`Fetcher` so the path-construction rule has exactly one
//! implementation, reused by every stage of `StagedParser`.

use lrt_core::Citation;

pub struct CitationBuilder;

impl CitationBuilder {
    pub fn introduction_path(citation: &Citation) -> String {
        format!("{}/introduction/data.xml", citation.short_path())
    }

    pub fn contents_path(citation: &Citation) -> String {
        format!("{}/contents/data.xml", citation.short_path())
    }

    pub fn body_path(citation: &Citation) -> String {
        format!("{}/data.xml", citation.short_path())
    }

    pub fn affecting_path(citation: &Citation) -> String {
        format!(
            "changes/affecting/{}?results-count=1000&sort=affecting-year-number",
            citation.short_path()
        )
    }

    pub fn affected_path(citation: &Citation) -> String {
        format!(
            "changes/affected/{}?results-count=1000&sort=affected-year-number",
            citation.short_path()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn introduction_path_matches_upstream_shape() {
        let citation = Citation::new("uksi", 2024, "1001");
        assert_eq!(
            CitationBuilder::introduction_path(&citation),
            "uksi/2024/1001/introduction/data.xml"
        );
    }

    #[test]
    fn affecting_path_carries_the_canonical_sort_query() {
        let citation = Citation::new("ukpga", 1974, "37");
        assert_eq!(
            CitationBuilder::affecting_path(&citation),
            "changes/affecting/ukpga/1974/37?results-count=1000&sort=affecting-year-number"
        );
    }
}
