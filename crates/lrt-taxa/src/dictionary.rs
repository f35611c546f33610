//! The curated phrase dictionary: fixed patterns mapping text fragments to
//! canonical taxa labels. Grown by observation, not generated.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Duty,
    Right,
    Responsibility,
    Power,
    Popimar,
}

pub struct Rule {
    pub pattern: &'static str,
    pub category: Category,
    pub label: &'static str,
    pub holder: &'static str,
    pub is_government_actor: bool,
}

/// The curated rule set. Each rule fires independently; a clause can match
/// more than one rule.
pub const RULES: &[Rule] = &[
    Rule {
        pattern: r"(?i)\bemployer\s+shall\b",
        category: Category::Duty,
        label: "General Duty",
        holder: "Employer",
        is_government_actor: false,
    },
    Rule {
        pattern: r"(?i)\bemployee\s+shall\b",
        category: Category::Duty,
        label: "General Duty",
        holder: "Employee",
        is_government_actor: false,
    },
    Rule {
        pattern: r"(?i)\blandlord\s+shall\b",
        category: Category::Duty,
        label: "General Duty",
        holder: "Landlord",
        is_government_actor: false,
    },
    Rule {
        pattern: r"(?i)\bsecretary of state\s+may\b",
        category: Category::Power,
        label: "Power Conferred",
        holder: "Minister",
        is_government_actor: true,
    },
    Rule {
        pattern: r"(?i)\bshall provide training\b",
        category: Category::Popimar,
        label: "Organisation - Competence",
        holder: "Employer",
        is_government_actor: false,
    },
    Rule {
        pattern: r"(?i)\bshall carry out a (?:suitable and sufficient )?assessment\b",
        category: Category::Popimar,
        label: "Organisation - Risk Assessment",
        holder: "Employer",
        is_government_actor: false,
    },
    Rule {
        pattern: r"(?i)\bemployee(?:s)? (?:has|have) the right to\b",
        category: Category::Right,
        label: "Entitlement",
        holder: "Employee",
        is_government_actor: false,
    },
    Rule {
        pattern: r"(?i)\bresponsible for ensuring\b",
        category: Category::Responsibility,
        label: "General Responsibility",
        holder: "Employer",
        is_government_actor: false,
    },
];

struct CompiledRule {
    regex: Regex,
    category: Category,
    label: &'static str,
    holder: &'static str,
    is_government_actor: bool,
}

fn compiled() -> &'static Vec<CompiledRule> {
    static COMPILED: OnceLock<Vec<CompiledRule>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .map(|r| CompiledRule {
                regex: Regex::new(r.pattern).unwrap(),
                category: r.category,
                label: r.label,
                holder: r.holder,
                is_government_actor: r.is_government_actor,
            })
            .collect()
    })
}

/// One dictionary hit: a rule fired at a location in the text.
pub struct Hit {
    pub category: Category,
    pub label: &'static str,
    pub holder: &'static str,
    pub is_government_actor: bool,
    pub clause: String,
}

const CLAUSE_CONTEXT_CHARS: usize = 60;

/// Scans `text` against every rule, returning one [`Hit`] per match.
pub fn scan(text: &str) -> Vec<Hit> {
    let mut hits = Vec::new();
    for rule in compiled() {
        for m in rule.regex.find_iter(text) {
            let start = m.start().saturating_sub(CLAUSE_CONTEXT_CHARS);
            let end = (m.end() + CLAUSE_CONTEXT_CHARS).min(text.len());
            let clause = text[start..end].trim().to_string();
            hits.push(Hit {
                category: rule.category,
                label: rule.label,
                holder: rule.holder,
                is_government_actor: rule.is_government_actor,
                clause,
            });
        }
    }
    hits
}

/// A purpose-statement clause, captured separately since it's prose rather
/// than a dictionary hit.
pub fn extract_purpose(text: &str) -> Option<String> {
    static PURPOSE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PURPOSE_RE.get_or_init(|| {
        Regex::new(r"(?i)purpose of (?:these|this) Regulations is to ([^.]+)\.").unwrap()
    });
    re.captures(text)
        .map(|c| c.get(1).unwrap().as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employer_shall_fires_duty_rule() {
        let hits = scan("The employer shall ensure adequate lighting.");
        assert!(hits
            .iter()
            .any(|h| h.category == Category::Duty && h.holder == "Employer"));
    }

    #[test]
    fn secretary_of_state_may_fires_power_rule() {
        let hits = scan("The Secretary of State may by regulations prescribe fees.");
        assert!(hits
            .iter()
            .any(|h| h.category == Category::Power && h.is_government_actor));
    }

    #[test]
    fn extracts_purpose_clause() {
        let purpose =
            extract_purpose("The purpose of these Regulations is to implement the Directive.");
        assert_eq!(purpose, Some("implement the Directive".to_string()));
    }
}
