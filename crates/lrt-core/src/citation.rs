//! Canonical identifier construction and normalization.
//!
//! A law has two interchangeable surface forms - `uksi/2024/1001` (a path
//! segment, used to build upstream URLs) and `UK_uksi_2024_1001` (the
//! citation name, the only form ever stored on an edge). Every other crate
//! that needs to go from one to the other should go through here, so that
//! `canonicalize(canonicalize(x)) == canonicalize(x)` has exactly one
//! implementation to hold.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifier triple that uniquely addresses a piece of UK legislation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub type_code: String,
    pub year: i32,
    pub number: String,
}

impl Citation {
    pub fn new(type_code: impl Into<String>, year: i32, number: impl Into<String>) -> Self {
        Self {
            type_code: type_code.into(),
            year,
            number: number.into(),
        }
    }

    /// Parses either surface form (`type/year/number` or `UK_type_year_number`).
    ///
    /// Returns `None` if `raw` does not have three identifiable segments.
    pub fn parse(raw: &str) -> Option<Self> {
        let body = raw.strip_prefix("UK_").unwrap_or(raw);
        let mut parts: Vec<&str> = if body.contains('/') {
            body.split('/').collect()
        } else {
            body.splitn(3, '_').collect()
        };
        if parts.len() != 3 {
            return None;
        }
        let number = parts.pop()?.to_string();
        let year: i32 = parts.pop()?.parse().ok()?;
        let type_code = parts.pop()?.to_string();
        Some(Citation::new(type_code, year, number))
    }

    /// The canonical `UK_<type>_<year>_<number>` form, the only one stored on edges.
    pub fn name(&self) -> String {
        format!("UK_{}_{}_{}", self.type_code, self.year, self.number)
    }

    /// The `<type>/<year>/<number>` form used to build upstream HTTP paths.
    pub fn short_path(&self) -> String {
        format!("{}/{}/{}", self.type_code, self.year, self.number)
    }

    /// Whether this is secondary legislation (eligible for the enacting-authority parser).
    pub fn is_secondary(&self) -> bool {
        !matches!(
            self.type_code.as_str(),
            "ukpga" | "asp" | "anaw" | "nia"
        )
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Normalizes any accepted input form into the canonical `UK_…` citation name.
///
/// Accepts `type/year/number`, `UK_type_year_number`, or an already-canonical
/// name; rewrites a `/`-separated form by replacing `/` with `_` and
/// prefixing `UK_`. Returns the input unchanged (prefixed) if it cannot be
/// decomposed into a triple - canonicalization never fails, it is idempotent
/// on anything it is given.
pub fn canonicalize(raw: &str) -> String {
    if let Some(citation) = Citation::parse(raw) {
        return citation.name();
    }
    if raw.starts_with("UK_") {
        return raw.to_string();
    }
    format!("UK_{}", raw.replace('/', "_"))
}
