//! The `ParsedLaw` normalizer and merger.
//!
//! Upstream callers hand us maps with capitalized or snake_case keys, atom-
//! or string-typed keys (by the time they reach Rust, both are just
//! `String`), and list fields wrapped in any of three JSON shapes. This
//! module is the single place that untangles all three axes of
//! heterogeneity - nothing downstream should ever branch on key shape.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Fields whose DB representation wraps a plain list as `{"values": [...]}`.
const VALUES_WRAPPED_FIELDS: &[&str] = &["si_code", "md_subjects", "duty_type"];

/// Fields whose DB representation is a key-set map `{label: true, ...}`.
const KEYSET_FIELDS: &[&str] = &[
    "duty_holder",
    "rights_holder",
    "responsibility_holder",
    "power_holder",
    "popimar",
];

/// Legacy key -> canonical key aliases.
fn alias_table() -> HashMap<&'static str, &'static str> {
    [
        ("actor", "role"),
        ("Revoking", "rescinding"),
        ("Revoked_by", "rescinded_by"),
        ("Amending", "amending"),
        ("Amended_by", "amended_by"),
        ("Enacting", "enacting"),
        ("Enacted_by", "enacted_by"),
        ("Title_EN", "title_en"),
        ("Name", "name"),
        ("Year", "year"),
        ("Number", "number"),
        ("Type_code", "type_code"),
        ("Live", "live"),
        ("Md_description", "md_description"),
        ("Md_subjects", "md_subjects"),
        ("Si_code", "si_code"),
        ("Family", "family"),
        ("Family_II", "family_ii"),
        ("Geo_Extent", "geo_extent"),
        ("Geo_Region", "geo_region"),
        ("Geo_Pan_Region", "geo_pan_region"),
    ]
    .into_iter()
    .collect()
}

/// Converts a key to snake_case-ish canonical form for the purpose of
/// matching aliases case-insensitively beyond the explicit table (best
/// effort; the explicit table above is authoritative for known legacy
/// names).
fn to_snake_case(key: &str) -> String {
    if key.chars().all(|c| c.is_lowercase() || c == '_' || c.is_numeric()) {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Canonical, flat representation of a law's parsed attributes. Internally
/// every list-shaped field is a plain JSON array (or a plain object for
/// holder sets, keyed by label with boolean membership) - the three
/// upstream JSON shapes are unwrapped on the way in and only rewrapped by
/// [`ParsedLaw::to_db`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLaw {
    pub fields: Map<String, Value>,
}

impl ParsedLaw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Builds a canonical [`ParsedLaw`] from an arbitrarily-shaped input map:
    /// aliases legacy keys, coerces scalar types, and unwraps list-polymorphic
    /// fields into plain arrays.
    pub fn from_map(raw: Value) -> Self {
        let raw_map = match raw {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        let aliases = alias_table();
        let mut fields = Map::new();

        for (raw_key, raw_value) in raw_map {
            let canonical_key = aliases
                .get(raw_key.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| to_snake_case(&raw_key));

            let coerced = coerce_scalar(&canonical_key, raw_value);
            let unwrapped = unwrap_list_polymorphism(&canonical_key, coerced);
            fields.insert(canonical_key, unwrapped);
        }

        Self { fields }
    }

    /// Merge rule: for every field, keep `existing` when `new` is null, an
    /// empty list, or an empty string; otherwise take `new`.
    pub fn merge(existing: &ParsedLaw, new: &ParsedLaw) -> ParsedLaw {
        let mut merged = existing.fields.clone();
        for (key, new_value) in &new.fields {
            if is_weak(new_value) {
                continue;
            }
            merged.insert(key.clone(), new_value.clone());
        }
        ParsedLaw { fields: merged }
    }

    /// Wraps list-shaped fields back into their DB JSON representation.
    pub fn to_db(&self) -> Value {
        let mut out = self.fields.clone();
        for key in VALUES_WRAPPED_FIELDS {
            if let Some(Value::Array(items)) = out.get(*key).cloned() {
                let mut wrapped = Map::new();
                wrapped.insert("values".to_string(), Value::Array(items));
                out.insert((*key).to_string(), Value::Object(wrapped));
            }
        }
        for key in KEYSET_FIELDS {
            if let Some(Value::Array(items)) = out.get(*key).cloned() {
                let mut set = Map::new();
                for item in items {
                    if let Value::String(label) = item {
                        set.insert(label, Value::Bool(true));
                    }
                }
                out.insert((*key).to_string(), Value::Object(set));
            }
        }
        Value::Object(out)
    }

    /// Inverts [`ParsedLaw::to_db`]: unwraps `{values:[...]}` and key-set
    /// maps back into plain arrays.
    pub fn from_db(value: Value) -> Self {
        let raw_map = match value {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        let mut fields = Map::new();
        for (key, value) in raw_map {
            fields.insert(key.clone(), unwrap_list_polymorphism(&key, value));
        }
        Self { fields }
    }
}

fn is_weak(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Scalar coercions: year strings -> integer, "true"/"false" ->
/// boolean, empty strings -> null. Date strings are left as strings (ISO
/// `YYYY-MM-DD` is already the canonical wire format); callers that need a
/// `NaiveDate` parse it explicitly.
fn coerce_scalar(key: &str, value: Value) -> Value {
    match value {
        Value::String(s) if s.is_empty() => Value::Null,
        Value::String(s) if key == "year" => s
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(s)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        other => other,
    }
}

/// Unwraps `{"values": [...]}`, `{"entries": [...]}`, and key-set maps
/// `{label: true, ...}` into plain arrays, regardless of field name - the
/// shape alone is enough to recognize the polymorphism.
fn unwrap_list_polymorphism(_key: &str, value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("values") {
                return Value::Array(items.clone());
            }
            if let Some(Value::Array(items)) = map.get("entries") {
                return Value::Array(items.clone());
            }
            if !map.is_empty() && map.values().all(|v| matches!(v, Value::Bool(_))) {
                let labels: Vec<Value> = map
                    .into_iter()
                    .filter(|(_, v)| matches!(v, Value::Bool(true)))
                    .map(|(k, _)| Value::String(k))
                    .collect();
                return Value::Array(labels);
            }
            Value::Object(map)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_legacy_keys() {
        let parsed = ParsedLaw::from_map(json!({"actor": ["Employer"], "Revoking": ["UK_x_1_1"]}));
        assert_eq!(parsed.get("role"), Some(&json!(["Employer"])));
        assert_eq!(parsed.get("rescinding"), Some(&json!(["UK_x_1_1"])));
    }

    #[test]
    fn coerces_year_string_and_booleans() {
        let parsed = ParsedLaw::from_map(json!({"year": "2024", "is_making": "true"}));
        assert_eq!(parsed.get("year"), Some(&json!(2024)));
        assert_eq!(parsed.get("is_making"), Some(&json!(true)));
    }

    #[test]
    fn empty_string_becomes_null() {
        let parsed = ParsedLaw::from_map(json!({"title_en": ""}));
        assert_eq!(parsed.get("title_en"), Some(&Value::Null));
    }

    #[test]
    fn unwraps_values_wrapped_list() {
        let parsed = ParsedLaw::from_map(json!({"si_code": {"values": ["ENVIRONMENT"]}}));
        assert_eq!(parsed.get("si_code"), Some(&json!(["ENVIRONMENT"])));
    }

    #[test]
    fn unwraps_keyset_map() {
        let parsed = ParsedLaw::from_map(json!({"duty_holder": {"Employer": true, "Landlord": true}}));
        let value = parsed.get("duty_holder").unwrap().as_array().unwrap();
        let mut labels: Vec<String> = value.iter().map(|v| v.as_str().unwrap().to_string()).collect();
        labels.sort();
        assert_eq!(labels, vec!["Employer".to_string(), "Landlord".to_string()]);
    }

    #[test]
    fn merge_keeps_existing_when_new_is_weak() {
        let existing = ParsedLaw::from_map(json!({"title_en": "The Old Title", "amending": ["A"]}));
        let new = ParsedLaw::from_map(json!({"title_en": "", "amending": []}));
        let merged = ParsedLaw::merge(&existing, &new);
        assert_eq!(merged.get("title_en"), Some(&json!("The Old Title")));
        assert_eq!(merged.get("amending"), Some(&json!(["A"])));
    }

    #[test]
    fn merge_takes_new_when_non_weak() {
        let existing = ParsedLaw::from_map(json!({"amending": ["A"]}));
        let new = ParsedLaw::from_map(json!({"amending": ["A", "B"]}));
        let merged = ParsedLaw::merge(&existing, &new);
        assert_eq!(merged.get("amending"), Some(&json!(["A", "B"])));
    }

    #[test]
    fn db_round_trip_preserves_values_wrapped_fields() {
        let original = ParsedLaw::from_map(json!({"si_code": ["ENVIRONMENT", "POLLUTION"]}));
        let db = original.to_db();
        assert_eq!(db["si_code"], json!({"values": ["ENVIRONMENT", "POLLUTION"]}));
        let restored = ParsedLaw::from_db(db);
        assert_eq!(restored.get("si_code"), original.get("si_code"));
    }

    #[test]
    fn db_round_trip_preserves_keyset_fields() {
        let original = ParsedLaw::from_map(json!({"popimar": ["Organisation - Competence"]}));
        let db = original.to_db();
        assert_eq!(db["popimar"], json!({"Organisation - Competence": true}));
        let restored = ParsedLaw::from_db(db);
        assert_eq!(restored.get("popimar"), original.get("popimar"));
    }

    #[test]
    fn role_stays_a_plain_array_through_db_round_trip() {
        let original = ParsedLaw::from_map(json!({"role": ["Employer", "Employee"]}));
        let db = original.to_db();
        assert_eq!(db["role"], json!(["Employer", "Employee"]));
    }

    proptest::proptest! {
        #[test]
        fn round_trip_is_stable_for_string_lists(items in proptest::collection::vec("[A-Za-z]{1,8}", 0..5)) {
            let original = ParsedLaw::from_map(json!({"si_code": items.clone()}));
            let restored = ParsedLaw::from_db(original.to_db());
            prop_assert_eq!(restored.get("si_code"), original.get("si_code"));
        }
    }
}
