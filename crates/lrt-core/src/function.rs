//! The Function Calculator: derives the `function` map from a law's
//! relationship arrays and a batched `is_making` lookup.
//!
//! This module is deliberately pure - it takes the lookup as a `HashMap`
//! rather than reaching for a repository itself, so `lrt-engine` can decide
//! when and how to batch the underlying query (a single batched call
//! regardless of the ordering of incoming records).

use crate::lrt_row::{
    FunctionMap, FN_AMENDING, FN_AMENDING_MAKER, FN_COMMENCING, FN_ENACTING, FN_ENACTING_MAKER,
    FN_MAKING, FN_REVOKING, FN_REVOKING_MAKER,
};
use std::collections::HashMap;

/// Immediate contribution: computable from the record alone.
pub fn immediate(is_making: bool, is_commencing: bool) -> FunctionMap {
    let mut map = FunctionMap::new();
    if is_making {
        map.insert(FN_MAKING.to_string(), true);
    }
    if is_commencing {
        map.insert(FN_COMMENCING.to_string(), true);
    }
    map
}

/// Classifies a set of target names against a batched `is_making` lookup,
/// setting the plain key if any target is a non-maker and the `Maker`
/// variant if any target is a maker.
fn classify_targets(
    targets: &[String],
    is_making_of: &HashMap<String, bool>,
    plain_key: &str,
    maker_key: &str,
    map: &mut FunctionMap,
) {
    let mut has_non_maker = false;
    let mut has_maker = false;
    for target in targets {
        match is_making_of.get(target) {
            Some(true) => has_maker = true,
            Some(false) => has_non_maker = true,
            None => has_non_maker = true,
        }
    }
    if has_non_maker {
        map.insert(plain_key.to_string(), true);
    }
    if has_maker {
        map.insert(maker_key.to_string(), true);
    }
}

/// The subset of relationship arrays the deferred/dynamic passes need.
pub struct RelationshipArrays<'a> {
    pub enacting: &'a [String],
    pub amending: &'a [String],
    pub rescinding: &'a [String],
}

/// Deferred contribution: `amending`/`rescinding`, computed at end-of-batch.
/// `enacting` is handled separately because it fires on a different trigger
/// (child persistence, not batch end) via [`monotonic_union`].
pub fn deferred_amending_revoking(
    arrays: &RelationshipArrays<'_>,
    is_making_of: &HashMap<String, bool>,
) -> FunctionMap {
    let mut map = FunctionMap::new();
    classify_targets(arrays.amending, is_making_of, FN_AMENDING, FN_AMENDING_MAKER, &mut map);
    classify_targets(
        arrays.rescinding,
        is_making_of,
        FN_REVOKING,
        FN_REVOKING_MAKER,
        &mut map,
    );
    map
}

/// Immediate+deferred `enacting` contribution, used the first time a record
/// is computed from a full relationship set (as opposed to the dynamic
/// child-triggered union in [`monotonic_union`]).
pub fn enacting_contribution(
    arrays: &RelationshipArrays<'_>,
    is_making_of: &HashMap<String, bool>,
) -> FunctionMap {
    let mut map = FunctionMap::new();
    classify_targets(arrays.enacting, is_making_of, FN_ENACTING, FN_ENACTING_MAKER, &mut map);
    map
}

/// Collects the union of all target names across the three relationship
/// arrays for a batch of records, for a single batched repository lookup.
pub fn union_of_targets<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = RelationshipArrays<'a>>,
{
    let mut set = std::collections::HashSet::new();
    for arrays in records {
        set.extend(arrays.enacting.iter().cloned());
        set.extend(arrays.amending.iter().cloned());
        set.extend(arrays.rescinding.iter().cloned());
    }
    set.into_iter().collect()
}

/// Merges a newly computed contribution into an existing map. Any key
/// already `true` in `existing` stays `true` even if `incoming` omits it -
/// this is the monotonic union dynamic `enacting` updates require:
/// `Enacting`/`Enacting Maker` are never cleared once set.
pub fn monotonic_union(existing: Option<FunctionMap>, incoming: FunctionMap) -> FunctionMap {
    let mut merged = existing.unwrap_or_default();
    for (key, value) in incoming {
        if value {
            merged.insert(key, true);
        }
    }
    merged
}

/// Replaces `existing` wholesale with `incoming`, per the non-dynamic
/// persistence rule (persist null if empty, else the full map).
/// Returns `None` when the computed map would be empty.
pub fn replacing(incoming: FunctionMap) -> Option<FunctionMap> {
    if incoming.is_empty() {
        None
    } else {
        Some(incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn s4_function_from_amending_array() {
        let is_making_of = lookup(&[("UK_uksi_2016_1154", false), ("UK_ukpga_1974_37", true)]);
        let arrays = RelationshipArrays {
            enacting: &[],
            amending: &["UK_uksi_2016_1154".to_string(), "UK_ukpga_1974_37".to_string()],
            rescinding: &[],
        };
        let map = deferred_amending_revoking(&arrays, &is_making_of);
        assert_eq!(map.get(FN_AMENDING), Some(&true));
        assert_eq!(map.get(FN_AMENDING_MAKER), Some(&true));
    }

    #[test]
    fn immediate_reflects_record_flags() {
        let map = immediate(true, false);
        assert_eq!(map.get(FN_MAKING), Some(&true));
        assert_eq!(map.get(FN_COMMENCING), None);
    }

    #[test]
    fn monotonicity_never_clears_enacting_keys() {
        let mut existing = FunctionMap::new();
        existing.insert(FN_ENACTING.to_string(), true);
        existing.insert(FN_ENACTING_MAKER.to_string(), true);

        // A later dynamic update from a non-maker child brings nothing new
        // for the Maker variant; it must survive anyway.
        let incoming = {
            let mut m = FunctionMap::new();
            m.insert(FN_ENACTING.to_string(), true);
            m
        };
        let merged = monotonic_union(Some(existing), incoming);
        assert_eq!(merged.get(FN_ENACTING), Some(&true));
        assert_eq!(merged.get(FN_ENACTING_MAKER), Some(&true));
    }

    #[test]
    fn replacing_empty_map_persists_as_none() {
        assert!(replacing(FunctionMap::new()).is_none());
    }

    #[test]
    fn union_of_targets_collects_across_batch() {
        let a = RelationshipArrays {
            enacting: &["X".to_string()],
            amending: &["Y".to_string()],
            rescinding: &[],
        };
        let b = RelationshipArrays {
            enacting: &[],
            amending: &["Y".to_string()],
            rescinding: &["Z".to_string()],
        };
        let mut union = union_of_targets([a, b]);
        union.sort();
        assert_eq!(union, vec!["X".to_string(), "Y".to_string(), "Z".to_string()]);
    }
}
