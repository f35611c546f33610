//! The stateful half of the Function Calculator: owns the repository lookup
//! that `lrt_core::function`'s pure logic needs. Three distinct timing
//! contracts, each a separate method so callers can't accidentally mix them:
//! immediate (record alone), deferred (end-of-batch, needs all `is_making`
//! flips already persisted), dynamic (child-persist triggered, monotonic).

use lrt_core::function::{self, RelationshipArrays};
use lrt_core::{FunctionMap, LrtRow};
use lrt_repository::{Repository, RepositoryResult};
use std::collections::HashMap;

pub struct FunctionCalculator<'a> {
    repository: &'a dyn Repository,
}

impl<'a> FunctionCalculator<'a> {
    pub fn new(repository: &'a dyn Repository) -> Self {
        Self { repository }
    }

    /// `Making`/`Commencing`: computable from the record alone, called at
    /// insert time.
    pub fn immediate(row: &LrtRow) -> FunctionMap {
        function::immediate(row.is_making, row.is_commencing)
    }

    /// `Amending`/`Amending Maker`/`Revoking`/`Revoking Maker` for a whole
    /// batch of rows, with a single batched repository lookup regardless of
    /// how many rows are in the batch.
    pub async fn compute_deferred_batch(
        &self,
        rows: &[LrtRow],
    ) -> RepositoryResult<HashMap<String, FunctionMap>> {
        let arrays: Vec<RelationshipArrays<'_>> = rows
            .iter()
            .map(|r| RelationshipArrays {
                enacting: &r.enacting,
                amending: &r.amending,
                rescinding: &r.rescinding,
            })
            .collect();
        let targets = function::union_of_targets(arrays.iter().map(|a| RelationshipArrays {
            enacting: a.enacting,
            amending: a.amending,
            rescinding: a.rescinding,
        }));
        let is_making_of = self.repository.lookup_is_making(&targets).await?;

        let mut result = HashMap::with_capacity(rows.len());
        for (row, arrays) in rows.iter().zip(arrays.iter()) {
            let deferred = function::deferred_amending_revoking(arrays, &is_making_of);
            let immediate = Self::immediate(row);
            let mut merged = immediate;
            merged.extend(deferred);
            result.insert(row.name.clone(), merged);
        }
        Ok(result)
    }

    /// Dynamic `Enacting`/`Enacting Maker` update: a newly-persisted child
    /// references `parent` as its enabling legislation. The parent's
    /// `enacting` array already has `child_name` appended by the caller;
    /// this only recomputes the function-map contribution and unions it in -
    /// it never clears a previously set key.
    pub fn add_child_to_enacting(
        existing_function: Option<FunctionMap>,
        child_name: &str,
        child_is_making: bool,
    ) -> FunctionMap {
        let mut is_making_of = HashMap::new();
        is_making_of.insert(child_name.to_string(), child_is_making);
        let enacting = [child_name.to_string()];
        let arrays = RelationshipArrays {
            enacting: &enacting,
            amending: &[],
            rescinding: &[],
        };
        let contribution = function::enacting_contribution(&arrays, &is_making_of);
        function::monotonic_union(existing_function, contribution)
    }
}
