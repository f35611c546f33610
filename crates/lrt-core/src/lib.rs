//! LRT-Core: shared row types, canonical identifiers, and pure classification
//! logic for the UK legislation register pipeline.
//!
//! This crate has no I/O of its own - it defines the shapes that
//! `lrt-fetch`, `lrt-parse`, `lrt-taxa`, `lrt-repository`, and `lrt-engine`
//! all exchange, plus the pieces of domain logic (citation canonicalization,
//! the function calculator, the `ParsedLaw` normalizer) that are pure
//! functions of their inputs and don't belong to any one stage.

pub mod cascade_row;
pub mod citation;
pub mod error;
pub mod function;
pub mod lat_row;
pub mod lrt_row;
pub mod normalize;

pub use cascade_row::{CascadeRow, CascadeStatus, UpdateType};
pub use citation::{canonicalize, Citation};
pub use error::{CoreError, CoreResult};
pub use lat_row::{CommentaryCounts, LatRow, SectionType};
pub use lrt_row::{
    merge_rows, AmendmentDetail, AmendmentStats, ChangeLogEntry, ConflictDetail, FunctionMap,
    Live, LiveSource, LrtRow, FN_AMENDING, FN_AMENDING_MAKER, FN_COMMENCING, FN_ENACTING,
    FN_ENACTING_MAKER, FN_MAKING, FN_REVOKING, FN_REVOKING_MAKER,
};
pub use normalize::ParsedLaw;
