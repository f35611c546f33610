//! LRT-Parse: the stage parsers that turn raw upstream documents into
//! partial attribute maps and structural rows.
//!
//! Each parser here is a pure function of its input bytes - none of them
//! fetch anything themselves. `lrt-engine`'s `StagedParser` owns the
//! fetch-then-parse-then-merge sequencing; this crate only owns the
//! "then-parse" part.

pub mod amending;
pub mod dates;
pub mod enacting;
pub mod error;
pub mod extent;
pub mod lat;
pub mod metadata;
mod xmltree;

pub use amending::{AmendingParser, ChangeRow, Direction};
pub use enacting::EnactingParser;
pub use error::{ParseError, ParseResult};
pub use extent::ExtentParser;
pub use lat::LatParser;
pub use metadata::MetadataParser;
