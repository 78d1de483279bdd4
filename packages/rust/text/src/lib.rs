//! Text-reconstruction primitives for the ingestion pipeline.
//!
//! Everything here is deterministic: the merge engine depends on these
//! utilities producing byte-identical output for identical input.

pub mod dates;
pub mod names;
pub mod normalize;
pub mod table;

pub use dates::{parse_document_date, parse_long_date, parse_short_date};
pub use names::{NameDirectory, NameEntry};
pub use normalize::{clean_spaces, slugify, truncate_slug, unaccent_lower, ungarble};
pub use table::TableParser;
