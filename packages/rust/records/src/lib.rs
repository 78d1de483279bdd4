//! Record schemas, the nested-path update grammar, and the per-type
//! multi-stage merge operations.
//!
//! Stored documents are `serde_json::Value`s whose object maps are
//! BTree-backed, so every serialization is recursively key-sorted: value
//! equality at the canonical serialized form comes for free, and set-union
//! deduplication of nested documents is order-insensitive.

pub mod models;
pub mod schema;
pub mod update;

pub use models::{Model, model};
pub use schema::{RecordSchema, compact, flatten};
pub use update::{SortKey, UpdateDoc, apply_update, ensure_path, get_path};
