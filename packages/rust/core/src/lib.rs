//! Pipeline core: the merge-upsert engine and the two-phase task harness.

pub mod engine;
pub mod harness;
pub mod names;

pub use engine::{MergeEngine, Outcome};
pub use harness::{RunStats, Task, gather, insert_items, run_task};
pub use names::load_name_directory;
