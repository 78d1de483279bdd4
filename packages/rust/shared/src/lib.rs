//! Shared types, errors and configuration for the parldata workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, FetchConfig, config_dir, config_file_path, init_config, load_config};
pub use error::{ParldataError, Result};
pub use types::{ParseItem, RecordKind};
