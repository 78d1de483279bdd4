//! Fetch layer: the semaphore-bounded HTTP client with write-once
//! caching, media type sniffing, and HTML parse helpers.

pub mod fetch;
pub mod html;
pub mod sniff;

pub use fetch::{Fetcher, exec_blocking};
pub use html::{extract_links, extract_text};
pub use sniff::{MediaType, sniff};
