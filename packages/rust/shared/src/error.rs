//! Error types for parldata.
//!
//! Library crates use [`ParldataError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-document errors (parse, name, date, merge-conflict) are caught at the
//! task boundary and logged; transport errors propagate fail-fast through the
//! enclosing concurrent batch.

use std::path::PathBuf;

/// Top-level error type for all parldata operations.
#[derive(Debug, thiserror::Error)]
pub enum ParldataError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-layer failure (connection, timeout, malformed response).
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status on a fetch.
    #[error("fetch error: {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// Payload bytes could not be decoded (not UTF-8 text, or an
    /// unrecognized binary format). Catchable: "probably binary".
    #[error("decode error: {url}: {message}")]
    Decode { url: String, message: String },

    /// Expected structure absent in one document.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A declined name matched more than one directory entry.
    #[error("multiple matches for name {name:?}")]
    AmbiguousName { name: String },

    /// Too few or too many tokens in a name; distinct from a no-match.
    #[error("too few or too many tokens in {name:?}")]
    IncompatibleName { name: String },

    /// A date grammar could not disassemble its input.
    #[error("date parse error: {message}")]
    DateParse { message: String },

    /// The store reported no document updated mid-merge.
    #[error("merge conflict: {message}")]
    MergeConflict { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Record validation error (missing required field, extraneous field).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ParldataError>;

impl ParldataError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a date-parse error from any displayable message.
    pub fn date(msg: impl Into<String>) -> Self {
        Self::DateParse {
            message: msg.into(),
        }
    }

    /// Create a merge-conflict error from any displayable message.
    pub fn merge_conflict(msg: impl Into<String>) -> Self {
        Self::MergeConflict {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is scoped to a single document and should be
    /// logged and skipped rather than aborting sibling work.
    pub fn is_per_document(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::AmbiguousName { .. }
                | Self::IncompatibleName { .. }
                | Self::DateParse { .. }
                | Self::MergeConflict { .. }
                | Self::Validation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ParldataError::Fetch {
            url: "http://example.com/a".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "fetch error: http://example.com/a: HTTP 404");

        let err = ParldataError::date("unable to disassemble date in 'gibberish'");
        assert!(err.to_string().contains("gibberish"));
    }

    #[test]
    fn per_document_classification() {
        assert!(ParldataError::parse("missing heading").is_per_document());
        assert!(
            ParldataError::IncompatibleName {
                name: "a b c d".into()
            }
            .is_per_document()
        );
        assert!(
            !ParldataError::Fetch {
                url: "http://example.com".into(),
                status: 500,
            }
            .is_per_document()
        );
        assert!(!ParldataError::Network("timed out".into()).is_per_document());
    }
}
