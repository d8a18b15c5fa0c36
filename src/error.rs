use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading, sniffing, or resolving a channel schema.
///
/// All variants are recoverable: the caller decides whether to fall back to
/// another schema source or give up. A schema is never returned partially
/// populated.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("definition file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read definition file")]
    Io(#[from] std::io::Error),

    #[error("malformed definition document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("stream header ended after {got} of {want} lines")]
    TruncatedHeader { got: usize, want: usize },

    #[error("header line {line} is not in the expected form: {reason}")]
    BadHeaderLine { line: usize, reason: String },

    #[error("duplicate channel index {0}")]
    DuplicateIndex(u32),
}
