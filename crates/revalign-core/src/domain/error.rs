//! Error taxonomy for corpus loading, span resolution and output.

use std::path::PathBuf;

/// Revalign errors.
#[derive(Debug, thiserror::Error)]
pub enum RevalignError {
    /// A revision, alignment or source file legitimately does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed document {}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    /// Zero target tokens reached the resolver.
    #[error("error span has no target tokens")]
    EmptySpan,

    /// No alignment edge touches the error span.
    #[error("no alignment edge touches error span {span}")]
    UnresolvedRevision { span: String },

    #[error("invalid target reference: {0}")]
    InvalidTarget(String),

    /// A target span reaches the configured token limit.
    #[error("target span of {len} tokens reaches the limit of {limit}")]
    SpanTooLong { len: u64, limit: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RevalignError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors whose fault scope is a single essay or error span. The
    /// orchestrator logs these and moves on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::MalformedDocument { .. } | Self::UnresolvedRevision { .. }
        )
    }
}

/// Result type for revalign operations.
pub type Result<T> = std::result::Result<T, RevalignError>;
