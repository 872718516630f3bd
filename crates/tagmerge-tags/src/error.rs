//! Error types for the tag conflict crate.

/// Errors raised by tag conflict decisions and rules.
#[derive(Debug, thiserror::Error)]
pub enum TagConflictError {
    /// Malformed input, e.g. an empty or multi-key tag collection.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation requires a decided state, or the value is not a
    /// candidate of the decision.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An automatic resolution rule carries an invalid regular expression.
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Convenience alias for tag conflict results.
pub type TagConflictResult<T> = Result<T, TagConflictError>;
