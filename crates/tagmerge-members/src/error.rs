//! Error types for the membership conflict crate.

use tagmerge_types::PrimitiveId;

/// Errors raised by membership conflict decisions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MemberConflictError {
    /// A decision was requested for a slot the relation does not have.
    #[error("position {position} out of range for {relation} with {len} members")]
    OutOfRange {
        relation: PrimitiveId,
        position: usize,
        len: usize,
    },

    /// Commands were requested while a slot is still undecided.
    #[error("invalid state: member {position} of {relation} is not decided yet")]
    Undecided {
        relation: PrimitiveId,
        position: usize,
    },

    /// A relation or decision index that the resolver does not know.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias for membership conflict results.
pub type MemberConflictResult<T> = Result<T, MemberConflictError>;
