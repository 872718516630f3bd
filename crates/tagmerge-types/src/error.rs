use thiserror::Error;

use crate::primitive::PrimitiveId;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid primitive id: {0}")]
    InvalidId(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("position {position} out of range for {relation} with {len} members")]
    OutOfRange {
        relation: PrimitiveId,
        position: usize,
        len: usize,
    },
}

/// Convenience alias for type results.
pub type TypeResult<T> = Result<T, TypeError>;
