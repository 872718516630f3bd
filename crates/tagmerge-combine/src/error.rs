use std::path::PathBuf;

use tagmerge_members::MemberConflictError;
use tagmerge_tags::TagConflictError;
use tagmerge_types::TypeError;

/// Errors raised while preparing or compiling a merge.
#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Tags(#[from] TagConflictError),

    #[error(transparent)]
    Members(#[from] MemberConflictError),

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type CombineResult<T> = Result<T, CombineError>;
