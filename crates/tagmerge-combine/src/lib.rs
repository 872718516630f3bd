//! Merge resolution for tagmerge.
//!
//! Ties the tag and membership resolvers together. A [`CombineSession`]
//! prepares both resolvers for a set of primitives being merged, and a
//! [`CombineResolver`] compiles their decisions into the [`Command`]s that
//! apply the merge to a target primitive and its parent relations.
//!
//! # Key Types
//!
//! - [`CombineSession`] -- Prepare, auto-resolve, and build commands for one merge
//! - [`CombineResolver`] -- Compiles decisions into an ordered command list
//! - [`CombineConfig`] -- Discardable keys and automatic resolution rules
//! - [`TagDiff`] -- Tag changes a resolution makes to a target
//!
//! [`Command`]: tagmerge_types::Command

pub mod config;
pub mod error;
pub mod resolver;
pub mod session;
pub mod tag_diff;

pub use config::{default_discardable_keys, CombineConfig};
pub use error::{CombineError, CombineResult};
pub use resolver::CombineResolver;
pub use session::{parent_relations, CombineSession};
pub use tag_diff::{diff_tags, TagChange, TagDiff};
