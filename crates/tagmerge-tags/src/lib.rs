//! Tag conflict resolution for tagmerge.
//!
//! When several primitives are combined into one, every tag key with more
//! than one observed value is a conflict. This crate owns one
//! [`TagConflictDecision`] per key, auto-decides the unambiguous ones, and
//! collects the user's remaining choices in a [`TagConflictResolver`].
//!
//! # Key Types
//!
//! - [`TagConflictDecision`] / [`TagDecision`] -- Per-key decision state
//! - [`TagConflictResolver`] -- All decisions of one merge, ordered and counted
//! - [`AutomaticRules`] -- Configurable rules that pre-resolve known conflicts
//!
//! The helpers in [`normalize`] prepare a raw [`TagCollection`] before the
//! resolver is populated.
//!
//! [`TagCollection`]: tagmerge_types::TagCollection

pub mod automatic;
pub mod decision;
pub mod error;
pub mod normalize;
pub mod resolver;

pub use automatic::{
    apply_automatic_resolution, AutomaticChoice, AutomaticChoiceGroup, AutomaticCombine,
    AutomaticRules, AutomaticTagConflictResolver, CombineSort,
};
pub use decision::{is_summable_key, TagConflictDecision, TagDecision};
pub use error::{TagConflictError, TagConflictResult};
pub use normalize::{complete_for_editing, normalize_before_editing};
pub use resolver::TagConflictResolver;
