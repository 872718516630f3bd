//! Relation membership conflict resolution for tagmerge.
//!
//! When primitives are merged, every relation slot that referred to one of
//! them must either be rewritten to point at the merge result or dropped.
//! Each such slot gets a [`MemberConflictDecision`]; the
//! [`MemberConflictResolver`] collects them and compiles the decisions into
//! replace-members commands for the relations that actually change.

pub mod decision;
pub mod error;
pub mod resolver;

pub use decision::{MemberConflictDecision, MemberDecision};
pub use error::{MemberConflictError, MemberConflictResult};
pub use resolver::MemberConflictResolver;
