//! Foundation types for tagmerge.
//!
//! This crate provides the map data model shared by every other tagmerge
//! crate: tagged primitives, relations and their members, multiset tag
//! collections, and the edit commands produced by conflict resolution.
//!
//! # Key Types
//!
//! - [`PrimitiveId`] -- Typed identifier of a node, way, or relation
//! - [`Primitive`] / [`Relation`] -- Tagged map entities
//! - [`Tagged`] -- Keyed attribute access shared by all entities
//! - [`TagCollection`] -- Multiset of tags with per-tag occurrence counts
//! - [`Command`] -- Opaque edit payload handed to an external executor
//! - [`CountListeners`] -- Observers of a resolver's unresolved conflict count

pub mod command;
pub mod error;
pub mod listener;
pub mod primitive;
pub mod relation;
pub mod tag;

pub use command::Command;
pub use error::{TypeError, TypeResult};
pub use listener::{CountListeners, ListenerId};
pub use primitive::{Primitive, PrimitiveId, PrimitiveKind, Tagged};
pub use relation::{Relation, RelationMember, RelationToChildReference};
pub use tag::{Tag, TagCollection};
