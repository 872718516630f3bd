//! Edit commands produced by conflict resolution.
//!
//! Commands are plain payloads. Nothing in tagmerge executes them; they are
//! handed to the editor's command/undo machinery, which applies them in
//! order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::primitive::PrimitiveId;
use crate::relation::RelationMember;

/// A single edit against the data set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Set `key` to `value` on every target, or remove it when `value` is
    /// absent.
    ChangeProperty {
        targets: Vec<PrimitiveId>,
        key: String,
        value: Option<String>,
    },
    /// Replace the complete member list of `relation`.
    ChangeMembers {
        relation: PrimitiveId,
        members: Vec<RelationMember>,
    },
}

impl Command {
    /// Set a property on one target. An empty value is a removal.
    pub fn set_property(target: PrimitiveId, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::change_property(vec![target], key, Some(value.into()))
    }

    pub fn remove_property(target: PrimitiveId, key: impl Into<String>) -> Self {
        Self::change_property(vec![target], key, None)
    }

    /// Change a property on several targets at once. `Some("")` is
    /// normalized to `None`.
    pub fn change_property(
        targets: Vec<PrimitiveId>,
        key: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self::ChangeProperty {
            targets,
            key: key.into(),
            value: value.filter(|v| !v.is_empty()),
        }
    }

    pub fn change_members(relation: PrimitiveId, members: Vec<RelationMember>) -> Self {
        Self::ChangeMembers { relation, members }
    }

    /// Returns `true` if this command deletes a property.
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::ChangeProperty { value: None, .. })
    }

    /// Primitives this command modifies.
    pub fn affected(&self) -> Vec<PrimitiveId> {
        match self {
            Self::ChangeProperty { targets, .. } => targets.clone(),
            Self::ChangeMembers { relation, .. } => vec![*relation],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChangeProperty {
                targets,
                key,
                value,
            } => {
                let targets: Vec<String> = targets.iter().map(PrimitiveId::to_string).collect();
                match value {
                    Some(v) => write!(f, "set {key}={v} on {}", targets.join(", ")),
                    None => write!(f, "remove {key} from {}", targets.join(", ")),
                }
            }
            Self::ChangeMembers { relation, members } => {
                let members: Vec<String> = members.iter().map(RelationMember::to_string).collect();
                write!(f, "replace members of {relation} with [{}]", members.join(", "))
            }
        }
    }
}
