//! Tag-level diff: what a resolution changes on a target primitive.
//!
//! A resolution is a list of tags where the empty value marks a key to be
//! removed. Only differences from the target's current tags are reported.

use std::collections::BTreeMap;

use tagmerge_types::{Command, PrimitiveId, Tag};

/// The changes a resolution makes to one target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub changes: Vec<TagChange>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, TagChange::Added { .. }))
            .count()
    }

    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, TagChange::Removed { .. }))
            .count()
    }

    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, TagChange::Modified { .. }))
            .count()
    }

    /// One property command per change, in diff order.
    pub fn to_commands(&self, target: PrimitiveId) -> Vec<Command> {
        self.changes.iter().map(|c| c.to_command(target)).collect()
    }
}

/// A single tag change on the target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagChange {
    Added { key: String, value: String },
    Removed { key: String, value: String },
    Modified { key: String, old: String, new: String },
}

impl TagChange {
    pub fn key(&self) -> &str {
        match self {
            Self::Added { key, .. } | Self::Removed { key, .. } | Self::Modified { key, .. } => key,
        }
    }

    pub fn to_command(&self, target: PrimitiveId) -> Command {
        match self {
            Self::Added { key, value } => Command::set_property(target, key.as_str(), value.as_str()),
            Self::Modified { key, new, .. } => Command::set_property(target, key.as_str(), new.as_str()),
            Self::Removed { key, .. } => Command::remove_property(target, key.as_str()),
        }
    }
}

/// Compare `resolution` against the target's `current` tags.
///
/// A tag with a value is `Added` or `Modified` when it differs from the
/// target; a tombstone is `Removed` only if the key is present. Keys the
/// resolution does not mention are left alone.
pub fn diff_tags(current: &BTreeMap<String, String>, resolution: &[Tag]) -> TagDiff {
    let mut changes = Vec::new();
    for tag in resolution {
        let existing = current.get(&tag.key);
        match (existing, tag.value.is_empty()) {
            (Some(old), true) => changes.push(TagChange::Removed {
                key: tag.key.clone(),
                value: old.clone(),
            }),
            (None, true) => {}
            (Some(old), false) if *old != tag.value => changes.push(TagChange::Modified {
                key: tag.key.clone(),
                old: old.clone(),
                new: tag.value.clone(),
            }),
            (Some(_), false) => {}
            (None, false) => changes.push(TagChange::Added {
                key: tag.key.clone(),
                value: tag.value.clone(),
            }),
        }
    }
    TagDiff { changes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn identical_resolution_is_empty() {
        let diff = diff_tags(
            &current(&[("highway", "primary"), ("name", "A")]),
            &[Tag::new("highway", "primary"), Tag::new("name", "A")],
        );
        assert!(diff.is_empty());
    }

    #[test]
    fn detects_each_kind() {
        let diff = diff_tags(
            &current(&[("highway", "primary"), ("name", "A"), ("note", "x")]),
            &[
                Tag::new("highway", "secondary"),
                Tag::new("name", "A"),
                Tag::new("note", ""),
                Tag::new("ref", "7"),
                Tag::new("fixme", ""),
            ],
        );
        assert_eq!(diff.len(), 3);
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.removals(), 1);
        assert_eq!(diff.modifications(), 1);
        let keys: Vec<&str> = diff.changes.iter().map(TagChange::key).collect();
        assert_eq!(keys, ["highway", "note", "ref"]);
    }

    #[test]
    fn commands_follow_changes() {
        let target = PrimitiveId::way(1);
        let diff = diff_tags(
            &current(&[("note", "x")]),
            &[Tag::new("note", ""), Tag::new("ref", "7")],
        );
        assert_eq!(
            diff.to_commands(target),
            vec![
                Command::remove_property(target, "note"),
                Command::set_property(target, "ref", "7"),
            ]
        );
    }
}
