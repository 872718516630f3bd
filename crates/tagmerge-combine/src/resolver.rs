//! Compiles the decisions of both resolvers into edit commands.

use std::collections::BTreeSet;

use tracing::debug;

use tagmerge_members::MemberConflictResolver;
use tagmerge_tags::TagConflictResolver;
use tagmerge_types::{Command, Tagged};

use crate::error::CombineResult;
use crate::tag_diff::{diff_tags, TagDiff};

/// Borrows both resolvers and the discardable-key policy for one merge.
///
/// Commands are emitted in a fixed order: tag changes in resolution order,
/// then removals of discardable keys, then relation member rewrites.
#[derive(Clone, Copy, Debug)]
pub struct CombineResolver<'a> {
    tags: &'a TagConflictResolver,
    members: &'a MemberConflictResolver,
    discardable_keys: &'a [String],
}

impl<'a> CombineResolver<'a> {
    pub fn new(
        tags: &'a TagConflictResolver,
        members: &'a MemberConflictResolver,
        discardable_keys: &'a [String],
    ) -> Self {
        Self {
            tags,
            members,
            discardable_keys,
        }
    }

    /// Tag changes the resolution makes to `target`, excluding discardable
    /// key removals.
    pub fn tag_diff<T: Tagged + ?Sized>(&self, target: &T) -> TagDiff {
        diff_tags(target.tags(), &self.tags.resolution())
    }

    /// Commands that apply the merge to `target`.
    ///
    /// Running this again against a target that already carries the
    /// resolved tags yields no tag commands. Fails if a membership decision
    /// is still undecided.
    pub fn build_resolution_commands<T: Tagged + ?Sized>(
        &self,
        target: &T,
    ) -> CombineResult<Vec<Command>> {
        let id = target.primitive_id();
        let resolution = self.tags.resolution();
        let mut commands = diff_tags(target.tags(), &resolution).to_commands(id);

        let resolved: BTreeSet<&str> = resolution.iter().map(|t| t.key.as_str()).collect();
        for key in self.discardable_keys {
            if target.has_key(key) && !resolved.contains(key.as_str()) {
                commands.push(Command::remove_property(id, key.as_str()));
            }
        }
        let tag_commands = commands.len();

        if self.members.num_decisions() > 0 {
            commands.extend(self.members.build_resolution_commands(id)?);
        }

        debug!(
            target = %id,
            tag_commands,
            member_commands = commands.len() - tag_commands,
            "built merge resolution commands"
        );
        Ok(commands)
    }
}
