//! One merge from start to finish.
//!
//! [`CombineSession::prepare`] collects the tags of the primitives being
//! merged, settles what the automatic rules can, and populates both
//! resolvers with their default decisions. When nothing is left to decide
//! [`CombineSession::resolve_automatically`] yields the commands directly;
//! otherwise the caller decides the rest through [`CombineSession::tags_mut`]
//! and [`CombineSession::members_mut`] and then builds the commands.

use tracing::{debug, info};

use tagmerge_members::MemberConflictResolver;
use tagmerge_tags::{
    apply_automatic_resolution, complete_for_editing, normalize_before_editing, TagConflictError,
    TagConflictResolver,
};
use tagmerge_types::{Command, PrimitiveId, Relation, TagCollection, Tagged, TypeError};

use crate::config::CombineConfig;
use crate::error::CombineResult;
use crate::resolver::CombineResolver;

/// The relations among `relations` that refer to any of `primitives`, each
/// listed once.
pub fn parent_relations(relations: &[Relation], primitives: &[PrimitiveId]) -> Vec<Relation> {
    let mut parents: Vec<Relation> = Vec::new();
    for relation in relations {
        if primitives.iter().any(|p| relation.references(*p))
            && !parents.iter().any(|r| r.id == relation.id)
        {
            parents.push(relation.clone());
        }
    }
    parents
}

#[derive(Debug)]
pub struct CombineSession {
    config: CombineConfig,
    primitives: Vec<PrimitiveId>,
    merged_tags: TagCollection,
    automatically_resolved: Vec<String>,
    tags: TagConflictResolver,
    members: MemberConflictResolver,
}

impl CombineSession {
    /// Prepare the resolvers for merging `primitives`.
    ///
    /// `parent_relations` are the relations referring to any of them; see
    /// [`parent_relations`].
    pub fn prepare<T: Tagged>(
        primitives: &[T],
        parent_relations: &[Relation],
        config: CombineConfig,
    ) -> CombineResult<Self> {
        if primitives.is_empty() {
            return Err(TypeError::InvalidArgument("no primitives to combine".into()).into());
        }
        let ids: Vec<PrimitiveId> = primitives.iter().map(|p| p.primitive_id()).collect();

        let mut merged_tags = TagCollection::union_of_all(primitives);
        let automatically_resolved = if config.apply_automatic {
            apply_automatic_resolution(&mut merged_tags, &config.automatic.resolvers())
        } else {
            Vec::new()
        };
        normalize_before_editing(&mut merged_tags, primitives, &config.discardable_keys);

        let mut to_edit = merged_tags.clone();
        complete_for_editing(&mut to_edit);

        let mut tags = TagConflictResolver::new();
        tags.populate(&to_edit)?;
        tags.prepare_default_decisions();

        let mut members = MemberConflictResolver::new();
        members.populate(parent_relations, &ids)?;
        members.prepare_default_decisions();

        info!(
            primitives = ids.len(),
            relations = members.relations().len(),
            tag_conflicts = tags.num_conflicts(),
            member_conflicts = members.num_conflicts(),
            automatic = automatically_resolved.len(),
            "prepared combine session"
        );

        Ok(Self {
            config,
            primitives: ids,
            merged_tags,
            automatically_resolved,
            tags,
            members,
        })
    }

    /// Commands for every target if no decision is left open, `None`
    /// otherwise.
    pub fn resolve_automatically<T: Tagged>(
        &self,
        targets: &[T],
    ) -> CombineResult<Option<Vec<Command>>> {
        if !self.is_resolved_completely() {
            debug!(
                tag_conflicts = self.tags.num_conflicts(),
                member_conflicts = self.members.num_conflicts(),
                "combine needs decisions"
            );
            return Ok(None);
        }
        let mut commands = Vec::new();
        for target in targets {
            commands.extend(self.resolver().build_resolution_commands(target)?);
        }
        Ok(Some(commands))
    }

    /// Commands that apply the merge to `target`. Every tag key must be
    /// decided.
    pub fn build_resolution_commands<T: Tagged + ?Sized>(
        &self,
        target: &T,
    ) -> CombineResult<Vec<Command>> {
        if !self.tags.is_resolved_completely() {
            let open: Vec<&str> = self
                .tags
                .decisions()
                .filter(|d| !d.is_decided())
                .map(|d| d.key())
                .collect();
            return Err(TagConflictError::InvalidState(format!(
                "undecided tag keys: {}",
                open.join(", ")
            ))
            .into());
        }
        self.resolver().build_resolution_commands(target)
    }

    fn resolver(&self) -> CombineResolver<'_> {
        CombineResolver::new(&self.tags, &self.members, &self.config.discardable_keys)
    }

    pub fn config(&self) -> &CombineConfig {
        &self.config
    }

    pub fn primitives(&self) -> &[PrimitiveId] {
        &self.primitives
    }

    /// The merged tags after automatic resolution and normalization.
    pub fn merged_tags(&self) -> &TagCollection {
        &self.merged_tags
    }

    /// Keys settled by automatic rules.
    pub fn automatically_resolved(&self) -> &[String] {
        &self.automatically_resolved
    }

    /// Returns `true` if the merged tags conflict on some key.
    pub fn has_tag_conflicts(&self) -> bool {
        !self.merged_tags.is_applicable_to_primitive()
    }

    pub fn tags(&self) -> &TagConflictResolver {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagConflictResolver {
        &mut self.tags
    }

    pub fn members(&self) -> &MemberConflictResolver {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut MemberConflictResolver {
        &mut self.members
    }

    pub fn num_conflicts(&self) -> usize {
        self.tags.num_conflicts() + self.members.num_conflicts()
    }

    pub fn is_resolved_completely(&self) -> bool {
        self.tags.is_resolved_completely() && self.members.is_resolved_completely()
    }
}
