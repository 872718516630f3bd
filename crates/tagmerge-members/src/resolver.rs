//! The membership conflict resolver.
//!
//! The resolver keeps its own snapshot of every affected relation. Rewrites
//! never touch those snapshots; they are expressed as new member lists
//! inside [`Command::ChangeMembers`] payloads.
//!
//! # Invariants
//!
//! - `(relation, position)` identifies at most one decision.
//! - Every decision's position was valid in its relation snapshot.
//! - Commands are only built once every decision is decided.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use tagmerge_types::{
    Command, CountListeners, ListenerId, PrimitiveId, PrimitiveKind, Relation, RelationMember,
    RelationToChildReference,
};

use crate::decision::{MemberConflictDecision, MemberDecision};
use crate::error::{MemberConflictError, MemberConflictResult};

/// Owns every membership decision of one merge.
#[derive(Debug, Default)]
pub struct MemberConflictResolver {
    decisions: Vec<MemberConflictDecision>,
    relations: Vec<Relation>,
    primitives: Vec<PrimitiveId>,
    num_conflicts: usize,
    listeners: CountListeners,
}

impl MemberConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Population
    // ---------------------------------------------------------------

    /// One decision for every slot of `relations` referring to any of
    /// `referents`. Relations and referents listed twice are considered
    /// once; relations without such a slot are not kept.
    pub fn populate(
        &mut self,
        relations: &[Relation],
        referents: &[PrimitiveId],
    ) -> MemberConflictResult<()> {
        self.decisions.clear();
        self.relations.clear();
        self.primitives = dedup(referents.iter().copied());
        for relation in relations {
            if self.relations.iter().any(|r| r.id == relation.id) {
                continue;
            }
            let before = self.decisions.len();
            for referent in &self.primitives {
                for (position, member) in relation.members.iter().enumerate() {
                    if member.refers_to(*referent) {
                        self.decisions
                            .push(MemberConflictDecision::new(relation, position)?);
                    }
                }
            }
            if self.decisions.len() > before {
                self.relations.push(relation.clone());
            }
        }
        self.refresh();
        debug!(
            relations = self.relations.len(),
            decisions = self.decisions.len(),
            "populated member conflict resolver"
        );
        Ok(())
    }

    /// One decision per explicit child reference. Every referenced relation
    /// must be present in `relations`.
    pub fn populate_from_references(
        &mut self,
        relations: &[Relation],
        references: &[RelationToChildReference],
    ) -> MemberConflictResult<()> {
        self.decisions.clear();
        self.relations.clear();
        for reference in references {
            let relation = relations
                .iter()
                .find(|r| r.id == reference.relation)
                .ok_or_else(|| {
                    MemberConflictError::InvalidArgument(format!(
                        "relation {} is not available",
                        reference.relation
                    ))
                })?;
            if self.find_decision(relation.id, reference.position).is_some() {
                continue;
            }
            self.decisions
                .push(MemberConflictDecision::new(relation, reference.position)?);
            if !self.relations.iter().any(|r| r.id == relation.id) {
                self.relations.push(relation.clone());
            }
        }
        self.primitives = dedup(references.iter().map(|r| r.child));
        self.refresh();
        Ok(())
    }

    /// Decide slots whose outcome is evident.
    ///
    /// When only nodes are merged and every slot refers to the same node,
    /// all slots are replaced. Otherwise, within each relation that contains
    /// every merged primitive, the occurrences of the primitives are paired
    /// up in order; a group with one common role at consecutive positions
    /// keeps its first slot and drops the rest. Anything else stays
    /// undecided.
    pub fn prepare_default_decisions(&mut self) {
        if self.primitives.is_empty() {
            return;
        }

        if self
            .primitives
            .iter()
            .all(|p| p.kind() == PrimitiveKind::Node)
        {
            let originals: BTreeSet<PrimitiveId> =
                self.decisions.iter().map(|d| d.original()).collect();
            if originals.len() == 1 {
                for decision in &mut self.decisions {
                    decision.decide(MemberDecision::Replace);
                }
                self.refresh();
                return;
            }
        }

        for relation in &self.relations {
            let mut by_primitive: Vec<(PrimitiveId, Vec<usize>)> = Vec::new();
            for (index, decision) in self.decisions.iter().enumerate() {
                if decision.relation() != relation.id {
                    continue;
                }
                match by_primitive.iter_mut().find(|(p, _)| *p == decision.original()) {
                    Some((_, indices)) => indices.push(index),
                    None => by_primitive.push((decision.original(), vec![index])),
                }
            }

            if !self
                .primitives
                .iter()
                .all(|p| by_primitive.iter().any(|(q, _)| q == p))
            {
                continue;
            }

            let steps = by_primitive
                .iter()
                .map(|(_, indices)| indices.len())
                .min()
                .unwrap_or(0);
            for step in 0..steps {
                let group: Vec<usize> = by_primitive.iter().map(|(_, indices)| indices[step]).collect();
                let roles: BTreeSet<&str> = group.iter().map(|i| self.decisions[*i].role()).collect();
                let positions: BTreeSet<usize> =
                    group.iter().map(|i| self.decisions[*i].position()).collect();
                if roles.len() != 1 || !is_consecutive(&positions) {
                    continue;
                }
                for (n, index) in group.into_iter().enumerate() {
                    let decision = if n == 0 {
                        MemberDecision::Replace
                    } else {
                        MemberDecision::Remove
                    };
                    self.decisions[index].decide(decision);
                }
            }
        }
        self.refresh();
    }

    // ---------------------------------------------------------------
    // Decisions
    // ---------------------------------------------------------------

    pub fn decide(
        &mut self,
        index: usize,
        decision: impl Into<Option<MemberDecision>>,
    ) -> MemberConflictResult<()> {
        self.decision_mut(index)?.decide(decision);
        self.refresh();
        Ok(())
    }

    pub fn set_role(&mut self, index: usize, role: Option<&str>) -> MemberConflictResult<()> {
        self.decision_mut(index)?.set_role(role);
        self.refresh();
        Ok(())
    }

    /// Decide every slot the same way.
    pub fn decide_all(&mut self, decision: impl Into<Option<MemberDecision>>) {
        let decision = decision.into();
        for d in &mut self.decisions {
            d.decide(decision);
        }
        self.refresh();
    }

    /// Apply one role to every slot.
    pub fn apply_role(&mut self, role: Option<&str>) {
        for decision in &mut self.decisions {
            decision.set_role(role);
        }
        self.refresh();
    }

    fn decision_mut(&mut self, index: usize) -> MemberConflictResult<&mut MemberConflictDecision> {
        let len = self.decisions.len();
        self.decisions.get_mut(index).ok_or_else(|| {
            MemberConflictError::InvalidArgument(format!(
                "no member decision at index {index} (have {len})"
            ))
        })
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn decision(&self, index: usize) -> Option<&MemberConflictDecision> {
        self.decisions.get(index)
    }

    pub fn decisions(&self) -> &[MemberConflictDecision] {
        &self.decisions
    }

    pub fn find_decision(
        &self,
        relation: PrimitiveId,
        position: usize,
    ) -> Option<&MemberConflictDecision> {
        self.decisions.iter().find(|d| d.matches(relation, position))
    }

    /// Snapshots of the affected relations, in population order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn num_decisions(&self) -> usize {
        self.decisions.len()
    }

    /// Number of undecided slots.
    pub fn num_conflicts(&self) -> usize {
        self.num_conflicts
    }

    pub fn is_resolved_completely(&self) -> bool {
        self.num_conflicts == 0
    }

    // ---------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------

    /// Replace-members commands for every relation the decisions change.
    ///
    /// Fails with [`MemberConflictError::Undecided`] if a slot of an
    /// affected relation is still undecided.
    pub fn build_resolution_commands(
        &self,
        new_referent: PrimitiveId,
    ) -> MemberConflictResult<Vec<Command>> {
        let index = self.decision_index();
        let mut commands = Vec::new();
        for relation in &self.relations {
            if let Some(members) = self.rebuild(relation, new_referent, &index)? {
                commands.push(Command::change_members(relation.id, members));
            }
        }
        debug!(
            new_referent = %new_referent,
            commands = commands.len(),
            "built member resolution commands"
        );
        Ok(commands)
    }

    /// Relations [`Self::build_resolution_commands`] would rewrite.
    pub fn modified_relations(
        &self,
        new_referent: PrimitiveId,
    ) -> MemberConflictResult<Vec<PrimitiveId>> {
        let index = self.decision_index();
        let mut modified = Vec::new();
        for relation in &self.relations {
            if self.rebuild(relation, new_referent, &index)?.is_some() {
                modified.push(relation.id);
            }
        }
        Ok(modified)
    }

    fn decision_index(&self) -> HashMap<(PrimitiveId, usize), &MemberConflictDecision> {
        self.decisions
            .iter()
            .map(|d| ((d.relation(), d.position()), d))
            .collect()
    }

    /// The new member list of `relation`, or `None` if nothing changes.
    fn rebuild(
        &self,
        relation: &Relation,
        new_referent: PrimitiveId,
        index: &HashMap<(PrimitiveId, usize), &MemberConflictDecision>,
    ) -> MemberConflictResult<Option<Vec<RelationMember>>> {
        let mut members = Vec::with_capacity(relation.members.len());
        let mut changed = false;
        for (position, member) in relation.members.iter().enumerate() {
            let Some(decision) = index.get(&(relation.id, position)) else {
                members.push(member.clone());
                continue;
            };
            match decision.decision() {
                MemberDecision::Replace => {
                    let replacement = RelationMember::new(decision.role(), new_referent);
                    changed |= replacement != *member;
                    members.push(replacement);
                }
                MemberDecision::Remove => changed = true,
                MemberDecision::Undecided => {
                    return Err(MemberConflictError::Undecided {
                        relation: relation.id,
                        position,
                    });
                }
            }
        }
        Ok(changed.then_some(members))
    }

    // ---------------------------------------------------------------
    // Notification
    // ---------------------------------------------------------------

    /// Register `callback(old, new)` for changes of [`Self::num_conflicts`].
    pub fn on_unresolved_count_changed(
        &mut self,
        callback: impl FnMut(usize, usize) + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Recount undecided slots and notify on change.
    pub fn refresh(&mut self) {
        let old = self.num_conflicts;
        self.num_conflicts = self.decisions.iter().filter(|d| !d.is_decided()).count();
        self.listeners.notify(old, self.num_conflicts);
    }
}

fn dedup(ids: impl Iterator<Item = PrimitiveId>) -> Vec<PrimitiveId> {
    let mut out: Vec<PrimitiveId> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn is_consecutive(numbers: &BTreeSet<usize>) -> bool {
    numbers
        .iter()
        .zip(numbers.iter().skip(1))
        .all(|(a, b)| a + 1 == *b)
}
