use serde::{Deserialize, Serialize};

use tagmerge_types::{PrimitiveId, Relation, TypeError};

use crate::error::{MemberConflictError, MemberConflictResult};

/// What happens to a relation slot that referred to a merged primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberDecision {
    #[default]
    Undecided,
    /// Point the slot at the merge result, with the decision's role.
    Replace,
    /// Drop the slot.
    Remove,
}

/// The decision for one `(relation, position)` slot.
///
/// The slot's referent and role are captured when the decision is built;
/// later edits to the relation do not affect it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberConflictDecision {
    relation: PrimitiveId,
    position: usize,
    original: PrimitiveId,
    role: String,
    decision: MemberDecision,
}

impl MemberConflictDecision {
    /// Fails with [`MemberConflictError::OutOfRange`] if `relation` has no
    /// member at `position`.
    pub fn new(relation: &Relation, position: usize) -> MemberConflictResult<Self> {
        let member = relation.member(position).map_err(|e| match e {
            TypeError::OutOfRange {
                relation,
                position,
                len,
            } => MemberConflictError::OutOfRange {
                relation,
                position,
                len,
            },
            other => MemberConflictError::InvalidArgument(other.to_string()),
        })?;
        Ok(Self {
            relation: relation.id,
            position,
            original: member.member,
            role: member.role.clone(),
            decision: MemberDecision::Undecided,
        })
    }

    pub fn relation(&self) -> PrimitiveId {
        self.relation
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// The primitive the slot referred to when the decision was built.
    pub fn original(&self) -> PrimitiveId {
        self.original
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn decision(&self) -> MemberDecision {
        self.decision
    }

    pub fn is_decided(&self) -> bool {
        self.decision != MemberDecision::Undecided
    }

    /// Record a decision. `None` resets to [`MemberDecision::Undecided`];
    /// any decision may replace any other.
    pub fn decide(&mut self, decision: impl Into<Option<MemberDecision>>) {
        self.decision = decision.into().unwrap_or_default();
    }

    /// Change the role used when the slot is replaced. `None` clears it.
    pub fn set_role(&mut self, role: Option<&str>) {
        self.role = role.unwrap_or_default().to_string();
    }

    pub fn matches(&self, relation: PrimitiveId, position: usize) -> bool {
        self.relation == relation && self.position == position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation() -> Relation {
        Relation::new(1)
            .with_member("outer", PrimitiveId::way(10))
            .with_member("", PrimitiveId::way(11))
    }

    #[test]
    fn captures_original_slot() {
        let d = MemberConflictDecision::new(&relation(), 0).unwrap();
        assert_eq!(d.relation(), PrimitiveId::relation(1));
        assert_eq!(d.position(), 0);
        assert_eq!(d.original(), PrimitiveId::way(10));
        assert_eq!(d.role(), "outer");
        assert_eq!(d.decision(), MemberDecision::Undecided);
    }

    #[test]
    fn position_must_exist() {
        let err = MemberConflictDecision::new(&relation(), 2).unwrap_err();
        assert_eq!(
            err,
            MemberConflictError::OutOfRange {
                relation: PrimitiveId::relation(1),
                position: 2,
                len: 2,
            }
        );
    }

    #[test]
    fn decide_any_order() {
        let mut d = MemberConflictDecision::new(&relation(), 1).unwrap();
        d.decide(MemberDecision::Remove);
        assert!(d.is_decided());
        d.decide(MemberDecision::Replace);
        assert_eq!(d.decision(), MemberDecision::Replace);
        d.decide(None);
        assert_eq!(d.decision(), MemberDecision::Undecided);
    }

    #[test]
    fn set_role_normalizes_none() {
        let mut d = MemberConflictDecision::new(&relation(), 0).unwrap();
        d.decide(MemberDecision::Replace);
        d.set_role(Some("inner"));
        assert_eq!(d.role(), "inner");
        d.set_role(None);
        assert_eq!(d.role(), "");
        assert_eq!(d.decision(), MemberDecision::Replace);
    }

    #[test]
    fn matches_relation_and_position() {
        let d = MemberConflictDecision::new(&relation(), 1).unwrap();
        assert!(d.matches(PrimitiveId::relation(1), 1));
        assert!(!d.matches(PrimitiveId::relation(1), 0));
        assert!(!d.matches(PrimitiveId::relation(2), 1));
    }
}
