use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::primitive::{PrimitiveId, Tagged};

/// One member slot of a relation: a referenced primitive plus a role label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationMember {
    #[serde(default)]
    pub role: String,
    pub member: PrimitiveId,
}

impl RelationMember {
    pub fn new(role: impl Into<String>, member: PrimitiveId) -> Self {
        Self {
            role: role.into(),
            member,
        }
    }

    pub fn refers_to(&self, id: PrimitiveId) -> bool {
        self.member == id
    }

    pub fn has_role(&self) -> bool {
        !self.role.is_empty()
    }
}

impl fmt::Display for RelationMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@\"{}\"", self.member, self.role)
    }
}

/// A relation: a tagged primitive holding an ordered list of member slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: PrimitiveId,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub members: Vec<RelationMember>,
}

impl Relation {
    pub fn new(id: i64) -> Self {
        Self {
            id: PrimitiveId::relation(id),
            tags: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    /// Builder-style member append.
    pub fn with_member(mut self, role: impl Into<String>, member: PrimitiveId) -> Self {
        self.members.push(RelationMember::new(role, member));
        self
    }

    /// Builder-style tag insertion.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn members_count(&self) -> usize {
        self.members.len()
    }

    /// The member at `position`, or [`TypeError::OutOfRange`].
    pub fn member(&self, position: usize) -> TypeResult<&RelationMember> {
        self.members.get(position).ok_or(TypeError::OutOfRange {
            relation: self.id,
            position,
            len: self.members.len(),
        })
    }

    /// Returns `true` if any member slot refers to `id`.
    pub fn references(&self, id: PrimitiveId) -> bool {
        self.members.iter().any(|m| m.refers_to(id))
    }

    /// Every member slot referring to one of `children`, in member order.
    pub fn child_references(&self, children: &[PrimitiveId]) -> Vec<RelationToChildReference> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| children.contains(&m.member))
            .map(|(position, m)| RelationToChildReference {
                relation: self.id,
                position,
                role: m.role.clone(),
                child: m.member,
            })
            .collect()
    }
}

impl Tagged for Relation {
    fn primitive_id(&self) -> PrimitiveId {
        self.id
    }

    fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.tags
    }
}

/// A reference from a relation member slot to a child primitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationToChildReference {
    pub relation: PrimitiveId,
    pub position: usize,
    pub role: String,
    pub child: PrimitiveId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Relation {
        Relation::new(1)
            .with_member("outer", PrimitiveId::way(10))
            .with_member("", PrimitiveId::node(20))
            .with_member("inner", PrimitiveId::way(10))
    }

    #[test]
    fn member_out_of_range() {
        let r = sample();
        assert!(r.member(2).is_ok());
        assert_eq!(
            r.member(3).unwrap_err(),
            TypeError::OutOfRange {
                relation: PrimitiveId::relation(1),
                position: 3,
                len: 3,
            }
        );
    }

    #[test]
    fn child_references_in_member_order() {
        let refs = sample().child_references(&[PrimitiveId::way(10)]);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].position, 0);
        assert_eq!(refs[0].role, "outer");
        assert_eq!(refs[1].position, 2);
        assert_eq!(refs[1].role, "inner");
    }

    #[test]
    fn references_checks_every_slot() {
        let r = sample();
        assert!(r.references(PrimitiveId::node(20)));
        assert!(!r.references(PrimitiveId::node(10)));
    }

    #[test]
    fn member_display() {
        let m = RelationMember::new("outer", PrimitiveId::way(3));
        assert_eq!(m.to_string(), "w3@\"outer\"");
        assert!(m.has_role());
    }
}
