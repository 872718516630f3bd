use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The three kinds of map primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Node,
    Way,
    Relation,
}

impl PrimitiveKind {
    /// Single-letter prefix used in the textual form of a [`PrimitiveId`].
    pub fn prefix(&self) -> char {
        match self {
            Self::Node => 'n',
            Self::Way => 'w',
            Self::Relation => 'r',
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Way => write!(f, "way"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

/// Typed identifier of a map primitive.
///
/// Identity is the pair of kind and numeric id, so node 1 and way 1 are
/// distinct. Negative ids denote primitives that have not been uploaded yet.
/// The textual form is the kind prefix followed by the id (`n12`, `w-3`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrimitiveId {
    kind: PrimitiveKind,
    id: i64,
}

impl PrimitiveId {
    pub const fn new(kind: PrimitiveKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub const fn node(id: i64) -> Self {
        Self::new(PrimitiveKind::Node, id)
    }

    pub const fn way(id: i64) -> Self {
        Self::new(PrimitiveKind::Way, id)
    }

    pub const fn relation(id: i64) -> Self {
        Self::new(PrimitiveKind::Relation, id)
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns `true` if this primitive only exists locally.
    pub fn is_new(&self) -> bool {
        self.id <= 0
    }
}

impl fmt::Debug for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveId({self})")
    }
}

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.id)
    }
}

impl FromStr for PrimitiveId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let kind = match chars.next() {
            Some('n') => PrimitiveKind::Node,
            Some('w') => PrimitiveKind::Way,
            Some('r') => PrimitiveKind::Relation,
            _ => return Err(TypeError::InvalidId(s.to_string())),
        };
        let id = chars
            .as_str()
            .parse::<i64>()
            .map_err(|_| TypeError::InvalidId(s.to_string()))?;
        Ok(Self::new(kind, id))
    }
}

impl TryFrom<String> for PrimitiveId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PrimitiveId> for String {
    fn from(id: PrimitiveId) -> Self {
        id.to_string()
    }
}

/// Keyed attribute access shared by nodes, ways and relations.
///
/// Implementors only expose their tag map; the accessors are provided.
pub trait Tagged {
    /// Identity of the primitive carrying the tags.
    fn primitive_id(&self) -> PrimitiveId;

    fn tags(&self) -> &BTreeMap<String, String>;

    fn tags_mut(&mut self) -> &mut BTreeMap<String, String>;

    fn get(&self, key: &str) -> Option<&str> {
        self.tags().get(key).map(String::as_str)
    }

    /// Set `key` to `value`. An empty value removes the key.
    fn put(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.remove(key);
        } else {
            self.tags_mut().insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.tags_mut().remove(key)
    }

    fn has_key(&self, key: &str) -> bool {
        self.tags().contains_key(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.tags().keys().map(String::as_str).collect()
    }

    fn is_tagged(&self) -> bool {
        !self.tags().is_empty()
    }
}

/// A node or way: an identity plus its tags.
///
/// Relations carry members as well and are modelled by
/// [`Relation`](crate::Relation).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Primitive {
    pub id: PrimitiveId,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Primitive {
    pub fn new(id: PrimitiveId) -> Self {
        Self {
            id,
            tags: BTreeMap::new(),
        }
    }

    pub fn node(id: i64) -> Self {
        Self::new(PrimitiveId::node(id))
    }

    pub fn way(id: i64) -> Self {
        Self::new(PrimitiveId::way(id))
    }

    /// Builder-style tag insertion.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl Tagged for Primitive {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_kind_prefix() {
        assert_eq!(PrimitiveId::node(12).to_string(), "n12");
        assert_eq!(PrimitiveId::way(-3).to_string(), "w-3");
        assert_eq!(PrimitiveId::relation(7).to_string(), "r7");
    }

    #[test]
    fn parse_textual_form() {
        assert_eq!("n12".parse::<PrimitiveId>().unwrap(), PrimitiveId::node(12));
        assert_eq!("w-3".parse::<PrimitiveId>().unwrap(), PrimitiveId::way(-3));
        assert!("x1".parse::<PrimitiveId>().is_err());
        assert!("n".parse::<PrimitiveId>().is_err());
        assert!("".parse::<PrimitiveId>().is_err());
    }

    #[test]
    fn same_number_different_kind_is_distinct() {
        assert_ne!(PrimitiveId::node(1), PrimitiveId::way(1));
    }

    #[test]
    fn serde_uses_textual_form() {
        let id = PrimitiveId::relation(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"r42\"");
        let parsed: PrimitiveId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn put_empty_value_removes_key() {
        let mut p = Primitive::node(1).with_tag("name", "Main St");
        p.put("name", "");
        assert!(!p.has_key("name"));
        assert!(!p.is_tagged());
    }

    #[test]
    fn tagged_accessors() {
        let mut p = Primitive::way(5).with_tag("highway", "residential");
        assert_eq!(p.get("highway"), Some("residential"));
        p.put("name", "Elm St");
        assert_eq!(p.keys(), vec!["highway", "name"]);
        assert_eq!(p.remove("highway").as_deref(), Some("residential"));
        assert_eq!(p.get("highway"), None);
    }

    #[test]
    fn new_ids_are_not_positive() {
        assert!(PrimitiveId::node(-1).is_new());
        assert!(!PrimitiveId::node(1).is_new());
    }
}
