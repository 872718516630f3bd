//! Tags and multiset tag collections.
//!
//! A [`TagCollection`] records every tag observed across a group of
//! primitives together with the number of primitives it was seen on. The
//! empty value is meaningful: a tag `key=""` stands for "some primitive in
//! the group does not carry `key`".
//!
//! All iteration is in lexicographic order so that every derived value
//! (joins, sums, key lists) is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::primitive::Tagged;

/// Separator used when several values are combined into one.
pub const VALUE_SEPARATOR: &str = ";";

/// A single key/value pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matches_key(&self, key: &str) -> bool {
        self.key == key
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Multiset of tags with per-tag occurrence counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagCollection {
    tags: BTreeMap<Tag, usize>,
}

impl TagCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tags of a single primitive.
    pub fn from_tagged<T: Tagged + ?Sized>(primitive: &T) -> Self {
        Self::from_map(primitive.tags())
    }

    pub fn from_map(tags: &BTreeMap<String, String>) -> Self {
        let mut tc = Self::new();
        for (key, value) in tags {
            tc.add(Tag::new(key.clone(), value.clone()));
        }
        tc
    }

    /// Every tag carried by any of `primitives`.
    pub fn union_of_all<'a, T, I>(primitives: I) -> Self
    where
        T: Tagged + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut tc = Self::new();
        for p in primitives {
            tc.add_all(&Self::from_tagged(p));
        }
        tc
    }

    /// Only the tags carried by every one of `primitives`.
    pub fn common_to_all<'a, T, I>(primitives: I) -> Self
    where
        T: Tagged + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut iter = primitives.into_iter();
        let Some(first) = iter.next() else {
            return Self::new();
        };
        let mut tc = Self::from_tagged(first);
        for p in iter {
            tc = tc.intersect(&Self::from_tagged(p));
        }
        tc
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn add(&mut self, tag: Tag) {
        *self.tags.entry(tag).or_insert(0) += 1;
    }

    pub fn add_all(&mut self, other: &TagCollection) {
        for (tag, count) in &other.tags {
            *self.tags.entry(tag.clone()).or_insert(0) += count;
        }
    }

    /// How many times `tag` was added.
    pub fn occurrence(&self, tag: &Tag) -> usize {
        self.tags.get(tag).copied().unwrap_or(0)
    }

    pub fn remove(&mut self, tag: &Tag) {
        self.tags.remove(tag);
    }

    pub fn remove_by_key(&mut self, key: &str) {
        self.tags.retain(|t, _| !t.matches_key(key));
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.keys()
    }

    pub fn keys(&self) -> BTreeSet<&str> {
        self.tags.keys().map(|t| t.key.as_str()).collect()
    }

    /// Keys with more than one distinct value (the empty value included).
    pub fn keys_with_multiple_values(&self) -> BTreeSet<&str> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tag in self.tags.keys() {
            *counts.entry(tag.key.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(k, _)| k)
            .collect()
    }

    /// Distinct values across all keys.
    pub fn values(&self) -> BTreeSet<&str> {
        self.tags.keys().map(|t| t.value.as_str()).collect()
    }

    /// Distinct values for `key`, the empty value included.
    pub fn values_for(&self, key: &str) -> BTreeSet<&str> {
        self.tags
            .keys()
            .filter(|t| t.matches_key(key))
            .map(|t| t.value.as_str())
            .collect()
    }

    /// The sub-collection restricted to `key`, occurrence counts preserved.
    pub fn tags_for(&self, key: &str) -> TagCollection {
        TagCollection {
            tags: self
                .tags
                .iter()
                .filter(|(t, _)| t.matches_key(key))
                .map(|(t, n)| (t.clone(), *n))
                .collect(),
        }
    }

    pub fn num_tags_for(&self, key: &str) -> usize {
        self.tags.keys().filter(|t| t.matches_key(key)).count()
    }

    pub fn has_tags_for(&self, key: &str) -> bool {
        self.tags.keys().any(|t| t.matches_key(key))
    }

    /// Returns `true` if `key` has at least one non-empty value.
    pub fn has_values_for(&self, key: &str) -> bool {
        self.tags
            .keys()
            .any(|t| t.matches_key(key) && !t.value.is_empty())
    }

    pub fn has_empty_value(&self, key: &str) -> bool {
        self.tags
            .keys()
            .any(|t| t.matches_key(key) && t.value.is_empty())
    }

    /// Returns `true` if the only value for `key` is the empty value.
    pub fn has_unique_empty_value(&self, key: &str) -> bool {
        let values = self.values_for(key);
        values.len() == 1 && values.contains("")
    }

    /// Returns `true` if `key` has exactly one value and it is non-empty.
    pub fn has_unique_non_empty_value(&self, key: &str) -> bool {
        let values = self.values_for(key);
        values.len() == 1 && !values.contains("")
    }

    /// Replace all values for `key` with `value`.
    pub fn set_unique_for_key(&mut self, key: &str, value: &str) {
        self.remove_by_key(key);
        self.add(Tag::new(key, value));
    }

    /// Returns `true` if no key has more than one value, so the collection
    /// can be written onto a primitive unambiguously.
    pub fn is_applicable_to_primitive(&self) -> bool {
        self.keys_with_multiple_values().is_empty()
    }

    /// Write the collection onto `primitive`. Keys with the empty value are
    /// removed.
    pub fn apply_to<T: Tagged + ?Sized>(&self, primitive: &mut T) -> TypeResult<()> {
        if !self.is_applicable_to_primitive() {
            return Err(TypeError::InvalidArgument(
                "tag collection has keys with multiple values".into(),
            ));
        }
        for tag in self.tags.keys() {
            primitive.put(&tag.key, &tag.value);
        }
        Ok(())
    }

    /// Tags present in both collections, with the smaller occurrence count.
    pub fn intersect(&self, other: &TagCollection) -> TagCollection {
        TagCollection {
            tags: self
                .tags
                .iter()
                .filter_map(|(t, n)| other.tags.get(t).map(|m| (t.clone(), (*n).min(*m))))
                .collect(),
        }
    }

    /// Tags of `self` not present in `other`.
    pub fn minus(&self, other: &TagCollection) -> TagCollection {
        TagCollection {
            tags: self
                .tags
                .iter()
                .filter(|(t, _)| !other.tags.contains_key(*t))
                .map(|(t, n)| (t.clone(), *n))
                .collect(),
        }
    }

    /// All values for `key` combined into one.
    ///
    /// Values are split on `;`, parts collected in first-seen order over the
    /// sorted values and the empty part dropped. If one original value
    /// already holds every part it is returned verbatim, which keeps the
    /// order of existing lists such as `ref=A1;B2`.
    pub fn joined_values(&self, key: &str) -> String {
        let originals = self.values_for(key);
        if originals.len() == 1 {
            return originals.into_iter().next().unwrap_or_default().to_string();
        }

        let mut parts: Vec<&str> = Vec::new();
        let mut split: Vec<(&str, Vec<&str>)> = Vec::with_capacity(originals.len());
        for value in &originals {
            let pieces: Vec<&str> = value.split(VALUE_SEPARATOR).map(str::trim).collect();
            for piece in &pieces {
                if !piece.is_empty() && !parts.contains(piece) {
                    parts.push(piece);
                }
            }
            split.push((value, pieces));
        }

        for (original, pieces) in &split {
            if parts.iter().all(|p| pieces.contains(p)) {
                return (*original).to_string();
            }
        }
        parts.join(VALUE_SEPARATOR)
    }

    /// Integer sum of every value for `key`; unparseable values are ignored.
    pub fn summed_values(&self, key: &str) -> String {
        self.values_for(key)
            .into_iter()
            .filter_map(|v| v.parse::<i64>().ok())
            .fold(0i64, i64::saturating_add)
            .to_string()
    }
}

impl FromIterator<Tag> for TagCollection {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut tc = Self::new();
        for tag in iter {
            tc.add(tag);
        }
        tc
    }
}

impl fmt::Display for TagCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self.tags.keys().map(Tag::to_string).collect();
        write!(f, "[{}]", tags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;
    use proptest::prelude::*;

    fn tc(pairs: &[(&str, &str)]) -> TagCollection {
        pairs.iter().map(|(k, v)| Tag::new(*k, *v)).collect()
    }

    #[test]
    fn occurrence_counts_duplicates() {
        let c = tc(&[("name", "A"), ("name", "A"), ("name", "B")]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.occurrence(&Tag::new("name", "A")), 2);
        assert_eq!(c.occurrence(&Tag::new("name", "C")), 0);
    }

    #[test]
    fn union_and_common() {
        let a = Primitive::node(1).with_tag("amenity", "cafe").with_tag("name", "X");
        let b = Primitive::node(2).with_tag("amenity", "cafe").with_tag("name", "Y");
        let union = TagCollection::union_of_all([&a, &b]);
        assert_eq!(union.values_for("name").len(), 2);
        assert_eq!(union.occurrence(&Tag::new("amenity", "cafe")), 2);

        let common = TagCollection::common_to_all([&a, &b]);
        assert_eq!(common.keys().into_iter().collect::<Vec<_>>(), vec!["amenity"]);
    }

    #[test]
    fn multiple_values_include_empty() {
        let c = tc(&[("name", "A"), ("name", ""), ("highway", "primary")]);
        let multi: Vec<&str> = c.keys_with_multiple_values().into_iter().collect();
        assert_eq!(multi, vec!["name"]);
        assert!(c.has_empty_value("name"));
        assert!(!c.has_unique_empty_value("name"));
        assert!(c.has_unique_non_empty_value("highway"));
        assert!(!c.is_applicable_to_primitive());
    }

    #[test]
    fn set_unique_replaces_all_values() {
        let mut c = tc(&[("name", "A"), ("name", "B")]);
        c.set_unique_for_key("name", "A;B");
        assert_eq!(c.values_for("name").into_iter().collect::<Vec<_>>(), vec!["A;B"]);
    }

    #[test]
    fn apply_to_removes_empty_values() {
        let c = tc(&[("name", ""), ("highway", "primary")]);
        let mut p = Primitive::way(1).with_tag("name", "Old");
        c.apply_to(&mut p).unwrap();
        assert_eq!(p.get("name"), None);
        assert_eq!(p.get("highway"), Some("primary"));
    }

    #[test]
    fn apply_to_rejects_conflicts() {
        let c = tc(&[("name", "A"), ("name", "B")]);
        let mut p = Primitive::way(1);
        assert!(c.apply_to(&mut p).is_err());
    }

    #[test]
    fn joined_values_sorted() {
        let c = tc(&[("name", "South St"), ("name", "North St")]);
        assert_eq!(c.joined_values("name"), "North St;South St");
    }

    #[test]
    fn joined_values_ignores_empty() {
        let c = tc(&[("ref", "A1"), ("ref", "")]);
        assert_eq!(c.joined_values("ref"), "A1");
    }

    #[test]
    fn joined_values_keeps_existing_superset() {
        let c = tc(&[("ref", "B2;A1"), ("ref", "A1")]);
        assert_eq!(c.joined_values("ref"), "B2;A1");
    }

    #[test]
    fn joined_values_deduplicates_parts() {
        let c = tc(&[("ref", "A1; B2"), ("ref", "B2;C3")]);
        assert_eq!(c.joined_values("ref"), "A1;B2;C3");
    }

    #[test]
    fn summed_values_skips_garbage() {
        let c = tc(&[("capacity", "10"), ("capacity", "20"), ("capacity", "lots"), ("capacity", "")]);
        assert_eq!(c.summed_values("capacity"), "30");
    }

    #[test]
    fn minus_and_intersect() {
        let a = tc(&[("a", "1"), ("b", "2")]);
        let b = tc(&[("b", "2"), ("c", "3")]);
        assert_eq!(a.minus(&b), tc(&[("a", "1")]));
        assert_eq!(a.intersect(&b), tc(&[("b", "2")]));
    }

    #[test]
    fn display_lists_tags() {
        let c = tc(&[("b", "2"), ("a", "1")]);
        assert_eq!(c.to_string(), "[a=1, b=2]");
    }

    proptest! {
        #[test]
        fn joined_value_contains_every_part(values in proptest::collection::vec("[a-z]{1,4}", 1..6)) {
            let c: TagCollection = values.iter().map(|v| Tag::new("k", v.as_str())).collect();
            let joined = c.joined_values("k");
            let parts: Vec<&str> = joined.split(';').collect();
            for v in &values {
                prop_assert!(parts.contains(&v.as_str()));
            }
        }
    }
}
