//! Preparing a raw tag collection for conflict resolution.

use tagmerge_types::{Tag, TagCollection, Tagged};

/// Normalize `tags` collected from `merged` before building decisions.
///
/// Discardable keys are dropped. When at least two merged primitives carry
/// tags, every key missing on one of them gains the empty value, so that
/// "remove the key" becomes one of its candidates.
pub fn normalize_before_editing<T: Tagged>(
    tags: &mut TagCollection,
    merged: &[T],
    discardable_keys: &[String],
) {
    for key in discardable_keys {
        tags.remove_by_key(key);
    }

    let tagged: Vec<&T> = merged.iter().filter(|p| p.is_tagged()).collect();
    if tagged.len() <= 1 {
        return;
    }

    let keys: Vec<String> = tags.keys().into_iter().map(str::to_string).collect();
    for key in keys {
        for primitive in &tagged {
            if primitive.get(&key).is_none() {
                tags.add(Tag::new(key.as_str(), ""));
            }
        }
    }
}

/// Add the empty value for every key so each decision can remove its key.
pub fn complete_for_editing(tags: &mut TagCollection) {
    let keys: Vec<String> = tags.keys().into_iter().map(str::to_string).collect();
    for key in keys {
        tags.add(Tag::new(key, ""));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagmerge_types::Primitive;

    #[test]
    fn missing_keys_gain_empty_value() {
        let a = Primitive::way(1).with_tag("highway", "primary").with_tag("name", "A");
        let b = Primitive::way(2).with_tag("highway", "primary");
        let merged = vec![a, b];
        let mut tags = TagCollection::union_of_all(&merged);
        normalize_before_editing(&mut tags, &merged, &[]);

        assert!(tags.has_empty_value("name"));
        assert!(!tags.has_empty_value("highway"));
        assert_eq!(tags.occurrence(&Tag::new("highway", "primary")), 2);
    }

    #[test]
    fn single_tagged_primitive_is_left_alone() {
        let a = Primitive::way(1).with_tag("name", "A");
        let b = Primitive::way(2);
        let merged = vec![a, b];
        let mut tags = TagCollection::union_of_all(&merged);
        normalize_before_editing(&mut tags, &merged, &[]);
        assert!(!tags.has_empty_value("name"));
    }

    #[test]
    fn discardable_keys_are_dropped() {
        let a = Primitive::way(1).with_tag("created_by", "JOSM").with_tag("name", "A");
        let merged = vec![a];
        let mut tags = TagCollection::union_of_all(&merged);
        normalize_before_editing(&mut tags, &merged, &["created_by".to_string()]);
        assert!(!tags.has_tags_for("created_by"));
        assert!(tags.has_tags_for("name"));
    }

    #[test]
    fn complete_adds_empty_everywhere() {
        let mut tags: TagCollection = [Tag::new("a", "1"), Tag::new("b", "2")].into_iter().collect();
        complete_for_editing(&mut tags);
        assert!(tags.has_empty_value("a"));
        assert!(tags.has_empty_value("b"));
        assert_eq!(tags.len(), 4);
    }
}
