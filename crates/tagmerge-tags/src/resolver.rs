//! The tag conflict resolver: every per-key decision of one merge.
//!
//! Keys are kept in display order: undecided keys first, then decided ones,
//! each group sorted by key. The order and the unresolved count are
//! recomputed after every mutation, and listeners are told when the count
//! changes.

use std::collections::BTreeMap;

use tracing::debug;

use tagmerge_types::{CountListeners, ListenerId, Tag, TagCollection};

use crate::decision::TagConflictDecision;
use crate::error::{TagConflictError, TagConflictResult};

/// Owns one [`TagConflictDecision`] per key of a merge.
#[derive(Debug, Default)]
pub struct TagConflictResolver {
    decisions: BTreeMap<String, TagConflictDecision>,
    ordered_keys: Vec<String>,
    num_conflicts: usize,
    listeners: CountListeners,
}

impl TagConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Population
    // ---------------------------------------------------------------

    /// Replace all decisions with one per key of `tags`.
    pub fn populate(&mut self, tags: &TagCollection) -> TagConflictResult<()> {
        self.decisions.clear();
        for key in tags.keys() {
            let decision = TagConflictDecision::new(tags.tags_for(key))?;
            self.decisions.insert(key.to_string(), decision);
        }
        self.refresh();
        debug!(
            keys = self.decisions.len(),
            conflicts = self.num_conflicts,
            "populated tag conflict resolver"
        );
        Ok(())
    }

    /// Decide the keys with an obvious outcome: a lone non-empty value is
    /// kept and a key seen only as absent is dropped. Keys with several
    /// values stay undecided; joining them is left to the user.
    pub fn prepare_default_decisions(&mut self) {
        for decision in self.decisions.values_mut() {
            let candidates = decision.values().len();
            match candidates {
                0 => decision.keep_none(),
                1 => decision.keep_single_value(),
                _ => {}
            }
        }
        self.refresh();
    }

    // ---------------------------------------------------------------
    // Decisions
    // ---------------------------------------------------------------

    pub fn keep_one(&mut self, key: &str, value: &str) -> TagConflictResult<()> {
        self.decision_mut(key)?.keep_one(value)?;
        self.refresh();
        Ok(())
    }

    pub fn keep_none(&mut self, key: &str) -> TagConflictResult<()> {
        self.decision_mut(key)?.keep_none();
        self.refresh();
        Ok(())
    }

    pub fn keep_all(&mut self, key: &str) -> TagConflictResult<()> {
        self.decision_mut(key)?.keep_all();
        self.refresh();
        Ok(())
    }

    pub fn sum_all_numeric(&mut self, key: &str) -> TagConflictResult<()> {
        self.decision_mut(key)?.sum_all_numeric();
        self.refresh();
        Ok(())
    }

    pub fn undecide(&mut self, key: &str) -> TagConflictResult<()> {
        self.decision_mut(key)?.undecide();
        self.refresh();
        Ok(())
    }

    fn decision_mut(&mut self, key: &str) -> TagConflictResult<&mut TagConflictDecision> {
        self.decisions
            .get_mut(key)
            .ok_or_else(|| TagConflictError::InvalidArgument(format!("no decision for key '{key}'")))
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn decision(&self, key: &str) -> Option<&TagConflictDecision> {
        self.decisions.get(key)
    }

    /// Decisions in display order.
    pub fn decisions(&self) -> impl Iterator<Item = &TagConflictDecision> {
        self.ordered_keys
            .iter()
            .filter_map(move |k| self.decisions.get(k))
    }

    pub fn ordered_keys(&self) -> &[String] {
        &self.ordered_keys
    }

    pub fn num_decisions(&self) -> usize {
        self.decisions.len()
    }

    /// Number of undecided keys.
    pub fn num_conflicts(&self) -> usize {
        self.num_conflicts
    }

    pub fn is_resolved_completely(&self) -> bool {
        self.num_conflicts == 0
    }

    /// Resolved tags in display order. Undecided keys are left out; removals
    /// appear with the empty value.
    pub fn resolution(&self) -> Vec<Tag> {
        self.decisions()
            .filter_map(TagConflictDecision::resolution)
            .collect()
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

    /// Recount conflicts, notify on change, and re-sort the keys.
    pub fn refresh(&mut self) {
        let old = self.num_conflicts;
        self.num_conflicts = self.decisions.values().filter(|d| !d.is_decided()).count();
        self.listeners.notify(old, self.num_conflicts);
        self.sort_keys();
    }

    fn sort_keys(&mut self) {
        let mut keys: Vec<(bool, String)> = self
            .decisions
            .iter()
            .map(|(k, d)| (d.is_decided(), k.clone()))
            .collect();
        keys.sort();
        self.ordered_keys = keys.into_iter().map(|(_, k)| k).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tc(pairs: &[(&str, &str)]) -> TagCollection {
        pairs.iter().map(|(k, v)| Tag::new(*k, *v)).collect()
    }

    fn populated(pairs: &[(&str, &str)]) -> TagConflictResolver {
        let mut r = TagConflictResolver::new();
        r.populate(&tc(pairs)).unwrap();
        r
    }

    #[test]
    fn one_decision_per_key() {
        let r = populated(&[("name", "A"), ("name", "B"), ("highway", "primary"), ("fixme", "")]);
        assert_eq!(r.num_decisions(), 3);
        assert_eq!(r.num_conflicts(), 1);
        assert!(!r.is_resolved_completely());
    }

    #[test]
    fn undecided_keys_sort_first() {
        let r = populated(&[
            ("amenity", "cafe"),
            ("name", "A"),
            ("name", "B"),
            ("brand", "X"),
            ("brand", "Y"),
            ("zoo", "petting"),
        ]);
        assert_eq!(r.ordered_keys(), ["brand", "name", "amenity", "zoo"]);
    }

    #[test]
    fn decisions_resort_on_change() {
        let mut r = populated(&[("amenity", "cafe"), ("name", "A"), ("name", "B")]);
        assert_eq!(r.ordered_keys(), ["name", "amenity"]);
        r.keep_one("name", "A").unwrap();
        assert_eq!(r.ordered_keys(), ["amenity", "name"]);
        r.undecide("amenity").unwrap();
        assert_eq!(r.ordered_keys(), ["amenity", "name"]);
        assert_eq!(r.num_conflicts(), 1);
    }

    #[test]
    fn resolution_skips_undecided() {
        let mut r = populated(&[("name", "A"), ("name", "B"), ("highway", "primary"), ("fixme", "")]);
        assert_eq!(
            r.resolution(),
            vec![Tag::new("fixme", ""), Tag::new("highway", "primary")]
        );

        r.keep_all("name").unwrap();
        assert!(r.is_resolved_completely());
        assert_eq!(r.resolution().len(), 3);
        assert!(r.resolution().contains(&Tag::new("name", "A;B")));
    }

    #[test]
    fn unknown_key_is_invalid_argument() {
        let mut r = populated(&[("name", "A")]);
        assert!(matches!(
            r.keep_none("nope"),
            Err(TagConflictError::InvalidArgument(_))
        ));
    }

    #[test]
    fn listener_sees_count_changes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut r = TagConflictResolver::new();
        let s = seen.clone();
        r.on_unresolved_count_changed(move |old, new| s.borrow_mut().push((old, new)));

        r.populate(&tc(&[("name", "A"), ("name", "B"), ("ref", "1"), ("ref", "2")]))
            .unwrap();
        r.keep_one("name", "A").unwrap();
        r.keep_one("name", "B").unwrap();
        r.sum_all_numeric("ref").unwrap();

        assert_eq!(*seen.borrow(), vec![(0, 2), (2, 1), (1, 0)]);
    }

    #[test]
    fn removed_listener_is_silent() {
        let seen = Rc::new(RefCell::new(0));
        let mut r = TagConflictResolver::new();
        let s = seen.clone();
        let id = r.on_unresolved_count_changed(move |_, _| *s.borrow_mut() += 1);
        assert!(r.remove_listener(id));
        r.populate(&tc(&[("name", "A"), ("name", "B")])).unwrap();
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn default_decisions_keep_lone_values() {
        let mut r = populated(&[
            ("name", "A"),
            ("name", "B"),
            ("name", ""),
            ("note", ""),
            ("ref", "7"),
            ("ref", ""),
        ]);
        assert_eq!(r.num_conflicts(), 2);
        r.prepare_default_decisions();
        assert_eq!(r.num_conflicts(), 1);
        assert_eq!(r.ordered_keys(), ["name", "note", "ref"]);
        assert_eq!(r.resolution(), vec![Tag::new("note", ""), Tag::new("ref", "7")]);

        r.keep_all("name").unwrap();
        assert!(r.is_resolved_completely());
        assert!(r.resolution().contains(&Tag::new("name", "A;B")));
    }

    #[test]
    fn repopulate_replaces_decisions() {
        let mut r = populated(&[("name", "A"), ("name", "B")]);
        r.populate(&tc(&[("ref", "1")])).unwrap();
        assert_eq!(r.num_decisions(), 1);
        assert!(r.decision("name").is_none());
        assert!(r.is_resolved_completely());
    }

    proptest! {
        #[test]
        fn ordering_invariant_holds(
            pairs in proptest::collection::vec(("[a-e]", "[xyz]?"), 1..20),
            decide in proptest::collection::vec(any::<bool>(), 5),
        ) {
            let tags: TagCollection = pairs.iter().map(|(k, v)| Tag::new(k.as_str(), v.as_str())).collect();
            let mut r = TagConflictResolver::new();
            r.populate(&tags).unwrap();
            let keys: Vec<String> = r.ordered_keys().to_vec();
            for (key, flag) in keys.iter().zip(decide) {
                if flag {
                    r.keep_none(key).unwrap();
                }
            }

            let decided: Vec<bool> = r.decisions().map(|d| d.is_decided()).collect();
            prop_assert_eq!(decided.iter().filter(|d| !**d).count(), r.num_conflicts());
            for pair in r.ordered_keys().windows(2) {
                let a = r.decision(&pair[0]).unwrap().is_decided();
                let b = r.decision(&pair[1]).unwrap().is_decided();
                prop_assert!(!a || b);
                if a == b {
                    prop_assert!(pair[0] < pair[1]);
                }
            }
        }
    }
}
