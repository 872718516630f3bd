//! Per-key tag conflict decision.
//!
//! A [`TagConflictDecision`] is built from the tags observed for exactly one
//! key across all merged primitives. It tries to decide itself on creation
//! and otherwise waits for the user to pick one of the [`TagDecision`]
//! variants.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tagmerge_types::{Command, PrimitiveId, Tag, TagCollection, Tagged};

use crate::error::{TagConflictError, TagConflictResult};

/// Keys whose numeric values may be summed instead of joined.
const SUMMABLE_KEYS: &[&str] = &["capacity", "step_count"];

/// Keys with a `capacity:` namespace (`capacity:disabled`, ...) are summable
/// too.
const SUMMABLE_PREFIX: &str = "capacity:";

/// Returns `true` if `key` is on the closed list of summable keys.
pub fn is_summable_key(key: &str) -> bool {
    SUMMABLE_KEYS.contains(&key)
        || key
            .strip_prefix(SUMMABLE_PREFIX)
            .is_some_and(|rest| !rest.is_empty())
}

/// How a conflicting tag key is resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagDecision {
    /// Nothing chosen yet.
    #[default]
    Undecided,
    /// Keep exactly this value.
    KeepOne(String),
    /// Drop the key from the merge result.
    KeepNone,
    /// Join all non-empty values.
    KeepAll,
    /// Sum all numeric values.
    SumAllNumeric,
}

impl TagDecision {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Undecided)
    }
}

/// The decision for one conflicting tag key.
#[derive(Clone, Debug)]
pub struct TagConflictDecision {
    key: String,
    tags: TagCollection,
    decision: TagDecision,
}

impl TagConflictDecision {
    /// Create a decision from the tags of a single key and auto-decide.
    ///
    /// Fails if `tags` is empty or holds more than one key.
    pub fn new(tags: TagCollection) -> TagConflictResult<Self> {
        let key = {
            let keys = tags.keys();
            if keys.is_empty() {
                return Err(TagConflictError::InvalidArgument(
                    "tag collection must not be empty".into(),
                ));
            }
            if keys.len() > 1 {
                return Err(TagConflictError::InvalidArgument(format!(
                    "tag collection must contain exactly one key, got {}",
                    keys.len()
                )));
            }
            keys.into_iter()
                .next()
                .map(str::to_string)
                .unwrap_or_default()
        };

        let mut decision = Self {
            key,
            tags,
            decision: TagDecision::Undecided,
        };
        decision.auto_decide();
        Ok(decision)
    }

    /// Decide on behalf of the user when the outcome is unambiguous.
    ///
    /// A lone empty value means the key is dropped; a lone non-empty value is
    /// kept. Two or more distinct values leave the decision undecided. An
    /// existing decision is left alone.
    pub fn auto_decide(&mut self) {
        if self.decision.is_decided() {
            return;
        }
        let values = self.tags.values_for(&self.key);
        self.decision = match values.len() {
            1 if values.contains("") => TagDecision::KeepNone,
            1 => TagDecision::KeepOne(
                values
                    .into_iter()
                    .next()
                    .map(str::to_string)
                    .unwrap_or_default(),
            ),
            _ => TagDecision::Undecided,
        };
        if self.decision.is_decided() {
            debug!(key = %self.key, decision = ?self.decision, "auto-decided tag conflict");
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn decision(&self) -> &TagDecision {
        &self.decision
    }

    /// The underlying tags, occurrence counts included.
    pub fn tags(&self) -> &TagCollection {
        &self.tags
    }

    /// Distinct non-empty candidate values in sorted order.
    pub fn values(&self) -> Vec<&str> {
        self.tags
            .values_for(&self.key)
            .into_iter()
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Returns `true` if at least one merged primitive lacked the key.
    pub fn has_empty_value(&self) -> bool {
        self.tags.has_empty_value(&self.key)
    }

    pub fn is_decided(&self) -> bool {
        self.decision.is_decided()
    }

    /// Keep `value`, which must be one of the candidates. The empty value is
    /// accepted only when some merged primitive lacked the key.
    pub fn keep_one(&mut self, value: &str) -> TagConflictResult<()> {
        if !self.tags.contains(&Tag::new(self.key.as_str(), value)) {
            return Err(TagConflictError::InvalidState(format!(
                "value '{value}' is not a candidate for key '{}'",
                self.key
            )));
        }
        self.decision = TagDecision::KeepOne(value.to_string());
        Ok(())
    }

    /// Keep the only non-empty candidate. Does nothing unless there is
    /// exactly one.
    pub(crate) fn keep_single_value(&mut self) {
        let single = match self.values().as_slice() {
            [value] => Some(value.to_string()),
            _ => None,
        };
        if let Some(value) = single {
            self.decision = TagDecision::KeepOne(value);
        }
    }

    pub fn keep_none(&mut self) {
        self.decision = TagDecision::KeepNone;
    }

    pub fn keep_all(&mut self) {
        self.decision = TagDecision::KeepAll;
    }

    pub fn sum_all_numeric(&mut self) {
        self.decision = TagDecision::SumAllNumeric;
    }

    pub fn undecide(&mut self) {
        self.decision = TagDecision::Undecided;
    }

    pub fn can_keep_none(&self) -> bool {
        self.has_empty_value()
    }

    pub fn can_keep_all(&self) -> bool {
        self.values().len() > 1
    }

    pub fn can_sum_all_numeric(&self) -> bool {
        self.can_keep_all() && is_summable_key(&self.key)
    }

    /// The value the decision resolves to; `None` means the key is removed.
    pub fn chosen_value(&self) -> TagConflictResult<Option<String>> {
        match &self.decision {
            TagDecision::Undecided => Err(self.not_decided()),
            TagDecision::KeepOne(value) => Ok(Some(value.clone())),
            TagDecision::KeepNone => Ok(None),
            TagDecision::KeepAll => Ok(Some(self.tags.joined_values(&self.key))),
            TagDecision::SumAllNumeric => Ok(Some(self.tags.summed_values(&self.key))),
        }
    }

    /// The resolved tag, or `None` while undecided. Removal is reported as a
    /// tag with the empty value.
    pub fn resolution(&self) -> Option<Tag> {
        let value = self.chosen_value().ok()?;
        Some(Tag::new(self.key.as_str(), value.unwrap_or_default()))
    }

    /// Write the decision directly onto `primitive`.
    pub fn apply_to<T: Tagged + ?Sized>(&self, primitive: &mut T) -> TagConflictResult<()> {
        match self.chosen_value()? {
            Some(value) => primitive.put(&self.key, &value),
            None => {
                primitive.remove(&self.key);
            }
        }
        Ok(())
    }

    /// A change-property command carrying the decision for `targets`.
    pub fn build_change_command(&self, targets: &[PrimitiveId]) -> TagConflictResult<Command> {
        let value = self.chosen_value()?;
        Ok(Command::change_property(
            targets.to_vec(),
            self.key.as_str(),
            value,
        ))
    }

    fn not_decided(&self) -> TagConflictError {
        TagConflictError::InvalidState(format!("conflict for key '{}' not decided yet", self.key))
    }
}
