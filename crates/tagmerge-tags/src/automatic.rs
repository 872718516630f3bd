//! Automatic tag conflict resolution.
//!
//! Some conflicts follow known patterns and are settled before the user
//! sees them: imported TIGER ids are concatenated, and dated `source` tags
//! from well-known imports resolve to the most recent one. Rules are plain
//! configuration ([`AutomaticRules`]) and are applied in order; the first
//! rule that produces a value for a key wins.
//!
//! A rule with an invalid regular expression is logged and skipped.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tagmerge_types::TagCollection;

use crate::error::{TagConflictError, TagConflictResult};

/// A rule that may settle the conflicting values of a key.
pub trait AutomaticTagConflictResolver {
    /// Whether this rule applies to `key`.
    fn matches_key(&self, key: &str) -> TagConflictResult<bool>;

    /// The resolved value, or `None` when the rule cannot decide.
    fn resolve(&self, values: &BTreeSet<&str>) -> TagConflictResult<Option<String>>;
}

/// Compile `pattern` so that it must match the whole input.
fn full_match(pattern: &str) -> TagConflictResult<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| TagConflictError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn matches(pattern: &str, is_regex: bool, input: &str) -> TagConflictResult<bool> {
    if is_regex {
        Ok(full_match(pattern)?.is_match(input))
    } else {
        Ok(pattern == input)
    }
}

// ---------------------------------------------------------------------------
// AutomaticCombine
// ---------------------------------------------------------------------------

/// Ordering applied to the parts joined by an [`AutomaticCombine`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineSort {
    /// Lexicographic.
    String,
    /// Numeric; the rule gives up if a part is not an integer.
    Integer,
    /// First-seen order.
    #[default]
    None,
}

/// Combine all values of a key by splitting on `separator` and joining the
/// distinct parts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomaticCombine {
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default)]
    pub sort: CombineSort,
}

fn default_separator() -> String {
    ";".into()
}

impl AutomaticCombine {
    pub fn new(
        key: impl Into<String>,
        description: impl Into<String>,
        is_regex: bool,
        separator: impl Into<String>,
        sort: CombineSort,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            is_regex,
            separator: separator.into(),
            sort,
        }
    }
}

impl AutomaticTagConflictResolver for AutomaticCombine {
    fn matches_key(&self, key: &str) -> TagConflictResult<bool> {
        matches(&self.key, self.is_regex, key)
    }

    fn resolve(&self, values: &BTreeSet<&str>) -> TagConflictResult<Option<String>> {
        let parts = values.iter().flat_map(|v| v.split(self.separator.as_str()));
        let joined: Vec<String> = match self.sort {
            CombineSort::String => parts
                .collect::<BTreeSet<&str>>()
                .into_iter()
                .map(str::to_string)
                .collect(),
            CombineSort::Integer => {
                let mut numeric: BTreeMap<i64, &str> = BTreeMap::new();
                for part in parts {
                    let Ok(n) = part.parse::<i64>() else {
                        return Ok(None);
                    };
                    numeric.entry(n).or_insert(part);
                }
                numeric.into_values().map(str::to_string).collect()
            }
            CombineSort::None => {
                let mut seen: Vec<&str> = Vec::new();
                for part in parts {
                    if !seen.contains(&part) {
                        seen.push(part);
                    }
                }
                seen.into_iter().map(str::to_string).collect()
            }
        };
        Ok(Some(joined.join(self.separator.as_str())))
    }
}

// ---------------------------------------------------------------------------
// AutomaticChoice / AutomaticChoiceGroup
// ---------------------------------------------------------------------------

/// One recognizable value of a key, with a score used to rank it against
/// the other choices of its group.
///
/// With `is_regex`, `score` is a replacement template (`$1 2`) expanded
/// against the matched value; the highest score by string comparison wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomaticChoice {
    pub key: String,
    pub group: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_regex: bool,
    pub value: String,
    pub score: String,
}

impl AutomaticChoice {
    pub fn new(
        key: impl Into<String>,
        group: impl Into<String>,
        description: impl Into<String>,
        is_regex: bool,
        value: impl Into<String>,
        score: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            group: group.into(),
            description: description.into(),
            is_regex,
            value: value.into(),
            score: score.into(),
        }
    }

    pub fn matches_value(&self, v: &str) -> TagConflictResult<bool> {
        matches(&self.value, self.is_regex, v)
    }

    pub fn compute_score(&self, v: &str) -> TagConflictResult<String> {
        if self.is_regex {
            Ok(full_match(&self.value)?.replace(v, self.score.as_str()).into_owned())
        } else {
            Ok(self.score.clone())
        }
    }
}

/// Choices sharing a key and a group name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutomaticChoiceGroup {
    pub key: String,
    pub group: String,
    pub is_regex: bool,
    pub choices: Vec<AutomaticChoice>,
}

impl AutomaticChoiceGroup {
    /// Group `choices` by `(key, group)`, keeping first-seen order.
    pub fn group_choices(choices: &[AutomaticChoice]) -> Vec<AutomaticChoiceGroup> {
        let mut groups: Vec<AutomaticChoiceGroup> = Vec::new();
        for choice in choices {
            match groups
                .iter_mut()
                .find(|g| g.key == choice.key && g.group == choice.group)
            {
                Some(group) => group.choices.push(choice.clone()),
                None => groups.push(AutomaticChoiceGroup {
                    key: choice.key.clone(),
                    group: choice.group.clone(),
                    is_regex: choice.is_regex,
                    choices: vec![choice.clone()],
                }),
            }
        }
        groups
    }
}

impl AutomaticTagConflictResolver for AutomaticChoiceGroup {
    fn matches_key(&self, key: &str) -> TagConflictResult<bool> {
        matches(&self.key, self.is_regex, key)
    }

    /// Resolves only if every value is recognized by some choice. When
    /// several choices match a value the last one's score counts.
    fn resolve(&self, values: &BTreeSet<&str>) -> TagConflictResult<Option<String>> {
        let mut best_score = String::new();
        let mut best_value = "";
        for value in values {
            let mut score = None;
            for choice in &self.choices {
                if choice.matches_value(value)? {
                    score = Some(choice.compute_score(value)?);
                }
            }
            let Some(score) = score else {
                return Ok(None);
            };
            if score >= best_score {
                best_score = score;
                best_value = *value;
            }
        }
        Ok(Some(best_value.to_string()))
    }
}

// ---------------------------------------------------------------------------
// AutomaticRules
// ---------------------------------------------------------------------------

/// Configured automatic resolution rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomaticRules {
    #[serde(default)]
    pub combines: Vec<AutomaticCombine>,
    #[serde(default)]
    pub choices: Vec<AutomaticChoice>,
}

impl Default for AutomaticRules {
    fn default() -> Self {
        Self {
            combines: default_combines(),
            choices: default_choices(),
        }
    }
}

impl AutomaticRules {
    /// No rules at all.
    pub fn empty() -> Self {
        Self {
            combines: Vec::new(),
            choices: Vec::new(),
        }
    }

    /// Combines first, then choice groups.
    pub fn resolvers(&self) -> Vec<Box<dyn AutomaticTagConflictResolver>> {
        let mut resolvers: Vec<Box<dyn AutomaticTagConflictResolver>> = Vec::new();
        for combine in &self.combines {
            resolvers.push(Box::new(combine.clone()));
        }
        for group in AutomaticChoiceGroup::group_choices(&self.choices) {
            resolvers.push(Box::new(group));
        }
        resolvers
    }

    /// Check that every pattern compiles.
    pub fn validate(&self) -> TagConflictResult<()> {
        for combine in self.combines.iter().filter(|c| c.is_regex) {
            full_match(&combine.key)?;
        }
        for choice in self.choices.iter().filter(|c| c.is_regex) {
            full_match(&choice.key)?;
            full_match(&choice.value)?;
        }
        Ok(())
    }
}

const KEY_SOURCE: &str = "source";
const GRP_FR_CADASTRE: &str = "FR:cadastre";
const GRP_CA_CANVEC: &str = "CA:canvec";

/// TIGER import ids are concatenated. `tiger:tlid` is listed first so that
/// its numeric ordering takes precedence over the generic `tiger:` rule.
pub fn default_combines() -> Vec<AutomaticCombine> {
    vec![
        AutomaticCombine::new("tiger:tlid", "US TIGER tlid", false, ":", CombineSort::Integer),
        AutomaticCombine::new("tiger:.*", "US TIGER not tlid", true, ":", CombineSort::String),
    ]
}

/// `source` values of the French cadastre and Canadian CanVec imports. The
/// score starts with the export year or version so the newest wins.
pub fn default_choices() -> Vec<AutomaticChoice> {
    vec![
        AutomaticChoice::new(
            KEY_SOURCE,
            GRP_FR_CADASTRE,
            "FR cadastre source, manual value",
            true,
            "cadastre",
            "0",
        ),
        AutomaticChoice::new(
            KEY_SOURCE,
            GRP_FR_CADASTRE,
            "FR cadastre source, initial format",
            true,
            r"extraction vectorielle v1 cadastre-dgi-fr source : Direction G[eé]n[eé]rale des Imp[oô]ts - Cadas\. Mise [aà] jour : (2[0-9]{3})",
            "$1 1",
        ),
        AutomaticChoice::new(
            KEY_SOURCE,
            GRP_FR_CADASTRE,
            "FR cadastre source, last format",
            true,
            r"(?:cadastre-dgi-fr source : )?Direction G[eé]n[eé]rale des (?:Imp[oô]ts|Finances Publiques) - Cadas(?:tre)?(?:\.| ;) [Mm]ise [aà] jour : (2[0-9]{3})",
            "$1 2",
        ),
        AutomaticChoice::new(
            KEY_SOURCE,
            GRP_CA_CANVEC,
            "CA canvec source, initial value",
            true,
            "CanVec_Import_2009",
            "00",
        ),
        AutomaticChoice::new(
            KEY_SOURCE,
            GRP_CA_CANVEC,
            "CA canvec source, 4.0/6.0 value",
            true,
            r"CanVec ([1-9]).0 - NRCan",
            "0$1",
        ),
        AutomaticChoice::new(
            KEY_SOURCE,
            GRP_CA_CANVEC,
            "CA canvec source, 7.0/8.0 value",
            true,
            r"NRCan-CanVec-([1-9]).0",
            "0$1",
        ),
        AutomaticChoice::new(
            KEY_SOURCE,
            GRP_CA_CANVEC,
            "CA canvec source, 10.0/12.0 value",
            true,
            r"NRCan-CanVec-(1[012]).0",
            "$1",
        ),
    ]
}

/// Settle every multi-valued key of `tags` that a rule can resolve.
///
/// Returns the keys that were resolved.
pub fn apply_automatic_resolution(
    tags: &mut TagCollection,
    resolvers: &[Box<dyn AutomaticTagConflictResolver>],
) -> Vec<String> {
    let keys: Vec<String> = tags
        .keys_with_multiple_values()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut resolved = Vec::new();
    for key in keys {
        for resolver in resolvers {
            let outcome = resolver.matches_key(&key).and_then(|matched| {
                if matched {
                    resolver.resolve(&tags.values_for(&key))
                } else {
                    Ok(None)
                }
            });
            match outcome {
                Ok(Some(value)) => {
                    debug!(key = %key, value = %value, "automatically resolved tag conflict");
                    tags.set_unique_for_key(&key, &value);
                    resolved.push(key.clone());
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "skipping automatic tag conflict rule"),
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagmerge_types::Tag;

    fn tc(pairs: &[(&str, &str)]) -> TagCollection {
        pairs.iter().map(|(k, v)| Tag::new(*k, *v)).collect()
    }

    fn set<'a>(values: &[&'a str]) -> BTreeSet<&'a str> {
        values.iter().copied().collect()
    }

    #[test]
    fn combine_string_sort() {
        let rule = AutomaticCombine::new("tiger:.*", "", true, ":", CombineSort::String);
        assert!(rule.matches_key("tiger:cfcc").unwrap());
        assert!(!rule.matches_key("name").unwrap());
        let out = rule.resolve(&set(&["b:a", "c"])).unwrap();
        assert_eq!(out.as_deref(), Some("a:b:c"));
    }

    #[test]
    fn combine_integer_sort() {
        let rule = AutomaticCombine::new("tiger:tlid", "", false, ":", CombineSort::Integer);
        let out = rule.resolve(&set(&["100:20", "3"])).unwrap();
        assert_eq!(out.as_deref(), Some("3:20:100"));
    }

    #[test]
    fn combine_integer_gives_up_on_text() {
        let rule = AutomaticCombine::new("tiger:tlid", "", false, ":", CombineSort::Integer);
        assert_eq!(rule.resolve(&set(&["12", "abc"])).unwrap(), None);
    }

    #[test]
    fn combine_insertion_order() {
        let rule = AutomaticCombine::new("ref", "", false, ";", CombineSort::None);
        let out = rule.resolve(&set(&["A;C", "B;A"])).unwrap();
        assert_eq!(out.as_deref(), Some("A;C;B"));
    }

    #[test]
    fn choice_group_picks_newest_cadastre() {
        let groups = AutomaticChoiceGroup::group_choices(&default_choices());
        assert_eq!(groups.len(), 2);
        let cadastre = &groups[0];
        assert_eq!(cadastre.group, GRP_FR_CADASTRE);

        let old = "extraction vectorielle v1 cadastre-dgi-fr source : Direction Générale des Impôts - Cadas. Mise à jour : 2008";
        let new = "cadastre-dgi-fr source : Direction Générale des Impôts - Cadastre. Mise à jour : 2012";
        let out = cadastre.resolve(&set(&[old, new, "cadastre"])).unwrap();
        assert_eq!(out.as_deref(), Some(new));
    }

    #[test]
    fn choice_group_needs_every_value_recognized() {
        let groups = AutomaticChoiceGroup::group_choices(&default_choices());
        let canvec = &groups[1];
        let out = canvec.resolve(&set(&["NRCan-CanVec-10.0", "survey"])).unwrap();
        assert_eq!(out, None);

        let out = canvec
            .resolve(&set(&["NRCan-CanVec-10.0", "CanVec 6.0 - NRCan", "CanVec_Import_2009"]))
            .unwrap();
        assert_eq!(out.as_deref(), Some("NRCan-CanVec-10.0"));
    }

    #[test]
    fn apply_resolves_tiger_keys() {
        let mut tags = tc(&[
            ("tiger:tlid", "30:10"),
            ("tiger:tlid", "20"),
            ("tiger:county", "Kings, NY"),
            ("tiger:county", "Queens, NY"),
            ("name", "A"),
            ("name", "B"),
        ]);
        let resolved = apply_automatic_resolution(&mut tags, &AutomaticRules::default().resolvers());
        assert_eq!(resolved, vec!["tiger:county", "tiger:tlid"]);
        assert_eq!(tags.joined_values("tiger:tlid"), "10:20:30");
        assert_eq!(tags.joined_values("tiger:county"), "Kings, NY:Queens, NY");
        assert_eq!(tags.values_for("name").len(), 2);
    }

    #[test]
    fn invalid_rule_is_skipped() {
        let rules = AutomaticRules {
            combines: vec![
                AutomaticCombine::new("na(me", "broken", true, ";", CombineSort::String),
                AutomaticCombine::new("name", "", false, ";", CombineSort::String),
            ],
            choices: Vec::new(),
        };
        assert!(matches!(rules.validate(), Err(TagConflictError::Pattern { .. })));

        let mut tags = tc(&[("name", "B"), ("name", "A")]);
        let resolved = apply_automatic_resolution(&mut tags, &rules.resolvers());
        assert_eq!(resolved, vec!["name"]);
        assert_eq!(tags.joined_values("name"), "A;B");
    }

    #[test]
    fn default_rules_validate() {
        AutomaticRules::default().validate().unwrap();
        assert!(AutomaticRules::empty().resolvers().is_empty());
    }
}
