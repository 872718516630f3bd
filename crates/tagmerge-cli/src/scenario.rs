//! Merge scenarios read from JSON.
//!
//! ```json
//! {
//!   "primitives": [{ "id": "w1", "tags": { "name": "North St" } }],
//!   "relations": [{ "id": "r5", "members": [{ "role": "", "member": "w1" }] }],
//!   "target": "w1"
//! }
//! ```

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use tagmerge_types::{Primitive, PrimitiveId, Relation};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Primitives being combined.
    pub primitives: Vec<Primitive>,
    /// Relations of the data set; those referring to a primitive are parents.
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Primitive that receives the merged tags. Defaults to the first one.
    #[serde(default)]
    pub target: Option<PrimitiveId>,
}

impl Scenario {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let scenario: Self = serde_json::from_str(text).context("invalid scenario")?;
        if scenario.primitives.is_empty() {
            bail!("scenario has no primitives");
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn primitive_ids(&self) -> Vec<PrimitiveId> {
        self.primitives.iter().map(|p| p.id).collect()
    }

    /// The target primitive. It must be one of the combined primitives.
    pub fn target(&self) -> anyhow::Result<&Primitive> {
        let Some(id) = self.target else {
            return self
                .primitives
                .first()
                .context("scenario has no primitives");
        };
        self.primitives
            .iter()
            .find(|p| p.id == id)
            .with_context(|| format!("target {id} is not among the primitives"))
    }
}
