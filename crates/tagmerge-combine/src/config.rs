use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tagmerge_tags::AutomaticRules;

use crate::error::{CombineError, CombineResult};

/// Configuration for combining primitives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// Whether automatic rules settle known conflicts before the resolvers
    /// are populated.
    pub apply_automatic: bool,
    /// Keys silently dropped from merged tags and from the target.
    pub discardable_keys: Vec<String>,
    /// Rules used when `apply_automatic` is set.
    pub automatic: AutomaticRules,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            apply_automatic: true,
            discardable_keys: default_discardable_keys(),
            automatic: AutomaticRules::default(),
        }
    }
}

impl CombineConfig {
    /// No automatic rules and no discardable keys.
    pub fn minimal() -> Self {
        Self {
            apply_automatic: false,
            discardable_keys: Vec::new(),
            automatic: AutomaticRules::empty(),
        }
    }

    /// Parse and validate a TOML document. Missing fields take their
    /// defaults.
    pub fn from_toml_str(s: &str) -> CombineResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> CombineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CombineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(
            path = %path.display(),
            discardable = config.discardable_keys.len(),
            "loaded combine configuration"
        );
        Ok(config)
    }

    pub fn to_toml(&self) -> CombineResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject empty keys and automatic rules whose patterns do not compile.
    pub fn validate(&self) -> CombineResult<()> {
        if self.discardable_keys.iter().any(|k| k.is_empty()) {
            return Err(CombineError::Config("discardable keys must not be empty".into()));
        }
        if self.automatic.combines.iter().any(|c| c.separator.is_empty()) {
            return Err(CombineError::Config(
                "automatic combine separator must not be empty".into(),
            ));
        }
        self.automatic.validate()?;
        Ok(())
    }
}

/// Keys considered uninteresting enough to be removed from edited data.
pub fn default_discardable_keys() -> Vec<String> {
    [
        "created_by",
        "converted_by",
        "geobase:datasetName",
        "geobase:uuid",
        "KSJ2:ADS",
        "KSJ2:ARE",
        "KSJ2:AdminArea",
        "KSJ2:COP_label",
        "KSJ2:DFD",
        "KSJ2:INT",
        "KSJ2:INT_label",
        "KSJ2:LOC",
        "KSJ2:LPN",
        "KSJ2:OPC",
        "KSJ2:PubFacAdmin",
        "KSJ2:RAC",
        "KSJ2:RAC_label",
        "KSJ2:RIC",
        "KSJ2:RIN",
        "KSJ2:WSC",
        "KSJ2:coordinate",
        "KSJ2:curve_id",
        "KSJ2:curve_type",
        "KSJ2:filename",
        "KSJ2:lake_id",
        "KSJ2:lat",
        "KSJ2:long",
        "KSJ2:river_id",
        "odbl",
        "odbl:note",
        "osmarender:nameDirection",
        "osmarender:renderName",
        "osmarender:renderRef",
        "osmarender:rendernames",
        "SK53_bulk:load",
        "sub_sea:type",
        "tiger:source",
        "tiger:separated",
        "tiger:tlid",
        "tiger:upload_uuid",
        "yh:LINE_NAME",
        "yh:LINE_NUM",
        "yh:STRUCTURE",
        "yh:TOTYUMONO",
        "yh:TYPE",
        "yh:WIDTH",
        "yh:WIDTH_RANK",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
