//! Deployment configuration: language version, feature toggles, declared
//!  user defined functions and dialect options, read from TOML.
//!
//! ```toml
//! version = "2.1"
//!
//! [features]
//! disabled = [{ type = "geometry", form = "POLYGON" }]
//! enabled = [{ type = "string", form = "LOWER" }]
//!
//! [[udf]]
//! signature = "split(str VARCHAR, sep VARCHAR) -> VARCHAR"
//! pattern = "splitWith($2, $1)"
//!
//! [dialect]
//! offset_policy = "with_unbounded_limit"
//!
//! [dialect.case_sensitivity]
//! column = true
//! ```

use std::{borrow::Cow, path::Path};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::Error,
    feature::{FeatureSet, FeatureType, LanguageFeature, LanguageVersion},
    function_def::{FunctionDef, FunctionRegistry},
    translate::DialectConfig,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeatureRef {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub form: String,
}

impl FeatureRef {
    pub fn to_feature(&self) -> LanguageFeature {
        match self.kind {
            FeatureType::Udf => LanguageFeature::udf(self.form.clone()),
            kind => LanguageFeature {
                kind: Some(kind),
                form: Cow::Owned(self.form.clone()),
                optional: true,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureToggles {
    /// Every optional feature of these types is turned off first.
    pub disabled_types: Vec<FeatureType>,
    pub disabled: Vec<FeatureRef>,
    pub enabled: Vec<FeatureRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UdfConfig {
    pub signature: String,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub version: LanguageVersion,
    pub features: FeatureToggles,
    pub udf: Vec<UdfConfig>,
    /// Absent means each translator's own defaults.
    pub dialect: Option<DialectConfig>,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        debug!(
            version = %config.version,
            udfs = config.udf.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// The version's features, minus the disabled ones, plus the enabled ones
    ///  and one feature per declared UDF.
    pub fn feature_set(&self) -> Result<FeatureSet, Error> {
        let mut set = FeatureSet::for_version(self.version);
        for kind in &self.features.disabled_types {
            set.disable_all(*kind);
        }
        for feature in &self.features.disabled {
            if !set.disable(&feature.to_feature()) {
                warn!(form = %feature.form, "disabled feature was not enabled");
            }
        }
        for feature in &self.features.enabled {
            set.enable(feature.to_feature());
        }
        for udf in &self.udf {
            let def = FunctionDef::parse(&udf.signature)?;
            set.enable(def.feature());
        }
        Ok(set)
    }

    /// Definitions of the declared UDFs, with their translation patterns.
    pub fn function_registry(&self) -> Result<FunctionRegistry, Error> {
        let mut registry = FunctionRegistry::new();
        for udf in &self.udf {
            let mut def = FunctionDef::parse(&udf.signature)?;
            if let Some(pattern) = &udf.pattern {
                def.set_translation_pattern(pattern.as_str())?;
            }
            if let Some(previous) = registry.register(def) {
                warn!(%previous, "UDF declared twice, keeping the last declaration");
            }
        }
        Ok(registry)
    }
}
