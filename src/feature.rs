//! Language features and the per-deployment set of enabled ones.
//!
//! Every AST node describes itself with exactly one [LanguageFeature]. Core
//!  features are mandatory for a language version and can never be disabled;
//!  optional features (geometry, string functions, UDFs, ...) are declared by a
//!  deployment through a [FeatureSet].

use std::{
    borrow::Cow,
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, RwLock},
};

use serde::Deserialize;

use crate::functions::ScalarFunctionKind;

#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    #[strum(serialize = "ivo://ivoa.net/std/TAPRegExt#features-adql-geo")]
    Geometry,
    #[strum(serialize = "ivo://ivoa.net/std/TAPRegExt#features-adql-string")]
    String,
    #[strum(serialize = "ivo://ivoa.net/std/TAPRegExt#features-adql-conditional")]
    Conditional,
    #[strum(serialize = "ivo://ivoa.net/std/TAPRegExt#features-adql-offset")]
    Offset,
    #[strum(serialize = "ivo://ivoa.net/std/TAPRegExt#features-adql-type")]
    Type,
    #[strum(serialize = "ivo://ivoa.net/std/TAPRegExt#features-udf")]
    Udf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
pub enum LanguageVersion {
    #[serde(rename = "2.0")]
    V2_0,
    #[default]
    #[serde(rename = "2.1")]
    V2_1,
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageVersion::V2_0 => write!(f, "2.0"),
            LanguageVersion::V2_1 => write!(f, "2.1"),
        }
    }
}

/// Identity of a language capability: its optional type plus its form (a
///  function name or syntax label). Forms compare case-insensitively.
#[derive(Debug, Clone)]
pub struct LanguageFeature {
    pub kind: Option<FeatureType>,
    pub form: Cow<'static, str>,
    pub optional: bool,
}

impl LanguageFeature {
    pub const fn core(form: &'static str) -> Self {
        Self {
            kind: None,
            form: Cow::Borrowed(form),
            optional: false,
        }
    }

    pub const fn optional(kind: FeatureType, form: &'static str) -> Self {
        Self {
            kind: Some(kind),
            form: Cow::Borrowed(form),
            optional: true,
        }
    }

    /// The feature a user defined function must have enabled to be used.
    pub fn udf(name: impl Into<String>) -> Self {
        Self {
            kind: Some(FeatureType::Udf),
            form: Cow::Owned(name.into()),
            optional: true,
        }
    }
}

impl PartialEq for LanguageFeature {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.form.eq_ignore_ascii_case(&other.form)
    }
}

impl Eq for LanguageFeature {}

impl Hash for LanguageFeature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        for b in self.form.bytes() {
            b.to_ascii_uppercase().hash(state);
        }
    }
}

impl fmt::Display for LanguageFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.form)?;
        if let Some(kind) = &self.kind {
            write!(f, " (of type '{kind}')")?;
        }
        Ok(())
    }
}

/// Descriptors shared by the AST nodes.
pub mod features {
    use super::{FeatureType, LanguageFeature};

    pub const SELECT: LanguageFeature = LanguageFeature::core("SELECT");
    pub const TABLE: LanguageFeature = LanguageFeature::core("TABLE");
    pub const JOIN: LanguageFeature = LanguageFeature::core("JOIN");
    pub const COLUMN: LanguageFeature = LanguageFeature::core("COLUMN");
    pub const NUMERIC: LanguageFeature = LanguageFeature::core("NUMERIC");
    pub const STRING: LanguageFeature = LanguageFeature::core("STRING");
    pub const SUM: LanguageFeature = LanguageFeature::core("SUM");
    pub const SUB: LanguageFeature = LanguageFeature::core("SUB");
    pub const MULT: LanguageFeature = LanguageFeature::core("MULT");
    pub const DIV: LanguageFeature = LanguageFeature::core("DIV");
    pub const NEGATION: LanguageFeature = LanguageFeature::core("NEGATION");
    pub const CONCAT: LanguageFeature = LanguageFeature::core("CONCAT");
    pub const COMPARISON: LanguageFeature = LanguageFeature::core("COMPARISON");
    pub const IS_NULL: LanguageFeature = LanguageFeature::core("IS_NULL");
    pub const BETWEEN: LanguageFeature = LanguageFeature::core("BETWEEN");
    pub const AND: LanguageFeature = LanguageFeature::core("AND");
    pub const OR: LanguageFeature = LanguageFeature::core("OR");
    pub const NOT: LanguageFeature = LanguageFeature::core("NOT");

    // Core since 2.1
    pub const HEXADECIMAL: LanguageFeature = LanguageFeature::core("HEXADECIMAL");
    pub const BIT_AND: LanguageFeature = LanguageFeature::core("BIT_AND");
    pub const BIT_OR: LanguageFeature = LanguageFeature::core("BIT_OR");
    pub const BIT_XOR: LanguageFeature = LanguageFeature::core("BIT_XOR");
    pub const BIT_NOT: LanguageFeature = LanguageFeature::core("BIT_NOT");

    pub const ILIKE: LanguageFeature = LanguageFeature::optional(FeatureType::String, "ILIKE");
    pub const OFFSET: LanguageFeature = LanguageFeature::optional(FeatureType::Offset, "OFFSET");
    pub const CAST: LanguageFeature = LanguageFeature::optional(FeatureType::Type, "CAST");

    pub const POINT: LanguageFeature = LanguageFeature::optional(FeatureType::Geometry, "POINT");
    pub const CIRCLE: LanguageFeature = LanguageFeature::optional(FeatureType::Geometry, "CIRCLE");
    pub const BOX: LanguageFeature = LanguageFeature::optional(FeatureType::Geometry, "BOX");
    pub const POLYGON: LanguageFeature =
        LanguageFeature::optional(FeatureType::Geometry, "POLYGON");
    pub const REGION: LanguageFeature = LanguageFeature::optional(FeatureType::Geometry, "REGION");
    pub const CENTROID: LanguageFeature =
        LanguageFeature::optional(FeatureType::Geometry, "CENTROID");
    pub const AREA: LanguageFeature = LanguageFeature::optional(FeatureType::Geometry, "AREA");
    pub const DISTANCE: LanguageFeature =
        LanguageFeature::optional(FeatureType::Geometry, "DISTANCE");
    pub const CONTAINS: LanguageFeature =
        LanguageFeature::optional(FeatureType::Geometry, "CONTAINS");
    pub const INTERSECTS: LanguageFeature =
        LanguageFeature::optional(FeatureType::Geometry, "INTERSECTS");
    pub const COORD1: LanguageFeature = LanguageFeature::optional(FeatureType::Geometry, "COORD1");
    pub const COORD2: LanguageFeature = LanguageFeature::optional(FeatureType::Geometry, "COORD2");
    pub const COORDSYS: LanguageFeature =
        LanguageFeature::optional(FeatureType::Geometry, "COORDSYS");

    pub const GEOMETRY: [LanguageFeature; 13] = [
        POINT, CIRCLE, BOX, POLYGON, REGION, CENTROID, AREA, DISTANCE, CONTAINS, INTERSECTS,
        COORD1, COORD2, COORDSYS,
    ];
}

/// Enumerates every feature known for `version`, core and optional alike.
///  UDF features are not included: they are declared per deployment.
pub fn describe(version: LanguageVersion) -> Vec<LanguageFeature> {
    use features::*;

    let mut all = vec![
        SELECT, TABLE, JOIN, COLUMN, NUMERIC, STRING, SUM, SUB, MULT, DIV, NEGATION, CONCAT,
        COMPARISON, IS_NULL, BETWEEN, AND, OR, NOT,
    ];
    all.extend(GEOMETRY);
    all.extend(
        ScalarFunctionKind::ALL
            .iter()
            .filter(|f| f.since() <= version)
            .map(|f| f.feature()),
    );
    if version >= LanguageVersion::V2_1 {
        all.extend([
            HEXADECIMAL,
            BIT_AND,
            BIT_OR,
            BIT_XOR,
            BIT_NOT,
            ILIKE,
            OFFSET,
            CAST,
        ]);
    }
    all
}

/// The features a deployment accepts. Pass it explicitly to validation so that
///  concurrent validations with different configurations never interfere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    supported: HashSet<LanguageFeature>,
}

impl FeatureSet {
    /// Every feature of `version` enabled.
    pub fn for_version(version: LanguageVersion) -> Self {
        Self {
            supported: describe(version).into_iter().collect(),
        }
    }

    pub fn is_enabled(&self, feature: &LanguageFeature) -> bool {
        self.supported.contains(feature)
    }

    /// Returns true if the feature was not already enabled. Core features
    ///  cannot be added this way.
    pub fn enable(&mut self, feature: LanguageFeature) -> bool {
        feature.optional && self.supported.insert(feature)
    }

    /// Returns true if the feature was enabled. Core features stay enabled.
    pub fn disable(&mut self, feature: &LanguageFeature) -> bool {
        feature.optional && self.supported.remove(feature)
    }

    /// Disables every optional feature of the given type.
    pub fn disable_all(&mut self, kind: FeatureType) {
        self.supported
            .retain(|f| !f.optional || f.kind != Some(kind));
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageFeature> {
        self.supported.iter()
    }
}

/// Mutable, shared feature configuration. Readers take a snapshot which stays
///  valid for the whole validation pass; writers swap in a new set.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    current: RwLock<Arc<FeatureSet>>,
}

impl FeatureRegistry {
    pub fn new(features: FeatureSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(features)),
        }
    }

    pub fn snapshot(&self) -> Arc<FeatureSet> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, edit: impl FnOnce(&mut FeatureSet)) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = FeatureSet::clone(&guard);
        edit(&mut next);
        *guard = Arc::new(next);
    }
}
