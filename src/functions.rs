use std::ops::RangeInclusive;

use crate::{
    ast::{Children, Node, Operand, ValueKind, join_adql},
    error::Error,
    feature::{FeatureType, LanguageFeature, LanguageVersion},
    position::TextPosition,
};

/// The built-in (non geometric) ADQL functions.
#[derive(
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ScalarFunctionKind {
    Abs,
    Ceiling,
    Degrees,
    Exp,
    Floor,
    Log,
    Log10,
    Mod,
    Pi,
    Power,
    Radians,
    Rand,
    Round,
    Sqrt,
    Truncate,
    Acos,
    Asin,
    Atan,
    Atan2,
    Cos,
    Cot,
    Sin,
    Tan,
    Lower,
    Upper,
    Coalesce,
}

impl ScalarFunctionKind {
    pub const ALL: [ScalarFunctionKind; 26] = [
        Self::Abs,
        Self::Ceiling,
        Self::Degrees,
        Self::Exp,
        Self::Floor,
        Self::Log,
        Self::Log10,
        Self::Mod,
        Self::Pi,
        Self::Power,
        Self::Radians,
        Self::Rand,
        Self::Round,
        Self::Sqrt,
        Self::Truncate,
        Self::Acos,
        Self::Asin,
        Self::Atan,
        Self::Atan2,
        Self::Cos,
        Self::Cot,
        Self::Sin,
        Self::Tan,
        Self::Lower,
        Self::Upper,
        Self::Coalesce,
    ];

    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn feature(&self) -> LanguageFeature {
        match self {
            Self::Lower | Self::Upper => LanguageFeature::optional(FeatureType::String, self.name()),
            Self::Coalesce => LanguageFeature::optional(FeatureType::Conditional, self.name()),
            _ => LanguageFeature::core(self.name()),
        }
    }

    /// The first language version defining this function.
    pub fn since(&self) -> LanguageVersion {
        match self {
            Self::Lower | Self::Upper | Self::Coalesce => LanguageVersion::V2_1,
            _ => LanguageVersion::V2_0,
        }
    }

    pub fn arity(&self) -> RangeInclusive<usize> {
        match self {
            Self::Pi => 0..=0,
            Self::Rand => 0..=1,
            Self::Round | Self::Truncate => 1..=2,
            Self::Mod | Self::Power | Self::Atan2 => 2..=2,
            Self::Coalesce => 1..=usize::MAX,
            _ => 1..=1,
        }
    }

    pub fn returns_string(&self) -> bool {
        matches!(self, Self::Lower | Self::Upper)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFunction {
    pub kind: ScalarFunctionKind,
    pub args: Vec<Operand>,
    pub position: Option<TextPosition>,
}

impl ScalarFunction {
    pub fn new(kind: ScalarFunctionKind, args: Vec<Operand>) -> Result<Self, Error> {
        if !kind.arity().contains(&args.len()) {
            return Err(Error::InvalidArgument(format!(
                "{kind} called with an incorrect number of arguments (got {})",
                args.len()
            )));
        }
        Ok(Self {
            kind,
            args,
            position: None,
        })
    }
}

impl Node for ScalarFunction {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        self.kind.feature()
    }

    fn to_adql(&self) -> String {
        format!("{}({})", self.kind, join_adql(&self.args))
    }

    fn children(&self) -> Children<'_> {
        Box::new(self.args.iter().map(|a| a as &dyn Node))
    }
}

impl ValueKind for ScalarFunction {
    fn is_numeric(&self) -> bool {
        match self.kind {
            ScalarFunctionKind::Coalesce => self.args.iter().any(|a| a.is_numeric()),
            kind => !kind.returns_string(),
        }
    }

    fn is_string(&self) -> bool {
        match self.kind {
            ScalarFunctionKind::Coalesce => self.args.iter().any(|a| a.is_string()),
            kind => kind.returns_string(),
        }
    }

    fn is_geometry(&self) -> bool {
        self.kind == ScalarFunctionKind::Coalesce && self.args.iter().any(|a| a.is_geometry())
    }
}
