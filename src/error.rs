//! Error types for ADQL validation and translation.

use thiserror::Error;

use crate::{ast::Node, feature::LanguageFeature, position::TextPosition};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A node uses a language feature which is not enabled.
    #[error("{message}")]
    UnsupportedFeature {
        feature: LanguageFeature,
        adql: String,
        position: Option<TextPosition>,
        message: String,
    },

    /// A construction-time contract was violated.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed function signature \"{signature}\": {reason}")]
    MalformedSignature { signature: String, reason: String },

    #[error("Invalid translation pattern \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Geometry translation error: {message}")]
    GeometryTranslation {
        message: String,
        position: Option<TextPosition>,
    },

    /// Reported by the external query parser.
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        position: Option<TextPosition>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Rejects `node` with the default message built from its feature.
    pub fn unsupported(node: &dyn Node) -> Self {
        let feature = node.feature();
        let message = format!("Unsupported feature: {feature}");
        Self::unsupported_with_message(node, message)
    }

    pub fn unsupported_with_message(node: &dyn Node, message: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: node.feature(),
            adql: node.to_adql(),
            position: node.position(),
            message: message.into(),
        }
    }

    pub fn geometry(message: impl Into<String>, position: Option<TextPosition>) -> Self {
        Self::GeometryTranslation {
            message: message.into(),
            position,
        }
    }

    /// The source span the error refers to, when known.
    pub fn position(&self) -> Option<TextPosition> {
        match self {
            Self::UnsupportedFeature { position, .. }
            | Self::GeometryTranslation { position, .. }
            | Self::Parse { position, .. } => *position,
            _ => None,
        }
    }
}
