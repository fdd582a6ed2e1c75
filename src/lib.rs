//! ADQL syntax trees, language feature gating and translation to SQL dialects.

pub mod ast;
pub mod config;
pub mod db_type;
pub mod error;
pub mod feature;
pub mod function_def;
pub mod functions;
pub mod geometry;
pub mod position;
pub mod region;
pub mod to_sql;
pub mod translate;
pub mod validate;

#[cfg(test)]
mod tests;

use crate::{ast::Query, error::Error, feature::FeatureSet, translate::TranslationContext};

/// Turns ADQL text into a [Query]. The grammar lives outside this crate.
pub trait QueryParser {
    fn parse(&self, text: &str) -> Result<Query, Error>;
}

/// Parses, validates against `features`, then translates `text`.
pub fn translate_text<P, C>(
    parser: &P,
    text: &str,
    features: &FeatureSet,
    cx: &C,
) -> Result<String, Error>
where
    P: QueryParser + ?Sized,
    C: TranslationContext + ?Sized,
{
    let query = parser.parse(text)?;
    validate::check_features(&query, features)?;
    translate::translate_query(&query, cx)
}
