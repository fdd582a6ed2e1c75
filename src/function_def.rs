//! User defined function signatures and their optional translation patterns.

use std::{collections::HashMap, fmt, sync::LazyLock};

use nom::{
    IResult,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{all_consuming, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
};
use regex::Regex;

use crate::{
    db_type::{DbType, DbTypeKind},
    error::Error,
    feature::LanguageFeature,
};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("placeholder regex is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParam {
    pub name: String,
    pub ty: DbType,
}

/// Signature of a user defined function: `name(param TYPE, ...) -> TYPE`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<FunctionParam>,
    pub return_type: DbType,
    translation_pattern: Option<String>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, params: Vec<FunctionParam>, return_type: DbType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            translation_pattern: None,
        }
    }

    /// Parses a signature such as `split(str VARCHAR, sep VARCHAR) -> VARCHAR`.
    pub fn parse(signature: &str) -> Result<Self, Error> {
        let malformed = |reason: String| Error::MalformedSignature {
            signature: signature.to_string(),
            reason,
        };

        let (_, raw) = parse_signature(signature).map_err(|_| malformed(diagnose(signature)))?;

        let params = raw
            .params
            .into_iter()
            .map(|(name, ty, len)| {
                Ok(FunctionParam {
                    name: name.to_string(),
                    ty: to_db_type(ty, len)?,
                })
            })
            .collect::<Result<Vec<_>, String>>()
            .map_err(malformed)?;
        let return_type = to_db_type(raw.return_type.0, raw.return_type.1).map_err(malformed)?;

        Ok(Self::new(raw.name, params, return_type))
    }

    pub fn translation_pattern(&self) -> Option<&str> {
        self.translation_pattern.as_deref()
    }

    /// Sets the text a call is translated to. `$k` refers to the k-th argument
    ///  (1-based); any other text is emitted as is.
    pub fn set_translation_pattern(&mut self, pattern: impl Into<String>) -> Result<(), Error> {
        let pattern = pattern.into();
        for caps in PLACEHOLDER.captures_iter(&pattern) {
            let index = caps[1].parse::<usize>().unwrap_or(usize::MAX);
            if index == 0 || index > self.params.len() {
                return Err(Error::InvalidPattern {
                    reason: format!(
                        "${} does not reference one of the {} parameters of {}",
                        &caps[1],
                        self.params.len(),
                        self.name
                    ),
                    pattern,
                });
            }
        }
        self.translation_pattern = Some(pattern);
        Ok(())
    }

    pub fn clear_translation_pattern(&mut self) {
        self.translation_pattern = None;
    }

    pub fn feature(&self) -> LanguageFeature {
        LanguageFeature::udf(self.name.clone())
    }

    pub fn is_numeric(&self) -> bool {
        self.return_type.is_numeric()
    }

    pub fn is_string(&self) -> bool {
        self.return_type.is_string()
    }

    pub fn is_geometry(&self) -> bool {
        self.return_type.is_geometry()
    }
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", param.name, param.ty)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Replaces every `$k` of `pattern` with `arg(k)`. Placeholders too large for
///  `usize` are passed as `usize::MAX`.
pub fn apply_pattern<E>(
    pattern: &str,
    mut arg: impl FnMut(usize) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(pattern.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(pattern) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&pattern[last..whole.start()]);
        out.push_str(&arg(digits.as_str().parse().unwrap_or(usize::MAX))?);
        last = whole.end();
    }
    out.push_str(&pattern[last..]);
    Ok(out)
}

/// Definitions accepted by a deployment, keyed by case-insensitive name and
///  arity.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    defs: HashMap<(String, usize), FunctionDef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the definition previously registered for the same name and
    ///  arity.
    pub fn register(&mut self, def: FunctionDef) -> Option<FunctionDef> {
        self.defs
            .insert((def.name.to_lowercase(), def.params.len()), def)
    }

    pub fn lookup(&self, name: &str, arity: usize) -> Option<&FunctionDef> {
        self.defs.get(&(name.to_lowercase(), arity))
    }

    pub fn set_translation_pattern(
        &mut self,
        name: &str,
        arity: usize,
        pattern: impl Into<String>,
    ) -> Result<(), Error> {
        self.defs
            .get_mut(&(name.to_lowercase(), arity))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("No function {name} with {arity} parameters"))
            })?
            .set_translation_pattern(pattern)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDef> {
        self.defs.values()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

struct RawSignature<'a> {
    name: &'a str,
    params: Vec<(&'a str, &'a str, Option<u32>)>,
    return_type: (&'a str, Option<u32>),
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn type_name(input: &str) -> IResult<&str, (&str, Option<u32>)> {
    let (input, name) = identifier(input)?;
    let (input, len) = opt(delimited(
        tuple((multispace0, char('('), multispace0)),
        digit1,
        tuple((multispace0, char(')'))),
    ))(input)?;
    Ok((input, (name, len.and_then(|l| l.parse().ok()))))
}

fn param(input: &str) -> IResult<&str, (&str, &str, Option<u32>)> {
    let (input, name) = identifier(input)?;
    let (input, (ty, len)) = preceded(multispace1, type_name)(input)?;
    Ok((input, (name, ty, len)))
}

fn parse_signature(input: &str) -> IResult<&str, RawSignature<'_>> {
    let (rest, (_, name, _, params, _, return_type, _)) = all_consuming(tuple((
        multispace0,
        identifier,
        multispace0,
        delimited(
            pair(char('('), multispace0),
            separated_list0(tuple((multispace0, char(','), multispace0)), param),
            pair(multispace0, char(')')),
        ),
        tuple((multispace0, tag("->"), multispace0)),
        type_name,
        multispace0,
    )))(input)?;
    Ok((
        rest,
        RawSignature {
            name,
            params,
            return_type,
        },
    ))
}

fn to_db_type(name: &str, len: Option<u32>) -> Result<DbType, String> {
    let kind = match name.parse::<DbTypeKind>() {
        Ok(DbTypeKind::Unknown | DbTypeKind::UnknownNumeric) | Err(_) => {
            return Err(format!("unknown type \"{name}\""));
        }
        Ok(kind) => kind,
    };
    match len {
        Some(_) if !kind.has_length() => Err(format!("type {kind} does not take a length")),
        Some(len) => Ok(DbType::with_length(kind, len)),
        None => Ok(DbType::new(kind)),
    }
}

/// Explains why [parse_signature] rejected `signature`.
fn diagnose(signature: &str) -> String {
    let opening = signature.matches('(').count();
    let closing = signature.matches(')').count();
    if !signature.contains("->") {
        "missing \"->\" followed by the return type".to_string()
    } else if opening == 0 || opening != closing {
        "unbalanced parameter list".to_string()
    } else {
        "expected \"name(param TYPE, ...) -> TYPE\"".to_string()
    }
}
