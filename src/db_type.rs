//! Logical column types and the contract for mapping them to a backend's own
//!  type vocabulary.

use std::fmt;

#[derive(
    strum_macros::Display,
    strum_macros::EnumString,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum DbTypeKind {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Binary,
    VarBinary,
    Char,
    VarChar,
    Blob,
    Clob,
    Timestamp,
    Point,
    Circle,
    Polygon,
    Region,
    #[strum(serialize = "UNKNOWN_NUMERIC")]
    UnknownNumeric,
    Unknown,
}

impl DbTypeKind {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::SmallInt
                | Self::Integer
                | Self::BigInt
                | Self::Real
                | Self::Double
                | Self::UnknownNumeric
                | Self::Unknown
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Self::Char | Self::VarChar | Self::Clob | Self::Timestamp | Self::Unknown
        )
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary | Self::VarBinary | Self::Blob | Self::Unknown)
    }

    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Self::Point | Self::Circle | Self::Polygon | Self::Region | Self::Unknown
        )
    }

    /// Whether the type accepts a length parameter: `VARCHAR(10)`.
    pub fn has_length(&self) -> bool {
        matches!(
            self,
            Self::Binary | Self::VarBinary | Self::Char | Self::VarChar
        )
    }
}

/// A logical type. `raw_name` keeps the backend name it was converted from,
///  if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbType {
    pub kind: DbTypeKind,
    pub length: Option<u32>,
    pub raw_name: Option<String>,
}

impl DbType {
    pub fn new(kind: DbTypeKind) -> Self {
        Self {
            kind,
            length: None,
            raw_name: None,
        }
    }

    pub fn with_length(kind: DbTypeKind, length: u32) -> Self {
        Self {
            kind,
            length: Some(length),
            raw_name: None,
        }
    }

    pub fn unknown(raw_name: impl Into<String>) -> Self {
        Self {
            kind: DbTypeKind::Unknown,
            length: None,
            raw_name: Some(raw_name.into()),
        }
    }

    pub fn raw(mut self, raw_name: impl Into<String>) -> Self {
        self.raw_name = Some(raw_name.into());
        self
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    pub fn is_string(&self) -> bool {
        self.kind.is_string()
    }

    pub fn is_geometry(&self) -> bool {
        self.kind.is_geometry()
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(length) = self.length {
            write!(f, "({length})")?;
        }
        Ok(())
    }
}

/// Converts between a target engine's native types and logical types. There is
///  one implementation per engine; the conversion does not have to round trip
///  but must be deterministic.
pub trait TypeMapping {
    /// `type_code` is the engine's numeric type identifier, `raw_name` its
    ///  native name and `display_name` the name shown to users. `params` are
    ///  the type modifiers, e.g. `["10"]` for `varchar(10)`.
    fn from_backend(
        &self,
        type_code: i32,
        raw_name: &str,
        display_name: &str,
        params: &[String],
    ) -> DbType;

    fn to_backend(&self, ty: &DbType) -> String;
}

/// The first type modifier as a length, if it is one.
pub fn length_param(params: &[String]) -> Option<u32> {
    params.first().and_then(|p| p.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!("VARCHAR(10)", DbType::with_length(DbTypeKind::VarChar, 10).to_string());
        assert_eq!("SMALLINT", DbType::new(DbTypeKind::SmallInt).to_string());
        assert_eq!("UNKNOWN_NUMERIC", DbTypeKind::UnknownNumeric.to_string());
    }

    #[test]
    fn parse_kind() {
        assert_eq!(Ok(DbTypeKind::VarChar), "varchar".parse::<DbTypeKind>());
        assert_eq!(Ok(DbTypeKind::BigInt), "BIGINT".parse::<DbTypeKind>());
        assert!("STRING".parse::<DbTypeKind>().is_err());
    }

    #[test]
    fn unknown_type_matches_everything() {
        let ty = DbType::unknown("hstore");
        assert!(ty.is_numeric() && ty.is_string() && ty.is_geometry());
        assert!(!DbType::new(DbTypeKind::Point).is_string());
    }

    #[test]
    fn length_params() {
        assert_eq!(Some(12), length_param(&["12".to_string()]));
        assert_eq!(None, length_param(&["x".to_string()]));
        assert_eq!(None, length_param(&[]));
    }
}
