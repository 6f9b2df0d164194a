//! OData primitive types and literal values.
//!
//! [`EdmType`] is the declared type of a property or parameter as read from
//! `$metadata`. [`Literal`] is a caller-supplied value that gets rendered into
//! a `$filter` clause or a function-import parameter alias.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// An OData primitive type tag (`Edm.*`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdmType {
    /// `Edm.Boolean`
    Boolean,
    /// `Edm.Byte`
    Byte,
    /// `Edm.Date`
    Date,
    /// `Edm.DateTimeOffset`
    DateTimeOffset,
    /// `Edm.Decimal`
    Decimal,
    /// `Edm.Double`
    Double,
    /// `Edm.Duration`
    Duration,
    /// `Edm.Guid`
    Guid,
    /// `Edm.Int16`
    Int16,
    /// `Edm.Int32`
    Int32,
    /// `Edm.Int64`
    Int64,
    /// `Edm.SByte`
    SByte,
    /// `Edm.Single`
    Single,
    /// `Edm.String`
    String,
    /// `Edm.TimeOfDay`
    TimeOfDay,
    /// Any other type name, kept verbatim (complex types, collections, ...).
    Other(String),
}

impl EdmType {
    /// Parses a type name as it appears in a `Type` attribute.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "Edm.Boolean" => Self::Boolean,
            "Edm.Byte" => Self::Byte,
            "Edm.Date" => Self::Date,
            "Edm.DateTimeOffset" => Self::DateTimeOffset,
            "Edm.Decimal" => Self::Decimal,
            "Edm.Double" => Self::Double,
            "Edm.Duration" => Self::Duration,
            "Edm.Guid" => Self::Guid,
            "Edm.Int16" => Self::Int16,
            "Edm.Int32" => Self::Int32,
            "Edm.Int64" => Self::Int64,
            "Edm.SByte" => Self::SByte,
            "Edm.Single" => Self::Single,
            "Edm.String" => Self::String,
            "Edm.TimeOfDay" => Self::TimeOfDay,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the type name as written in `$metadata`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Boolean => "Edm.Boolean",
            Self::Byte => "Edm.Byte",
            Self::Date => "Edm.Date",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::Decimal => "Edm.Decimal",
            Self::Double => "Edm.Double",
            Self::Duration => "Edm.Duration",
            Self::Guid => "Edm.Guid",
            Self::Int16 => "Edm.Int16",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::SByte => "Edm.SByte",
            Self::Single => "Edm.Single",
            Self::String => "Edm.String",
            Self::TimeOfDay => "Edm.TimeOfDay",
            Self::Other(name) => name,
        }
    }

    /// Returns the friendly type used in descriptions.
    #[must_use]
    pub fn friendly(&self) -> FriendlyType {
        match self {
            Self::Decimal => FriendlyType::Float,
            Self::Int16 | Self::Int32 | Self::Int64 => FriendlyType::Int,
            Self::String => FriendlyType::Str,
            Self::Boolean => FriendlyType::Bool,
            Self::Date | Self::TimeOfDay => FriendlyType::Datetime,
            other => FriendlyType::Passthrough(other.as_str().to_string()),
        }
    }

    /// Returns true for types that carry a calendar date.
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTimeOffset)
    }
}

impl fmt::Display for EdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short type label shown by `describe` and `show`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FriendlyType {
    /// Text.
    Str,
    /// Floating point number.
    Float,
    /// Integer.
    Int,
    /// Boolean.
    Bool,
    /// Date or time.
    Datetime,
    /// No friendly mapping; the Edm name is shown.
    Passthrough(String),
}

impl fmt::Display for FriendlyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => f.write_str("str"),
            Self::Float => f.write_str("float"),
            Self::Int => f.write_str("int"),
            Self::Bool => f.write_str("bool"),
            Self::Datetime => f.write_str("datetime"),
            Self::Passthrough(name) => f.write_str(name),
        }
    }
}

/// A value supplied by the caller for a filter operand or function parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without offset.
    DateTime(NaiveDateTime),
}

impl Literal {
    /// Numeric view of the value, parsing text when needed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer view of the value. Floats are truncated toward zero.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Renders the value as an OData decimal literal (`4.0`, `4.25`).
    ///
    /// Falls back to a quoted literal when the value is not numeric.
    #[must_use]
    pub fn to_decimal_literal(&self) -> String {
        self.as_f64()
            .map_or_else(|| self.to_quoted_literal(), format_float)
    }

    /// Renders the value as an OData integer literal.
    ///
    /// Falls back to a quoted literal when the value is not numeric.
    #[must_use]
    pub fn to_int_literal(&self) -> String {
        self.as_i64()
            .map_or_else(|| self.to_quoted_literal(), |v| v.to_string())
    }

    /// Renders the value as a single-quoted OData string literal.
    #[must_use]
    pub fn to_quoted_literal(&self) -> String {
        quote(&self.to_string())
    }

    /// Renders the value as an unquoted `YYYY-MM-DD` date literal.
    #[must_use]
    pub fn to_date_literal(&self) -> String {
        match self {
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.date().format("%Y-%m-%d").to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&format_float(*v)),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Literal {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Literal {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<NaiveDate> for Literal {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// Formats a float the way OData decimal literals are written: integral
/// values keep one fractional digit.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Single-quotes a string, doubling embedded quotes.
pub(crate) fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
