use std::borrow::Cow;
use std::fmt;

use msql_error::{MsqlError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::numeric::{NumericStr, classify_numeric, parse_f64_prefix};
use crate::{EvalType, FieldType};

/// A dynamically-typed MySQL scalar value.
///
/// The string tag comes in two flavours: [`Value::Text`] for character
/// strings and [`Value::Bytes`] for byte strings (the "binary" flag).
/// Values are immutable once built; functions produce new values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// A signed 64-bit integer.
    Int(i64),
    /// An unsigned 64-bit integer.
    UInt(u64),
    /// A 64-bit IEEE 754 floating-point number.
    Float(f64),
    /// An exact decimal.
    Decimal(Decimal),
    /// A character string.
    Text(String),
    /// A byte string.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this is a NULL value.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for either string flavour.
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Bytes(_))
    }

    /// Returns true for byte strings.
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }

    /// Try to extract a signed integer.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to extract an unsigned integer.
    pub const fn as_uint(&self) -> Option<u64> {
        match self {
            Self::UInt(u) => Some(*u),
            _ => None,
        }
    }

    /// Try to extract a float.
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to extract a decimal.
    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to extract a character string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of either string flavour.
    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(s) => Some(s.as_bytes()),
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Byte form used by string comparison.
    ///
    /// Strings borrow their contents; numbers are rendered the way MySQL
    /// casts them to `CHAR`. NULL renders as the empty string.
    pub fn string_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.as_bytes()),
            Self::Bytes(b) => Cow::Borrowed(b),
            other => Cow::Owned(other.to_text().into_bytes()),
        }
    }

    /// Convert to text following MySQL's `CAST(x AS CHAR)`.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) => format_mysql_float(*f),
            Self::Decimal(d) => d.to_string(),
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Convert to a double following MySQL numeric-context rules.
    ///
    /// - NULL -> 0.0
    /// - integers and decimals -> nearest double
    /// - strings -> longest numeric prefix, 0.0 if none
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Int(i) => *i as f64,
            Self::UInt(u) => *u as f64,
            Self::Float(f) => *f,
            Self::Decimal(d) => d.to_f64().unwrap_or(0.0),
            Self::Text(s) => parse_f64_prefix(s.as_bytes()),
            Self::Bytes(b) => parse_f64_prefix(b),
        }
    }

    /// Convert this value to the evaluation category of `ft`.
    ///
    /// Used to re-type a function result to its declared type. NULL stays
    /// NULL. Conversions that cannot keep the value (an unsigned value above
    /// `i64::MAX` into a signed type, a non-finite float into a decimal) are
    /// coercion errors.
    pub fn convert_to(&self, ft: &FieldType) -> Result<Self> {
        if self.is_null() {
            return Ok(Self::Null);
        }
        match ft.eval_type() {
            EvalType::Null => Ok(Self::Null),
            EvalType::Int => self.to_i64_rounded().map(Self::Int),
            EvalType::UInt => self.to_u64_rounded().map(Self::UInt),
            EvalType::Float => Ok(Self::Float(self.to_f64())),
            EvalType::Decimal => self.to_decimal_rounded().map(Self::Decimal),
            EvalType::String if ft.binary => Ok(Self::Bytes(self.string_bytes().into_owned())),
            EvalType::String => Ok(Self::Text(self.to_text())),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn to_i64_rounded(&self) -> Result<i64> {
        let out_of_range = || MsqlError::coercion(format!("{self} out of range for BIGINT"));
        match self {
            Self::Int(i) => Ok(*i),
            Self::UInt(u) => i64::try_from(*u).map_err(|_| out_of_range()),
            Self::Decimal(d) => d.round().to_i64().ok_or_else(out_of_range),
            Self::Text(_) | Self::Bytes(_) => match self.string_numeric() {
                NumericStr::Int(i) => i64::try_from(i).map_err(|_| out_of_range()),
                _ => float_to_i64(self.to_f64()).ok_or_else(out_of_range),
            },
            Self::Float(f) => float_to_i64(*f).ok_or_else(out_of_range),
            Self::Null => Ok(0),
        }
    }

    fn to_u64_rounded(&self) -> Result<u64> {
        let out_of_range =
            || MsqlError::coercion(format!("{self} out of range for BIGINT UNSIGNED"));
        match self {
            Self::Int(i) => u64::try_from(*i).map_err(|_| out_of_range()),
            Self::UInt(u) => Ok(*u),
            Self::Decimal(d) => d.round().to_u64().ok_or_else(out_of_range),
            Self::Text(_) | Self::Bytes(_) => match self.string_numeric() {
                NumericStr::Int(i) => u64::try_from(i).map_err(|_| out_of_range()),
                _ => float_to_u64(self.to_f64()).ok_or_else(out_of_range),
            },
            Self::Float(f) => float_to_u64(*f).ok_or_else(out_of_range),
            Self::Null => Ok(0),
        }
    }

    fn to_decimal_rounded(&self) -> Result<Decimal> {
        let out_of_range = || MsqlError::coercion(format!("{self} out of range for DECIMAL"));
        match self {
            Self::Int(i) => Ok(Decimal::from(*i)),
            Self::UInt(u) => Ok(Decimal::from(*u)),
            Self::Decimal(d) => Ok(*d),
            Self::Text(_) | Self::Bytes(_) => match self.string_numeric() {
                NumericStr::Int(i) => Decimal::from_i128(i).ok_or_else(out_of_range),
                NumericStr::Decimal(d) => Ok(d),
                NumericStr::Inexact | NumericStr::NotNumeric => {
                    Decimal::from_f64(self.to_f64()).ok_or_else(out_of_range)
                }
            },
            Self::Float(f) => Decimal::from_f64(*f).ok_or_else(out_of_range),
            Self::Null => Ok(Decimal::ZERO),
        }
    }

    /// Clean-number classification of a string value.
    ///
    /// Non-strings classify as [`NumericStr::NotNumeric`].
    pub fn string_numeric(&self) -> NumericStr {
        self.as_str_bytes()
            .map_or(NumericStr::NotNumeric, classify_numeric)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_i64(f: f64) -> Option<i64> {
    let r = f.round();
    if r >= -9_223_372_036_854_775_808.0 && r < 9_223_372_036_854_775_808.0 {
        Some(r as i64)
    } else {
        None
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn float_to_u64(f: f64) -> Option<u64> {
    let r = f.round();
    if r >= 0.0 && r < 18_446_744_073_709_551_616.0 {
        Some(r as u64)
    } else {
        None
    }
}

/// Format a double the way MySQL renders it in text results.
///
/// Integral values print without a fraction; very large or very small
/// magnitudes switch to exponent notation.
pub fn format_mysql_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_owned();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e15).contains(&abs) {
        format!("{f:e}")
    } else {
        format!("{f}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(v) => f.write_str(&format_mysql_float(*v)),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Bytes(b) => {
                f.write_str("X'")?;
                for byte in b {
                    write!(f, "{byte:02X}")?;
                }
                f.write_str("'")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Self::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
