//! Core value and type definitions for the msql evaluation core.
//!
//! - [`Value`]: the nullable runtime scalar produced by expression evaluation.
//! - [`FieldType`] / [`EvalType`]: static result types of bound expressions.
//! - [`SessionId`]: opaque identity of the session evaluating a row.
//! - [`numeric`]: MySQL-compatible parsing of numeric strings.

pub mod field_type;
pub mod numeric;
pub mod value;

pub use field_type::{Charset, EvalType, FieldType, MysqlType};
pub use numeric::{NumericStr, classify_numeric, parse_exact, parse_f64_prefix};
pub use value::Value;

pub use bigdecimal::BigDecimal;
pub use rust_decimal::Decimal;

use std::fmt;

/// Opaque identity of a client session.
///
/// Supplied by the session-management collaborator through the row context;
/// the lock manager uses it to record and check lock ownership.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw connection id.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
