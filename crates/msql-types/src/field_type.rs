//! Static result types of bound expressions.

use std::fmt;

use crate::Value;

/// MySQL column type codes relevant to scalar evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MysqlType {
    Null,
    LongLong,
    Float,
    Double,
    NewDecimal,
    String,
    VarString,
    Varchar,
    Blob,
}

/// Character set attached to string types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Charset {
    /// Byte strings; comparison is byte-wise.
    Binary,
    /// Character strings.
    Utf8mb4,
}

/// Evaluation category of a [`FieldType`].
///
/// This is the closed tag set the coercion engine reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalType {
    Null,
    Int,
    UInt,
    Float,
    Decimal,
    String,
}

/// Static type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FieldType {
    pub tp: MysqlType,
    pub unsigned: bool,
    pub binary: bool,
    pub charset: Charset,
}

impl FieldType {
    const fn numeric(tp: MysqlType, unsigned: bool) -> Self {
        Self {
            tp,
            unsigned,
            binary: true,
            charset: Charset::Binary,
        }
    }

    const fn string(tp: MysqlType, binary: bool) -> Self {
        Self {
            tp,
            unsigned: false,
            binary,
            charset: if binary {
                Charset::Binary
            } else {
                Charset::Utf8mb4
            },
        }
    }

    /// Type of a `NULL` literal.
    pub const fn null() -> Self {
        Self::numeric(MysqlType::Null, false)
    }

    /// Signed `BIGINT`.
    pub const fn long_long() -> Self {
        Self::numeric(MysqlType::LongLong, false)
    }

    /// `BIGINT UNSIGNED`.
    pub const fn unsigned_long_long() -> Self {
        Self::numeric(MysqlType::LongLong, true)
    }

    /// Single precision `FLOAT`.
    pub const fn float() -> Self {
        Self::numeric(MysqlType::Float, false)
    }

    /// `DOUBLE`.
    pub const fn double() -> Self {
        Self::numeric(MysqlType::Double, false)
    }

    /// `DECIMAL`.
    pub const fn new_decimal() -> Self {
        Self::numeric(MysqlType::NewDecimal, false)
    }

    /// `CHAR` in the default character set.
    pub const fn char() -> Self {
        Self::string(MysqlType::String, false)
    }

    /// `BINARY`.
    pub const fn binary() -> Self {
        Self::string(MysqlType::String, true)
    }

    /// `VARCHAR` in the default character set.
    pub const fn varchar() -> Self {
        Self::string(MysqlType::Varchar, false)
    }

    /// `VARBINARY`.
    pub const fn varbinary() -> Self {
        Self::string(MysqlType::Varchar, true)
    }

    /// `TEXT`.
    pub const fn text() -> Self {
        Self::string(MysqlType::Blob, false)
    }

    /// `BLOB`.
    pub const fn blob() -> Self {
        Self::string(MysqlType::Blob, true)
    }

    /// Type of a character string literal.
    pub const fn var_string() -> Self {
        Self::string(MysqlType::VarString, false)
    }

    /// Type of a byte string literal.
    pub const fn var_binary_string() -> Self {
        Self::string(MysqlType::VarString, true)
    }

    /// Reduce to the evaluation category.
    pub const fn eval_type(&self) -> EvalType {
        match self.tp {
            MysqlType::Null => EvalType::Null,
            MysqlType::LongLong if self.unsigned => EvalType::UInt,
            MysqlType::LongLong => EvalType::Int,
            MysqlType::Float | MysqlType::Double => EvalType::Float,
            MysqlType::NewDecimal => EvalType::Decimal,
            MysqlType::String | MysqlType::VarString | MysqlType::Varchar | MysqlType::Blob => {
                EvalType::String
            }
        }
    }

    /// Whether values of this type are strings.
    pub const fn is_string(&self) -> bool {
        matches!(self.eval_type(), EvalType::String)
    }

    /// Whether values of this type are byte strings.
    pub const fn is_binary_string(&self) -> bool {
        self.is_string() && self.binary
    }

    /// Static type of a literal value.
    pub const fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::null(),
            Value::Int(_) => Self::long_long(),
            Value::UInt(_) => Self::unsigned_long_long(),
            Value::Float(_) => Self::double(),
            Value::Decimal(_) => Self::new_decimal(),
            Value::Text(_) => Self::var_string(),
            Value::Bytes(_) => Self::var_binary_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.tp {
            MysqlType::Null => "null",
            MysqlType::LongLong => "bigint",
            MysqlType::Float => "float",
            MysqlType::Double => "double",
            MysqlType::NewDecimal => "decimal",
            MysqlType::String if self.binary => "binary",
            MysqlType::String => "char",
            MysqlType::VarString | MysqlType::Varchar if self.binary => "varbinary",
            MysqlType::VarString | MysqlType::Varchar => "varchar",
            MysqlType::Blob if self.binary => "blob",
            MysqlType::Blob => "text",
        };
        f.write_str(name)?;
        if self.unsigned {
            f.write_str(" unsigned")?;
        }
        Ok(())
    }
}
