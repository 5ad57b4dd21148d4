//! Typed expressions and the row context they evaluate against.
//!
//! The surrounding executor owns parsing and planning; it hands the
//! evaluator argument expressions that already know their static
//! [`FieldType`], plus one [`RowContext`] per row.

use std::fmt;
use std::sync::Arc;

use msql_error::{MsqlError, Result};
use msql_types::{FieldType, SessionId, Value};

/// Read-only view of the row being evaluated.
pub trait RowContext {
    /// Value of the column at `index`, `None` past the end of the row.
    fn column(&self, index: usize) -> Option<&Value>;

    /// Number of columns in the row.
    fn width(&self) -> usize;

    /// Session evaluating this row; lock functions record it as the holder.
    fn session_id(&self) -> SessionId;
}

/// In-memory row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    session: SessionId,
    values: Vec<Value>,
}

impl Row {
    /// A row with column values.
    pub fn new(session: SessionId, values: Vec<Value>) -> Self {
        Self { session, values }
    }

    /// A row without columns, for constant-only expressions.
    pub fn empty(session: SessionId) -> Self {
        Self::new(session, Vec::new())
    }
}

impl RowContext for Row {
    fn column(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    fn width(&self) -> usize {
        self.values.len()
    }

    fn session_id(&self) -> SessionId {
        self.session
    }
}

/// An expression producing one value per row.
///
/// Implementations are shared across executor threads and must not keep
/// per-row mutable state.
pub trait Expression: Send + Sync + fmt::Debug {
    /// Evaluate against `row`.
    fn eval(&self, row: &dyn RowContext) -> Result<Value>;

    /// Static result type, fixed at bind time.
    fn field_type(&self) -> &FieldType;

    /// Whether the value is the same for every row.
    fn is_constant(&self) -> bool {
        false
    }
}

/// A literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    value: Value,
    field_type: FieldType,
}

impl Constant {
    /// A literal typed from its own value.
    pub fn new(value: Value) -> Self {
        let field_type = FieldType::of_value(&value);
        Self { value, field_type }
    }

    /// A literal with an explicit static type (e.g. a `BLOB` parameter).
    pub fn with_type(value: Value, field_type: FieldType) -> Self {
        Self { value, field_type }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Expression for Constant {
    fn eval(&self, _row: &dyn RowContext) -> Result<Value> {
        Ok(self.value.clone())
    }

    fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    fn is_constant(&self) -> bool {
        true
    }
}

/// Reference to a column of the current row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    index: usize,
    field_type: FieldType,
}

impl ColumnRef {
    pub fn new(index: usize, field_type: FieldType) -> Self {
        Self { index, field_type }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl Expression for ColumnRef {
    fn eval(&self, row: &dyn RowContext) -> Result<Value> {
        row.column(self.index)
            .cloned()
            .ok_or_else(|| MsqlError::ColumnOutOfRange {
                index: self.index,
                width: row.width(),
            })
    }

    fn field_type(&self) -> &FieldType {
        &self.field_type
    }
}

/// Wrap literals as constant argument expressions.
pub fn constants<I>(values: I) -> Vec<Arc<dyn Expression>>
where
    I: IntoIterator<Item = Value>,
{
    values
        .into_iter()
        .map(|v| Arc::new(Constant::new(v)) as Arc<dyn Expression>)
        .collect()
}
