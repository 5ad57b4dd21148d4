//! Function class and bound-function traits.
//!
//! A [`FunctionClass`] is the registry entry for one SQL name. Binding it
//! against concrete argument expressions checks the argument count, fixes
//! the result type and yields a [`BuiltinFunction`]: the per-call-site
//! evaluator. [`ScalarFunction`] wraps that evaluator as an
//! [`Expression`] so calls nest inside other calls.
//!
//! # Send + Sync
//!
//! Bound functions are shared across executor threads through `Arc`.
//! Evaluation takes `&self`; all per-row state lives on the stack.
#![allow(clippy::unnecessary_literal_bound)]

use std::fmt;
use std::sync::Arc;

use msql_error::{MsqlError, Result};
use msql_types::{FieldType, Value};

use crate::BuildContext;
use crate::expr::{Expression, RowContext};

/// Accepted argument counts of a function class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` means variadic.
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    pub const fn accepts(self, count: usize) -> bool {
        count >= self.min
            && match self.max {
                Some(max) => count <= max,
                None => true,
            }
    }
}

/// Registry entry for one SQL function name.
pub trait FunctionClass: Send + Sync {
    /// Canonical (upper-case) SQL name.
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    /// Bind to `args`, producing the call-site evaluator.
    ///
    /// Implementations call [`FunctionClass::verify_args`] first.
    fn get_function(
        &self,
        ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>>;

    /// Reject argument counts outside [`FunctionClass::arity`].
    fn verify_args(&self, args: &[Arc<dyn Expression>]) -> Result<()> {
        if self.arity().accepts(args.len()) {
            Ok(())
        } else {
            Err(MsqlError::arg_count(self.name(), args.len()))
        }
    }
}

/// A function bound to its argument expressions.
pub trait BuiltinFunction: Send + Sync + fmt::Debug {
    /// Evaluate against one row.
    fn eval(&self, row: &dyn RowContext) -> Result<Value>;

    /// Result type decided at bind time.
    fn ret_type(&self) -> &FieldType;

    fn args(&self) -> &[Arc<dyn Expression>];

    /// Whether equal inputs always give equal outputs.
    ///
    /// The lock functions read shared manager state and return `false`.
    fn is_deterministic(&self) -> bool {
        true
    }
}

/// A bound function call, usable as an argument of another call.
#[derive(Debug)]
pub struct ScalarFunction {
    name: String,
    func: Box<dyn BuiltinFunction>,
}

impl ScalarFunction {
    pub fn new(name: impl Into<String>, func: Box<dyn BuiltinFunction>) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self) -> &dyn BuiltinFunction {
        self.func.as_ref()
    }
}

impl Expression for ScalarFunction {
    fn eval(&self, row: &dyn RowContext) -> Result<Value> {
        self.func.eval(row)
    }

    fn field_type(&self) -> &FieldType {
        self.func.ret_type()
    }

    fn is_constant(&self) -> bool {
        self.func.is_deterministic() && self.func.args().iter().all(|a| a.is_constant())
    }
}

impl fmt::Display for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(/* {} args */)", self.name, self.func.args().len())
    }
}
