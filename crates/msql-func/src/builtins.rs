//! Comparison builtins: `GREATEST`, `LEAST`, `INTERVAL`, `ISNULL`.
//!
//! `GREATEST`/`LEAST` return `NULL` as soon as any argument is `NULL`.
//! `INTERVAL` never returns `NULL`: a `NULL` probe yields -1. Operands are
//! compared through [`crate::coerce`], never as raw values.
#![allow(
    clippy::unnecessary_literal_bound,
    clippy::cast_possible_wrap,
    clippy::match_same_arms
)]

use std::cmp::Ordering;
use std::sync::Arc;

use msql_error::Result;
use msql_types::{EvalType, FieldType, Value};

use crate::coerce::{CompareContext, CompareKey, Domain, choose_domain};
use crate::expr::{Expression, RowContext};
use crate::scalar::{Arity, BuiltinFunction, FunctionClass};
use crate::{BuildContext, FuncId, FunctionRegistry};

// ── Helpers ───────────────────────────────────────────────────────────────

/// Evaluate every argument, stopping at the first `NULL`.
fn eval_non_null(args: &[Arc<dyn Expression>], row: &dyn RowContext) -> Result<Option<Vec<Value>>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        let value = arg.eval(row)?;
        if value.is_null() {
            return Ok(None);
        }
        values.push(value);
    }
    Ok(Some(values))
}

/// Result type of `GREATEST`/`LEAST`: the widest argument type.
fn widest_type(args: &[Arc<dyn Expression>]) -> FieldType {
    let types: Vec<&FieldType> = args
        .iter()
        .map(|a| a.field_type())
        .filter(|ft| ft.eval_type() != EvalType::Null)
        .collect();
    if types.is_empty() {
        return FieldType::null();
    }
    let has = |et: EvalType| types.iter().any(|ft| ft.eval_type() == et);
    if has(EvalType::String) {
        return if types.iter().any(|ft| ft.is_binary_string()) {
            FieldType::var_binary_string()
        } else {
            FieldType::var_string()
        };
    }
    if has(EvalType::Float) {
        return FieldType::double();
    }
    if has(EvalType::Decimal) {
        return FieldType::new_decimal();
    }
    match (has(EvalType::Int), has(EvalType::UInt)) {
        (true, true) => FieldType::new_decimal(),
        (false, true) => FieldType::unsigned_long_long(),
        _ => FieldType::long_long(),
    }
}

// ── greatest(X, Y, ...) / least(X, Y, ...) ────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Greatest,
    Least,
}

impl Extremum {
    const fn name(self) -> &'static str {
        match self {
            Self::Greatest => "GREATEST",
            Self::Least => "LEAST",
        }
    }

    /// Ordering of a candidate against the current winner that replaces it.
    const fn replaces_on(self) -> Ordering {
        match self {
            Self::Greatest => Ordering::Greater,
            Self::Least => Ordering::Less,
        }
    }

    fn bind(self, args: Vec<Arc<dyn Expression>>) -> Box<dyn BuiltinFunction> {
        let types: Vec<FieldType> = args.iter().map(|a| *a.field_type()).collect();
        Box::new(BoundExtremum {
            which: self,
            ret: widest_type(&args),
            domain: Domain::for_types(&types),
            args,
        })
    }
}

#[derive(Debug)]
struct BoundExtremum {
    which: Extremum,
    args: Vec<Arc<dyn Expression>>,
    ret: FieldType,
    /// Fixed when argument types alone decide it.
    domain: Option<Domain>,
}

impl BuiltinFunction for BoundExtremum {
    fn eval(&self, row: &dyn RowContext) -> Result<Value> {
        let Some(mut values) = eval_non_null(&self.args, row)? else {
            return Ok(Value::Null);
        };
        let domain = self
            .domain
            .unwrap_or_else(|| choose_domain(&values, CompareContext::General));
        let keys = values
            .iter()
            .map(|v| domain.key(v))
            .collect::<Result<Vec<CompareKey<'_>>>>()?;

        let mut best = 0;
        for (i, key) in keys.iter().enumerate().skip(1) {
            if key.compare(&keys[best]) == self.which.replaces_on() {
                best = i;
            }
        }
        drop(keys);
        values.swap_remove(best).convert_to(&self.ret)
    }

    fn ret_type(&self) -> &FieldType {
        &self.ret
    }

    fn args(&self) -> &[Arc<dyn Expression>] {
        &self.args
    }
}

pub struct GreatestFunc;

impl FunctionClass for GreatestFunc {
    fn name(&self) -> &str {
        Extremum::Greatest.name()
    }

    fn arity(&self) -> Arity {
        Arity::at_least(2)
    }

    fn get_function(
        &self,
        _ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(Extremum::Greatest.bind(args))
    }
}

pub struct LeastFunc;

impl FunctionClass for LeastFunc {
    fn name(&self) -> &str {
        Extremum::Least.name()
    }

    fn arity(&self) -> Arity {
        Arity::at_least(2)
    }

    fn get_function(
        &self,
        _ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(Extremum::Least.bind(args))
    }
}

// ── interval(N, N1, N2, ...) ──────────────────────────────────────────────

#[derive(Debug)]
struct BoundInterval {
    args: Vec<Arc<dyn Expression>>,
    ret: FieldType,
    linear_scan_max: usize,
}

impl BuiltinFunction for BoundInterval {
    fn eval(&self, row: &dyn RowContext) -> Result<Value> {
        let probe = self.args[0].eval(row)?;
        if probe.is_null() {
            return Ok(Value::Int(-1));
        }
        let bounds = self.args[1..]
            .iter()
            .map(|a| a.eval(row))
            .collect::<Result<Vec<Value>>>()?;

        let domain = choose_domain(
            std::iter::once(&probe).chain(&bounds),
            CompareContext::Numeric,
        );
        let probe_key = domain.key(&probe)?;
        let keys = bounds
            .iter()
            .map(|b| {
                if b.is_null() {
                    Ok(None)
                } else {
                    domain.key(b).map(Some)
                }
            })
            .collect::<Result<Vec<Option<CompareKey<'_>>>>>()?;

        // NULL boundaries never exceed the probe.
        let not_above = |key: &Option<CompareKey<'_>>| {
            key.as_ref()
                .is_none_or(|k| k.compare(&probe_key) != Ordering::Greater)
        };
        let idx = if keys.len() <= self.linear_scan_max {
            keys.iter().position(|k| !not_above(k)).unwrap_or(keys.len())
        } else {
            keys.partition_point(not_above)
        };
        Ok(Value::Int(idx as i64))
    }

    fn ret_type(&self) -> &FieldType {
        &self.ret
    }

    fn args(&self) -> &[Arc<dyn Expression>] {
        &self.args
    }
}

pub struct IntervalFunc;

impl FunctionClass for IntervalFunc {
    fn name(&self) -> &str {
        "INTERVAL"
    }

    fn arity(&self) -> Arity {
        Arity::at_least(2)
    }

    fn get_function(
        &self,
        ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(Box::new(BoundInterval {
            args,
            ret: FieldType::long_long(),
            linear_scan_max: ctx.config.interval_linear_scan_max,
        }))
    }
}

// ── isnull(X) ─────────────────────────────────────────────────────────────

#[derive(Debug)]
struct BoundIsNull {
    args: Vec<Arc<dyn Expression>>,
    ret: FieldType,
}

impl BuiltinFunction for BoundIsNull {
    fn eval(&self, row: &dyn RowContext) -> Result<Value> {
        let value = self.args[0].eval(row)?;
        Ok(Value::Int(i64::from(value.is_null())))
    }

    fn ret_type(&self) -> &FieldType {
        &self.ret
    }

    fn args(&self) -> &[Arc<dyn Expression>] {
        &self.args
    }
}

pub struct IsNullFunc;

impl FunctionClass for IsNullFunc {
    fn name(&self) -> &str {
        "ISNULL"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn get_function(
        &self,
        _ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(Box::new(BoundIsNull {
            args,
            ret: FieldType::long_long(),
        }))
    }
}

// ── Registration ──────────────────────────────────────────────────────────

/// Register every builtin function class.
pub fn register_builtins(registry: &mut FunctionRegistry) {
    for id in FuncId::ALL {
        registry.register_class(id.class());
    }
}
