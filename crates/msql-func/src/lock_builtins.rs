//! User-level lock functions backed by a shared [`NamedLockManager`].
//!
//! The manager comes from the [`BuildContext`] at bind time; the holder is
//! the session of the row being evaluated. None of these functions are
//! deterministic.
#![allow(clippy::unnecessary_literal_bound, clippy::cast_possible_wrap)]

use std::sync::Arc;

use msql_error::{MsqlError, Result};
use msql_lock::{AcquireOutcome, LockWait, NamedLockManager, ReleaseOutcome};
use msql_types::{FieldType, Value};

use crate::expr::{Expression, RowContext};
use crate::scalar::{Arity, BuiltinFunction, FunctionClass};
use crate::BuildContext;

// ── Helpers ───────────────────────────────────────────────────────────────

/// Evaluate the lock name argument; `None` for SQL NULL.
fn lock_name(arg: &Arc<dyn Expression>, row: &dyn RowContext) -> Result<Option<String>> {
    let value = arg.eval(row)?;
    Ok((!value.is_null()).then(|| value.to_text()))
}

/// Shared shape of every bound lock function.
#[derive(Debug)]
struct BoundLock {
    op: LockOp,
    args: Vec<Arc<dyn Expression>>,
    ret: FieldType,
    locks: Arc<NamedLockManager>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockOp {
    Get,
    Release,
    IsFree,
    IsUsed,
    ReleaseAll,
}

impl LockOp {
    const fn ret_type(self) -> FieldType {
        match self {
            Self::IsUsed => FieldType::unsigned_long_long(),
            _ => FieldType::long_long(),
        }
    }

    fn bind(self, ctx: &BuildContext, args: Vec<Arc<dyn Expression>>) -> Box<dyn BuiltinFunction> {
        Box::new(BoundLock {
            op: self,
            args,
            ret: self.ret_type(),
            locks: Arc::clone(&ctx.locks),
        })
    }
}

impl BoundLock {
    fn get_lock(&self, row: &dyn RowContext, name: &str) -> Result<Value> {
        let timeout = self.args[1].eval(row)?;
        let seconds = (!timeout.is_null()).then(|| timeout.to_f64());
        let wait = LockWait::from_seconds(seconds, self.locks.config());
        let acquired = match self.locks.get_lock(row.session_id(), name, wait)? {
            AcquireOutcome::Acquired => 1,
            AcquireOutcome::TimedOut => 0,
        };
        Ok(Value::Int(acquired))
    }

    fn release_lock(&self, row: &dyn RowContext, name: &str) -> Result<Value> {
        self.locks.validate_name(name)?;
        Ok(match self.locks.release_lock(row.session_id(), name) {
            ReleaseOutcome::Released => Value::Int(1),
            ReleaseOutcome::NotOwner => Value::Int(0),
            ReleaseOutcome::NotFound => Value::Null,
        })
    }
}

impl BuiltinFunction for BoundLock {
    fn eval(&self, row: &dyn RowContext) -> Result<Value> {
        if self.op == LockOp::ReleaseAll {
            let released = self.locks.release_all_held_by(row.session_id());
            return Ok(Value::Int(released as i64));
        }
        let Some(name) = lock_name(&self.args[0], row)? else {
            return Ok(Value::Null);
        };
        match self.op {
            LockOp::Get => self.get_lock(row, &name),
            LockOp::Release => self.release_lock(row, &name),
            LockOp::IsFree => {
                self.locks.validate_name(&name)?;
                Ok(Value::Int(i64::from(self.locks.is_free(&name))))
            }
            LockOp::IsUsed => {
                self.locks.validate_name(&name)?;
                Ok(self
                    .locks
                    .holder(&name)
                    .map_or(Value::Null, |s| Value::UInt(s.get())))
            }
            LockOp::ReleaseAll => Err(MsqlError::internal("RELEASE_ALL_LOCKS takes no lock name")),
        }
    }

    fn ret_type(&self) -> &FieldType {
        &self.ret
    }

    fn args(&self) -> &[Arc<dyn Expression>] {
        &self.args
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

// ── get_lock(NAME, TIMEOUT) ───────────────────────────────────────────────

pub struct GetLockFunc;

impl FunctionClass for GetLockFunc {
    fn name(&self) -> &str {
        "GET_LOCK"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(2)
    }

    fn get_function(
        &self,
        ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(LockOp::Get.bind(ctx, args))
    }
}

// ── release_lock(NAME) ────────────────────────────────────────────────────

pub struct ReleaseLockFunc;

impl FunctionClass for ReleaseLockFunc {
    fn name(&self) -> &str {
        "RELEASE_LOCK"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn get_function(
        &self,
        ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(LockOp::Release.bind(ctx, args))
    }
}

// ── is_free_lock(NAME) ────────────────────────────────────────────────────

pub struct IsFreeLockFunc;

impl FunctionClass for IsFreeLockFunc {
    fn name(&self) -> &str {
        "IS_FREE_LOCK"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn get_function(
        &self,
        ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(LockOp::IsFree.bind(ctx, args))
    }
}

// ── is_used_lock(NAME) ────────────────────────────────────────────────────

pub struct IsUsedLockFunc;

impl FunctionClass for IsUsedLockFunc {
    fn name(&self) -> &str {
        "IS_USED_LOCK"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn get_function(
        &self,
        ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(LockOp::IsUsed.bind(ctx, args))
    }
}

// ── release_all_locks() ───────────────────────────────────────────────────

pub struct ReleaseAllLocksFunc;

impl FunctionClass for ReleaseAllLocksFunc {
    fn name(&self) -> &str {
        "RELEASE_ALL_LOCKS"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    fn get_function(
        &self,
        ctx: &BuildContext,
        args: Vec<Arc<dyn Expression>>,
    ) -> Result<Box<dyn BuiltinFunction>> {
        self.verify_args(&args)?;
        Ok(LockOp::ReleaseAll.bind(ctx, args))
    }
}
