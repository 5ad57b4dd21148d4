//! Builtin scalar functions of the MySQL-compatible evaluator.
//!
//! This crate provides:
//! - the [`Expression`] / [`RowContext`] surface the executor evaluates
//!   against,
//! - the [`coerce`] engine that picks one comparison domain per operand set,
//! - the comparison builtins (`GREATEST`, `LEAST`, `INTERVAL`, `ISNULL`) and
//!   the user-level lock builtins (`GET_LOCK`, `RELEASE_LOCK`, ...),
//! - a [`FunctionRegistry`] resolving names case-insensitively and binding
//!   them to argument expressions.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use msql_error::{MsqlError, Result};
use msql_lock::NamedLockManager;

pub mod builtins;
pub mod coerce;
pub mod expr;
pub mod lock_builtins;
pub mod scalar;

pub use builtins::{GreatestFunc, IntervalFunc, IsNullFunc, LeastFunc, register_builtins};
pub use coerce::{CompareContext, CompareKey, Domain, choose_domain, compare};
pub use expr::{ColumnRef, Constant, Expression, Row, RowContext, constants};
pub use lock_builtins::{
    GetLockFunc, IsFreeLockFunc, IsUsedLockFunc, ReleaseAllLocksFunc, ReleaseLockFunc,
};
pub use scalar::{Arity, BuiltinFunction, FunctionClass, ScalarFunction};

/// Default boundary count up to which `INTERVAL` scans linearly.
pub const DEFAULT_INTERVAL_LINEAR_SCAN_MAX: usize = 8;

/// Evaluation tunables fixed at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// `INTERVAL` switches from a linear scan to binary search above this
    /// many boundaries.
    pub interval_linear_scan_max: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            interval_linear_scan_max: DEFAULT_INTERVAL_LINEAR_SCAN_MAX,
        }
    }
}

/// Services and settings handed to every [`FunctionClass::get_function`].
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub config: EvalConfig,
    /// Shared by every session of one engine instance.
    pub locks: Arc<NamedLockManager>,
}

impl BuildContext {
    pub fn new(config: EvalConfig, locks: Arc<NamedLockManager>) -> Self {
        Self { config, locks }
    }
}

/// Identifier of every builtin function class.
///
/// [`FuncId::ALL`] with [`FuncId::class`] is the one static name-to-class
/// table; [`register_builtins`] fills registries from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncId {
    Greatest,
    Least,
    Interval,
    IsNull,
    GetLock,
    ReleaseLock,
    IsFreeLock,
    IsUsedLock,
    ReleaseAllLocks,
}

impl FuncId {
    pub const ALL: [Self; 9] = [
        Self::Greatest,
        Self::Least,
        Self::Interval,
        Self::IsNull,
        Self::GetLock,
        Self::ReleaseLock,
        Self::IsFreeLock,
        Self::IsUsedLock,
        Self::ReleaseAllLocks,
    ];

    /// Canonical SQL name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Greatest => "GREATEST",
            Self::Least => "LEAST",
            Self::Interval => "INTERVAL",
            Self::IsNull => "ISNULL",
            Self::GetLock => "GET_LOCK",
            Self::ReleaseLock => "RELEASE_LOCK",
            Self::IsFreeLock => "IS_FREE_LOCK",
            Self::IsUsedLock => "IS_USED_LOCK",
            Self::ReleaseAllLocks => "RELEASE_ALL_LOCKS",
        }
    }

    /// Resolve a SQL name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let canon = canonical_name(name);
        Self::ALL.into_iter().find(|id| id.name() == canon)
    }

    /// The function class implementing this builtin.
    pub fn class(self) -> Arc<dyn FunctionClass> {
        match self {
            Self::Greatest => Arc::new(GreatestFunc),
            Self::Least => Arc::new(LeastFunc),
            Self::Interval => Arc::new(IntervalFunc),
            Self::IsNull => Arc::new(IsNullFunc),
            Self::GetLock => Arc::new(GetLockFunc),
            Self::ReleaseLock => Arc::new(ReleaseLockFunc),
            Self::IsFreeLock => Arc::new(IsFreeLockFunc),
            Self::IsUsedLock => Arc::new(IsUsedLockFunc),
            Self::ReleaseAllLocks => Arc::new(ReleaseAllLocksFunc),
        }
    }
}

/// Registry of function classes keyed by upper-case name.
///
/// Lookup never fails loudly: an unknown name is `None` from
/// [`FunctionRegistry::lookup`] and [`MsqlError::FunctionNotExists`] from
/// [`FunctionRegistry::bind`].
pub struct FunctionRegistry {
    classes: HashMap<String, Arc<dyn FunctionClass>>,
    ctx: BuildContext,
}

impl FunctionRegistry {
    /// Registry with every builtin registered.
    #[must_use]
    pub fn new(ctx: BuildContext) -> Self {
        let mut registry = Self::empty(ctx);
        register_builtins(&mut registry);
        registry
    }

    /// Registry with no functions.
    #[must_use]
    pub fn empty(ctx: BuildContext) -> Self {
        Self {
            classes: HashMap::new(),
            ctx,
        }
    }

    /// Register a function class under its canonical name.
    ///
    /// Returns the class previously registered under that name.
    pub fn register<F>(&mut self, class: F) -> Option<Arc<dyn FunctionClass>>
    where
        F: FunctionClass + 'static,
    {
        self.register_class(Arc::new(class))
    }

    /// Register an already shared function class.
    pub fn register_class(
        &mut self,
        class: Arc<dyn FunctionClass>,
    ) -> Option<Arc<dyn FunctionClass>> {
        let name = canonical_name(class.name());
        self.classes.insert(name, class)
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn FunctionClass>> {
        let canon = canonical_name(name);
        let found = self.classes.get(&canon).cloned();
        debug!(name = %canon, hit = found.is_some(), "registry lookup");
        found
    }

    /// Resolve `name` and bind it to `args`.
    pub fn bind(&self, name: &str, args: Vec<Arc<dyn Expression>>) -> Result<ScalarFunction> {
        let class = self
            .lookup(name)
            .ok_or_else(|| MsqlError::no_function(name.trim()))?;
        let arity = args.len();
        let func = class.get_function(&self.ctx, args)?;
        debug!(name = class.name(), arity, ret = %func.ret_type(), "function bound");
        Ok(ScalarFunction::new(class.name(), func))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(&canonical_name(name))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub const fn context(&self) -> &BuildContext {
        &self.ctx
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new(BuildContext::default())
    }
}

fn canonical_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}
