use thiserror::Error;

/// Primary error type for the msql evaluation core.
///
/// Bind-time variants abort expression construction before any row is
/// evaluated; the rest abort evaluation of a single row and are handed to
/// the query executor. NULL propagation is never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MsqlError {
    // === Bind Errors ===
    /// Wrong number of arguments for a builtin function.
    #[error("Incorrect parameter count in the call to native function '{name}'")]
    InvalidArgCount { name: String, actual: usize },

    /// No builtin registered under this name.
    #[error("FUNCTION {name} does not exist")]
    FunctionNotExists { name: String },

    // === Evaluation Errors ===
    /// Operands cannot be placed in any comparison domain.
    #[error("Illegal mix of values for comparison: {detail}")]
    TypeCoercion { detail: String },

    /// Column index outside the row supplied by the executor.
    #[error("column index {index} out of range for row of width {width}")]
    ColumnOutOfRange { index: usize, width: usize },

    // === Named Lock Errors ===
    /// User-level lock name is empty or too long.
    #[error("Incorrect user-level lock name '{name}'.")]
    InvalidLockName { name: String },

    /// A session asked for a second named lock under the one-lock policy.
    ///
    /// Internal signal only: the lock manager resolves it by releasing the
    /// previously held lock.
    #[error("session {session} holds lock '{held}' while requesting '{requested}'")]
    LockPolicyViolation {
        session: u64,
        held: String,
        requested: String,
    },

    // === Internal Errors ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// MySQL server error codes for wire compatibility.
///
/// Numeric values match `mysqld_error.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// ER_UNKNOWN_ERROR.
    Unknown = 1105,
    /// ER_BAD_FIELD_ERROR.
    BadField = 1054,
    /// ER_CANT_AGGREGATE_2COLLATIONS.
    CantAggregateCollations = 1267,
    /// ER_SP_DOES_NOT_EXIST.
    FunctionNotExists = 1305,
    /// ER_WRONG_PARAMCOUNT_TO_NATIVE_FCT.
    WrongParamCount = 1582,
    /// ER_USER_LOCK_WRONG_NAME.
    UserLockWrongName = 3057,
}

impl MsqlError {
    /// Map this error to a MySQL error code.
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgCount { .. } => ErrorCode::WrongParamCount,
            Self::FunctionNotExists { .. } => ErrorCode::FunctionNotExists,
            Self::TypeCoercion { .. } => ErrorCode::CantAggregateCollations,
            Self::ColumnOutOfRange { .. } => ErrorCode::BadField,
            Self::InvalidLockName { .. } => ErrorCode::UserLockWrongName,
            Self::LockPolicyViolation { .. } | Self::Internal(_) => ErrorCode::Unknown,
        }
    }

    /// Whether the error is raised while binding, before any row exists.
    pub const fn is_bind_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgCount { .. } | Self::FunctionNotExists { .. }
        )
    }

    /// Whether the error must stay inside the evaluator.
    pub const fn is_internal_signal(&self) -> bool {
        matches!(self, Self::LockPolicyViolation { .. })
    }

    /// Create an arity error.
    pub fn arg_count(name: impl Into<String>, actual: usize) -> Self {
        Self::InvalidArgCount {
            name: name.into(),
            actual,
        }
    }

    /// Create an unknown-function error.
    pub fn no_function(name: impl Into<String>) -> Self {
        Self::FunctionNotExists { name: name.into() }
    }

    /// Create a coercion error.
    pub fn coercion(detail: impl Into<String>) -> Self {
        Self::TypeCoercion {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `MsqlError`.
pub type Result<T> = std::result::Result<T, MsqlError>;
