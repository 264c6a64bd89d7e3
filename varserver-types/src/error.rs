//! Error taxonomy for variable operations.
//!
//! `ALREADY` and `IN_PROGRESS` are deliberately not members of [`VarError`]:
//! `ALREADY` is a success-shaped outcome ([`WriteOutcome::Already`]) and
//! `IN_PROGRESS` never crosses the handler boundary, see the dispatcher's
//! `HandlerOutcome`.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarError {
    #[error("variable, transaction or search context not found")]
    NotFound,

    #[error("access denied")]
    AccessDenied,

    #[error("operation not supported for this variable")]
    NotSupported,

    #[error("value out of range for the destination type")]
    Range,

    #[error("value too large for the declared capacity")]
    TooBig,

    #[error("out of memory")]
    NoMem,

    #[error("variable table is full")]
    NoSpace,

    #[error("print output was redirected to a PRINT handler")]
    Pipe,

    #[error("the subscribing process is no longer alive")]
    NoSuchProcess,
}

pub type VarResult<T> = Result<T, VarError>;

/// Outcome of a successful write, distinguishing a no-op repeat write from one
/// that actually changed stored state and should fan out notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Already,
}
