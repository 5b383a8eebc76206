//! Error type shared by the repositories, the data context and the unit of work.

use sea_orm::DbErr;
use thiserror::Error;

/// Errors surfaced by repository, context and unit-of-work operations.
///
/// Storage failures are carried through untouched in [`Error::Database`]; every other
/// variant is raised by this crate itself.
#[derive(Debug, Error)]
pub enum Error {
    /// A programming-contract violation, such as `then_by` before `order_by` or a
    /// second `begin_transaction` while one is open.
    #[error("Invalid operation: {0}")]
    InvalidState(String),

    /// A lookup that must match at most one entity matched several.
    #[error("Sequence contains more than one matching {entity} entity ({matches} matches)")]
    NotUnique { entity: String, matches: usize },

    /// A required setup argument was missing or unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The cancellation token fired before the operation completed.
    #[error("Operation was cancelled")]
    Cancelled,

    /// The unit of work has already been disposed.
    #[error("Cannot access a disposed unit of work")]
    Disposed,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// The runtime behind the blocking entry points could not be started.
    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState(message.into())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// True for errors raised by this crate for contract violations, as opposed to
    /// failures reported by the storage engine.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
