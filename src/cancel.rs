//! Cooperative cancellation for repository and unit-of-work operations.
//!
//! Every async operation of this crate can be raced against a
//! [`CancellationToken`]:
//!
//! ```rust,ignore
//! let token = CancellationToken::new();
//! let saved = uow.save_changes().with_cancellation(&token).await;
//! ```
//!
//! A cancelled operation returns [`Error::Cancelled`]. The underlying future is
//! dropped at its current await point; a `save_changes` cancelled mid-flush drops
//! its implicit transaction, which rolls it back.

use std::future::Future;

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Extension for futures yielding this crate's [`Result`].
pub trait Cancellable<T>: Future<Output = Result<T>> + Sized {
    /// Resolve to [`Error::Cancelled`] as soon as `token` fires.
    fn with_cancellation(self, token: &CancellationToken) -> impl Future<Output = Result<T>>;
}

impl<F, T> Cancellable<T> for F
where
    F: Future<Output = Result<T>>,
{
    fn with_cancellation(self, token: &CancellationToken) -> impl Future<Output = Result<T>> {
        run_cancellable(self, token)
    }
}

/// Run `operation` unless `token` fires first. A token cancelled up front wins
/// without polling the operation.
pub async fn run_cancellable<F, T>(operation: F, token: &CancellationToken) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;

        () = token.cancelled() => {
            debug!("Operation cancelled");
            Err(Error::Cancelled)
        }
        result = operation => result,
    }
}
