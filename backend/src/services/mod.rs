//! Business logic services for the restaurant inventory platform

use std::future::Future;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub mod catalog;
pub mod deduction;
pub mod ledger;

pub use catalog::CatalogService;
pub use deduction::{DeductionService, SaleOutcome};
pub use ledger::LedgerService;

/// Result of one optimistic attempt at a stock commit
pub(crate) enum Attempt<T> {
    Done(T),
    /// The store rejected the commit because this ingredient moved underneath us
    Conflict(Uuid),
}

/// Run `attempt` until it commits, at most `max_attempts` times.
///
/// Every call starts from a fresh read, so nothing computed by a losing attempt
/// survives into the next one.
pub(crate) async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    resource: Uuid,
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<Attempt<T>>>,
{
    let max_attempts = max_attempts.max(1);
    let mut contended = resource;

    for n in 1..=max_attempts {
        match attempt(n).await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Conflict(ingredient_id) => {
                tracing::debug!(
                    %resource,
                    %ingredient_id,
                    attempt = n,
                    max_attempts,
                    "Stock version conflict, retrying from a fresh read"
                );
                contended = ingredient_id;
            }
        }
    }

    tracing::warn!(%resource, %contended, max_attempts, "Giving up on contended stock commit");
    Err(AppError::ConcurrentWriteConflict {
        resource: contended,
        attempts: max_attempts,
    })
}
