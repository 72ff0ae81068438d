//! Bounded retry for versioned pool writes.
//!
//! Joins and closes both run as attempts: load, decide, save. A save that
//! loses the version race re-runs the whole attempt from a fresh load;
//! anything else ends the loop.

use std::future::Future;

use tracing::{debug, warn};

use crate::domain::ports::PoolRepositoryError;
use crate::domain::{JoinCoordinatorConfig, PoolError, PoolId};

/// Attempt-local outcomes that steer [`retry_on_conflict`].
pub(crate) enum AttemptError {
    Conflict,
    Rejected(PoolError),
}

impl From<PoolError> for AttemptError {
    fn from(error: PoolError) -> Self {
        Self::Rejected(error)
    }
}

/// Map a repository failure to a retryable conflict or a final rejection.
pub(crate) fn classify_repository_error(
    pool_id: PoolId,
    error: PoolRepositoryError,
) -> AttemptError {
    match error {
        PoolRepositoryError::Conflict { .. } => AttemptError::Conflict,
        other => AttemptError::Rejected(PoolError::from_repository(pool_id, other)),
    }
}

/// Run `attempt` until it succeeds, is rejected, or the policy's attempts
/// are spent on conflicts.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    pool_id: PoolId,
    operation: &'static str,
    policy: JoinCoordinatorConfig,
    mut attempt: F,
) -> Result<T, PoolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts();
    for attempt_number in 1..=max_attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Conflict) => {
                debug!(
                    pool_id = %pool_id,
                    operation,
                    attempt = attempt_number,
                    "lost a concurrent write; retrying"
                );
            }
            Err(AttemptError::Rejected(error)) => return Err(error),
        }
    }

    warn!(
        pool_id = %pool_id,
        operation,
        attempts = max_attempts,
        "gave up after repeated conflicts"
    );
    Err(PoolError::Conflict {
        pool_id,
        attempts: max_attempts,
    })
}
