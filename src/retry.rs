//! Poll-and-recover retry
//!
//! Bridges the gap between "action submitted" and "UI reflects the
//! result": the application processes uploads asynchronously, and the
//! page the browser is sitting on can go stale while that happens. Each
//! failed check therefore waits and forces a full page reload before the
//! next evaluation.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::session::Session;

/// How often and how patiently [`poll_until`] re-checks its predicate.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of predicate evaluations
    pub max_attempts: u32,

    /// Pause between a failed evaluation and the reload that follows it
    pub inter_attempt_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, inter_attempt_delay: Duration) -> Self {
        Self {
            max_attempts,
            inter_attempt_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            inter_attempt_delay: Duration::from_secs(5),
        }
    }
}

/// Repeatedly evaluate `predicate` until it holds, reloading the page
/// between attempts.
///
/// Every evaluation counts against `policy.max_attempts`, including the
/// first. A failed evaluation is followed by `policy.inter_attempt_delay`
/// of idle time and one `session.reload()`, so success on attempt `k`
/// costs `k - 1` delay+reload cycles while exhaustion costs exactly
/// `max_attempts` evaluations and `max_attempts` cycles. A policy with
/// `max_attempts == 0` fails without evaluating the predicate at all.
///
/// `condition` is a human-readable description of what is being awaited;
/// it ends up in the [`E2eError::PollTimeout`] message when attempts run
/// out. Errors from the predicate or the reload abort the loop
/// immediately.
pub async fn poll_until<S, F, Fut>(
    session: &S,
    condition: &str,
    policy: &RetryPolicy,
    mut predicate: F,
) -> E2eResult<()>
where
    S: Session + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    for attempt in 1..=policy.max_attempts {
        if predicate().await? {
            debug!(
                "condition {:?} met on attempt {}/{}",
                condition, attempt, policy.max_attempts
            );
            return Ok(());
        }

        debug!(
            "condition {:?} not met on attempt {}/{}, reloading in {:?}",
            condition, attempt, policy.max_attempts, policy.inter_attempt_delay
        );
        tokio::time::sleep(policy.inter_attempt_delay).await;
        session.reload().await?;
    }

    Err(E2eError::PollTimeout {
        condition: condition.to_string(),
        attempts: policy.max_attempts,
    })
}
