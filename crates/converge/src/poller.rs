//! The polling loop.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ConvergeError;
use crate::outcome::{AbortReason, ConvergenceOutcome};
use crate::request::{Bound, ConvergenceRequest, ErrorPolicy, ResourceKind, Tick};

/// Poll `check` until `predicate` holds, `bound` is exhausted, or `cancel` fires.
///
/// Every check is preceded by a sleep of `interval`, including the first
/// one. Check errors are tolerated: they count as an attempt without
/// progress.
///
/// # Errors
/// Returns [`ConvergeError`] without calling `check` when the bound or the
/// interval is invalid.
pub async fn await_convergence<S, E, F, Fut, P>(
    check: F,
    predicate: P,
    interval: Duration,
    bound: Bound,
    cancel: &CancellationToken,
) -> Result<ConvergenceOutcome<S, E>, ConvergeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, E>>,
    P: Fn(&S) -> bool + Send + Sync + 'static,
    E: Display,
{
    ConvergenceRequest::new(ResourceKind::Other, "remote state", predicate)
        .with_interval(interval)
        .with_bound(bound)
        .run(cancel, check)
        .await
}

impl<S, E: Display> ConvergenceRequest<S, E> {
    /// Run the wait described by this request.
    ///
    /// # Errors
    /// Returns [`ConvergeError`] without calling `check` when the request
    /// fails [`validate`](Self::validate).
    pub async fn run<F, Fut>(
        self,
        cancel: &CancellationToken,
        mut check: F,
    ) -> Result<ConvergenceOutcome<S, E>, ConvergeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, E>>,
    {
        self.validate()?;

        let interval = self.interval();
        let bound = self.bound();
        let deadline = match bound {
            Bound::Within(d) => Some(Instant::now() + d),
            Bound::Attempts(_) => None,
        };

        info!(
            kind = %self.kind(),
            target = %self.target(),
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            bound = %bound,
            "Waiting for convergence"
        );

        let mut attempts: u32 = 0;
        let mut last_snapshot: Option<S> = None;
        let mut last_error: Option<E> = None;

        loop {
            if bound.max_attempts().is_some_and(|max| attempts >= max) {
                break;
            }
            if deadline.is_some_and(|d| Instant::now() + interval > d) {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Ok(self.cancelled(attempts, last_snapshot));
                }
                () = tokio::time::sleep(interval) => {}
            }

            attempts += 1;
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Ok(self.cancelled(attempts, last_snapshot));
                }
                result = check() => result,
            };

            match result {
                Ok(snapshot) => {
                    if self.is_satisfied(&snapshot) {
                        info!(
                            kind = %self.kind(),
                            target = %self.target(),
                            attempts,
                            "Converged"
                        );
                        return Ok(ConvergenceOutcome::Converged { snapshot, attempts });
                    }
                    debug!(
                        kind = %self.kind(),
                        target = %self.target(),
                        attempt = attempts,
                        "Not converged yet"
                    );
                    self.notify(Tick::Pending {
                        attempt: attempts,
                        snapshot: &snapshot,
                    });
                    last_snapshot = Some(snapshot);
                }
                Err(error) => match self.error_policy() {
                    ErrorPolicy::Tolerate => {
                        warn!(
                            kind = %self.kind(),
                            target = %self.target(),
                            attempt = attempts,
                            error = %error,
                            "Transient failure while polling"
                        );
                        self.notify(Tick::TransientError {
                            attempt: attempts,
                            error: &error,
                        });
                        last_error = Some(error);
                    }
                    ErrorPolicy::Abort => {
                        warn!(
                            kind = %self.kind(),
                            target = %self.target(),
                            attempt = attempts,
                            error = %error,
                            "Aborting wait on check failure"
                        );
                        return Ok(ConvergenceOutcome::Aborted {
                            reason: AbortReason::Failed(error),
                            last_snapshot,
                            attempts,
                        });
                    }
                },
            }
        }

        warn!(
            kind = %self.kind(),
            target = %self.target(),
            attempts,
            bound = %bound,
            "Timed out waiting for convergence"
        );
        Ok(ConvergenceOutcome::TimedOut {
            last_snapshot,
            last_error,
            attempts,
        })
    }

    fn cancelled(&self, attempts: u32, last_snapshot: Option<S>) -> ConvergenceOutcome<S, E> {
        info!(
            kind = %self.kind(),
            target = %self.target(),
            attempts,
            "Wait cancelled"
        );
        ConvergenceOutcome::Aborted {
            reason: AbortReason::Cancelled,
            last_snapshot,
            attempts,
        }
    }
}
