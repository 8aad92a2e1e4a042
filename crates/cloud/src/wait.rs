//! Poller-backed waits with cancellation and progress reporting.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use converge::{ConvergenceOutcome, ConvergenceRequest, Tick};
use tokio_util::sync::CancellationToken;

use crate::providers::CloudError;

/// Progress of a running wait, one event per unconverged check.
#[derive(Debug)]
pub enum WaitEvent<'a> {
    /// The resource answered but is not there yet.
    Pending { attempt: u32, status: String },
    /// The check failed and will be retried.
    TransientError { attempt: u32, error: &'a CloudError },
}

type ProgressFn = Arc<dyn Fn(WaitEvent<'_>) + Send + Sync>;

/// Shared settings for every wait issued by a flow.
#[derive(Clone, Default)]
pub struct Waiter {
    cancel: CancellationToken,
    progress: Option<ProgressFn>,
    interval: Option<Duration>,
}

impl Waiter {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            progress: None,
            interval: None,
        }
    }

    /// Report every unconverged check to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(WaitEvent<'_>) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Poll at `interval` instead of each kind's default.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail with [`CloudError::Cancelled`] once the operator has cancelled.
    ///
    /// Multi-step flows call this before each mutating call so a cancel
    /// stops the flow instead of skipping to its next step.
    ///
    /// # Errors
    /// Returns [`CloudError::Cancelled`] naming `target`.
    pub fn ensure_active(&self, target: &str) -> Result<(), CloudError> {
        if self.cancel.is_cancelled() {
            Err(CloudError::Cancelled(target.to_string()))
        } else {
            Ok(())
        }
    }

    /// Run `request`, describing each pending snapshot with `describe`.
    ///
    /// # Errors
    /// Returns [`CloudError::InvalidWait`] if the request is invalid. Every
    /// other result, including timeouts, is reported in the outcome.
    pub async fn run<S, F, Fut>(
        &self,
        request: ConvergenceRequest<S, CloudError>,
        describe: fn(&S) -> String,
        check: F,
    ) -> Result<ConvergenceOutcome<S, CloudError>, CloudError>
    where
        S: 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, CloudError>>,
    {
        let mut request = request;
        if let Some(interval) = self.interval {
            request = request.with_interval(interval);
        }
        if let Some(progress) = self.progress.clone() {
            request = request.with_observer(move |tick: Tick<'_, S, CloudError>| match tick {
                Tick::Pending { attempt, snapshot } => progress(WaitEvent::Pending {
                    attempt,
                    status: describe(snapshot),
                }),
                Tick::TransientError { attempt, error } => {
                    progress(WaitEvent::TransientError { attempt, error });
                }
            });
        }
        Ok(request.run(&self.cancel, check).await?)
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .field("interval", &self.interval)
            .finish()
    }
}
