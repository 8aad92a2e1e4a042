//! Spinner feedback for long waits.

use std::future::Future;
use std::time::Duration;

use awsmgr_cloud::{WaitEvent, Waiter};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg} ({pos} checks, {elapsed})";

/// Message shown after an unconverged check.
fn event_message(label: &str, event: &WaitEvent<'_>) -> String {
    match event {
        WaitEvent::Pending { status, .. } => format!("{label} [{status}]"),
        WaitEvent::TransientError { .. } => format!("{label} x"),
    }
}

/// A spinner that ticks once per unconverged check.
///
/// Cleared when dropped, so early returns leave no stale line behind.
pub struct Spinner {
    bar: ProgressBar,
    label: String,
}

impl Spinner {
    pub fn start(label: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            bar.set_style(style);
        }
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            label: label.to_string(),
        }
    }

    /// A waiter reporting into this spinner.
    pub fn waiter(&self, cancel: &CancellationToken) -> Waiter {
        let sink = self.bar.clone();
        let label = self.label.clone();
        Waiter::new(cancel.clone()).with_progress(move |event| {
            sink.inc(1);
            sink.set_message(event_message(&label, &event));
        })
    }

    /// Handle for hiding the spinner around prompts.
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Run `work` with a [`Waiter`] whose checks drive a spinner.
///
/// Transient errors show as `x`. Cancelling `cancel` ends the wait.
pub async fn with_spinner<T, F, Fut>(cancel: &CancellationToken, label: &str, work: F) -> T
where
    F: FnOnce(Waiter) -> Fut,
    Fut: Future<Output = T>,
{
    let spinner = Spinner::start(label);
    work(spinner.waiter(cancel)).await
}

#[cfg(test)]
mod tests {
    use awsmgr_cloud::CloudError;

    use super::*;

    #[test]
    fn test_event_messages() {
        let pending = WaitEvent::Pending {
            attempt: 2,
            status: "pending".to_string(),
        };
        assert_eq!(event_message("Waiting", &pending), "Waiting [pending]");

        let error = CloudError::NotFound("i-0abc".to_string());
        let transient = WaitEvent::TransientError {
            attempt: 3,
            error: &error,
        };
        assert_eq!(event_message("Waiting", &transient), "Waiting x");
    }

    #[tokio::test]
    async fn test_with_spinner_hands_out_waiter() {
        let cancel = CancellationToken::new();
        let value = with_spinner(&cancel, "Working", |waiter| async move {
            assert!(!waiter.cancel_token().is_cancelled());
            7
        })
        .await;
        assert_eq!(value, 7);
    }
}
