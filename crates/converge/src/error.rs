//! Errors raised before a wait starts.

use thiserror::Error;

/// Errors that prevent a convergence wait from starting.
///
/// Anything that happens *during* a wait is reported through
/// [`ConvergenceOutcome`](crate::ConvergenceOutcome) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvergeError {
    /// The bound allows no attempts (zero attempts, or a deadline shorter
    /// than one interval).
    #[error("invalid bound for '{target}': {reason}")]
    InvalidBound { target: String, reason: String },

    /// The polling interval is zero, which would spin against the remote API.
    #[error("invalid interval for '{target}': interval must be greater than zero")]
    InvalidInterval { target: String },
}
