//! Result of a convergence wait.

use std::fmt;

/// Why a wait stopped before its bound was exhausted.
#[derive(Debug)]
pub enum AbortReason<E> {
    /// The wait was cancelled from outside (e.g. Ctrl-C).
    Cancelled,
    /// A check failed under [`ErrorPolicy::Abort`](crate::ErrorPolicy::Abort).
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for AbortReason<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Outcome of a convergence wait.
///
/// `TimedOut` and `Aborted` are ordinary values, not errors: the caller
/// decides whether to proceed, and none of the helpers below ever turn them
/// into a converged snapshot.
#[must_use = "a timed-out or aborted wait must be handled explicitly"]
#[derive(Debug)]
pub enum ConvergenceOutcome<S, E> {
    /// The predicate held for `snapshot`, observed on check number `attempts`.
    Converged { snapshot: S, attempts: u32 },
    /// The bound was exhausted without the predicate ever holding.
    TimedOut {
        last_snapshot: Option<S>,
        last_error: Option<E>,
        attempts: u32,
    },
    /// The wait stopped early.
    Aborted {
        reason: AbortReason<E>,
        last_snapshot: Option<S>,
        attempts: u32,
    },
}

impl<S, E> ConvergenceOutcome<S, E> {
    #[must_use]
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Aborted {
                reason: AbortReason::Cancelled,
                ..
            }
        )
    }

    /// Number of checks issued.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Converged { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    /// The most recent successful snapshot, for diagnostics.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<&S> {
        match self {
            Self::Converged { snapshot, .. } => Some(snapshot),
            Self::TimedOut { last_snapshot, .. } | Self::Aborted { last_snapshot, .. } => {
                last_snapshot.as_ref()
            }
        }
    }

    /// The converged snapshot, or `None` for every other outcome.
    #[must_use]
    pub fn into_converged(self) -> Option<S> {
        match self {
            Self::Converged { snapshot, .. } => Some(snapshot),
            Self::TimedOut { .. } | Self::Aborted { .. } => None,
        }
    }

    /// Short label for logs and progress output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Converged { .. } => "converged",
            Self::TimedOut { .. } => "timed out",
            Self::Aborted {
                reason: AbortReason::Cancelled,
                ..
            } => "cancelled",
            Self::Aborted { .. } => "aborted",
        }
    }
}
