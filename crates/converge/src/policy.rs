//! What a caller does with a wait that did not converge.

use crate::outcome::ConvergenceOutcome;

/// Risk class of the step that follows a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceContinue {
    /// Setup that may still work unconfirmed. After a timeout the operator
    /// may be offered to go ahead; the offer defaults to yes.
    BestEffort,
    /// A follow-up that deletes or releases something. It runs only after
    /// `Converged` and the operator is never asked to override a timeout.
    Destructive,
}

impl ForceContinue {
    /// Default answer of the "proceed anyway?" prompt.
    #[must_use]
    pub const fn prompt_default(self) -> bool {
        matches!(self, Self::BestEffort)
    }

    /// Whether the follow-up may run without asking anyone.
    #[must_use]
    pub fn permits<S, E>(self, outcome: &ConvergenceOutcome<S, E>) -> bool {
        outcome.is_converged()
    }

    /// Whether the operator may override this outcome.
    ///
    /// Only a timed-out best-effort wait qualifies; a cancelled wait stays
    /// cancelled.
    #[must_use]
    pub fn may_override<S, E>(self, outcome: &ConvergenceOutcome<S, E>) -> bool {
        self == Self::BestEffort && outcome.is_timed_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::AbortReason;

    fn timed_out() -> ConvergenceOutcome<&'static str, ()> {
        ConvergenceOutcome::TimedOut {
            last_snapshot: Some("pending"),
            last_error: None,
            attempts: 40,
        }
    }

    #[test]
    fn test_prompt_defaults() {
        assert!(ForceContinue::BestEffort.prompt_default());
        assert!(!ForceContinue::Destructive.prompt_default());
    }

    #[test]
    fn test_timeout_never_permits() {
        for class in [ForceContinue::BestEffort, ForceContinue::Destructive] {
            assert!(!class.permits(&timed_out()));
        }
        assert!(ForceContinue::BestEffort.may_override(&timed_out()));
        assert!(!ForceContinue::Destructive.may_override(&timed_out()));
    }

    #[test]
    fn test_cancelled_is_final() {
        let cancelled: ConvergenceOutcome<&str, ()> = ConvergenceOutcome::Aborted {
            reason: AbortReason::Cancelled,
            last_snapshot: None,
            attempts: 2,
        };
        assert!(!ForceContinue::BestEffort.may_override(&cancelled));
        assert!(!ForceContinue::BestEffort.permits(&cancelled));
    }

    #[test]
    fn test_converged_permits() {
        let converged: ConvergenceOutcome<&str, ()> = ConvergenceOutcome::Converged {
            snapshot: "running",
            attempts: 3,
        };
        assert!(ForceContinue::Destructive.permits(&converged));
    }
}
