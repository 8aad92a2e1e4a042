//! Wait descriptions: what to poll for, how often, and for how long.

use std::fmt;
use std::time::Duration;

use crate::error::ConvergeError;

/// Region opt-in: minutes-long, polled slowly.
pub const REGION_OPT_IN_INTERVAL: Duration = Duration::from_secs(10);
/// Region opt-in: ~10 minutes at the default interval.
pub const REGION_OPT_IN_ATTEMPTS: u32 = 60;

/// Instance state transitions (pending -> running, stopping -> stopped, ...).
pub const INSTANCE_STATE_INTERVAL: Duration = Duration::from_secs(3);
/// Instance state transitions: two minutes at the default interval.
pub const INSTANCE_STATE_ATTEMPTS: u32 = 40;

/// VPC / subnet IPv6 CIDR association.
pub const CIDR_ASSOCIATION_INTERVAL: Duration = Duration::from_secs(3);
/// VPC / subnet IPv6 CIDR association: thirty seconds.
pub const CIDR_ASSOCIATION_ATTEMPTS: u32 = 10;

/// Static / Elastic IP attach and detach.
pub const STATIC_IP_INTERVAL: Duration = Duration::from_secs(2);
/// Static / Elastic IP attach and detach: thirty seconds.
pub const STATIC_IP_ATTEMPTS: u32 = 15;

/// Managed database creation (RDS is slow).
pub const DATABASE_INTERVAL: Duration = Duration::from_secs(30);
/// Managed database creation: fifteen minutes.
pub const DATABASE_ATTEMPTS: u32 = 30;

/// Caller-defined waits.
pub const OTHER_INTERVAL: Duration = Duration::from_secs(5);
/// Caller-defined waits.
pub const OTHER_ATTEMPTS: u32 = 20;

/// The kind of remote resource being waited on.
///
/// The kind selects default interval and bound, and labels log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// An opt-in region moving to `opted-in`.
    RegionOptIn,
    /// A compute instance reaching a target state.
    InstanceState,
    /// An IPv6 CIDR block reaching `associated`.
    CidrAssociation,
    /// A static / elastic IP attachment becoming consistent.
    StaticIpConsistency,
    /// A managed database reaching `available`.
    DatabaseAvailability,
    /// Anything else.
    Other,
}

impl ResourceKind {
    /// Default sleep between two checks.
    #[must_use]
    pub const fn default_interval(self) -> Duration {
        match self {
            Self::RegionOptIn => REGION_OPT_IN_INTERVAL,
            Self::InstanceState => INSTANCE_STATE_INTERVAL,
            Self::CidrAssociation => CIDR_ASSOCIATION_INTERVAL,
            Self::StaticIpConsistency => STATIC_IP_INTERVAL,
            Self::DatabaseAvailability => DATABASE_INTERVAL,
            Self::Other => OTHER_INTERVAL,
        }
    }

    /// Default upper bound on the wait.
    #[must_use]
    pub const fn default_bound(self) -> Bound {
        match self {
            Self::RegionOptIn => Bound::Attempts(REGION_OPT_IN_ATTEMPTS),
            Self::InstanceState => Bound::Attempts(INSTANCE_STATE_ATTEMPTS),
            Self::CidrAssociation => Bound::Attempts(CIDR_ASSOCIATION_ATTEMPTS),
            Self::StaticIpConsistency => Bound::Attempts(STATIC_IP_ATTEMPTS),
            Self::DatabaseAvailability => Bound::Attempts(DATABASE_ATTEMPTS),
            Self::Other => Bound::Attempts(OTHER_ATTEMPTS),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegionOptIn => write!(f, "region_opt_in"),
            Self::InstanceState => write!(f, "instance_state"),
            Self::CidrAssociation => write!(f, "cidr_association"),
            Self::StaticIpConsistency => write!(f, "static_ip"),
            Self::DatabaseAvailability => write!(f, "database"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Hard upper bound on a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// At most this many checks.
    Attempts(u32),
    /// No check is started after this much time has passed since the wait began.
    Within(Duration),
}

impl Bound {
    /// Maximum number of checks, when the bound is attempt-based.
    #[must_use]
    pub const fn max_attempts(self) -> Option<u32> {
        match self {
            Self::Attempts(n) => Some(n),
            Self::Within(_) => None,
        }
    }

    fn validate(self, target: &str, interval: Duration) -> Result<(), ConvergeError> {
        match self {
            Self::Attempts(0) => Err(ConvergeError::InvalidBound {
                target: target.to_string(),
                reason: "max attempts must be at least 1".to_string(),
            }),
            Self::Within(d) if d.is_zero() => Err(ConvergeError::InvalidBound {
                target: target.to_string(),
                reason: "deadline must be greater than zero".to_string(),
            }),
            Self::Within(d) if d < interval => Err(ConvergeError::InvalidBound {
                target: target.to_string(),
                reason: format!(
                    "deadline shorter than interval ({}ms < {}ms)",
                    d.as_millis(),
                    interval.as_millis()
                ),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempts(n) => write!(f, "{n} attempts"),
            Self::Within(d) => write!(f, "{}s", d.as_secs()),
        }
    }
}

/// What to do when a single check fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Count the failure as a no-progress attempt and keep polling.
    #[default]
    Tolerate,
    /// Stop immediately and report the error as [`AbortReason::Failed`](crate::AbortReason::Failed).
    Abort,
}

/// A progress event emitted after every check that did not converge.
#[derive(Debug)]
pub enum Tick<'a, S, E> {
    /// The check succeeded but the predicate is not yet satisfied.
    Pending { attempt: u32, snapshot: &'a S },
    /// The check failed and the failure was tolerated.
    TransientError { attempt: u32, error: &'a E },
}

type Predicate<S> = Box<dyn Fn(&S) -> bool + Send + Sync>;
type Observer<S, E> = Box<dyn for<'a> Fn(Tick<'a, S, E>) + Send + Sync>;

/// Description of a single wait.
///
/// Built right before the wait and consumed by [`run`](Self::run).
pub struct ConvergenceRequest<S, E> {
    kind: ResourceKind,
    target: String,
    predicate: Predicate<S>,
    interval: Duration,
    bound: Bound,
    error_policy: ErrorPolicy,
    observer: Option<Observer<S, E>>,
}

impl<S, E> ConvergenceRequest<S, E> {
    /// Create a request with the defaults of `kind`.
    ///
    /// `target` names what is being waited for; it appears in logs and in
    /// timeout messages shown to the operator.
    pub fn new(
        kind: ResourceKind,
        target: impl Into<String>,
        predicate: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            predicate: Box::new(predicate),
            interval: kind.default_interval(),
            bound: kind.default_bound(),
            error_policy: ErrorPolicy::default(),
            observer: None,
        }
    }

    /// Override the sleep between checks.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the bound.
    #[must_use]
    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    /// Override the transient-error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Receive a [`Tick`] after every check that did not converge.
    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(Tick<'_, S, E>) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn bound(&self) -> Bound {
        self.bound
    }

    #[must_use]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Check the request before any remote call is made.
    ///
    /// # Errors
    /// Returns [`ConvergeError`] when the bound allows no attempt, the
    /// interval is zero, or a deadline expires before the first check.
    pub fn validate(&self) -> Result<(), ConvergeError> {
        if self.interval.is_zero() {
            return Err(ConvergeError::InvalidInterval {
                target: self.target.clone(),
            });
        }
        self.bound.validate(&self.target, self.interval)
    }

    pub(crate) fn is_satisfied(&self, snapshot: &S) -> bool {
        (self.predicate)(snapshot)
    }

    pub(crate) fn notify(&self, tick: Tick<'_, S, E>) {
        if let Some(observer) = &self.observer {
            observer(tick);
        }
    }
}

impl<S, E> fmt::Debug for ConvergenceRequest<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvergenceRequest")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("interval", &self.interval)
            .field("bound", &self.bound)
            .field("error_policy", &self.error_policy)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_defaults() {
        assert_eq!(
            ResourceKind::RegionOptIn.default_bound(),
            Bound::Attempts(REGION_OPT_IN_ATTEMPTS)
        );
        assert_eq!(
            ResourceKind::CidrAssociation.default_interval(),
            Duration::from_secs(3)
        );
        assert_eq!(
            ResourceKind::DatabaseAvailability.default_interval(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_zero_attempts_is_invalid() {
        let req: ConvergenceRequest<u32, String> =
            ConvergenceRequest::new(ResourceKind::Other, "thing", |_| true)
                .with_bound(Bound::Attempts(0));
        assert!(matches!(
            req.validate(),
            Err(ConvergeError::InvalidBound { .. })
        ));
    }

    #[test]
    fn test_zero_deadline_is_invalid() {
        let req: ConvergenceRequest<u32, String> =
            ConvergenceRequest::new(ResourceKind::Other, "thing", |_| true)
                .with_bound(Bound::Within(Duration::ZERO));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_deadline_shorter_than_interval_is_invalid() {
        let req: ConvergenceRequest<u32, String> =
            ConvergenceRequest::new(ResourceKind::Other, "thing", |_| true)
                .with_interval(Duration::from_secs(10))
                .with_bound(Bound::Within(Duration::from_secs(5)));
        assert!(matches!(
            req.validate(),
            Err(ConvergeError::InvalidBound { reason, .. }) if reason.starts_with("deadline shorter than interval")
        ));

        let exact = ConvergenceRequest::<u32, String>::new(ResourceKind::Other, "thing", |_| true)
            .with_interval(Duration::from_secs(10))
            .with_bound(Bound::Within(Duration::from_secs(10)));
        assert!(exact.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let req: ConvergenceRequest<u32, String> =
            ConvergenceRequest::new(ResourceKind::Other, "thing", |_| true)
                .with_interval(Duration::ZERO);
        assert_eq!(
            req.validate(),
            Err(ConvergeError::InvalidInterval {
                target: "thing".to_string()
            })
        );
    }

    #[test]
    fn test_bound_display() {
        assert_eq!(Bound::Attempts(5).to_string(), "5 attempts");
        assert_eq!(Bound::Within(Duration::from_secs(90)).to_string(), "90s");
    }
}
