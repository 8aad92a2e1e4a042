//! Compute provider trait and common types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use converge::{ConvergeError, ConvergenceOutcome, ConvergenceRequest, ResourceKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wait::Waiter;

/// Errors that can occur during cloud operations.
#[derive(Error, Debug)]
pub enum CloudError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A wait ended without the resource converging.
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// A wait was cancelled by the operator.
    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    /// Invalid configuration or input.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// XML response could not be decoded.
    #[error("XML decode error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// Authentication error (invalid or unauthorized credentials).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Request signing failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// A deployment archive could not be built.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A wait was described with an invalid bound or interval.
    #[error(transparent)]
    InvalidWait(#[from] ConvergeError),
}

/// Error codes AWS uses for throttling and temporary unavailability.
const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "RequestThrottled",
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "InternalError",
    "InternalFailure",
    "Unavailable",
];

impl CloudError {
    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, code, .. } => {
                *status >= 500 || TRANSIENT_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }

    /// The AWS error code, when the failure came from the API.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Fail with [`CloudError::Cancelled`] when the operator cancelled the wait.
    ///
    /// Timeouts and check failures pass through for the caller to judge.
    ///
    /// # Errors
    /// Returns [`CloudError::Cancelled`] naming `target`.
    pub fn stop_if_cancelled<S>(
        outcome: &ConvergenceOutcome<S, CloudError>,
        target: &str,
    ) -> Result<(), CloudError> {
        if outcome.is_cancelled() {
            Err(Self::Cancelled(target.to_string()))
        } else {
            Ok(())
        }
    }

    /// Turn a finished wait into a result: only `Converged` is success.
    ///
    /// # Errors
    /// Returns [`CloudError::Timeout`] or [`CloudError::Cancelled`] naming
    /// `target`, or the check error that aborted the wait.
    pub fn from_outcome<S>(
        outcome: ConvergenceOutcome<S, CloudError>,
        target: &str,
    ) -> Result<S, CloudError> {
        match outcome {
            ConvergenceOutcome::Converged { snapshot, .. } => Ok(snapshot),
            ConvergenceOutcome::TimedOut { .. } => Err(Self::Timeout(target.to_string())),
            ConvergenceOutcome::Aborted {
                reason: converge::AbortReason::Cancelled,
                ..
            } => Err(Self::Cancelled(target.to_string())),
            ConvergenceOutcome::Aborted {
                reason: converge::AbortReason::Failed(e),
                ..
            } => Err(e),
        }
    }
}

/// Instance (VM) status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Instance is being created or started.
    Pending,
    /// Instance is running.
    Running,
    /// Instance is stopping.
    Stopping,
    /// Instance is stopped.
    Stopped,
    /// Instance is being terminated.
    Terminating,
    /// Instance is terminated.
    Terminated,
    /// Unknown status.
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    /// Map an EC2 or Lightsail state name.
    #[must_use]
    pub fn from_state_name(name: &str) -> Self {
        match name {
            "pending" | "starting" | "rebooting" => Self::Pending,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "shutting-down" => Self::Terminating,
            "terminated" => Self::Terminated,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
            Self::Terminating => write!(f, "terminating"),
            Self::Terminated => write!(f, "terminated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A virtual machine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Unique instance identifier (EC2 instance id, Lightsail instance name).
    pub id: String,
    /// Instance name.
    pub name: String,
    /// Current status.
    pub status: InstanceStatus,
    /// Raw state name reported by the API.
    pub state_name: String,
    /// Instance type / bundle.
    pub instance_type: String,
    /// Region.
    pub region: String,
    /// Availability zone.
    pub zone: Option<String>,
    /// Public IPv4 address.
    pub public_ip: Option<String>,
    /// Private IPv4 address.
    pub private_ip: Option<String>,
    /// First IPv6 address.
    pub ipv6: Option<String>,
    /// OS image used.
    pub image: String,
    /// When the instance was created.
    pub created_at: Option<DateTime<Utc>>,
}

/// Operations shared by EC2 and Lightsail.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Region this provider talks to.
    fn region(&self) -> &str;

    /// List all instances that have not been terminated.
    async fn list_instances(&self) -> Result<Vec<Instance>, CloudError>;

    /// Get instance by ID.
    async fn get_instance(&self, id: &str) -> Result<Instance, CloudError>;

    /// Start an instance.
    async fn start_instance(&self, id: &str) -> Result<(), CloudError>;

    /// Stop an instance.
    async fn stop_instance(&self, id: &str) -> Result<(), CloudError>;

    /// Reboot an instance.
    async fn reboot_instance(&self, id: &str) -> Result<(), CloudError>;

    /// Terminate (EC2) or delete (Lightsail) an instance.
    async fn terminate_instance(&self, id: &str) -> Result<(), CloudError>;

    /// Poll the instance until it reports `target`.
    async fn wait_instance_state(
        &self,
        id: &str,
        target: InstanceStatus,
        waiter: &Waiter,
    ) -> Result<ConvergenceOutcome<Instance, CloudError>, CloudError> {
        let request = ConvergenceRequest::new(
            ResourceKind::InstanceState,
            format!("instance {id} to be {target}"),
            move |instance: &Instance| instance.status == target,
        );
        waiter
            .run(request, |i: &Instance| i.state_name.clone(), || self.get_instance(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_name_mapping() {
        assert_eq!(InstanceStatus::from_state_name("running"), InstanceStatus::Running);
        assert_eq!(InstanceStatus::from_state_name("starting"), InstanceStatus::Pending);
        assert_eq!(
            InstanceStatus::from_state_name("shutting-down"),
            InstanceStatus::Terminating
        );
        assert_eq!(InstanceStatus::from_state_name("weird"), InstanceStatus::Unknown);
    }

    #[test]
    fn test_throttling_is_transient() {
        let throttled = CloudError::Api {
            status: 400,
            code: "RequestLimitExceeded".to_string(),
            message: "slow down".to_string(),
        };
        assert!(throttled.is_transient());

        let denied = CloudError::Api {
            status: 400,
            code: "ValidationException".to_string(),
            message: "bad".to_string(),
        };
        assert!(!denied.is_transient());
        assert_eq!(denied.code(), Some("ValidationException"));
    }

    #[test]
    fn test_timed_out_outcome_is_an_error() {
        let outcome: ConvergenceOutcome<u8, CloudError> = ConvergenceOutcome::TimedOut {
            last_snapshot: Some(1),
            last_error: None,
            attempts: 3,
        };
        let err = CloudError::from_outcome(outcome, "vpc-1 IPv6 block").unwrap_err();
        assert_eq!(err.to_string(), "Timed out waiting for vpc-1 IPv6 block");
    }
}
