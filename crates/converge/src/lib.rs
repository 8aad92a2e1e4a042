//! Convergence polling for eventually-consistent remote resources.
//!
//! Cloud APIs acknowledge a request long before the resource is usable:
//! a region opt-in takes minutes, an instance spends seconds in `pending`,
//! an IPv6 CIDR association sits in `associating`. This crate provides one
//! primitive for all of those waits:
//!
//! - [`ConvergenceRequest`] describes *what* to wait for (predicate,
//!   interval, bound, transient-error policy).
//! - [`await_convergence`] / [`ConvergenceRequest::run`] poll a caller
//!   supplied check until the predicate holds, the bound is exhausted, or
//!   the wait is cancelled.
//! - [`ConvergenceOutcome`] reports the result as a value. A timeout is not
//!   an error and is never reported as success.
//!
//! [`ForceContinue`] names what a caller may do after a wait that did not
//! converge.
//!
//! The crate also provides [`fan_out`], which queries independent partitions
//! (AWS regions) concurrently and merges their rows deterministically.
//!
//! The poller does not know about any vendor SDK; `check` is any async
//! closure returning `Result<Snapshot, Error>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use converge::{ConvergenceRequest, ResourceKind};
//! use tokio_util::sync::CancellationToken;
//!
//! let outcome = ConvergenceRequest::new(
//!     ResourceKind::InstanceState,
//!     "instance i-0abc to reach running",
//!     |state: &String| state == "running",
//! )
//! .run(&CancellationToken::new(), || ec2.instance_state("i-0abc"))
//! .await?;
//!
//! if let Some(state) = outcome.into_converged() {
//!     println!("ready: {state}");
//! }
//! ```

pub mod error;
pub mod fanout;
pub mod outcome;
pub mod policy;
pub mod poller;
pub mod request;

pub use error::ConvergeError;
pub use fanout::{fan_out, FanOutReport, PartitionFailure, Regional};
pub use outcome::{AbortReason, ConvergenceOutcome};
pub use policy::ForceContinue;
pub use poller::await_convergence;
pub use request::{Bound, ConvergenceRequest, ErrorPolicy, ResourceKind, Tick};
