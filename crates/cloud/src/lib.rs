//! AWS access for the `awsmgr` operator console.
//!
//! The crate talks to AWS directly over signed HTTPS:
//!
//! - **EC2** - instances, images, Elastic IPs, default-VPC networking
//! - **Lightsail** - instances, bundles, blueprints, firewall, static IPs
//! - **Account / STS / Service Quotas** - identity, region opt-in, vCPU limits
//! - **Budgets / IAM / Lambda / RDS** - the starter-credit tasks
//!
//! ## Waiting
//!
//! Every "wait until ready" step goes through [`wait::Waiter`], which runs a
//! [`converge::ConvergenceRequest`] with a shared cancellation token and an
//! optional progress sink. Follow-up actions that destroy or release a
//! resource only run after the wait reported `Converged`.
//!
//! ## Configuration
//!
//! A [`ClientConfig`] (credentials, proxy, timeout) is built once and passed
//! to [`AwsClient::new`]; per-service clients borrow that client.

pub mod account;
pub mod aws;
pub mod catalog;
pub mod config;
pub mod providers;
pub mod regions;
pub mod scan;
pub mod starter;
pub mod wait;

pub use aws::AwsClient;
pub use config::{parse_proxy, ClientConfig, Credentials};
pub use providers::{ec2, lightsail, CloudError, ComputeProvider, Ec2, Instance, InstanceStatus, Lightsail};
pub use regions::{OptInStatus, RegionInfo};
pub use wait::{WaitEvent, Waiter};
