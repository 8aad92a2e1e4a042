//! EC2 (Elastic Compute Cloud).
//!
//! Implements [`ComputeProvider`](crate::ComputeProvider) over the EC2 query
//! API, plus the pieces the launch flow needs: image lookup, Elastic IP
//! cleanup, the open-all security group and IPv6 setup for the default VPC.

mod client;
mod models;
mod network;

pub use client::{terminate_when_running, AddressCleanup, Ec2, EC2_API_VERSION};
pub use models::*;
pub use network::{first_subnet_block, OpenAllGroup, OPEN_ALL_GROUP_NAME};
