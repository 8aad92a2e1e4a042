//! Compute providers.
//!
//! [`ComputeProvider`] is the common surface of EC2 and Lightsail; each
//! submodule adds the service-specific operations the flows need.

pub mod ec2;
pub mod lightsail;
mod traits;

pub use traits::{CloudError, ComputeProvider, Instance, InstanceStatus};

pub use ec2::Ec2;
pub use lightsail::Lightsail;
