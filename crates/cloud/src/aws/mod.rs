//! AWS wire layer.
//!
//! Requests are signed with Signature Version 4 and sent over the shared
//! [`AwsClient`]. Three protocols are spoken:
//!
//! - **query** (EC2, RDS, STS, IAM): form-encoded POST, XML reply
//! - **JSON 1.1** (Lightsail, Service Quotas, Budgets): `X-Amz-Target` header
//! - **REST-JSON** (Account, Lambda)

mod client;
pub mod models;
mod params;
pub mod signer;

pub use client::{AwsClient, Endpoint};
pub use params::QueryParams;
