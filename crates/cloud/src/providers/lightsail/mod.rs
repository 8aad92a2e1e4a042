//! Amazon Lightsail.
//!
//! Implements [`ComputeProvider`](crate::ComputeProvider) over the Lightsail
//! JSON API, plus bundle/blueprint catalogs, firewall opening and the static
//! IP lifecycle.

mod client;
mod models;

pub use client::{
    linux_blueprints, linux_bundles, DeleteReport, Lightsail, DEFAULT_BLUEPRINT, DEFAULT_BUNDLE,
    LIGHTSAIL_TARGET_PREFIX,
};
pub use models::*;
