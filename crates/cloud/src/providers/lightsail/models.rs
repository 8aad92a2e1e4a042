//! Lightsail JSON API models.

use serde::{Deserialize, Serialize};

/// Lightsail instance information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightsailInstance {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub location: Option<ResourceLocation>,
    #[serde(default)]
    pub blueprint_id: String,
    #[serde(default)]
    pub bundle_id: String,
    #[serde(default)]
    pub is_static_ip: bool,
    #[serde(default)]
    pub public_ip_address: Option<String>,
    #[serde(default)]
    pub private_ip_address: Option<String>,
    #[serde(default)]
    pub ipv6_addresses: Vec<String>,
    #[serde(default)]
    pub hardware: Option<InstanceHardware>,
    #[serde(default)]
    pub networking: Option<InstanceNetworking>,
    #[serde(default)]
    pub state: Option<LightsailState>,
}

impl LightsailInstance {
    /// State name, `unknown` when absent.
    #[must_use]
    pub fn state_name(&self) -> &str {
        self.state.as_ref().map_or("unknown", |s| s.name.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLocation {
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHardware {
    #[serde(default)]
    pub cpu_count: u32,
    #[serde(default)]
    pub ram_size_in_gb: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceNetworking {
    #[serde(default)]
    pub ports: Vec<InstancePortInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePortInfo {
    #[serde(default)]
    pub from_port: i32,
    #[serde(default)]
    pub to_port: i32,
    #[serde(default)]
    pub protocol: String,
}

impl InstancePortInfo {
    /// `all (tcp)` for a full-range rule, `22/tcp` otherwise.
    #[must_use]
    pub fn summary(&self) -> String {
        let full_range = self.from_port == 0 && self.to_port == 65535;
        let any_protocol = self.from_port == 0 && (self.protocol == "all" || self.protocol == "-1");
        if full_range || any_protocol {
            format!("all ({})", self.protocol)
        } else {
            format!("{}/{}", self.from_port, self.protocol)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightsailState {
    #[serde(default)]
    pub code: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInstancesResponse {
    #[serde(default)]
    pub instances: Vec<LightsailInstance>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetInstanceResponse {
    pub instance: LightsailInstance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRegionsResponse {
    #[serde(default)]
    pub regions: Vec<LightsailRegion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightsailRegion {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A Lightsail plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub bundle_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Monthly price in USD.
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub cpu_count: u32,
    #[serde(default)]
    pub ram_size_in_gb: f64,
    #[serde(default)]
    pub disk_size_in_gb: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub supported_platforms: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBundlesResponse {
    #[serde(default)]
    pub bundles: Vec<Bundle>,
}

/// A Lightsail OS / application image.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub blueprint_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBlueprintsResponse {
    #[serde(default)]
    pub blueprints: Vec<Blueprint>,
}

/// A Lightsail static IP.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticIp {
    pub name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub attached_to: Option<String>,
    #[serde(default)]
    pub is_attached: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStaticIpsResponse {
    #[serde(default)]
    pub static_ips: Vec<StaticIp>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStaticIpResponse {
    pub static_ip: StaticIp,
}

/// Parameters for `CreateInstances`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstancesRequest {
    pub instance_names: Vec<String>,
    pub availability_zone: String,
    pub blueprint_id: String,
    pub bundle_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortInfo {
    pub from_port: u16,
    pub to_port: u16,
    pub protocol: &'static str,
}
