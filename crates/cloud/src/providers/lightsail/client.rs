//! Lightsail API client implementation.

use async_trait::async_trait;
use converge::{ConvergenceOutcome, ConvergenceRequest, ForceContinue, ResourceKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::models::{
    Blueprint, Bundle, CreateInstancesRequest, GetBlueprintsResponse, GetBundlesResponse,
    GetInstanceResponse, GetInstancesResponse, GetRegionsResponse, GetStaticIpResponse,
    GetStaticIpsResponse, LightsailInstance, PortInfo, StaticIp,
};
use crate::aws::{AwsClient, Endpoint};
use crate::providers::traits::{CloudError, ComputeProvider, Instance, InstanceStatus};
use crate::wait::Waiter;

/// `X-Amz-Target` prefix of the Lightsail JSON API.
pub const LIGHTSAIL_TARGET_PREFIX: &str = "Lightsail_20161128";

/// Bundle preselected in the create flow.
pub const DEFAULT_BUNDLE: &str = "nano_3_0";

/// Blueprint preselected in the create flow.
pub const DEFAULT_BLUEPRINT: &str = "debian_12";

/// What happened to the static IP of a deleted instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Static IP released before deletion.
    pub released_ip: Option<String>,
    /// Static IP left allocated because its detach never converged.
    pub kept_ip: Option<String>,
}

/// Lightsail client for one region.
#[derive(Clone, Debug)]
pub struct Lightsail {
    client: AwsClient,
    endpoint: Endpoint,
}

impl Lightsail {
    /// Create a new Lightsail client for `region`.
    #[must_use]
    pub fn new(client: &AwsClient, region: &str) -> Self {
        Self {
            client: client.clone(),
            endpoint: Endpoint::regional("lightsail", region),
        }
    }

    async fn call<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<T, CloudError> {
        let target = format!("{LIGHTSAIL_TARGET_PREFIX}.{operation}");
        self.client.json(&self.endpoint, &target, body).await
    }

    /// Names of the regions Lightsail is available in, sorted.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn region_names(&self) -> Result<Vec<String>, CloudError> {
        let response: GetRegionsResponse = self.call("GetRegions", &json!({})).await?;
        let mut names: Vec<String> = response
            .regions
            .into_iter()
            .map(|r| r.name)
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Active Linux bundles, cheapest first.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn bundles(&self) -> Result<Vec<Bundle>, CloudError> {
        let response: GetBundlesResponse = self.call("GetBundles", &json!({})).await?;
        Ok(linux_bundles(response.bundles))
    }

    /// Linux/Unix blueprint ids, sorted.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn blueprints(&self) -> Result<Vec<String>, CloudError> {
        let response: GetBlueprintsResponse = self.call("GetBlueprints", &json!({})).await?;
        Ok(linux_blueprints(response.blueprints))
    }

    /// Create instances.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn create_instances(&self, req: &CreateInstancesRequest) -> Result<(), CloudError> {
        info!(
            names = ?req.instance_names,
            zone = %req.availability_zone,
            bundle = %req.bundle_id,
            blueprint = %req.blueprint_id,
            "Creating Lightsail instances"
        );
        let _: serde_json::Value = self.call("CreateInstances", req).await?;
        Ok(())
    }

    /// Raw description of one instance.
    ///
    /// # Errors
    /// Returns [`CloudError::NotFound`] if the instance does not exist.
    pub async fn describe_instance(&self, name: &str) -> Result<LightsailInstance, CloudError> {
        let response: GetInstanceResponse = self
            .call("GetInstance", &json!({ "instanceName": name }))
            .await?;
        Ok(response.instance)
    }

    /// Open TCP and UDP 0-65535 to the world.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn open_all_ports(&self, name: &str) -> Result<(), CloudError> {
        let ports = [
            PortInfo {
                from_port: 0,
                to_port: 65535,
                protocol: "tcp",
            },
            PortInfo {
                from_port: 0,
                to_port: 65535,
                protocol: "udp",
            },
        ];
        let _: serde_json::Value = self
            .call(
                "PutInstancePublicPorts",
                &json!({ "instanceName": name, "portInfos": ports }),
            )
            .await?;
        info!(instance = %name, "Opened all public ports");
        Ok(())
    }

    /// Wait for `name` to run, then open all ports. Ports stay untouched
    /// unless the wait converged.
    ///
    /// # Errors
    /// Returns error if the wait is invalid or the port update fails.
    pub async fn open_all_ports_when_running(
        &self,
        name: &str,
        waiter: &Waiter,
    ) -> Result<ConvergenceOutcome<Instance, CloudError>, CloudError> {
        let request = ConvergenceRequest::new(
            ResourceKind::InstanceState,
            format!("Lightsail instance {name} to be running"),
            |i: &Instance| i.status == InstanceStatus::Running,
        )
        .with_interval(std::time::Duration::from_secs(2))
        .with_bound(converge::Bound::Attempts(30));
        let outcome = waiter
            .run(request, |i: &Instance| i.state_name.clone(), || self.get_instance(name))
            .await?;
        if ForceContinue::BestEffort.permits(&outcome) {
            self.open_all_ports(name).await?;
        } else {
            warn!(instance = %name, outcome = outcome.label(), "Firewall left unchanged");
        }
        Ok(outcome)
    }

    // ========================================================================
    // Static IPs
    // ========================================================================

    /// All static IPs in the region.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn static_ips(&self) -> Result<Vec<StaticIp>, CloudError> {
        let mut ips = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let body = match &page_token {
                Some(token) => json!({ "pageToken": token }),
                None => json!({}),
            };
            let response: GetStaticIpsResponse = self.call("GetStaticIps", &body).await?;
            ips.extend(response.static_ips);
            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(ips)
    }

    /// The static IP attached to `instance`, if any.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn attached_static_ip(&self, instance: &str) -> Result<Option<StaticIp>, CloudError> {
        Ok(self
            .static_ips()
            .await?
            .into_iter()
            .find(|ip| ip.attached_to.as_deref() == Some(instance)))
    }

    async fn static_ip(&self, name: &str) -> Result<StaticIp, CloudError> {
        let response: GetStaticIpResponse = self
            .call("GetStaticIp", &json!({ "staticIpName": name }))
            .await?;
        Ok(response.static_ip)
    }

    /// Allocate `Static-<instance>`, attach it, and wait until the attachment shows.
    ///
    /// # Errors
    /// Returns error if allocation or attachment fails.
    pub async fn allocate_and_attach_static_ip(
        &self,
        instance: &str,
        waiter: &Waiter,
    ) -> Result<ConvergenceOutcome<StaticIp, CloudError>, CloudError> {
        let ip_name = format!("Static-{instance}");
        let _: serde_json::Value = self
            .call("AllocateStaticIp", &json!({ "staticIpName": ip_name }))
            .await?;
        let _: serde_json::Value = self
            .call(
                "AttachStaticIp",
                &json!({ "staticIpName": ip_name, "instanceName": instance }),
            )
            .await?;
        info!(ip = %ip_name, instance = %instance, "Static IP attached");

        let wanted = instance.to_string();
        let request = ConvergenceRequest::new(
            ResourceKind::StaticIpConsistency,
            format!("static IP {ip_name} to attach to {instance}"),
            move |ip: &StaticIp| ip.is_attached && ip.attached_to.as_deref() == Some(wanted.as_str()),
        );
        waiter
            .run(request, describe_static_ip, || self.static_ip(&ip_name))
            .await
    }

    /// Detach a static IP and release it once the detach is confirmed.
    ///
    /// Returns `true` if the address was released.
    ///
    /// # Errors
    /// Returns error if detaching or releasing fails.
    pub async fn detach_and_release_static_ip(
        &self,
        ip_name: &str,
        waiter: &Waiter,
    ) -> Result<bool, CloudError> {
        let target = format!("static IP {ip_name} to detach");
        waiter.ensure_active(&target)?;
        let _: serde_json::Value = self
            .call("DetachStaticIp", &json!({ "staticIpName": ip_name }))
            .await?;

        let request = ConvergenceRequest::new(
            ResourceKind::StaticIpConsistency,
            target.clone(),
            |ip: &StaticIp| !ip.is_attached,
        );
        let outcome = waiter
            .run(request, describe_static_ip, || self.static_ip(ip_name))
            .await?;
        CloudError::stop_if_cancelled(&outcome, &target)?;
        if !ForceContinue::Destructive.permits(&outcome) {
            warn!(ip = %ip_name, outcome = outcome.label(), "Static IP still attached, not releasing");
            return Ok(false);
        }

        let _: serde_json::Value = self
            .call("ReleaseStaticIp", &json!({ "staticIpName": ip_name }))
            .await?;
        info!(ip = %ip_name, "Static IP released");
        Ok(true)
    }

    /// Release the instance's static IP (if any), then delete the instance.
    ///
    /// A cancelled detach wait stops the flow before `DeleteInstance`.
    ///
    /// # Errors
    /// Returns [`CloudError::Cancelled`] if the operator cancelled, or any
    /// API error.
    pub async fn delete_instance_and_static_ip(
        &self,
        name: &str,
        waiter: &Waiter,
    ) -> Result<DeleteReport, CloudError> {
        let target = format!("deletion of {name}");
        waiter.ensure_active(&target)?;
        let mut report = DeleteReport::default();
        if let Some(ip) = self.attached_static_ip(name).await? {
            if self.detach_and_release_static_ip(&ip.name, waiter).await? {
                report.released_ip = Some(ip.name);
            } else {
                report.kept_ip = Some(ip.name);
            }
        }
        waiter.ensure_active(&target)?;
        self.terminate_instance(name).await?;
        Ok(report)
    }

    /// Convert Lightsail instance to our type.
    pub(crate) fn to_instance(ls: &LightsailInstance, region: &str) -> Instance {
        let state = ls.state_name().to_string();
        Instance {
            id: ls.name.clone(),
            name: ls.name.clone(),
            status: InstanceStatus::from_state_name(&state),
            state_name: state,
            instance_type: ls.bundle_id.clone(),
            region: region.to_string(),
            zone: ls
                .location
                .as_ref()
                .and_then(|l| l.availability_zone.clone()),
            public_ip: ls.public_ip_address.clone(),
            private_ip: ls.private_ip_address.clone(),
            ipv6: ls.ipv6_addresses.first().cloned(),
            image: ls.blueprint_id.clone(),
            created_at: ls.created_at.and_then(|secs| {
                #[allow(clippy::cast_possible_truncation)]
                chrono::DateTime::from_timestamp(secs as i64, 0)
            }),
        }
    }

    async fn instance_action(&self, operation: &str, name: &str) -> Result<(), CloudError> {
        info!(instance = %name, operation, "Lightsail instance action");
        let _: serde_json::Value = self
            .call(operation, &json!({ "instanceName": name }))
            .await?;
        Ok(())
    }
}

fn describe_static_ip(ip: &StaticIp) -> String {
    match (&ip.attached_to, ip.is_attached) {
        (Some(instance), true) => format!("attached to {instance}"),
        _ => "detached".to_string(),
    }
}

/// Keep active, non-Windows bundles, cheapest first.
#[must_use]
pub fn linux_bundles(bundles: Vec<Bundle>) -> Vec<Bundle> {
    let mut kept: Vec<Bundle> = bundles
        .into_iter()
        .filter(|b| b.is_active)
        .filter(|b| b.supported_platforms.first().map(String::as_str) != Some("WINDOWS"))
        .collect();
    kept.sort_by(|a, b| a.price.total_cmp(&b.price));
    kept
}

/// Keep Linux/Unix blueprint ids, sorted.
#[must_use]
pub fn linux_blueprints(blueprints: Vec<Blueprint>) -> Vec<String> {
    let mut ids: Vec<String> = blueprints
        .into_iter()
        .filter(|b| b.platform.as_deref() == Some("LINUX_UNIX"))
        .map(|b| b.blueprint_id)
        .collect();
    ids.sort();
    ids
}

#[async_trait]
impl ComputeProvider for Lightsail {
    fn region(&self) -> &str {
        &self.endpoint.region
    }

    async fn list_instances(&self) -> Result<Vec<Instance>, CloudError> {
        let mut instances = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let body = match &page_token {
                Some(token) => json!({ "pageToken": token }),
                None => json!({}),
            };
            let response: GetInstancesResponse = self.call("GetInstances", &body).await?;
            instances.extend(
                response
                    .instances
                    .iter()
                    .map(|i| Self::to_instance(i, &self.endpoint.region)),
            );
            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(instances)
    }

    async fn get_instance(&self, id: &str) -> Result<Instance, CloudError> {
        let ls = self.describe_instance(id).await?;
        Ok(Self::to_instance(&ls, &self.endpoint.region))
    }

    async fn start_instance(&self, id: &str) -> Result<(), CloudError> {
        self.instance_action("StartInstance", id).await
    }

    async fn stop_instance(&self, id: &str) -> Result<(), CloudError> {
        self.instance_action("StopInstance", id).await
    }

    async fn reboot_instance(&self, id: &str) -> Result<(), CloudError> {
        self.instance_action("RebootInstance", id).await
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), CloudError> {
        self.instance_action("DeleteInstance", id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(id: &str, price: f64, platform: &str, active: bool) -> Bundle {
        Bundle {
            bundle_id: id.to_string(),
            name: None,
            price,
            cpu_count: 2,
            ram_size_in_gb: 1.0,
            disk_size_in_gb: 40,
            is_active: active,
            supported_platforms: vec![platform.to_string()],
        }
    }

    #[test]
    fn test_linux_bundles_sorted_by_price() {
        let kept = linux_bundles(vec![
            bundle("small_3_0", 10.0, "LINUX_UNIX", true),
            bundle("nano_win_3_0", 8.0, "WINDOWS", true),
            bundle("nano_3_0", 5.0, "LINUX_UNIX", true),
            bundle("old_1_0", 3.5, "LINUX_UNIX", false),
        ]);
        let ids: Vec<&str> = kept.iter().map(|b| b.bundle_id.as_str()).collect();
        assert_eq!(ids, vec!["nano_3_0", "small_3_0"]);
    }

    #[test]
    fn test_linux_blueprints() {
        let bp = |id: &str, platform: &str| Blueprint {
            blueprint_id: id.to_string(),
            name: None,
            platform: Some(platform.to_string()),
            is_active: true,
        };
        let ids = linux_blueprints(vec![
            bp("windows_server_2022", "WINDOWS"),
            bp("ubuntu_24_04", "LINUX_UNIX"),
            bp("debian_12", "LINUX_UNIX"),
        ]);
        assert_eq!(ids, vec!["debian_12".to_string(), "ubuntu_24_04".to_string()]);
    }
}
