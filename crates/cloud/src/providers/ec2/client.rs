//! EC2 API client implementation.

use async_trait::async_trait;
use converge::{ConvergenceOutcome, ConvergenceRequest, ForceContinue, ResourceKind};
use tracing::{info, warn};

use super::models::{
    Ack, Address, DescribeAddressesResponse, DescribeImagesResponse, DescribeInstancesResponse,
    DescribeRegionsResponse, DescribeVolumesResponse, Ec2Instance, Image, RegionItem,
    RunInstancesRequest, RunInstancesResponse, Volume,
};
use crate::aws::{AwsClient, Endpoint, QueryParams};
use crate::providers::traits::{CloudError, ComputeProvider, Instance, InstanceStatus};
use crate::wait::Waiter;

/// EC2 query API version.
pub const EC2_API_VERSION: &str = "2016-11-15";

/// Result of cleaning up the Elastic IPs of an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressCleanup {
    /// Public IPs that were disassociated and released.
    pub released: Vec<String>,
    /// Public IPs whose disassociation never converged; they were not released.
    pub kept: Vec<String>,
}

impl AddressCleanup {
    /// Whether every address was released.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.kept.is_empty()
    }
}

/// EC2 client for one region.
#[derive(Clone, Debug)]
pub struct Ec2 {
    client: AwsClient,
    endpoint: Endpoint,
}

impl Ec2 {
    /// Create a new EC2 client for `region`.
    #[must_use]
    pub fn new(client: &AwsClient, region: &str) -> Self {
        Self {
            client: client.clone(),
            endpoint: Endpoint::regional("ec2", region),
        }
    }

    pub(crate) async fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        params: QueryParams,
    ) -> Result<T, CloudError> {
        self.client
            .query(&self.endpoint, action, EC2_API_VERSION, &params)
            .await
    }

    // ========================================================================
    // Regions
    // ========================================================================

    /// All regions visible to the account, including those not opted in.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn describe_regions(&self) -> Result<Vec<RegionItem>, CloudError> {
        let response: DescribeRegionsResponse = self
            .call("DescribeRegions", QueryParams::new().set("AllRegions", true))
            .await?;
        Ok(response.regions.into_vec())
    }

    /// A single region, looked up by name.
    ///
    /// # Errors
    /// Returns [`CloudError::NotFound`] if the region is unknown to the account.
    pub async fn describe_region(&self, name: &str) -> Result<RegionItem, CloudError> {
        let response: DescribeRegionsResponse = self
            .call(
                "DescribeRegions",
                QueryParams::new()
                    .set("AllRegions", true)
                    .list("RegionName", &[name]),
            )
            .await?;
        response
            .regions
            .into_vec()
            .into_iter()
            .find(|r| r.region_name == name)
            .ok_or_else(|| CloudError::NotFound(format!("Region not found: {name}")))
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Launch instances.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn run_instances(&self, req: &RunInstancesRequest) -> Result<Vec<Instance>, CloudError> {
        info!(
            image = %req.image_id,
            instance_type = %req.instance_type,
            count = req.count,
            region = %self.endpoint.region,
            "Launching EC2 instances"
        );
        let response: RunInstancesResponse = self.call("RunInstances", req.to_params()).await?;
        let instances: Vec<Instance> = response
            .instances
            .items
            .iter()
            .map(|i| Self::to_instance(i, &self.endpoint.region))
            .collect();
        info!(count = instances.len(), "EC2 instances launched");
        Ok(instances)
    }

    /// Raw description of one instance.
    ///
    /// # Errors
    /// Returns [`CloudError::NotFound`] if the instance does not exist.
    pub async fn describe_instance(&self, id: &str) -> Result<Ec2Instance, CloudError> {
        let response: DescribeInstancesResponse = self
            .call("DescribeInstances", QueryParams::new().list("InstanceId", &[id]))
            .await?;
        response
            .reservations
            .into_vec()
            .into_iter()
            .flat_map(|r| r.instances.into_vec())
            .next()
            .ok_or_else(|| CloudError::NotFound(format!("Instance not found: {id}")))
    }

    /// Volumes attached to an instance.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn instance_volumes(&self, id: &str) -> Result<Vec<Volume>, CloudError> {
        let response: DescribeVolumesResponse = self
            .call(
                "DescribeVolumes",
                QueryParams::new().filter("attachment.instance-id", &[id]),
            )
            .await?;
        Ok(response.volumes.into_vec())
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Newest HVM image matching `owner`, `name_pattern` and `architecture`.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn latest_image(
        &self,
        owner: &str,
        name_pattern: &str,
        architecture: &str,
    ) -> Result<Option<Image>, CloudError> {
        let response: DescribeImagesResponse = self
            .call(
                "DescribeImages",
                QueryParams::new()
                    .list("Owner", &[owner])
                    .filter("name", &[name_pattern])
                    .filter("architecture", &[architecture])
                    .filter("virtualization-type", &["hvm"]),
            )
            .await?;
        Ok(newest_image(response.images.into_vec()))
    }

    /// Root device name of an image (`/dev/xvda`, `/dev/sda1`, ...).
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn image_root_device(&self, image_id: &str) -> Result<Option<String>, CloudError> {
        let response: DescribeImagesResponse = self
            .call("DescribeImages", QueryParams::new().list("ImageId", &[image_id]))
            .await?;
        Ok(response
            .images
            .into_vec()
            .into_iter()
            .next()
            .and_then(|i| i.root_device_name))
    }

    // ========================================================================
    // Elastic IPs
    // ========================================================================

    /// Elastic IPs associated with an instance.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn instance_addresses(&self, id: &str) -> Result<Vec<Address>, CloudError> {
        let response: DescribeAddressesResponse = self
            .call(
                "DescribeAddresses",
                QueryParams::new().filter("instance-id", &[id]),
            )
            .await?;
        Ok(response.addresses.into_vec())
    }

    async fn address(&self, allocation_id: &str) -> Result<Address, CloudError> {
        let response: DescribeAddressesResponse = self
            .call(
                "DescribeAddresses",
                QueryParams::new().list("AllocationId", &[allocation_id]),
            )
            .await?;
        response
            .addresses
            .into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::NotFound(format!("Address not found: {allocation_id}")))
    }

    /// Disassociate every Elastic IP of an instance and release it once the
    /// disassociation is confirmed.
    ///
    /// # Errors
    /// Returns [`CloudError::Cancelled`] as soon as the operator cancels, so
    /// no later address is touched, or any API error.
    pub async fn release_instance_addresses(
        &self,
        id: &str,
        waiter: &Waiter,
    ) -> Result<AddressCleanup, CloudError> {
        let mut cleanup = AddressCleanup::default();
        for address in self.instance_addresses(id).await? {
            waiter.ensure_active(&format!("release of Elastic IP {}", address.public_ip))?;
            let Some(allocation_id) = address.allocation_id.clone() else {
                warn!(ip = %address.public_ip, "Address has no allocation id, skipping");
                cleanup.kept.push(address.public_ip);
                continue;
            };

            if let Some(association_id) = &address.association_id {
                let _: Ack = self
                    .call(
                        "DisassociateAddress",
                        QueryParams::new().set("AssociationId", association_id),
                    )
                    .await?;

                let target = format!("Elastic IP {} to detach", address.public_ip);
                let request = ConvergenceRequest::new(
                    ResourceKind::StaticIpConsistency,
                    target.clone(),
                    |a: &Address| a.association_id.is_none(),
                );
                let outcome = waiter
                    .run(
                        request,
                        |a: &Address| {
                            a.instance_id
                                .clone()
                                .map_or_else(|| "detached".to_string(), |i| format!("on {i}"))
                        },
                        || self.address(&allocation_id),
                    )
                    .await?;
                CloudError::stop_if_cancelled(&outcome, &target)?;
                if !ForceContinue::Destructive.permits(&outcome) {
                    warn!(
                        ip = %address.public_ip,
                        outcome = outcome.label(),
                        "Elastic IP still associated, not releasing"
                    );
                    cleanup.kept.push(address.public_ip);
                    continue;
                }
            }

            let _: Ack = self
                .call(
                    "ReleaseAddress",
                    QueryParams::new().set("AllocationId", &allocation_id),
                )
                .await?;
            info!(ip = %address.public_ip, "Elastic IP released");
            cleanup.released.push(address.public_ip);
        }
        Ok(cleanup)
    }

    /// Release the instance's Elastic IPs, then terminate it.
    ///
    /// # Errors
    /// Returns [`CloudError::Cancelled`] without terminating if the operator
    /// cancels during the address cleanup, or any API error.
    pub async fn release_addresses_and_terminate(
        &self,
        id: &str,
        waiter: &Waiter,
    ) -> Result<AddressCleanup, CloudError> {
        let cleanup = self.release_instance_addresses(id, waiter).await?;
        waiter.ensure_active(&format!("termination of {id}"))?;
        self.terminate_instance(id).await?;
        Ok(cleanup)
    }

    /// Convert EC2 instance to our type.
    pub(crate) fn to_instance(ec2: &Ec2Instance, region: &str) -> Instance {
        Instance {
            id: ec2.instance_id.clone(),
            name: ec2
                .name_tag()
                .map_or_else(|| ec2.instance_id.clone(), ToString::to_string),
            status: InstanceStatus::from_state_name(&ec2.state.name),
            state_name: ec2.state.name.clone(),
            instance_type: ec2.instance_type.clone(),
            region: region.to_string(),
            zone: ec2.placement.as_ref().map(|p| p.availability_zone.clone()),
            public_ip: ec2.public_ip_address.clone(),
            private_ip: ec2.private_ip_address.clone(),
            ipv6: ec2.first_ipv6().map(ToString::to_string),
            image: ec2.image_id.clone(),
            created_at: ec2
                .launch_time
                .as_ref()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
        }
    }

    async fn instance_action(&self, action: &str, id: &str) -> Result<(), CloudError> {
        info!(instance_id = %id, action, "EC2 instance action");
        let _: Ack = self
            .call(action, QueryParams::new().list("InstanceId", &[id]))
            .await?;
        Ok(())
    }
}

/// Pick the image with the newest creation date.
fn newest_image(mut images: Vec<Image>) -> Option<Image> {
    images.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
    images.into_iter().next()
}

#[async_trait]
impl ComputeProvider for Ec2 {
    fn region(&self) -> &str {
        &self.endpoint.region
    }

    async fn list_instances(&self) -> Result<Vec<Instance>, CloudError> {
        let mut instances = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let response: DescribeInstancesResponse = self
                .call(
                    "DescribeInstances",
                    QueryParams::new().set_opt("NextToken", next_token.as_deref()),
                )
                .await?;
            instances.extend(
                response
                    .reservations
                    .items
                    .iter()
                    .flat_map(|r| r.instances.items.iter())
                    .filter(|i| i.state.name != "terminated")
                    .map(|i| Self::to_instance(i, &self.endpoint.region)),
            );
            match response.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(instances)
    }

    async fn get_instance(&self, id: &str) -> Result<Instance, CloudError> {
        let ec2 = self.describe_instance(id).await?;
        Ok(Self::to_instance(&ec2, &self.endpoint.region))
    }

    async fn start_instance(&self, id: &str) -> Result<(), CloudError> {
        self.instance_action("StartInstances", id).await
    }

    async fn stop_instance(&self, id: &str) -> Result<(), CloudError> {
        self.instance_action("StopInstances", id).await
    }

    async fn reboot_instance(&self, id: &str) -> Result<(), CloudError> {
        self.instance_action("RebootInstances", id).await
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), CloudError> {
        self.instance_action("TerminateInstances", id).await
    }
}

/// Wait for `id` to reach `running`, then terminate it only if it converged.
///
/// Returns the wait outcome so callers can report what happened.
///
/// # Errors
/// Returns error if a wait is invalid or the termination call fails.
pub async fn terminate_when_running(
    ec2: &Ec2,
    id: &str,
    waiter: &Waiter,
) -> Result<ConvergenceOutcome<Instance, CloudError>, CloudError> {
    let outcome = ec2
        .wait_instance_state(id, InstanceStatus::Running, waiter)
        .await?;
    if ForceContinue::Destructive.permits(&outcome) {
        ec2.terminate_instance(id).await?;
    } else {
        warn!(instance_id = %id, outcome = outcome.label(), "Instance not terminated");
    }
    Ok(outcome)
}
