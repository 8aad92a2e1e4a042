//! EC2 query API response models.
//!
//! Field names follow the EC2 XML (`camelCase`, `xxxSet` lists of `<item>`).

use base64::Engine;
use serde::Deserialize;

use crate::aws::models::{non_empty, ItemSet};
use crate::aws::QueryParams;

/// `<return>true</return>` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    #[serde(rename = "return", default)]
    pub ok: Option<String>,
}

// ============================================================================
// Regions
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeRegionsResponse {
    #[serde(rename = "regionInfo", default)]
    pub regions: ItemSet<RegionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionItem {
    #[serde(rename = "regionName")]
    pub region_name: String,
    #[serde(rename = "optInStatus", default)]
    pub opt_in_status: Option<String>,
}

// ============================================================================
// Instances
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeInstancesResponse {
    #[serde(rename = "reservationSet", default)]
    pub reservations: ItemSet<Reservation>,
    #[serde(rename = "nextToken", default, deserialize_with = "non_empty")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reservation {
    #[serde(rename = "instancesSet", default)]
    pub instances: ItemSet<Ec2Instance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunInstancesResponse {
    #[serde(rename = "reservationId", default)]
    pub reservation_id: Option<String>,
    #[serde(rename = "instancesSet", default)]
    pub instances: ItemSet<Ec2Instance>,
}

/// EC2 instance information.
#[derive(Debug, Clone, Deserialize)]
pub struct Ec2Instance {
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    #[serde(rename = "imageId", default)]
    pub image_id: String,
    #[serde(rename = "instanceState")]
    pub state: InstanceState,
    #[serde(rename = "instanceType", default)]
    pub instance_type: String,
    #[serde(rename = "keyName", default, deserialize_with = "non_empty")]
    pub key_name: Option<String>,
    #[serde(rename = "launchTime", default)]
    pub launch_time: Option<String>,
    #[serde(default)]
    pub placement: Option<Placement>,
    #[serde(rename = "privateIpAddress", default, deserialize_with = "non_empty")]
    pub private_ip_address: Option<String>,
    #[serde(rename = "ipAddress", default, deserialize_with = "non_empty")]
    pub public_ip_address: Option<String>,
    #[serde(rename = "vpcId", default)]
    pub vpc_id: Option<String>,
    #[serde(rename = "subnetId", default)]
    pub subnet_id: Option<String>,
    #[serde(rename = "rootDeviceName", default)]
    pub root_device_name: Option<String>,
    #[serde(rename = "tagSet", default)]
    pub tags: ItemSet<Tag>,
    #[serde(rename = "networkInterfaceSet", default)]
    pub network_interfaces: ItemSet<NetworkInterface>,
    #[serde(rename = "blockDeviceMapping", default)]
    pub block_devices: ItemSet<BlockDevice>,
}

impl Ec2Instance {
    /// Value of the `Name` tag.
    #[must_use]
    pub fn name_tag(&self) -> Option<&str> {
        self.tags
            .items
            .iter()
            .find(|t| t.key == "Name")
            .map(|t| t.value.as_str())
    }

    /// First IPv6 address on any interface.
    #[must_use]
    pub fn first_ipv6(&self) -> Option<&str> {
        self.network_interfaces
            .items
            .iter()
            .flat_map(|n| n.ipv6_addresses.items.iter())
            .map(|a| a.address.as_str())
            .next()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceState {
    #[serde(default)]
    pub code: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Placement {
    #[serde(rename = "availabilityZone")]
    pub availability_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkInterface {
    #[serde(rename = "ipv6AddressesSet", default)]
    pub ipv6_addresses: ItemSet<Ipv6Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ipv6Address {
    #[serde(rename = "ipv6Address")]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockDevice {
    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(default)]
    pub ebs: Option<EbsDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EbsDevice {
    #[serde(rename = "volumeId")]
    pub volume_id: String,
}

// ============================================================================
// Images and volumes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeImagesResponse {
    #[serde(rename = "imagesSet", default)]
    pub images: ItemSet<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    #[serde(rename = "imageId")]
    pub image_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "creationDate", default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(rename = "rootDeviceName", default)]
    pub root_device_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeVolumesResponse {
    #[serde(rename = "volumeSet", default)]
    pub volumes: ItemSet<Volume>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Volume {
    #[serde(rename = "volumeId")]
    pub volume_id: String,
    #[serde(default)]
    pub size: u32,
    #[serde(rename = "volumeType", default)]
    pub volume_type: String,
    #[serde(default)]
    pub status: String,
}

// ============================================================================
// Elastic IPs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeAddressesResponse {
    #[serde(rename = "addressesSet", default)]
    pub addresses: ItemSet<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Address {
    #[serde(rename = "publicIp")]
    pub public_ip: String,
    #[serde(rename = "allocationId", default)]
    pub allocation_id: Option<String>,
    #[serde(rename = "associationId", default, deserialize_with = "non_empty")]
    pub association_id: Option<String>,
    #[serde(rename = "instanceId", default, deserialize_with = "non_empty")]
    pub instance_id: Option<String>,
}

// ============================================================================
// Networking
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeVpcsResponse {
    #[serde(rename = "vpcSet", default)]
    pub vpcs: ItemSet<Vpc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vpc {
    #[serde(rename = "vpcId")]
    pub vpc_id: String,
    #[serde(rename = "cidrBlock", default)]
    pub cidr_block: Option<String>,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
    #[serde(rename = "ipv6CidrBlockAssociationSet", default)]
    pub ipv6_blocks: ItemSet<Ipv6CidrAssociation>,
}

impl Vpc {
    /// The first IPv6 block in `associated` state.
    #[must_use]
    pub fn associated_ipv6_block(&self) -> Option<&str> {
        self.ipv6_blocks
            .items
            .iter()
            .find(|a| a.state.state == "associated")
            .and_then(|a| a.ipv6_cidr_block.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ipv6CidrAssociation {
    #[serde(rename = "associationId", default)]
    pub association_id: Option<String>,
    #[serde(rename = "ipv6CidrBlock", default, deserialize_with = "non_empty")]
    pub ipv6_cidr_block: Option<String>,
    #[serde(rename = "ipv6CidrBlockState")]
    pub state: CidrBlockState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CidrBlockState {
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeSubnetsResponse {
    #[serde(rename = "subnetSet", default)]
    pub subnets: ItemSet<Subnet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subnet {
    #[serde(rename = "subnetId")]
    pub subnet_id: String,
    #[serde(rename = "availabilityZone", default)]
    pub availability_zone: Option<String>,
    #[serde(rename = "ipv6CidrBlockAssociationSet", default)]
    pub ipv6_blocks: ItemSet<Ipv6CidrAssociation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeRouteTablesResponse {
    #[serde(rename = "routeTableSet", default)]
    pub route_tables: ItemSet<RouteTable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteTable {
    #[serde(rename = "routeTableId")]
    pub route_table_id: String,
    #[serde(rename = "routeSet", default)]
    pub routes: ItemSet<Route>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    #[serde(rename = "destinationIpv6CidrBlock", default)]
    pub destination_ipv6: Option<String>,
    #[serde(rename = "gatewayId", default)]
    pub gateway_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeInternetGatewaysResponse {
    #[serde(rename = "internetGatewaySet", default)]
    pub gateways: ItemSet<InternetGateway>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InternetGateway {
    #[serde(rename = "internetGatewayId")]
    pub internet_gateway_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeSecurityGroupsResponse {
    #[serde(rename = "securityGroupInfo", default)]
    pub groups: ItemSet<SecurityGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityGroup {
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "groupName", default)]
    pub group_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSecurityGroupResponse {
    #[serde(rename = "groupId")]
    pub group_id: String,
}

// ============================================================================
// Requests
// ============================================================================

/// Primary network interface of a new instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInterfaceSpec {
    pub security_group_id: Option<String>,
    pub subnet_id: Option<String>,
    /// Request one IPv6 address.
    pub ipv6: bool,
}

/// gp3 root volume override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootVolumeSpec {
    pub device_name: String,
    pub size_gb: u32,
}

/// Parameters for `RunInstances`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInstancesRequest {
    pub image_id: String,
    pub instance_type: String,
    pub count: u32,
    /// Plain-text user data; encoded on the wire.
    pub user_data: Option<String>,
    pub name: Option<String>,
    pub network_interface: Option<NetworkInterfaceSpec>,
    pub root_volume: Option<RootVolumeSpec>,
}

impl RunInstancesRequest {
    #[must_use]
    pub fn new(image_id: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            instance_type: instance_type.into(),
            count: 1,
            user_data: None,
            name: None,
            network_interface: None,
            root_volume: None,
        }
    }

    pub(crate) fn to_params(&self) -> QueryParams {
        let count = self.count.max(1);
        let mut params = QueryParams::new()
            .set("ImageId", &self.image_id)
            .set("InstanceType", &self.instance_type)
            .set("MinCount", count)
            .set("MaxCount", count)
            .set_opt(
                "UserData",
                self.user_data
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(|s| base64::engine::general_purpose::STANDARD.encode(s)),
            );

        if let Some(nic) = &self.network_interface {
            params = params
                .set("NetworkInterface.1.DeviceIndex", 0)
                .set("NetworkInterface.1.AssociatePublicIpAddress", true)
                .set_opt(
                    "NetworkInterface.1.SecurityGroupId.1",
                    nic.security_group_id.as_deref(),
                );
            if nic.ipv6 {
                params = params
                    .set("NetworkInterface.1.Ipv6AddressCount", 1)
                    .set_opt("NetworkInterface.1.SubnetId", nic.subnet_id.as_deref());
            }
        }

        if let Some(volume) = &self.root_volume {
            params = params
                .set("BlockDeviceMapping.1.DeviceName", &volume.device_name)
                .set("BlockDeviceMapping.1.Ebs.VolumeSize", volume.size_gb)
                .set("BlockDeviceMapping.1.Ebs.VolumeType", "gp3");
        }

        if let Some(name) = &self.name {
            params = params
                .set("TagSpecification.1.ResourceType", "instance")
                .set("TagSpecification.1.Tag.1.Key", "Name")
                .set("TagSpecification.1.Tag.1.Value", name);
        }

        params
    }
}
