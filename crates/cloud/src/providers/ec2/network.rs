//! Default-VPC networking: the open-all security group and IPv6 setup.

use std::net::Ipv6Addr;

use converge::{ConvergenceRequest, ResourceKind};
use tracing::{debug, info};

use super::client::Ec2;
use super::models::{
    Ack, CreateSecurityGroupResponse, DescribeInternetGatewaysResponse,
    DescribeRouteTablesResponse, DescribeSecurityGroupsResponse, DescribeSubnetsResponse,
    DescribeVpcsResponse, Vpc,
};
use crate::aws::QueryParams;
use crate::providers::traits::CloudError;
use crate::wait::Waiter;

/// Name of the all-traffic security group.
pub const OPEN_ALL_GROUP_NAME: &str = "open-all-ports";

/// Security group allowing all inbound traffic, with the VPC it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAllGroup {
    pub group_id: String,
    pub vpc_id: String,
}

impl Ec2 {
    /// Find or create the `open-all-ports` group in the default VPC.
    ///
    /// # Errors
    /// Returns [`CloudError::NotFound`] if the region has no default VPC, or
    /// any API error.
    pub async fn ensure_open_all_security_group(&self) -> Result<OpenAllGroup, CloudError> {
        let vpcs: DescribeVpcsResponse = self
            .call(
                "DescribeVpcs",
                QueryParams::new().filter("isDefault", &["true"]),
            )
            .await?;
        let vpc_id = vpcs
            .vpcs
            .into_vec()
            .into_iter()
            .next()
            .map(|v| v.vpc_id)
            .ok_or_else(|| CloudError::NotFound("no default VPC in this region".to_string()))?;

        let groups: DescribeSecurityGroupsResponse = self
            .call(
                "DescribeSecurityGroups",
                QueryParams::new()
                    .filter("group-name", &[OPEN_ALL_GROUP_NAME])
                    .filter("vpc-id", &[vpc_id.as_str()]),
            )
            .await?;
        if let Some(group) = groups.groups.into_vec().into_iter().next() {
            debug!(group_id = %group.group_id, vpc_id = %vpc_id, "Reusing open-all security group");
            return Ok(OpenAllGroup {
                group_id: group.group_id,
                vpc_id,
            });
        }

        let created: CreateSecurityGroupResponse = self
            .call(
                "CreateSecurityGroup",
                QueryParams::new()
                    .set("GroupName", OPEN_ALL_GROUP_NAME)
                    .set("GroupDescription", "Auto generated")
                    .set("VpcId", &vpc_id),
            )
            .await?;

        let _: Ack = self
            .call(
                "AuthorizeSecurityGroupIngress",
                QueryParams::new()
                    .set("GroupId", &created.group_id)
                    .set("IpPermissions.1.IpProtocol", "-1")
                    .set("IpPermissions.1.IpRanges.1.CidrIp", "0.0.0.0/0")
                    .set("IpPermissions.2.IpProtocol", "-1")
                    .set("IpPermissions.2.Ipv6Ranges.1.CidrIpv6", "::/0"),
            )
            .await?;

        info!(group_id = %created.group_id, vpc_id = %vpc_id, "Created open-all security group");
        Ok(OpenAllGroup {
            group_id: created.group_id,
            vpc_id,
        })
    }

    async fn describe_vpc(&self, vpc_id: &str) -> Result<Vpc, CloudError> {
        let vpcs: DescribeVpcsResponse = self
            .call("DescribeVpcs", QueryParams::new().list("VpcId", &[vpc_id]))
            .await?;
        vpcs.vpcs
            .into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::NotFound(format!("VPC not found: {vpc_id}")))
    }

    /// Give the VPC and its first subnet IPv6 connectivity.
    ///
    /// Associates an Amazon-provided /56 when the VPC has none and waits for
    /// it, assigns the first /64 to the first subnet, enables address
    /// assignment on launch, and adds a `::/0` route through the attached
    /// internet gateway when missing. Returns the subnet id.
    ///
    /// # Errors
    /// Returns [`CloudError::Timeout`] or [`CloudError::Cancelled`] if the
    /// VPC block never becomes associated, [`CloudError::Config`] for a
    /// malformed block, or any API error.
    pub async fn setup_ipv6(&self, vpc_id: &str, waiter: &Waiter) -> Result<String, CloudError> {
        let vpc = self.describe_vpc(vpc_id).await?;
        let vpc_block = if let Some(block) = vpc.associated_ipv6_block() {
            block.to_string()
        } else {
            let _: Ack = self
                .call(
                    "AssociateVpcCidrBlock",
                    QueryParams::new()
                        .set("VpcId", vpc_id)
                        .set("AmazonProvidedIpv6CidrBlock", true),
                )
                .await?;
            info!(vpc_id, "Requested Amazon-provided IPv6 block");

            let target = format!("IPv6 block of {vpc_id} to associate");
            let request = ConvergenceRequest::new(
                ResourceKind::CidrAssociation,
                target.clone(),
                |v: &Vpc| v.associated_ipv6_block().is_some(),
            );
            let outcome = waiter
                .run(
                    request,
                    |v: &Vpc| {
                        v.ipv6_blocks
                            .items
                            .first()
                            .map_or_else(|| "none".to_string(), |a| a.state.state.clone())
                    },
                    || self.describe_vpc(vpc_id),
                )
                .await?;
            let vpc = CloudError::from_outcome(outcome, &target)?;
            vpc.associated_ipv6_block()
                .map(ToString::to_string)
                .ok_or_else(|| CloudError::Timeout(target))?
        };

        let subnets: DescribeSubnetsResponse = self
            .call(
                "DescribeSubnets",
                QueryParams::new().filter("vpc-id", &[vpc_id]),
            )
            .await?;
        let subnet = subnets
            .subnets
            .into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::NotFound(format!("no subnet in {vpc_id}")))?;

        let subnet_has_block = subnet
            .ipv6_blocks
            .items
            .iter()
            .any(|a| a.state.state == "associated" || a.state.state == "associating");
        if !subnet_has_block {
            let subnet_block = first_subnet_block(&vpc_block)?;
            let _: Ack = self
                .call(
                    "AssociateSubnetCidrBlock",
                    QueryParams::new()
                        .set("SubnetId", &subnet.subnet_id)
                        .set("Ipv6CidrBlock", &subnet_block),
                )
                .await?;
            info!(subnet_id = %subnet.subnet_id, block = %subnet_block, "Associated subnet IPv6 block");
        }

        let _: Ack = self
            .call(
                "ModifySubnetAttribute",
                QueryParams::new()
                    .set("SubnetId", &subnet.subnet_id)
                    .set("AssignIpv6AddressOnCreation.Value", true),
            )
            .await?;

        self.ensure_ipv6_default_route(vpc_id).await?;
        Ok(subnet.subnet_id)
    }

    async fn ensure_ipv6_default_route(&self, vpc_id: &str) -> Result<(), CloudError> {
        let tables: DescribeRouteTablesResponse = self
            .call(
                "DescribeRouteTables",
                QueryParams::new().filter("vpc-id", &[vpc_id]),
            )
            .await?;
        let Some(table) = tables.route_tables.into_vec().into_iter().next() else {
            return Ok(());
        };
        if table
            .routes
            .items
            .iter()
            .any(|r| r.destination_ipv6.as_deref() == Some("::/0"))
        {
            return Ok(());
        }

        let gateways: DescribeInternetGatewaysResponse = self
            .call(
                "DescribeInternetGateways",
                QueryParams::new().filter("attachment.vpc-id", &[vpc_id]),
            )
            .await?;
        let Some(gateway) = gateways.gateways.into_vec().into_iter().next() else {
            debug!(vpc_id, "No internet gateway attached, skipping IPv6 route");
            return Ok(());
        };

        let _: Ack = self
            .call(
                "CreateRoute",
                QueryParams::new()
                    .set("RouteTableId", &table.route_table_id)
                    .set("DestinationIpv6CidrBlock", "::/0")
                    .set("GatewayId", &gateway.internet_gateway_id),
            )
            .await?;
        info!(route_table = %table.route_table_id, "Added IPv6 default route");
        Ok(())
    }
}

/// The first /64 of a VPC /56 block.
///
/// # Errors
/// Returns [`CloudError::Config`] if `vpc_block` is not an IPv6 /56.
pub fn first_subnet_block(vpc_block: &str) -> Result<String, CloudError> {
    let malformed = || CloudError::Config(format!("unexpected VPC IPv6 block '{vpc_block}'"));
    let (address, prefix) = vpc_block.split_once('/').ok_or_else(malformed)?;
    if prefix != "56" {
        return Err(malformed());
    }
    let address: Ipv6Addr = address.parse().map_err(|_| malformed())?;
    Ok(format!("{address}/64"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_subnet_block() {
        assert_eq!(
            first_subnet_block("2600:1f18:abc:de00::/56").unwrap(),
            "2600:1f18:abc:de00::/64"
        );
    }

    #[test]
    fn test_malformed_block_is_rejected() {
        assert!(matches!(
            first_subnet_block("2600:1f18:abc:de00::/64"),
            Err(CloudError::Config(_))
        ));
        assert!(first_subnet_block("10.0.0.0/56").is_err());
        assert!(first_subnet_block("garbage").is_err());
    }
}
