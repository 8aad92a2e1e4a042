//! Account-wide instance listings, one concurrent query per region.

use converge::{fan_out, FanOutReport};

use crate::aws::AwsClient;
use crate::providers::{ComputeProvider, Ec2, Instance, Lightsail};

/// Non-terminated EC2 instances across `regions`, ordered by region.
pub async fn ec2_instances<I, R>(client: &AwsClient, regions: I) -> FanOutReport<Instance>
where
    I: IntoIterator<Item = R>,
    R: Into<String>,
{
    fan_out(regions, |region| {
        let client = client.clone();
        async move { Ec2::new(&client, &region).list_instances().await }
    })
    .await
}

/// Lightsail instances across `regions`, ordered by region.
pub async fn lightsail_instances<I, R>(client: &AwsClient, regions: I) -> FanOutReport<Instance>
where
    I: IntoIterator<Item = R>,
    R: Into<String>,
{
    fan_out(regions, |region| {
        let client = client.clone();
        async move { Lightsail::new(&client, &region).list_instances().await }
    })
    .await
}
