//! Account-level calls: caller identity, region opt-in and service quotas.
//!
//! Identity and quota calls go to the bootstrap region of the client
//! configuration; the Account API only exists in `us-east-1`.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::aws::{AwsClient, Endpoint, QueryParams};
use crate::providers::CloudError;

const STS_API_VERSION: &str = "2011-06-15";
const ACCOUNT_HOST: &str = "account.us-east-1.amazonaws.com";
const ACCOUNT_REGION: &str = "us-east-1";
const SERVICE_QUOTAS_TARGET_PREFIX: &str = "ServiceQuotasV20190624";

/// Service code of the EC2 vCPU quota.
pub const EC2_SERVICE_CODE: &str = "ec2";

/// Running On-Demand Standard (A, C, D, H, I, M, R, T, Z) instances, in vCPUs.
pub const STANDARD_VCPU_QUOTA_CODE: &str = "L-1216C47A";

#[derive(Debug, Deserialize)]
struct GetCallerIdentityResponse {
    #[serde(rename = "GetCallerIdentityResult")]
    result: CallerIdentity,
}

/// Who the credentials belong to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallerIdentity {
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Arn", default)]
    pub arn: String,
    #[serde(rename = "UserId", default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct GetServiceQuotaResponse {
    #[serde(rename = "Quota")]
    quota: ServiceQuota,
}

/// An applied service quota.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceQuota {
    #[serde(rename = "QuotaName", default)]
    pub name: Option<String>,
    #[serde(rename = "Value", default)]
    pub value: f64,
}

/// Client for account-wide services.
#[derive(Clone, Debug)]
pub struct Account {
    client: AwsClient,
}

impl Account {
    #[must_use]
    pub fn new(client: &AwsClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// STS `GetCallerIdentity`; doubles as the credential check.
    ///
    /// # Errors
    /// Returns [`CloudError::Auth`] for rejected credentials, or any API error.
    pub async fn caller_identity(&self) -> Result<CallerIdentity, CloudError> {
        let endpoint = Endpoint::regional("sts", &self.client.config().bootstrap_region);
        let response: GetCallerIdentityResponse = self
            .client
            .query(&endpoint, "GetCallerIdentity", STS_API_VERSION, &QueryParams::new())
            .await?;
        debug!(account = %response.result.account, "Resolved caller identity");
        Ok(response.result)
    }

    /// Ask AWS to enable an opt-in region.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn enable_region(&self, region: &str) -> Result<(), CloudError> {
        let endpoint = Endpoint::global("account", ACCOUNT_HOST, ACCOUNT_REGION);
        let _: serde_json::Value = self
            .client
            .rest_json(
                &endpoint,
                Method::POST,
                "/enableRegion",
                &json!({ "RegionName": region }),
            )
            .await?;
        info!(region, "EnableRegion accepted");
        Ok(())
    }

    /// Current value of a service quota.
    ///
    /// # Errors
    /// Returns [`CloudError::NotFound`] for an unknown quota, or any API error.
    pub async fn service_quota(
        &self,
        service_code: &str,
        quota_code: &str,
    ) -> Result<ServiceQuota, CloudError> {
        let endpoint = Endpoint::regional("servicequotas", &self.client.config().bootstrap_region);
        let response: GetServiceQuotaResponse = self
            .client
            .json(
                &endpoint,
                &format!("{SERVICE_QUOTAS_TARGET_PREFIX}.GetServiceQuota"),
                &json!({ "ServiceCode": service_code, "QuotaCode": quota_code }),
            )
            .await?;
        Ok(response.quota)
    }

    /// The standard on-demand vCPU limit of EC2.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn ec2_vcpu_quota(&self) -> Result<ServiceQuota, CloudError> {
        self.service_quota(EC2_SERVICE_CODE, STANDARD_VCPU_QUOTA_CODE)
            .await
    }
}
