//! Region discovery and opt-in.

use std::fmt;

use converge::{ConvergenceOutcome, ConvergenceRequest, ForceContinue, ResourceKind};
use tracing::{info, warn};

use crate::account::Account;
use crate::aws::AwsClient;
use crate::providers::ec2::{Ec2, RegionItem};
use crate::providers::lightsail::Lightsail;
use crate::providers::CloudError;
use crate::wait::Waiter;

/// Opt-in status reported by `DescribeRegions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptInStatus {
    NotRequired,
    OptedIn,
    NotOptedIn,
    Enabling,
    Other(String),
}

impl OptInStatus {
    #[must_use]
    pub fn from_api(raw: Option<&str>) -> Self {
        match raw.unwrap_or_default() {
            "opt-in-not-required" => Self::NotRequired,
            "opted-in" => Self::OptedIn,
            "not-opted-in" => Self::NotOptedIn,
            "enabling" => Self::Enabling,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether instances can be launched right now.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::NotRequired | Self::OptedIn)
    }

    /// Short marker shown next to the region in menus.
    #[must_use]
    pub fn badge(&self) -> &'static str {
        match self {
            Self::NotOptedIn => "[not enabled]",
            Self::OptedIn => "[enabled]",
            Self::Enabling => "[enabling]",
            Self::NotRequired | Self::Other(_) => "",
        }
    }
}

impl fmt::Display for OptInStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequired => f.write_str("opt-in-not-required"),
            Self::OptedIn => f.write_str("opted-in"),
            Self::NotOptedIn => f.write_str("not-opted-in"),
            Self::Enabling => f.write_str("enabling"),
            Self::Other(raw) if raw.is_empty() => f.write_str("unknown"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// An EC2 region and its opt-in status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub name: String,
    pub opt_in: OptInStatus,
}

impl From<RegionItem> for RegionInfo {
    fn from(item: RegionItem) -> Self {
        Self {
            opt_in: OptInStatus::from_api(item.opt_in_status.as_deref()),
            name: item.region_name,
        }
    }
}

/// All EC2 regions, opted in or not, sorted by name.
///
/// # Errors
/// Returns error if the API call fails.
pub async fn list_ec2_regions(client: &AwsClient) -> Result<Vec<RegionInfo>, CloudError> {
    let mut regions: Vec<RegionInfo> = Ec2::new(client, &client.config().bootstrap_region)
        .describe_regions()
        .await?
        .into_iter()
        .filter(|r| !r.region_name.is_empty())
        .map(RegionInfo::from)
        .collect();
    regions.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(regions)
}

/// Lightsail regions, sorted by name.
///
/// # Errors
/// Returns error if the API call fails.
pub async fn list_lightsail_regions(client: &AwsClient) -> Result<Vec<String>, CloudError> {
    Lightsail::new(client, &client.config().bootstrap_region)
        .region_names()
        .await
}

/// Human-readable location of `region`.
#[must_use]
pub fn display_name(region: &str) -> &'static str {
    match region {
        "af-south-1" => "Africa (Cape Town)",
        "ap-east-1" => "Asia Pacific (Hong Kong)",
        "ap-east-2" => "Asia Pacific (Taipei)",
        "ap-northeast-1" => "Asia Pacific (Tokyo)",
        "ap-northeast-2" => "Asia Pacific (Seoul)",
        "ap-northeast-3" => "Asia Pacific (Osaka)",
        "ap-south-1" => "Asia Pacific (Mumbai)",
        "ap-south-2" => "Asia Pacific (Hyderabad)",
        "ap-southeast-1" => "Asia Pacific (Singapore)",
        "ap-southeast-2" => "Asia Pacific (Sydney)",
        "ap-southeast-3" => "Asia Pacific (Jakarta)",
        "ap-southeast-4" => "Asia Pacific (Melbourne)",
        "ap-southeast-5" => "Asia Pacific (Malaysia)",
        "ap-southeast-6" => "Asia Pacific (New Zealand)",
        "ap-southeast-7" => "Asia Pacific (Thailand)",
        "ca-central-1" => "Canada (Central)",
        "ca-west-1" => "Canada West (Calgary)",
        "eu-central-1" => "Europe (Frankfurt)",
        "eu-central-2" => "Europe (Zurich)",
        "eu-north-1" => "Europe (Stockholm)",
        "eu-south-1" => "Europe (Milan)",
        "eu-south-2" => "Europe (Spain)",
        "eu-west-1" => "Europe (Ireland)",
        "eu-west-2" => "Europe (London)",
        "eu-west-3" => "Europe (Paris)",
        "il-central-1" => "Israel (Tel Aviv)",
        "me-central-1" => "Middle East (UAE)",
        "me-south-1" => "Middle East (Bahrain)",
        "mx-central-1" => "Mexico (Central)",
        "sa-east-1" => "South America (Sao Paulo)",
        "us-east-1" => "US East (N. Virginia)",
        "us-east-2" => "US East (Ohio)",
        "us-west-1" => "US West (N. California)",
        "us-west-2" => "US West (Oregon)",
        _ => "Unknown region",
    }
}

/// Operator decisions taken while enabling a region.
pub trait OptInPrompt: Send + Sync {
    /// Whether to request opt-in for a region that is not enabled.
    fn confirm_enable(&self, region: &str, status: &OptInStatus) -> bool;

    /// Whether to go ahead although the region never reported `opted-in`.
    fn force_continue(&self, region: &str) -> bool;
}

/// How a region became usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Already enabled, or the wait converged.
    Ready,
    /// The wait did not converge and the operator chose to continue.
    Forced,
}

/// Account error codes meaning the region is already enabled or enabling.
const OPT_IN_IN_PROGRESS_CODES: &[&str] = &[
    "ValidationException",
    "ResourceAlreadyExists",
    "ResourceAlreadyExistsException",
    "ConflictException",
];

/// Make `region` usable, enabling it if the operator agrees.
///
/// # Errors
/// Returns [`CloudError::Cancelled`] if the operator declines or cancels the
/// wait, [`CloudError::Timeout`] if the region never becomes ready and the
/// operator does not force-continue, or any API error.
pub async fn ensure_region_opt_in(
    client: &AwsClient,
    region: &RegionInfo,
    prompt: &dyn OptInPrompt,
    waiter: &Waiter,
) -> Result<Readiness, CloudError> {
    if region.opt_in.is_ready() {
        return Ok(Readiness::Ready);
    }
    warn!(region = %region.name, status = %region.opt_in, "Region is not enabled");

    if region.opt_in != OptInStatus::Enabling {
        if !prompt.confirm_enable(&region.name, &region.opt_in) {
            return Err(CloudError::Cancelled(format!("opt-in of region {}", region.name)));
        }
        match Account::new(client).enable_region(&region.name).await {
            Ok(()) => info!(region = %region.name, "Requested region opt-in"),
            Err(e) if e.code().is_some_and(|c| OPT_IN_IN_PROGRESS_CODES.contains(&c)) => {
                warn!(region = %region.name, error = %e, "Region state unchanged, continuing");
            }
            Err(e) => return Err(e),
        }
    }

    let target = format!("region {} to be enabled", region.name);
    let outcome = ensure_ready(client, &region.name, waiter).await?;
    let policy = ForceContinue::BestEffort;
    if policy.permits(&outcome) {
        Ok(Readiness::Ready)
    } else if outcome.is_cancelled() {
        Err(CloudError::Cancelled(target))
    } else if policy.may_override(&outcome) && prompt.force_continue(&region.name) {
        warn!(region = %region.name, "Continuing without confirmed opt-in");
        Ok(Readiness::Forced)
    } else {
        Err(CloudError::Timeout(target))
    }
}

/// Poll until `region` reports `opted-in`.
///
/// # Errors
/// Returns error if the wait itself is invalid.
pub async fn ensure_ready(
    client: &AwsClient,
    region: &str,
    waiter: &Waiter,
) -> Result<ConvergenceOutcome<RegionItem, CloudError>, CloudError> {
    let ec2 = Ec2::new(client, &client.config().bootstrap_region);
    let request = ConvergenceRequest::new(
        ResourceKind::RegionOptIn,
        format!("region {region} to be enabled"),
        |r: &RegionItem| r.opt_in_status.as_deref() == Some("opted-in"),
    );
    waiter
        .run(
            request,
            |r: &RegionItem| OptInStatus::from_api(r.opt_in_status.as_deref()).to_string(),
            || ec2.describe_region(region),
        )
        .await
}
