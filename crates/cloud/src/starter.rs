//! Starter-credit tasks: a cost budget, a short-lived EC2 instance, a
//! short-lived Lambda function and a short-lived RDS database, all in
//! `us-east-1`.

use std::fmt;
use std::io::{Cursor, Write};
use std::time::Duration;

use base64::Engine;
use converge::{
    Bound, ConvergenceOutcome, ConvergenceRequest, ErrorPolicy, ForceContinue, ResourceKind,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::aws::{AwsClient, Endpoint, QueryParams};
use crate::catalog::{Architecture, AMAZON_LINUX_2023};
use crate::providers::ec2::{terminate_when_running, Ec2, RunInstancesRequest};
use crate::providers::{CloudError, Instance};
use crate::wait::Waiter;

const BUDGETS_TARGET: &str = "AWSBudgetServiceGateway.CreateBudget";
const RDS_API_VERSION: &str = "2014-10-31";
const IAM_API_VERSION: &str = "2010-05-08";
const LAMBDA_FUNCTIONS_PATH: &str = "/2015-03-31/functions";

/// Region the starter tasks run in.
pub const STARTER_REGION: &str = "us-east-1";

/// Monthly budget limit in USD.
pub const BUDGET_LIMIT_USD: &str = "10.0";
/// Alert threshold, percent of the limit.
pub const BUDGET_ALERT_PERCENT: f64 = 80.0;
/// Instance type of the EC2 task.
pub const STARTER_INSTANCE_TYPE: &str = "t3.micro";
/// Instance class of the RDS task.
pub const STARTER_DB_CLASS: &str = "db.t3.micro";
/// Runtime of the Lambda task.
pub const STARTER_FUNCTION_RUNTIME: &str = "python3.12";

/// One starter task, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarterTask {
    Budget,
    Ec2,
    Function,
    Database,
}

impl StarterTask {
    pub const ALL: [Self; 4] = [Self::Budget, Self::Ec2, Self::Function, Self::Database];
}

impl fmt::Display for StarterTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Budget => f.write_str("Set up a cost budget"),
            Self::Ec2 => f.write_str("Launch and terminate an EC2 instance"),
            Self::Function => f.write_str("Create, invoke and delete a Lambda function"),
            Self::Database => f.write_str("Create and delete an RDS database"),
        }
    }
}

/// Random lowercase suffix for resource names.
#[must_use]
pub fn random_suffix(len: usize) -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(len)
        .collect()
}

// ============================================================================
// Budget
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateBudgetRequest<'a> {
    account_id: &'a str,
    budget: Budget<'a>,
    notifications_with_subscribers: Vec<NotificationWithSubscribers<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Budget<'a> {
    budget_name: &'a str,
    budget_type: &'static str,
    time_unit: &'static str,
    budget_limit: Spend,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Spend {
    amount: &'static str,
    unit: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct NotificationWithSubscribers<'a> {
    notification: Notification,
    subscribers: Vec<Subscriber<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Notification {
    notification_type: &'static str,
    comparison_operator: &'static str,
    threshold: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Subscriber<'a> {
    subscription_type: &'static str,
    address: &'a str,
}

/// Result of the budget task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetResult {
    Created { name: String },
    AlreadyExists,
}

/// Create a monthly cost budget with an email alert at 80 % of actual spend.
///
/// # Errors
/// Returns error if the API call fails for any reason other than a duplicate.
pub async fn create_budget(client: &AwsClient, account_id: &str) -> Result<BudgetResult, CloudError> {
    let name = format!("AutoBudget-{}", random_suffix(6));
    let email = format!("alert-{}@example.com", random_suffix(4));
    let request = CreateBudgetRequest {
        account_id,
        budget: Budget {
            budget_name: &name,
            budget_type: "COST",
            time_unit: "MONTHLY",
            budget_limit: Spend {
                amount: BUDGET_LIMIT_USD,
                unit: "USD",
            },
        },
        notifications_with_subscribers: vec![NotificationWithSubscribers {
            notification: Notification {
                notification_type: "ACTUAL",
                comparison_operator: "GREATER_THAN",
                threshold: BUDGET_ALERT_PERCENT,
            },
            subscribers: vec![Subscriber {
                subscription_type: "EMAIL",
                address: &email,
            }],
        }],
    };

    let endpoint = Endpoint::global("budgets", "budgets.amazonaws.com", STARTER_REGION);
    match client
        .json::<serde_json::Value, _>(&endpoint, BUDGETS_TARGET, &request)
        .await
    {
        Ok(_) => {
            info!(budget = %name, "Budget created");
            Ok(BudgetResult::Created { name })
        }
        Err(e) if e.code().is_some_and(|c| c.contains("Duplicate")) => {
            info!("Budget already exists");
            Ok(BudgetResult::AlreadyExists)
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// EC2
// ============================================================================

/// Result of the EC2 task.
#[derive(Debug)]
pub struct Ec2TaskReport {
    pub instance_id: String,
    pub outcome: ConvergenceOutcome<Instance, CloudError>,
}

impl Ec2TaskReport {
    /// Whether the instance was terminated.
    #[must_use]
    pub fn terminated(&self) -> bool {
        self.outcome.is_converged()
    }
}

/// Launch a t3.micro on Amazon Linux 2023, wait for it to run, terminate it.
///
/// The instance is terminated only after it was seen running.
///
/// # Errors
/// Returns error if no image is found or an API call fails.
pub async fn run_ec2_task(client: &AwsClient, waiter: &Waiter) -> Result<Ec2TaskReport, CloudError> {
    let ec2 = Ec2::new(client, STARTER_REGION);
    let image = ec2
        .latest_image(
            AMAZON_LINUX_2023.owner,
            AMAZON_LINUX_2023.pattern,
            Architecture::X86_64.as_str(),
        )
        .await?
        .ok_or_else(|| CloudError::NotFound(format!("no {} image", AMAZON_LINUX_2023.name)))?;

    let launched = ec2
        .run_instances(&RunInstancesRequest::new(image.image_id, STARTER_INSTANCE_TYPE))
        .await?;
    let instance_id = launched
        .into_iter()
        .next()
        .map(|i| i.id)
        .ok_or_else(|| CloudError::NotFound("RunInstances returned no instance".to_string()))?;

    let outcome = terminate_when_running(&ec2, &instance_id, waiter).await?;
    Ok(Ec2TaskReport {
        instance_id,
        outcome,
    })
}

// ============================================================================
// Lambda
// ============================================================================

const FUNCTION_FILE: &str = "lambda_function.py";
const FUNCTION_HANDLER: &str = "lambda_function.lambda_handler";
const FUNCTION_SOURCE: &str = "def lambda_handler(event, context):\n    return \"Hello from awsmgr\"\n";
const LAMBDA_TRUST_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"Service":"lambda.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#;

/// A fresh role is not assumable by Lambda for several seconds.
const ROLE_PROPAGATION_INTERVAL: Duration = Duration::from_secs(5);
const ROLE_PROPAGATION_ATTEMPTS: u32 = 6;
/// Pending -> Active.
const FUNCTION_ACTIVE_INTERVAL: Duration = Duration::from_secs(2);
const FUNCTION_ACTIVE_ATTEMPTS: u32 = 30;

#[derive(Debug, Deserialize)]
struct CreateRoleResponse {
    #[serde(rename = "CreateRoleResult")]
    result: CreateRoleResult,
}

#[derive(Debug, Deserialize)]
struct CreateRoleResult {
    #[serde(rename = "Role")]
    role: IamRole,
}

/// A created IAM role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IamRole {
    #[serde(rename = "RoleName")]
    pub name: String,
    #[serde(rename = "Arn")]
    pub arn: String,
}

#[derive(Debug, Deserialize)]
struct IamAck {}

/// Minimal IAM client for the function task's execution role.
#[derive(Clone, Debug)]
pub struct Iam {
    client: AwsClient,
    endpoint: Endpoint,
}

impl Iam {
    #[must_use]
    pub fn new(client: &AwsClient) -> Self {
        Self {
            client: client.clone(),
            endpoint: Endpoint::global("iam", "iam.amazonaws.com", STARTER_REGION),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        params: QueryParams,
    ) -> Result<T, CloudError> {
        self.client
            .query(&self.endpoint, action, IAM_API_VERSION, &params)
            .await
    }

    /// Create a role Lambda may assume.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn create_lambda_role(&self, name: &str) -> Result<IamRole, CloudError> {
        let response: CreateRoleResponse = self
            .call(
                "CreateRole",
                QueryParams::new()
                    .set("RoleName", name)
                    .set("AssumeRolePolicyDocument", LAMBDA_TRUST_POLICY),
            )
            .await?;
        info!(role = %name, "IAM role created");
        Ok(response.result.role)
    }

    /// # Errors
    /// Returns error if the API call fails.
    pub async fn delete_role(&self, name: &str) -> Result<(), CloudError> {
        let _: IamAck = self
            .call("DeleteRole", QueryParams::new().set("RoleName", name))
            .await?;
        info!(role = %name, "IAM role deleted");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateFunctionRequest<'a> {
    function_name: &'a str,
    runtime: &'static str,
    role: &'a str,
    handler: &'static str,
    code: FunctionCode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct FunctionCode {
    zip_file: String,
}

/// The parts of a function configuration the task reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionConfiguration {
    pub function_name: String,
    #[serde(default)]
    pub state: Option<String>,
}

impl FunctionConfiguration {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.as_deref() == Some("Active")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetFunctionResponse {
    configuration: FunctionConfiguration,
}

/// Minimal Lambda client for the function task.
#[derive(Clone, Debug)]
pub struct Lambda {
    client: AwsClient,
    endpoint: Endpoint,
}

impl Lambda {
    #[must_use]
    pub fn new(client: &AwsClient, region: &str) -> Self {
        Self {
            client: client.clone(),
            endpoint: Endpoint::regional("lambda", region),
        }
    }

    /// Create a Python function from a zip archive.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn create_function(
        &self,
        name: &str,
        role_arn: &str,
        archive: &[u8],
    ) -> Result<FunctionConfiguration, CloudError> {
        let request = CreateFunctionRequest {
            function_name: name,
            runtime: STARTER_FUNCTION_RUNTIME,
            role: role_arn,
            handler: FUNCTION_HANDLER,
            code: FunctionCode {
                zip_file: base64::engine::general_purpose::STANDARD.encode(archive),
            },
        };
        self.client
            .rest_json(&self.endpoint, Method::POST, LAMBDA_FUNCTIONS_PATH, &request)
            .await
    }

    /// # Errors
    /// Returns [`CloudError::NotFound`] if the function does not exist.
    pub async fn get_function(&self, name: &str) -> Result<FunctionConfiguration, CloudError> {
        let response: GetFunctionResponse = self
            .client
            .rest_json_no_body(
                &self.endpoint,
                Method::GET,
                &format!("{LAMBDA_FUNCTIONS_PATH}/{name}"),
            )
            .await?;
        Ok(response.configuration)
    }

    /// Invoke synchronously with an empty event and return the payload.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn invoke(&self, name: &str) -> Result<serde_json::Value, CloudError> {
        self.client
            .rest_json(
                &self.endpoint,
                Method::POST,
                &format!("{LAMBDA_FUNCTIONS_PATH}/{name}/invocations"),
                &serde_json::json!({}),
            )
            .await
    }

    /// # Errors
    /// Returns error if the API call fails.
    pub async fn delete_function(&self, name: &str) -> Result<(), CloudError> {
        self.client
            .rest_json_no_body::<serde_json::Value>(
                &self.endpoint,
                Method::DELETE,
                &format!("{LAMBDA_FUNCTIONS_PATH}/{name}"),
            )
            .await?;
        info!(function = %name, "Lambda function deleted");
        Ok(())
    }

    /// Retry `CreateFunction` until the new role is assumable.
    ///
    /// Any error other than the role not being assumable aborts the wait.
    ///
    /// # Errors
    /// Returns error if the wait itself is invalid.
    pub async fn create_function_when_role_ready(
        &self,
        name: &str,
        role_arn: &str,
        archive: &[u8],
        waiter: &Waiter,
    ) -> Result<ConvergenceOutcome<Option<FunctionConfiguration>, CloudError>, CloudError> {
        let request = ConvergenceRequest::new(
            ResourceKind::Other,
            format!("function {name} to be created"),
            |created: &Option<FunctionConfiguration>| created.is_some(),
        )
        .with_interval(ROLE_PROPAGATION_INTERVAL)
        .with_bound(Bound::Attempts(ROLE_PROPAGATION_ATTEMPTS))
        .with_error_policy(ErrorPolicy::Abort);
        waiter
            .run(
                request,
                |_: &Option<FunctionConfiguration>| "role not assumable yet".to_string(),
                move || async move {
                    match self.create_function(name, role_arn, archive).await {
                        Ok(function) => Ok(Some(function)),
                        Err(e) if role_not_assumable(&e) => Ok(None),
                        Err(e) => Err(e),
                    }
                },
            )
            .await
    }

    /// Poll until the function is `Active`.
    ///
    /// # Errors
    /// Returns error if the wait itself is invalid.
    pub async fn wait_active(
        &self,
        name: &str,
        waiter: &Waiter,
    ) -> Result<ConvergenceOutcome<FunctionConfiguration, CloudError>, CloudError> {
        let request = ConvergenceRequest::new(
            ResourceKind::Other,
            format!("function {name} to become active"),
            FunctionConfiguration::is_active,
        )
        .with_interval(FUNCTION_ACTIVE_INTERVAL)
        .with_bound(Bound::Attempts(FUNCTION_ACTIVE_ATTEMPTS));
        waiter
            .run(
                request,
                |f: &FunctionConfiguration| f.state.clone().unwrap_or_else(|| "unknown".to_string()),
                || self.get_function(name),
            )
            .await
    }
}

fn role_not_assumable(error: &CloudError) -> bool {
    matches!(
        error,
        CloudError::Api { code, message, .. }
            if code == "InvalidParameterValueException" && message.contains("assumed")
    )
}

/// Zip archive holding the handler source.
///
/// # Errors
/// Returns [`CloudError::Archive`] if the archive cannot be written.
pub fn function_archive() -> Result<Vec<u8>, CloudError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file(FUNCTION_FILE, options)?;
    writer
        .write_all(FUNCTION_SOURCE.as_bytes())
        .map_err(ZipError::from)?;
    Ok(writer.finish()?.into_inner())
}

/// Result of the Lambda task.
#[derive(Debug)]
pub struct FunctionTaskReport {
    pub function_name: String,
    pub role_name: String,
    pub outcome: ConvergenceOutcome<FunctionConfiguration, CloudError>,
    /// Payload returned by the invocation, when it ran and succeeded.
    pub response: Option<serde_json::Value>,
    /// The function and its role were deleted.
    pub cleaned_up: bool,
}

/// Create a role and a Python function, wait for it to be active, invoke
/// it, then delete both.
///
/// The role is deleted when the function cannot be created. The function is
/// invoked and deleted only after it was seen `Active`; otherwise both are
/// left for the operator to remove.
///
/// # Errors
/// Returns [`CloudError::Cancelled`] if the operator cancels while the
/// function is being created, or any API error.
pub async fn run_function_task(
    client: &AwsClient,
    waiter: &Waiter,
) -> Result<FunctionTaskReport, CloudError> {
    let iam = Iam::new(client);
    let lambda = Lambda::new(client, STARTER_REGION);
    let role_name = format!("AutoLambdaRole-{}", random_suffix(5));
    let function_name = format!("AutoFunc-{}", random_suffix(5));
    let archive = function_archive()?;

    let role = iam.create_lambda_role(&role_name).await?;
    let target = format!("function {function_name} to be created");
    let created = match lambda
        .create_function_when_role_ready(&function_name, &role.arn, &archive, waiter)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return Err(discard_role(&iam, &role_name, e).await),
    };
    CloudError::stop_if_cancelled(&created, &target)?;
    if let Err(e) = CloudError::from_outcome(created, &target) {
        return Err(discard_role(&iam, &role_name, e).await);
    }
    info!(function = %function_name, "Lambda function created");

    let outcome = lambda.wait_active(&function_name, waiter).await?;
    if !ForceContinue::Destructive.permits(&outcome) {
        warn!(
            function = %function_name,
            role = %role_name,
            outcome = outcome.label(),
            "Function not active, delete it and its role manually"
        );
        return Ok(FunctionTaskReport {
            function_name,
            role_name,
            outcome,
            response: None,
            cleaned_up: false,
        });
    }

    let response = match lambda.invoke(&function_name).await {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(function = %function_name, error = %e, "Invocation failed");
            None
        }
    };
    lambda.delete_function(&function_name).await?;
    iam.delete_role(&role_name).await?;

    Ok(FunctionTaskReport {
        function_name,
        role_name,
        outcome,
        response,
        cleaned_up: true,
    })
}

async fn discard_role(iam: &Iam, role_name: &str, cause: CloudError) -> CloudError {
    warn!(role = %role_name, error = %cause, "Function not created, deleting its role");
    if let Err(e) = iam.delete_role(role_name).await {
        warn!(role = %role_name, error = %e, "Role deletion failed, delete it manually");
    }
    cause
}

// ============================================================================
// RDS
// ============================================================================

#[derive(Debug, Deserialize)]
struct DescribeDbInstancesResponse {
    #[serde(rename = "DescribeDBInstancesResult")]
    result: DescribeDbInstancesResult,
}

#[derive(Debug, Deserialize)]
struct DescribeDbInstancesResult {
    #[serde(rename = "DBInstances", default)]
    instances: DbInstanceList,
}

#[derive(Debug, Default, Deserialize)]
struct DbInstanceList {
    #[serde(rename = "DBInstance", default)]
    items: Vec<DbInstance>,
}

/// The parts of an RDS instance the task reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbInstance {
    #[serde(rename = "DBInstanceIdentifier")]
    pub identifier: String,
    #[serde(rename = "DBInstanceStatus", default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct RdsAck {}

/// Result of the RDS task.
#[derive(Debug)]
pub struct DatabaseTaskReport {
    pub identifier: String,
    pub outcome: ConvergenceOutcome<DbInstance, CloudError>,
    /// `DeleteDBInstance` was accepted.
    pub delete_requested: bool,
}

/// Minimal RDS client for the database task.
#[derive(Clone, Debug)]
pub struct Rds {
    client: AwsClient,
    endpoint: Endpoint,
}

impl Rds {
    #[must_use]
    pub fn new(client: &AwsClient, region: &str) -> Self {
        Self {
            client: client.clone(),
            endpoint: Endpoint::regional("rds", region),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        params: QueryParams,
    ) -> Result<T, CloudError> {
        self.client
            .query(&self.endpoint, action, RDS_API_VERSION, &params)
            .await
    }

    /// Create a 20 GiB MySQL instance with backups off.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn create_mysql(&self, identifier: &str, password: &str) -> Result<(), CloudError> {
        let _: RdsAck = self
            .call(
                "CreateDBInstance",
                QueryParams::new()
                    .set("DBInstanceIdentifier", identifier)
                    .set("DBInstanceClass", STARTER_DB_CLASS)
                    .set("Engine", "mysql")
                    .set("MasterUsername", "admin")
                    .set("MasterUserPassword", password)
                    .set("AllocatedStorage", 20)
                    .set("BackupRetentionPeriod", 0),
            )
            .await?;
        info!(identifier, "RDS instance creation requested");
        Ok(())
    }

    /// Current state of one instance.
    ///
    /// # Errors
    /// Returns [`CloudError::NotFound`] if the instance does not exist.
    pub async fn describe(&self, identifier: &str) -> Result<DbInstance, CloudError> {
        let response: DescribeDbInstancesResponse = self
            .call(
                "DescribeDBInstances",
                QueryParams::new().set("DBInstanceIdentifier", identifier),
            )
            .await?;
        response
            .result
            .instances
            .items
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::NotFound(format!("DB instance not found: {identifier}")))
    }

    /// Delete without a final snapshot.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn delete(&self, identifier: &str) -> Result<(), CloudError> {
        let _: RdsAck = self
            .call(
                "DeleteDBInstance",
                QueryParams::new()
                    .set("DBInstanceIdentifier", identifier)
                    .set("SkipFinalSnapshot", true),
            )
            .await?;
        info!(identifier, "RDS instance deletion requested");
        Ok(())
    }

    /// Poll until the instance is `available`.
    ///
    /// # Errors
    /// Returns error if the wait itself is invalid.
    pub async fn wait_available(
        &self,
        identifier: &str,
        waiter: &Waiter,
    ) -> Result<ConvergenceOutcome<DbInstance, CloudError>, CloudError> {
        let request = ConvergenceRequest::new(
            ResourceKind::DatabaseAvailability,
            format!("database {identifier} to become available"),
            |db: &DbInstance| db.status == "available",
        );
        waiter
            .run(request, |db: &DbInstance| db.status.clone(), || {
                self.describe(identifier)
            })
            .await
    }
}

/// Create a MySQL instance, wait for it, then delete it.
///
/// Deletion happens only after the instance was seen `available`; otherwise
/// the database is left for the operator to remove.
///
/// # Errors
/// Returns error if creation or deletion fails.
pub async fn run_database_task(
    client: &AwsClient,
    waiter: &Waiter,
) -> Result<DatabaseTaskReport, CloudError> {
    let rds = Rds::new(client, STARTER_REGION);
    let identifier = format!("db-{}", random_suffix(6));
    let password = format!("Pw{}", random_suffix(18));
    rds.create_mysql(&identifier, &password).await?;

    let outcome = rds.wait_available(&identifier, waiter).await?;
    let delete_requested = if ForceContinue::Destructive.permits(&outcome) {
        rds.delete(&identifier).await?;
        true
    } else {
        warn!(
            identifier = %identifier,
            outcome = outcome.label(),
            "Database may still be creating, delete it manually"
        );
        false
    };

    Ok(DatabaseTaskReport {
        identifier,
        outcome,
        delete_requested,
    })
}
