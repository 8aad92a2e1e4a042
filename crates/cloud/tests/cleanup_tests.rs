//! Destructive follow-ups only run after the preceding wait converged.

use std::time::Duration;

use awsmgr_cloud::providers::ec2::{terminate_when_running, Ec2};
use awsmgr_cloud::providers::lightsail::Lightsail;
use awsmgr_cloud::regions::{ensure_region_opt_in, OptInPrompt, Readiness};
use awsmgr_cloud::starter::{run_database_task, run_function_task, Rds};
use awsmgr_cloud::{AwsClient, ClientConfig, CloudError, Credentials, OptInStatus, RegionInfo, Waiter};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> AwsClient {
    let credentials = Credentials::new("AKIDEXAMPLE", "secret").unwrap();
    AwsClient::new(&ClientConfig::new(credentials).with_endpoint_override(server.uri())).unwrap()
}

fn fast_waiter() -> Waiter {
    Waiter::new(CancellationToken::new()).with_interval(Duration::from_millis(5))
}

fn cancel_after(cancel: &CancellationToken, delay: Duration) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        cancel.cancel();
    });
}

fn ack(action: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(format!(
        "<{action}Response><return>true</return></{action}Response>"
    ))
}

fn lightsail_op(op: &str) -> wiremock::matchers::HeaderExactMatcher {
    header("x-amz-target", format!("Lightsail_20161128.{op}").as_str())
}

#[tokio::test]
async fn test_static_ip_kept_when_detach_never_converges() {
    let server = MockServer::start().await;
    Mock::given(lightsail_op("DetachStaticIp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(lightsail_op("GetStaticIp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "staticIp": {"name": "Static-web", "ipAddress": "3.3.3.3",
                         "attachedTo": "web", "isAttached": true}
        })))
        .expect(15)
        .mount(&server)
        .await;
    Mock::given(lightsail_op("ReleaseStaticIp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let released = Lightsail::new(&client_for(&server), "us-east-1")
        .detach_and_release_static_ip("Static-web", &fast_waiter())
        .await
        .unwrap();
    assert!(!released);
}

#[tokio::test]
async fn test_static_ip_released_after_detach() {
    let server = MockServer::start().await;
    Mock::given(lightsail_op("DetachStaticIp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    Mock::given(lightsail_op("GetStaticIp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "staticIp": {"name": "Static-web", "ipAddress": "3.3.3.3", "isAttached": false}
        })))
        .mount(&server)
        .await;
    Mock::given(lightsail_op("ReleaseStaticIp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let released = Lightsail::new(&client_for(&server), "us-east-1")
        .detach_and_release_static_ip("Static-web", &fast_waiter())
        .await
        .unwrap();
    assert!(released);
}

#[tokio::test]
async fn test_elastic_ip_kept_while_still_associated() {
    let server = MockServer::start().await;
    let associated = r"<DescribeAddressesResponse><addressesSet><item>
            <publicIp>54.1.2.3</publicIp><allocationId>eipalloc-1</allocationId>
            <associationId>eipassoc-1</associationId><instanceId>i-0abc</instanceId>
        </item></addressesSet></DescribeAddressesResponse>";
    Mock::given(method("POST"))
        .and(body_string_contains("Action=DescribeAddresses"))
        .respond_with(ResponseTemplate::new(200).set_body_string(associated))
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=DisassociateAddress"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<DisassociateAddressResponse><return>true</return></DisassociateAddressResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=ReleaseAddress"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ReleaseAddressResponse><return>true</return></ReleaseAddressResponse>",
        ))
        .expect(0)
        .mount(&server)
        .await;

    let cleanup = Ec2::new(&client_for(&server), "us-east-1")
        .release_instance_addresses("i-0abc", &fast_waiter())
        .await
        .unwrap();
    assert!(cleanup.released.is_empty());
    assert_eq!(cleanup.kept, vec!["54.1.2.3".to_string()]);
    assert!(!cleanup.is_complete());
}

#[tokio::test]
async fn test_database_wait_times_out_while_creating() {
    let server = MockServer::start().await;
    Mock::given(body_string_contains("Action=DescribeDBInstances"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CREATING_DB))
        .expect(30)
        .mount(&server)
        .await;

    let outcome = Rds::new(&client_for(&server), "us-east-1")
        .wait_available("db-abc123", &fast_waiter())
        .await
        .unwrap();
    assert!(outcome.is_timed_out());
    assert_eq!(outcome.last_snapshot().map(|db| db.status.as_str()), Some("creating"));
}

const CREATING_DB: &str = "<DescribeDBInstancesResponse><DescribeDBInstancesResult><DBInstances><DBInstance>\
     <DBInstanceIdentifier>db-abc123</DBInstanceIdentifier>\
     <DBInstanceStatus>creating</DBInstanceStatus>\
     </DBInstance></DBInstances></DescribeDBInstancesResult></DescribeDBInstancesResponse>";

#[tokio::test]
async fn test_database_never_deleted_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(body_string_contains("Action=CreateDBInstance"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<CreateDBInstanceResponse><CreateDBInstanceResult/></CreateDBInstanceResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=DescribeDBInstances"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CREATING_DB))
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=DeleteDBInstance"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<DeleteDBInstanceResponse><DeleteDBInstanceResult/></DeleteDBInstanceResponse>",
        ))
        .expect(0)
        .mount(&server)
        .await;

    let report = run_database_task(&client_for(&server), &fast_waiter())
        .await
        .unwrap();
    assert!(report.outcome.is_timed_out());
    assert!(!report.delete_requested);
}

fn instance_in_state(state: &str) -> String {
    format!(
        "<DescribeInstancesResponse><reservationSet><item><instancesSet><item>\
         <instanceId>i-0abc</instanceId><imageId>ami-1</imageId>\
         <instanceState><code>0</code><name>{state}</name></instanceState>\
         <instanceType>t3.micro</instanceType>\
         </item></instancesSet></item></reservationSet></DescribeInstancesResponse>"
    )
}

#[tokio::test]
async fn test_instance_not_terminated_until_running() {
    let server = MockServer::start().await;
    Mock::given(body_string_contains("Action=DescribeInstances"))
        .respond_with(ResponseTemplate::new(200).set_body_string(instance_in_state("pending")))
        .expect(40)
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=TerminateInstances"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<TerminateInstancesResponse><instancesSet/></TerminateInstancesResponse>",
        ))
        .expect(0)
        .mount(&server)
        .await;

    let ec2 = Ec2::new(&client_for(&server), "us-east-1");
    let outcome = terminate_when_running(&ec2, "i-0abc", &fast_waiter())
        .await
        .unwrap();
    assert!(outcome.is_timed_out());
    assert_eq!(outcome.last_snapshot().map(|i| i.state_name.as_str()), Some("pending"));
}

#[tokio::test]
async fn test_instance_terminated_once_running() {
    let server = MockServer::start().await;
    Mock::given(body_string_contains("Action=DescribeInstances"))
        .respond_with(ResponseTemplate::new(200).set_body_string(instance_in_state("running")))
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=TerminateInstances"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<TerminateInstancesResponse><instancesSet/></TerminateInstancesResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let ec2 = Ec2::new(&client_for(&server), "us-east-1");
    let outcome = terminate_when_running(&ec2, "i-0abc", &fast_waiter())
        .await
        .unwrap();
    assert!(outcome.is_converged());
}

fn attached_static_ips() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "staticIps": [{"name": "Static-web", "ipAddress": "3.3.3.3",
                       "attachedTo": "web", "isAttached": true}]
    }))
}

#[tokio::test]
async fn test_cancelled_delete_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(lightsail_op("GetStaticIps"))
        .respond_with(attached_static_ips())
        .mount(&server)
        .await;
    for op in ["DetachStaticIp", "ReleaseStaticIp", "DeleteInstance"] {
        Mock::given(lightsail_op(op))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;
    }

    let cancel = CancellationToken::new();
    cancel.cancel();
    let waiter = Waiter::new(cancel).with_interval(Duration::from_millis(5));
    let err = Lightsail::new(&client_for(&server), "us-east-1")
        .delete_instance_and_static_ip("web", &waiter)
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Cancelled(_)));
}

#[tokio::test]
async fn test_cancel_during_detach_keeps_instance() {
    let server = MockServer::start().await;
    Mock::given(lightsail_op("GetStaticIps"))
        .respond_with(attached_static_ips())
        .mount(&server)
        .await;
    Mock::given(lightsail_op("DetachStaticIp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(lightsail_op("GetStaticIp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "staticIp": {"name": "Static-web", "ipAddress": "3.3.3.3",
                         "attachedTo": "web", "isAttached": true}
        })))
        .mount(&server)
        .await;
    for op in ["ReleaseStaticIp", "DeleteInstance"] {
        Mock::given(lightsail_op(op))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;
    }

    let cancel = CancellationToken::new();
    let waiter = Waiter::new(cancel.clone()).with_interval(Duration::from_millis(5));
    cancel_after(&cancel, Duration::from_millis(12));
    let err = Lightsail::new(&client_for(&server), "us-east-1")
        .delete_instance_and_static_ip("web", &waiter)
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Cancelled(ref target) if target.contains("Static-web")));
}

#[tokio::test]
async fn test_cancel_during_address_cleanup_skips_terminate() {
    let server = MockServer::start().await;
    let both_associated = r"<DescribeAddressesResponse><addressesSet>
        <item><publicIp>54.1.2.3</publicIp><allocationId>eipalloc-1</allocationId>
            <associationId>eipassoc-1</associationId><instanceId>i-0abc</instanceId></item>
        <item><publicIp>54.1.2.4</publicIp><allocationId>eipalloc-2</allocationId>
            <associationId>eipassoc-2</associationId><instanceId>i-0abc</instanceId></item>
        </addressesSet></DescribeAddressesResponse>";
    Mock::given(body_string_contains("Action=DescribeAddresses"))
        .respond_with(ResponseTemplate::new(200).set_body_string(both_associated))
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=DisassociateAddress"))
        .and(body_string_contains("AssociationId=eipassoc-1"))
        .respond_with(ack("DisassociateAddress"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=DisassociateAddress"))
        .and(body_string_contains("AssociationId=eipassoc-2"))
        .respond_with(ack("DisassociateAddress"))
        .expect(0)
        .mount(&server)
        .await;
    for action in ["ReleaseAddress", "TerminateInstances"] {
        Mock::given(body_string_contains(format!("Action={action}").as_str()))
            .respond_with(ack(action))
            .expect(0)
            .mount(&server)
            .await;
    }

    let cancel = CancellationToken::new();
    let waiter = Waiter::new(cancel.clone()).with_interval(Duration::from_millis(5));
    cancel_after(&cancel, Duration::from_millis(12));
    let err = Ec2::new(&client_for(&server), "us-east-1")
        .release_addresses_and_terminate("i-0abc", &waiter)
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Cancelled(ref target) if target.contains("54.1.2.3")));
}

#[tokio::test]
async fn test_ipv6_setup_times_out_while_associating() {
    let server = MockServer::start().await;
    Mock::given(body_string_contains("Action=DescribeVpcs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<DescribeVpcsResponse><vpcSet><item><vpcId>vpc-1</vpcId><isDefault>true</isDefault>\
             <ipv6CidrBlockAssociationSet><item><associationId>a-1</associationId>\
             <ipv6CidrBlock>2600:1f18:aa:bb00::/56</ipv6CidrBlock>\
             <ipv6CidrBlockState><state>associating</state></ipv6CidrBlockState></item>\
             </ipv6CidrBlockAssociationSet></item></vpcSet></DescribeVpcsResponse>",
        ))
        .expect(11)
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=AssociateVpcCidrBlock"))
        .respond_with(ack("AssociateVpcCidrBlock"))
        .expect(1)
        .mount(&server)
        .await;
    for action in ["DescribeSubnets", "AssociateSubnetCidrBlock", "ModifySubnetAttribute"] {
        Mock::given(body_string_contains(format!("Action={action}").as_str()))
            .respond_with(ack(action))
            .expect(0)
            .mount(&server)
            .await;
    }

    let err = Ec2::new(&client_for(&server), "us-east-1")
        .setup_ipv6("vpc-1", &fast_waiter())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Timeout(ref target) if target.contains("vpc-1")));
}

async fn mount_iam_role(server: &MockServer, deletes: u64) {
    Mock::given(body_string_contains("Action=CreateRole"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<CreateRoleResponse><CreateRoleResult><Role>\
             <RoleName>AutoLambdaRole-abcde</RoleName>\
             <Arn>arn:aws:iam::123456789012:role/AutoLambdaRole-abcde</Arn>\
             </Role></CreateRoleResult></CreateRoleResponse>",
        ))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(body_string_contains("Action=DeleteRole"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<DeleteRoleResponse><ResponseMetadata/></DeleteRoleResponse>",
        ))
        .expect(deletes)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_role_deleted_when_function_creation_fails() {
    let server = MockServer::start().await;
    mount_iam_role(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/2015-03-31/functions"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-amzn-ErrorType", "InvalidParameterValueException")
                .set_body_json(serde_json::json!({
                    "Type": "User",
                    "message": "The runtime parameter of python3.12 is not supported"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = run_function_task(&client_for(&server), &fast_waiter())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Api { ref code, .. } if code == "InvalidParameterValueException"));
}

#[tokio::test]
async fn test_function_invoked_and_deleted_once_active() {
    let server = MockServer::start().await;
    mount_iam_role(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/2015-03-31/functions"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-amzn-ErrorType", "InvalidParameterValueException")
                .set_body_json(serde_json::json!({
                    "message": "The role defined for the function cannot be assumed by Lambda."
                })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2015-03-31/functions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "FunctionName": "AutoFunc-abcde", "State": "Pending"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/2015-03-31/functions/AutoFunc-[a-z0-9]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Configuration": {"FunctionName": "AutoFunc-abcde", "State": "Active"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/2015-03-31/functions/AutoFunc-[a-z0-9]+/invocations$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"Hello from awsmgr\""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/2015-03-31/functions/AutoFunc-[a-z0-9]+$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let report = run_function_task(&client_for(&server), &fast_waiter())
        .await
        .unwrap();
    assert!(report.outcome.is_converged());
    assert!(report.cleaned_up);
    assert_eq!(report.response, Some(serde_json::json!("Hello from awsmgr")));
}

struct Answers {
    enable: bool,
    force: bool,
}

impl OptInPrompt for Answers {
    fn confirm_enable(&self, _region: &str, _status: &OptInStatus) -> bool {
        self.enable
    }

    fn force_continue(&self, _region: &str) -> bool {
        self.force
    }
}

fn not_opted_in() -> RegionInfo {
    RegionInfo {
        name: "af-south-1".to_string(),
        opt_in: OptInStatus::NotOptedIn,
    }
}

#[tokio::test]
async fn test_opt_in_continues_after_validation_exception() {
    let server = MockServer::start().await;
    Mock::given(path("/enableRegion"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "__type": "ValidationException",
            "message": "Region is already enabling"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=DescribeRegions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<DescribeRegionsResponse><regionInfo><item><regionName>af-south-1</regionName>\
             <optInStatus>opted-in</optInStatus></item></regionInfo></DescribeRegionsResponse>",
        ))
        .mount(&server)
        .await;

    let readiness = ensure_region_opt_in(
        &client_for(&server),
        &not_opted_in(),
        &Answers {
            enable: true,
            force: false,
        },
        &fast_waiter(),
    )
    .await
    .unwrap();
    assert_eq!(readiness, Readiness::Ready);
}

#[tokio::test]
async fn test_declined_opt_in_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = ensure_region_opt_in(
        &client_for(&server),
        &not_opted_in(),
        &Answers {
            enable: false,
            force: true,
        },
        &fast_waiter(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CloudError::Cancelled(_)));
}

#[tokio::test]
async fn test_opt_in_timeout_respects_force_continue() {
    let server = MockServer::start().await;
    Mock::given(path("/enableRegion"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;
    Mock::given(body_string_contains("Action=DescribeRegions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<DescribeRegionsResponse><regionInfo><item><regionName>af-south-1</regionName>\
             <optInStatus>enabling</optInStatus></item></regionInfo></DescribeRegionsResponse>",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let forced = ensure_region_opt_in(
        &client,
        &not_opted_in(),
        &Answers {
            enable: true,
            force: true,
        },
        &fast_waiter(),
    )
    .await
    .unwrap();
    assert_eq!(forced, Readiness::Forced);

    let err = ensure_region_opt_in(
        &client,
        &not_opted_in(),
        &Answers {
            enable: true,
            force: false,
        },
        &fast_waiter(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CloudError::Timeout(ref target) if target.contains("af-south-1")));
}
