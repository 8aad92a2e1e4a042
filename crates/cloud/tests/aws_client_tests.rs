//! HTTP-level tests of the signed AWS client against a local mock server.

use awsmgr_cloud::account::Account;
use awsmgr_cloud::providers::ec2::Ec2;
use awsmgr_cloud::providers::lightsail::Lightsail;
use awsmgr_cloud::starter::{create_budget, BudgetResult};
use awsmgr_cloud::{AwsClient, ClientConfig, CloudError, ComputeProvider, Credentials};
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> AwsClient {
    let credentials = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .unwrap()
        .with_session_token(Some("session-token".to_string()));
    let config = ClientConfig::new(credentials).with_endpoint_override(server.uri());
    AwsClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_query_request_is_signed_and_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .and(header("x-amz-security-token", "session-token"))
        .and(body_string_contains("Action=DescribeRegions"))
        .and(body_string_contains("Version=2016-11-15"))
        .and(body_string_contains("AllRegions=true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<DescribeRegionsResponse xmlns="http://ec2.amazonaws.com/doc/2016-11-15/">
                 <requestId>req-1</requestId>
                 <regionInfo>
                   <item><regionName>us-east-1</regionName><optInStatus>opt-in-not-required</optInStatus></item>
                   <item><regionName>af-south-1</regionName><optInStatus>not-opted-in</optInStatus></item>
                 </regionInfo>
               </DescribeRegionsResponse>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let regions = Ec2::new(&client_for(&server), "us-east-1")
        .describe_regions()
        .await
        .unwrap();
    let names: Vec<&str> = regions.iter().map(|r| r.region_name.as_str()).collect();
    assert_eq!(names, vec!["us-east-1", "af-south-1"]);
    assert_eq!(regions[1].opt_in_status.as_deref(), Some("not-opted-in"));
}

#[tokio::test]
async fn test_query_not_found_error_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=DescribeInstances"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "<Response><Errors><Error><Code>InvalidInstanceID.NotFound</Code>\
             <Message>The instance ID 'i-0abc' does not exist</Message></Error></Errors>\
             <RequestID>req-2</RequestID></Response>",
        ))
        .mount(&server)
        .await;

    let err = Ec2::new(&client_for(&server), "us-east-1")
        .get_instance("i-0abc")
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::NotFound(ref m) if m.contains("i-0abc")));
}

#[tokio::test]
async fn test_forbidden_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=GetCallerIdentity"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<ErrorResponse><Error><Type>Sender</Type><Code>InvalidClientTokenId</Code>\
             <Message>The security token included in the request is invalid.</Message>\
             </Error><RequestId>r-1</RequestId></ErrorResponse>",
        ))
        .mount(&server)
        .await;

    let err = Account::new(&client_for(&server))
        .caller_identity()
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Auth(ref m) if m.starts_with("InvalidClientTokenId")));
}

#[tokio::test]
async fn test_json_target_header_and_throttling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "Lightsail_20161128.GetRegions"))
        .and(header("content-type", "application/x-amz-json-1.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "regions": [
                {"name": "us-west-2", "displayName": "Oregon"},
                {"name": "ap-northeast-1", "displayName": "Tokyo"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "Lightsail_20161128.GetInstances"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "__type": "ThrottlingException",
            "message": "Rate exceeded"
        })))
        .mount(&server)
        .await;

    let lightsail = Lightsail::new(&client_for(&server), "us-east-1");
    assert_eq!(
        lightsail.region_names().await.unwrap(),
        vec!["ap-northeast-1".to_string(), "us-west-2".to_string()]
    );

    let err = lightsail.list_instances().await.unwrap_err();
    assert_eq!(err.code(), Some("ThrottlingException"));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_rest_json_error_type_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enableRegion"))
        .and(body_string_contains("\"RegionName\":\"af-south-1\""))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-amzn-ErrorType", "ValidationException:http://internal")
                .set_body_json(serde_json::json!({ "message": "Region is already enabled" })),
        )
        .mount(&server)
        .await;

    let err = Account::new(&client_for(&server))
        .enable_region("af-south-1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("ValidationException"));
}

#[tokio::test]
async fn test_duplicate_budget_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "AWSBudgetServiceGateway.CreateBudget"))
        .and(body_string_contains("\"AccountId\":\"123456789012\""))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "__type": "DuplicateRecordException",
            "Message": "the budget already exists"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = create_budget(&client_for(&server), "123456789012")
        .await
        .unwrap();
    assert_eq!(result, BudgetResult::AlreadyExists);
}
