//! Region fan-out merging.

use std::time::Duration;

use converge::{fan_out, PartitionFailure};

#[tokio::test(start_paused = true)]
async fn test_union_is_sorted_by_region_regardless_of_finish_order() {
    let report = fan_out(["us-west-2", "ap-south-1", "eu-central-1"], |region| async move {
        // The first region alphabetically answers last.
        let delay = match region.as_str() {
            "ap-south-1" => 30,
            "eu-central-1" => 20,
            _ => 10,
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok::<_, String>(vec![format!("{region}-a"), format!("{region}-b")])
    })
    .await;

    let rows: Vec<(&str, &str)> = report
        .rows
        .iter()
        .map(|r| (r.region.as_str(), r.item.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("ap-south-1", "ap-south-1-a"),
            ("ap-south-1", "ap-south-1-b"),
            ("eu-central-1", "eu-central-1-a"),
            ("eu-central-1", "eu-central-1-b"),
            ("us-west-2", "us-west-2-a"),
            ("us-west-2", "us-west-2-b"),
        ]
    );
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn test_failed_partition_is_omitted_and_reported() {
    let report = fan_out(["us-east-1", "me-south-1", "eu-west-1"], |region| async move {
        if region == "me-south-1" {
            Err("AuthFailure: region not enabled".to_string())
        } else {
            Ok(vec![1_u32])
        }
    })
    .await;

    let regions: Vec<&str> = report.rows.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(regions, vec!["eu-west-1", "us-east-1"]);
    assert_eq!(
        report.failed,
        vec![PartitionFailure {
            region: "me-south-1".to_string(),
            error: "AuthFailure: region not enabled".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_empty_partitions_contribute_nothing() {
    let report = fan_out(["us-east-1", "eu-west-1"], |region| async move {
        if region == "us-east-1" {
            Ok::<_, String>(Vec::<u8>::new())
        } else {
            Ok(vec![7])
        }
    })
    .await;

    assert_eq!(report.len(), 1);
    assert_eq!(report.rows[0].region, "eu-west-1");
}

#[tokio::test]
async fn test_panicking_partition_is_reported_as_failure() {
    let report = fan_out(["us-east-1", "eu-west-1"], |region| async move {
        assert!(region != "eu-west-1", "boom");
        Ok::<_, String>(vec![region])
    })
    .await;

    assert_eq!(report.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].region, "eu-west-1");
}
