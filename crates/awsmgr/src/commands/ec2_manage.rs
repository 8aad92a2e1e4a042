//! EC2 instance listing and lifecycle actions.

use anyhow::Result;
use awsmgr_cloud::ec2::Ec2Instance;
use awsmgr_cloud::{scan, ComputeProvider, Ec2, Instance, InstanceStatus};
use converge::Regional;

use super::with_back;
use crate::prompt;
use crate::session::Session;
use crate::ui;

const ACTIONS: [&str; 4] = ["Start", "Stop", "Reboot", "Terminate"];

/// Scan every enabled region, pick an instance, act on it.
pub async fn run(session: &Session) -> Result<()> {
    ui::print_section("Manage EC2 instances");
    ui::print_step("Scanning EC2 regions");
    let report = scan::ec2_instances(session.client(), session.enabled_ec2_regions()).await;
    ui::print_scan(&report, |r| ui::instances_table(&r.rows));
    if report.is_empty() {
        return Ok(());
    }

    let labels = with_back(report.rows.iter().map(row_label));
    let choice = prompt::select("Instance", &labels, 0)?;
    let Some(row) = report.rows.get(choice) else {
        return Ok(());
    };

    let ec2 = Ec2::new(session.client(), &row.region);
    let id = row.item.id.as_str();
    print_details(&ec2, id).await?;

    let action = prompt::select("Action", &with_back(ACTIONS), 0)?;
    match action {
        0 => {
            ec2.start_instance(id).await?;
            ui::print_success(&format!("Start requested for {id}"));
            wait_for(session, &ec2, id, InstanceStatus::Running).await?;
        }
        1 => {
            ec2.stop_instance(id).await?;
            ui::print_success(&format!("Stop requested for {id}"));
            wait_for(session, &ec2, id, InstanceStatus::Stopped).await?;
        }
        2 => {
            ec2.reboot_instance(id).await?;
            ui::print_success(&format!("Reboot requested for {id}"));
        }
        3 => terminate(session, &ec2, id).await?,
        _ => {}
    }
    Ok(())
}

fn row_label(row: &Regional<Instance>) -> String {
    let name = if row.item.name.is_empty() {
        String::new()
    } else {
        format!(" {}", row.item.name)
    };
    format!("{:<16} {}{name} [{}]", row.region, row.item.id, row.item.state_name)
}

async fn print_details(ec2: &Ec2, id: &str) -> Result<()> {
    let instance = ec2.describe_instance(id).await?;
    ui::print_section(&format!("Instance {id}"));
    for (key, value) in detail_rows(&instance) {
        ui::print_kv(key, &value);
    }

    let volumes = ec2.instance_volumes(id).await?;
    if volumes.is_empty() {
        ui::print_kv("Disks", "-");
    } else {
        ui::print_kv("Disks", "");
        for volume in volumes {
            ui::print_list_item(&format!(
                "{} {} GB {} ({})",
                volume.volume_id, volume.size, volume.volume_type, volume.status
            ));
        }
    }
    println!();
    Ok(())
}

fn detail_rows(instance: &Ec2Instance) -> Vec<(&'static str, String)> {
    let or_none = |value: Option<&str>| value.unwrap_or("(none)").to_string();
    vec![
        ("Name", or_none(instance.name_tag())),
        ("State", instance.state.name.clone()),
        ("Type", instance.instance_type.clone()),
        (
            "Zone",
            or_none(instance.placement.as_ref().map(|p| p.availability_zone.as_str())),
        ),
        ("Image", instance.image_id.clone()),
        ("Public IPv4", or_none(instance.public_ip_address.as_deref())),
        ("Private IPv4", or_none(instance.private_ip_address.as_deref())),
        ("IPv6", or_none(instance.first_ipv6())),
        ("Key pair", or_none(instance.key_name.as_deref())),
        ("Launched", or_none(instance.launch_time.as_deref())),
    ]
}

async fn wait_for(session: &Session, ec2: &Ec2, id: &str, target: InstanceStatus) -> Result<()> {
    let outcome = session
        .wait(&format!("Waiting for {id} to be {target}"), |waiter| async move {
            ec2.wait_instance_state(id, target, &waiter).await
        })
        .await?;
    if outcome.is_converged() {
        ui::print_success(&format!("{id} is {target}"));
    } else {
        let last = outcome
            .last_snapshot()
            .map_or("unknown", |i| i.state_name.as_str());
        ui::print_warning(&format!("{id} not {target} yet ({}, last seen {last})", outcome.label()));
    }
    Ok(())
}

/// Release the instance's Elastic IPs, then terminate it.
async fn terminate(session: &Session, ec2: &Ec2, id: &str) -> Result<()> {
    if !prompt::confirm(&format!("Terminate {id}? This cannot be undone"), false)? {
        ui::print_info("Cancelled");
        return Ok(());
    }

    let cleanup = session
        .wait("Releasing Elastic IPs", |waiter| async move {
            ec2.release_addresses_and_terminate(id, &waiter).await
        })
        .await?;
    for ip in &cleanup.released {
        ui::print_success(&format!("Released Elastic IP {ip}"));
    }
    for ip in &cleanup.kept {
        ui::print_warning(&format!("Elastic IP {ip} is still allocated; release it manually"));
    }
    ui::print_success(&format!("Termination requested for {id}"));
    Ok(())
}
