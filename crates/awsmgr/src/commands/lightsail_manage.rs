//! Lightsail instance listing, lifecycle and static IP actions.

use anyhow::Result;
use awsmgr_cloud::lightsail::LightsailInstance;
use awsmgr_cloud::{scan, ComputeProvider, Lightsail};

use super::with_back;
use crate::prompt;
use crate::session::Session;
use crate::ui;

const ACTIONS: [&str; 5] = ["Start", "Stop", "Reboot", "Delete", "Manage static IP"];

/// Scan every Lightsail region, pick an instance, act on it.
pub async fn run(session: &Session) -> Result<()> {
    ui::print_section("Manage Lightsail instances");
    ui::print_step("Scanning Lightsail regions");
    let report = scan::lightsail_instances(session.client(), session.lightsail_regions()).await;
    ui::print_scan(&report, |r| ui::instances_table(&r.rows));
    if report.is_empty() {
        return Ok(());
    }

    let labels = with_back(
        report
            .rows
            .iter()
            .map(|r| format!("{:<16} {} [{}]", r.region, r.item.name, r.item.state_name)),
    );
    let choice = prompt::select("Instance", &labels, 0)?;
    let Some(row) = report.rows.get(choice) else {
        return Ok(());
    };

    let lightsail = Lightsail::new(session.client(), &row.region);
    let name = row.item.name.as_str();
    let instance = lightsail.describe_instance(name).await?;
    let static_ip = lightsail.attached_static_ip(name).await?;
    print_details(&instance, static_ip.as_ref().map(|ip| ip.name.as_str()));

    match prompt::select("Action", &with_back(ACTIONS), 0)? {
        0 => {
            lightsail.start_instance(name).await?;
            ui::print_success(&format!("Start requested for {name}"));
        }
        1 => {
            lightsail.stop_instance(name).await?;
            ui::print_success(&format!("Stop requested for {name}"));
        }
        2 => {
            lightsail.reboot_instance(name).await?;
            ui::print_success(&format!("Reboot requested for {name}"));
        }
        3 => delete(session, &lightsail, name).await?,
        4 => manage_static_ip(session, &lightsail, name, static_ip.map(|ip| ip.name)).await?,
        _ => {}
    }
    Ok(())
}

fn print_details(instance: &LightsailInstance, static_ip: Option<&str>) {
    ui::print_section(&format!("Lightsail instance {}", instance.name));
    for (key, value) in detail_rows(instance, static_ip) {
        ui::print_kv(key, &value);
    }
    println!();
}

fn detail_rows(instance: &LightsailInstance, static_ip: Option<&str>) -> Vec<(&'static str, String)> {
    let location = instance.location.as_ref();
    let region = location
        .and_then(|l| l.region_name.as_deref())
        .unwrap_or("-");
    let zone = location
        .and_then(|l| l.availability_zone.as_deref())
        .unwrap_or("-");
    let hardware = instance.hardware.as_ref().map_or_else(
        || instance.bundle_id.clone(),
        |h| format!("{} ({} vCPU, {:.1} GB RAM)", instance.bundle_id, h.cpu_count, h.ram_size_in_gb),
    );
    let ip = instance.public_ip_address.as_deref().unwrap_or("(none)");
    let ip = match static_ip {
        Some(ip_name) => format!("{ip} (static: {ip_name})"),
        None if instance.is_static_ip => format!("{ip} (static)"),
        None => format!("{ip} (dynamic)"),
    };
    let ports: Vec<String> = instance
        .networking
        .as_ref()
        .map(|n| n.ports.iter().map(|p| p.summary()).collect())
        .unwrap_or_default();

    vec![
        ("Name", instance.name.clone()),
        ("Location", format!("{region} / {zone}")),
        ("Bundle", hardware),
        ("Blueprint", instance.blueprint_id.clone()),
        ("State", instance.state_name().to_string()),
        ("Public IPv4", ip),
        ("IPv6", instance.ipv6_addresses.first().cloned().unwrap_or_else(|| "(none)".to_string())),
        (
            "Open ports",
            if ports.is_empty() {
                "(none)".to_string()
            } else {
                ports.join(", ")
            },
        ),
    ]
}

/// Release the attached static IP, then delete the instance.
async fn delete(session: &Session, lightsail: &Lightsail, name: &str) -> Result<()> {
    if !prompt::confirm(&format!("Delete {name}? This cannot be undone"), false)? {
        ui::print_info("Cancelled");
        return Ok(());
    }
    let report = session
        .wait(&format!("Deleting {name}"), |waiter| async move {
            lightsail.delete_instance_and_static_ip(name, &waiter).await
        })
        .await?;
    if let Some(ip) = &report.released_ip {
        ui::print_success(&format!("Released static IP {ip}"));
    }
    if let Some(ip) = &report.kept_ip {
        ui::print_warning(&format!("Static IP {ip} is still allocated; release it manually"));
    }
    ui::print_success(&format!("Deletion requested for {name}"));
    Ok(())
}

/// Detach and release the current static IP, or allocate and attach one.
async fn manage_static_ip(
    session: &Session,
    lightsail: &Lightsail,
    name: &str,
    attached: Option<String>,
) -> Result<()> {
    if let Some(ip_name) = attached {
        if !prompt::confirm(&format!("Detach and release static IP {ip_name}?"), false)? {
            ui::print_info("Cancelled");
            return Ok(());
        }
        let ip = ip_name.as_str();
        let released = session
            .wait(&format!("Detaching {ip}"), |waiter| async move {
                lightsail.detach_and_release_static_ip(ip, &waiter).await
            })
            .await?;
        if released {
            ui::print_success(&format!("Static IP {ip} released"));
        } else {
            ui::print_warning(&format!("{ip} did not detach in time and was kept"));
        }
        return Ok(());
    }

    if !prompt::confirm(&format!("Allocate a static IP and attach it to {name}?"), false)? {
        ui::print_info("Cancelled");
        return Ok(());
    }
    let outcome = session
        .wait("Attaching static IP", |waiter| async move {
            lightsail.allocate_and_attach_static_ip(name, &waiter).await
        })
        .await?;
    match outcome.into_converged() {
        Some(ip) => ui::print_success(&format!(
            "Static IP {} attached: {}",
            ip.name,
            ip.ip_address.as_deref().unwrap_or("-")
        )),
        None => ui::print_warning("The attachment is not visible yet; check the Lightsail console"),
    }
    Ok(())
}
