//! Non-interactive listings.

use anyhow::Result;
use awsmgr_cloud::scan;

use crate::session::Session;
use crate::ui;

/// EC2 regions with opt-in status, then Lightsail regions.
pub fn regions(session: &Session) -> Result<()> {
    ui::print_section("EC2 regions");
    println!("{}", ui::regions_table(session.ec2_regions()));

    ui::print_section("Lightsail regions");
    if session.lightsail_regions().is_empty() {
        ui::print_info("No Lightsail regions available");
    }
    for region in session.lightsail_regions() {
        ui::print_list_item(&ui::lightsail_region_label(region));
    }
    Ok(())
}

/// EC2 instances in every enabled region.
pub async fn ec2(session: &Session) {
    ui::print_step("Scanning EC2 regions");
    let report = scan::ec2_instances(session.client(), session.enabled_ec2_regions()).await;
    ui::print_scan(&report, |r| ui::instances_table(&r.rows));
}

/// Lightsail instances in every Lightsail region.
pub async fn lightsail(session: &Session) {
    ui::print_step("Scanning Lightsail regions");
    let report = scan::lightsail_instances(session.client(), session.lightsail_regions()).await;
    ui::print_scan(&report, |r| ui::instances_table(&r.rows));
}
