//! Console output helpers.
//!
//! Status lines go to stdout with a colored marker; listings are rendered
//! as comfy-table tables.

use awsmgr_cloud::catalog::InstanceTypeOption;
use awsmgr_cloud::lightsail::Bundle;
use awsmgr_cloud::regions::display_name;
use awsmgr_cloud::{Instance, InstanceStatus, RegionInfo};
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use converge::{FanOutReport, PartitionFailure};

/// Print the awsmgr banner.
pub fn print_banner() {
    println!();
    println!("{}", "  awsmgr".cyan().bold());
    println!("  {}", "EC2 and Lightsail from the terminal".bright_black());
    println!();
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(70).bright_black());
    println!();
}

/// Print a step indicator with message.
pub fn print_step(message: &str) {
    println!("{} {}", "▶".cyan(), message.bold());
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message.red());
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("  {} {}", format!("{key}:").bright_black(), value.green());
}

/// Print a list item.
pub fn print_list_item(item: &str) {
    println!("  {} {item}", "•".bright_black());
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::new(n).fg(Color::Cyan)).collect()
}

fn new_table(names: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(names));
    table
}

fn status_color(status: InstanceStatus) -> Color {
    match status {
        InstanceStatus::Running => Color::Green,
        InstanceStatus::Pending | InstanceStatus::Stopping => Color::Yellow,
        InstanceStatus::Stopped => Color::DarkGrey,
        InstanceStatus::Terminating | InstanceStatus::Terminated => Color::Red,
        InstanceStatus::Unknown => Color::White,
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

/// Region menu rows: name, location and opt-in badge.
pub fn region_label(region: &RegionInfo) -> String {
    let badge = region.opt_in.badge();
    if badge.is_empty() {
        format!("{:<16} {}", region.name, display_name(&region.name))
    } else {
        format!("{:<16} {} {badge}", region.name, display_name(&region.name))
    }
}

/// Lightsail region menu row.
pub fn lightsail_region_label(region: &str) -> String {
    format!("{region:<16} {}", display_name(region))
}

/// Table of EC2 regions and their opt-in status.
pub fn regions_table(regions: &[RegionInfo]) -> Table {
    let mut table = new_table(&["Region", "Location", "Opt-in"]);
    for region in regions {
        let color = if region.opt_in.is_ready() {
            Color::Green
        } else {
            Color::Yellow
        };
        table.add_row(vec![
            Cell::new(&region.name),
            Cell::new(display_name(&region.name)),
            Cell::new(region.opt_in.to_string()).fg(color),
        ]);
    }
    table
}

/// Numbered table of instances from a region scan.
pub fn instances_table(rows: &[converge::Regional<Instance>]) -> Table {
    let mut table = new_table(&[
        "#", "Region", "Zone", "ID", "State", "Name", "Type", "Public IP", "Private IP", "IPv6",
    ]);
    for (idx, row) in rows.iter().enumerate() {
        let i = &row.item;
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&row.region),
            Cell::new(or_dash(i.zone.as_deref())),
            Cell::new(&i.id),
            Cell::new(&i.state_name).fg(status_color(i.status)),
            Cell::new(or_dash(Some(i.name.as_str()))),
            Cell::new(&i.instance_type),
            Cell::new(or_dash(i.public_ip.as_deref())),
            Cell::new(or_dash(i.private_ip.as_deref())),
            Cell::new(or_dash(i.ipv6.as_deref())),
        ]);
    }
    table
}

/// Instance type catalog with reference prices.
pub fn instance_types_table(types: &[InstanceTypeOption]) -> Table {
    let mut table = new_table(&["#", "Type", "vCPU", "Memory", "Price (us-east-1)", "Notes"]);
    for (idx, t) in types.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&t.instance_type),
            Cell::new(t.vcpus),
            Cell::new(format!("{:.1} GiB", t.ram_gib)),
            Cell::new(t.price),
            Cell::new(t.description),
        ]);
    }
    table
}

/// Lightsail bundles, cheapest first.
pub fn bundles_table(bundles: &[Bundle]) -> Table {
    let mut table = new_table(&["#", "Bundle", "vCPU", "Memory", "Disk", "Price"]);
    for (idx, b) in bundles.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&b.bundle_id),
            Cell::new(b.cpu_count),
            Cell::new(format!("{:.1} GiB", b.ram_size_in_gb)),
            Cell::new(format!("{} GB", b.disk_size_in_gb)),
            Cell::new(format!("${:.2}/mo", b.price)),
        ]);
    }
    table
}

/// Warn about regions whose scan failed.
pub fn print_scan_failures(failed: &[PartitionFailure]) {
    for failure in failed {
        print_warning(&format!("{}: {}", failure.region, failure.error));
    }
}

/// Print a scan report as a table, or a note when it is empty.
pub fn print_scan<T>(report: &FanOutReport<T>, table: impl FnOnce(&FanOutReport<T>) -> Table) {
    print_scan_failures(&report.failed);
    if report.is_empty() {
        print_info("No instances found");
    } else {
        println!("{}", table(report));
    }
}
