//! Interactive Lightsail launch.

use anyhow::{bail, Context, Result};
use awsmgr_cloud::lightsail::{CreateInstancesRequest, DEFAULT_BLUEPRINT, DEFAULT_BUNDLE};
use awsmgr_cloud::starter::random_suffix;
use awsmgr_cloud::Lightsail;

use crate::prompt;
use crate::session::Session;
use crate::ui;

/// Create one instance and open its firewall once it runs.
pub async fn run(session: &Session) -> Result<()> {
    ui::print_section("Create a Lightsail instance");

    let regions = session.lightsail_regions();
    if regions.is_empty() {
        bail!("no Lightsail regions available");
    }
    let labels: Vec<String> = regions.iter().map(|r| ui::lightsail_region_label(r)).collect();
    let default = regions
        .iter()
        .position(|r| r == session.bootstrap_region())
        .unwrap_or(0);
    let region = regions[prompt::select("Region", &labels, default)?].as_str();
    let lightsail = Lightsail::new(session.client(), region);

    ui::print_step("Loading bundles");
    let bundles = lightsail.bundles().await.context("failed to list bundles")?;
    if bundles.is_empty() {
        bail!("no Linux bundles offered in {region}");
    }
    println!("{}", ui::bundles_table(&bundles));
    let bundle_ids: Vec<&str> = bundles.iter().map(|b| b.bundle_id.as_str()).collect();
    let bundle_id = bundle_ids[prompt::select("Bundle", &bundle_ids, default_index(&bundle_ids, DEFAULT_BUNDLE))?];

    ui::print_step("Loading blueprints");
    let blueprints = lightsail
        .blueprints()
        .await
        .context("failed to list blueprints")?;
    if blueprints.is_empty() {
        bail!("no Linux blueprints offered in {region}");
    }
    let blueprint_id = &blueprints[prompt::select(
        "Blueprint",
        &blueprints,
        default_index(&blueprints, DEFAULT_BLUEPRINT),
    )?];

    let name = prompt::text("Instance name", &format!("ls-{}", random_suffix(6)))?;
    let availability_zone = prompt::text("Availability zone", &format!("{region}a"))?;
    let user_data = prompt::multiline("Optional launch script")?;

    let request = CreateInstancesRequest {
        instance_names: vec![name.clone()],
        availability_zone,
        blueprint_id: blueprint_id.clone(),
        bundle_id: bundle_id.to_string(),
        user_data,
    };
    ui::print_step(&format!("Creating {name} ({bundle_id}, {blueprint_id}) in {region}"));
    lightsail
        .create_instances(&request)
        .await
        .context("CreateInstances failed")?;
    ui::print_success(&format!("Instance {name} requested"));

    let instance = name.as_str();
    let lightsail = &lightsail;
    let outcome = session
        .wait(&format!("Waiting for {instance} to run"), |waiter| async move {
            lightsail.open_all_ports_when_running(instance, &waiter).await
        })
        .await?;
    if outcome.is_converged() {
        ui::print_success("All TCP and UDP ports opened");
    } else {
        ui::print_warning(&format!(
            "{instance} is not running yet ({}); open the ports in the Lightsail console",
            outcome.label()
        ));
    }
    Ok(())
}

/// Position of `wanted` in `items`, or the first entry.
fn default_index<S: AsRef<str>>(items: &[S], wanted: &str) -> usize {
    items.iter().position(|i| i.as_ref() == wanted).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_index() {
        let bundles = ["micro_3_0", "nano_3_0", "small_3_0"];
        assert_eq!(default_index(&bundles, DEFAULT_BUNDLE), 1);
        assert_eq!(default_index(&bundles, "large_3_0"), 0);

        let blueprints = vec!["debian_12".to_string(), "ubuntu_24_04".to_string()];
        assert_eq!(default_index(&blueprints, DEFAULT_BLUEPRINT), 0);
    }
}
