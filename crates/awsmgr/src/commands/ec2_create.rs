//! Interactive EC2 launch.

use anyhow::{bail, Context, Result};
use awsmgr_cloud::catalog::{
    ai_suitability, instance_types, launch_user_data, AiSuitability, Architecture,
    InstanceTypeOption, AI_MIN_RAM_GIB, OS_IMAGES,
};
use awsmgr_cloud::ec2::{NetworkInterfaceSpec, RootVolumeSpec, RunInstancesRequest};
use awsmgr_cloud::{CloudError, Ec2, RegionInfo};
use tracing::warn;

use crate::prompt;
use crate::session::Session;
use crate::ui;

const CUSTOM_AMI: &str = "Custom AMI id";
const MANUAL_TYPE: &str = "Enter a type manually";
const DEFAULT_MANUAL_TYPE: &str = "t3.micro";

/// Walk through the launch questions and start the instances.
pub async fn run(session: &Session) -> Result<()> {
    ui::print_section("Create EC2 instances");

    let architectures = [Architecture::X86_64, Architecture::Arm64];
    let arch = architectures[prompt::select("Architecture", &architectures, 0)?];

    let region = choose_region(session)?;
    session.ensure_region(region).await?;
    let ec2 = Ec2::new(session.client(), &region.name);

    let image_id = choose_image(&ec2, arch).await?;
    let option = choose_instance_type(arch)?;
    if !accept_for_ai(&option)? {
        ui::print_info("Cancelled");
        return Ok(());
    }

    let count = prompt::number("Number of instances", 1u32)?.max(1);
    let disk_gb = prompt::number("Root volume size in GB (0 keeps the image default)", 0u32)?;
    let want_ipv6 = prompt::confirm("Assign an IPv6 address?", false)?;
    let root_password = prompt::optional_text("SSH root password (empty to skip)")?;
    let open_all = prompt::confirm("Open all ports (security group)?", false)?;
    let script = prompt::multiline("Optional launch script")?;

    let mut request = RunInstancesRequest::new(image_id, option.instance_type.clone());
    request.count = count;
    request.user_data = launch_user_data(root_password.as_deref(), script.as_deref());
    request.network_interface = network_interface(session, &ec2, open_all, want_ipv6).await?;
    if disk_gb > 0 {
        if let Some(device_name) = ec2.image_root_device(&request.image_id).await? {
            request.root_volume = Some(RootVolumeSpec {
                device_name,
                size_gb: disk_gb,
            });
        } else {
            ui::print_warning("Image has no root device name; keeping its default disk size");
        }
    }

    ui::print_step(&format!("Launching {count} x {} in {}", option.instance_type, region.name));
    let launched = ec2
        .run_instances(&request)
        .await
        .context("RunInstances failed")?;
    for instance in &launched {
        ui::print_success(&format!("Launched {} ({})", instance.id, instance.state_name));
    }
    Ok(())
}

fn choose_region(session: &Session) -> Result<&RegionInfo> {
    let regions = session.ec2_regions();
    if regions.is_empty() {
        bail!("no EC2 regions available");
    }
    let labels: Vec<String> = regions.iter().map(ui::region_label).collect();
    let default = regions
        .iter()
        .position(|r| r.name == session.bootstrap_region())
        .unwrap_or(0);
    Ok(&regions[prompt::select("Region", &labels, default)?])
}

async fn choose_image(ec2: &Ec2, arch: Architecture) -> Result<String> {
    let mut labels: Vec<&str> = OS_IMAGES.iter().map(|os| os.name).collect();
    labels.push(CUSTOM_AMI);
    let choice = prompt::select("Operating system", &labels, 0)?;

    let Some(os) = OS_IMAGES.get(choice) else {
        let ami = prompt::text("AMI id", "")?;
        if !ami.starts_with("ami-") {
            bail!("'{ami}' is not an AMI id");
        }
        return Ok(ami);
    };

    ui::print_step(&format!("Looking up the latest {} image", os.name));
    let image = ec2
        .latest_image(os.owner, os.pattern, arch.as_str())
        .await?
        .with_context(|| format!("no {} image for {arch} in this region", os.name))?;
    ui::print_kv("Image", &format!("{} {}", image.image_id, image.name.as_deref().unwrap_or_default()));
    Ok(image.image_id)
}

fn choose_instance_type(arch: Architecture) -> Result<InstanceTypeOption> {
    let types = instance_types(arch);
    println!("{}", ui::instance_types_table(&types));
    let mut labels: Vec<&str> = types.iter().map(|t| t.instance_type.as_str()).collect();
    labels.push(MANUAL_TYPE);
    let choice = prompt::select("Instance type", &labels, 0)?;

    let option = match types.get(choice) {
        Some(option) => option.clone(),
        None => InstanceTypeOption::manual(prompt::text("Instance type", DEFAULT_MANUAL_TYPE)?),
    };
    ui::print_success(&format!("Selected {}", option.instance_type));
    Ok(option)
}

/// Warn when the type is a poor fit for AI inference; `false` means cancel.
fn accept_for_ai(option: &InstanceTypeOption) -> Result<bool> {
    match ai_suitability(option) {
        AiSuitability::Suitable => {
            ui::print_success("Suitable for AI inference workloads");
            Ok(true)
        }
        AiSuitability::Unsuitable { reason } => {
            ui::print_warning(&format!("{} is not recommended for AI workloads", option.instance_type));
            ui::print_list_item(&reason);
            prompt::confirm("Continue with this type anyway?", false)
        }
        AiSuitability::LowMemory { ram_gib } => {
            ui::print_warning(&format!(
                "{} has {ram_gib:.1} GiB of memory; modern LLMs need at least {AI_MIN_RAM_GIB:.0} GiB",
                option.instance_type
            ));
            prompt::confirm("Continue with this type anyway? It may run out of memory", false)
        }
    }
}

/// Security group and IPv6 subnet for the primary interface.
///
/// IPv6 setup failures fall back to an IPv4-only launch; a cancel aborts the
/// launch.
async fn network_interface(
    session: &Session,
    ec2: &Ec2,
    open_all: bool,
    want_ipv6: bool,
) -> Result<Option<NetworkInterfaceSpec>> {
    if !open_all && !want_ipv6 {
        return Ok(None);
    }

    let group = ec2
        .ensure_open_all_security_group()
        .await
        .context("network setup failed")?;
    let mut spec = NetworkInterfaceSpec {
        security_group_id: open_all.then(|| group.group_id.clone()),
        ..NetworkInterfaceSpec::default()
    };

    if want_ipv6 {
        let vpc_id = group.vpc_id.as_str();
        let result = session
            .wait("Setting up IPv6", |waiter| async move {
                ec2.setup_ipv6(vpc_id, &waiter).await
            })
            .await;
        match ipv6_subnet(result).context("launch aborted")? {
            Some(subnet_id) => {
                ui::print_success(&format!("IPv6 ready on subnet {subnet_id}"));
                spec.ipv6 = true;
                spec.subnet_id = Some(subnet_id);
            }
            None => ui::print_warning("IPv6 setup failed; launching with IPv4 only"),
        }
    }

    Ok(Some(spec))
}

/// The IPv6 subnet, `None` to degrade to IPv4-only, or the cancel error.
fn ipv6_subnet(result: Result<String, CloudError>) -> Result<Option<String>, CloudError> {
    match result {
        Ok(subnet_id) => Ok(Some(subnet_id)),
        Err(e @ CloudError::Cancelled(_)) => Err(e),
        Err(e) => {
            warn!(error = %e, "IPv6 setup failed, launching IPv4-only");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv6_timeout_degrades_to_ipv4() {
        let result = ipv6_subnet(Err(CloudError::Timeout("IPv6 block of vpc-1 to associate".to_string())));
        assert!(matches!(result, Ok(None)));
        assert_eq!(ipv6_subnet(Ok("subnet-1".to_string())).unwrap(), Some("subnet-1".to_string()));
    }

    #[test]
    fn test_ipv6_cancel_aborts_launch() {
        let result = ipv6_subnet(Err(CloudError::Cancelled("IPv6 block of vpc-1 to associate".to_string())));
        assert!(matches!(result, Err(CloudError::Cancelled(_))));
    }
}
