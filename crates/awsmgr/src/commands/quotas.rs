use anyhow::{Context, Result};
use awsmgr_cloud::account::Account;

use crate::session::Session;
use crate::ui;

/// Print the standard on-demand vCPU quota.
pub async fn run(session: &Session) -> Result<()> {
    ui::print_step("Fetching EC2 vCPU quota");
    let quota = Account::new(session.client())
        .ec2_vcpu_quota()
        .await
        .context("failed to read the EC2 vCPU quota")?;
    ui::print_kv(
        quota
            .name
            .as_deref()
            .unwrap_or("Running On-Demand Standard instances"),
        &format!("{:.0} vCPU", quota.value),
    );
    Ok(())
}
