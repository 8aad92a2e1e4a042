//! Menu actions and subcommands.

pub mod ec2_create;
pub mod ec2_manage;
pub mod inventory;
pub mod lightsail_create;
pub mod lightsail_manage;
pub mod quotas;
pub mod starter;

/// Menu labels for `items` followed by a "Back" entry.
pub(crate) fn with_back<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut labels: Vec<String> = items.into_iter().map(Into::into).collect();
    labels.push("Back".to_string());
    labels
}
