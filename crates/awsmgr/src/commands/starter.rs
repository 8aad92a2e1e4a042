//! Starter-credit tasks.

use anyhow::Result;
use awsmgr_cloud::starter::{self, BudgetResult, StarterTask, STARTER_REGION};

use crate::prompt;
use crate::session::Session;
use crate::ui;

/// Run all tasks or a chosen subset, one after another.
pub async fn run(session: &Session) -> Result<()> {
    ui::print_section(&format!("Starter-credit tasks ({STARTER_REGION})"));

    let modes = ["Run all tasks", "Pick tasks"];
    let tasks: Vec<StarterTask> = if prompt::select("Mode", &modes, 0)? == 0 {
        StarterTask::ALL.to_vec()
    } else {
        prompt::multi_select("Tasks (space to toggle)", &StarterTask::ALL)?
            .into_iter()
            .filter_map(|i| StarterTask::ALL.get(i).copied())
            .collect()
    };
    if tasks.is_empty() {
        ui::print_info("No tasks selected");
        return Ok(());
    }

    for task in tasks {
        ui::print_step(&task.to_string());
        if let Err(e) = run_task(session, task).await {
            ui::print_error(&format!("{task}: {e:#}"));
        }
    }
    Ok(())
}

async fn run_task(session: &Session, task: StarterTask) -> Result<()> {
    let client = session.client();
    match task {
        StarterTask::Budget => match starter::create_budget(client, session.account_id()).await? {
            BudgetResult::Created { name } => ui::print_success(&format!("Budget {name} created")),
            BudgetResult::AlreadyExists => ui::print_info("A budget already exists"),
        },
        StarterTask::Ec2 => {
            let report = session
                .wait("Waiting for the instance to run", |waiter| async move {
                    starter::run_ec2_task(client, &waiter).await
                })
                .await?;
            if report.terminated() {
                ui::print_success(&format!("Instance {} launched and terminated", report.instance_id));
            } else {
                ui::print_warning(&format!(
                    "Instance {} was not terminated ({}); check it manually",
                    report.instance_id,
                    report.outcome.label()
                ));
            }
        }
        StarterTask::Function => {
            let report = session
                .wait("Creating the Lambda function", |waiter| async move {
                    starter::run_function_task(client, &waiter).await
                })
                .await?;
            match (&report.response, report.cleaned_up) {
                (Some(payload), true) => ui::print_success(&format!(
                    "Function {} returned {payload}; function and role deleted",
                    report.function_name
                )),
                (None, true) => ui::print_warning(&format!(
                    "Function {} could not be invoked; function and role deleted",
                    report.function_name
                )),
                (_, false) => ui::print_warning(&format!(
                    "Function {} is not active ({}); delete it and role {} manually",
                    report.function_name,
                    report.outcome.label(),
                    report.role_name
                )),
            }
        }
        StarterTask::Database => {
            let report = session
                .wait("Waiting for the database to become available", |waiter| async move {
                    starter::run_database_task(client, &waiter).await
                })
                .await?;
            if report.delete_requested {
                ui::print_success(&format!("Database {} created and deleted", report.identifier));
            } else {
                ui::print_warning(&format!(
                    "Database {} may still be creating ({}); delete it manually",
                    report.identifier,
                    report.outcome.label()
                ));
            }
        }
    }
    Ok(())
}
