//! awsmgr: manage EC2 and Lightsail instances from the terminal.
//!
//! Without a subcommand an interactive session starts; the subcommands
//! print account inventory and exit.

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;
mod prompt;
mod session;
mod ui;

use session::{ConnectionArgs, Session};

/// Interactive EC2 and Lightsail manager.
#[derive(Parser)]
#[command(
    name = "awsmgr",
    version,
    about = "Interactive EC2 and Lightsail manager",
    long_about = "Create, inspect and clean up EC2 and Lightsail instances across\n\
                  every region of an AWS account.\n\n\
                  Run without a subcommand for the interactive menu. Long waits\n\
                  can be cancelled with Ctrl-C."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List EC2 regions with their opt-in status and Lightsail regions.
    Regions,

    /// List instances across all enabled regions.
    List {
        #[arg(value_enum)]
        service: Service,
    },

    /// Show the EC2 on-demand vCPU quota.
    Quotas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Service {
    Ec2,
    Lightsail,
}

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("info,awsmgr=debug,awsmgr_cloud=debug,converge=debug")
    } else {
        EnvFilter::new("warn,awsmgr=info,awsmgr_cloud=info")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        None => {
            ui::print_banner();
            let session = Session::connect(&cli.connection, true).await?;
            session.run().await
        }
        Some(command) => {
            let session = Session::connect(&cli.connection, false).await?;
            match command {
                Commands::Regions => commands::inventory::regions(&session),
                Commands::List { service: Service::Ec2 } => {
                    commands::inventory::ec2(&session).await;
                    Ok(())
                }
                Commands::List {
                    service: Service::Lightsail,
                } => {
                    commands::inventory::lightsail(&session).await;
                    Ok(())
                }
                Commands::Quotas => commands::quotas::run(&session).await,
            }
        }
    }
}
