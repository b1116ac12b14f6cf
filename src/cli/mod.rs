pub mod commands;
pub mod context;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "console")]
#[command(about = "Console CLI - Session-aware client for the SaaS administration API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Department management")]
    Departments {
        #[command(subcommand)]
        cmd: commands::departments::DepartmentCommands,
    },

    #[command(about = "Service package catalogue")]
    Packages {
        #[command(subcommand)]
        cmd: commands::packages::PackageCommands,
    },

    #[command(about = "Subscriptions and service access")]
    Subscriptions {
        #[command(subcommand)]
        cmd: commands::subscriptions::SubscriptionCommands,
    },

    #[command(about = "User management")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },

    #[command(about = "Reseller management and invite links")]
    Resellers {
        #[command(subcommand)]
        cmd: commands::resellers::ResellerCommands,
    },

    #[command(about = "Dashboard analytics")]
    Analytics {
        #[command(subcommand)]
        cmd: commands::analytics::AnalyticsCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let console = context::open_console()?;

    let result = match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &console, output_format).await,
        Commands::Departments { cmd } => commands::departments::handle(cmd, &console, output_format).await,
        Commands::Packages { cmd } => commands::packages::handle(cmd, &console, output_format).await,
        Commands::Subscriptions { cmd } => commands::subscriptions::handle(cmd, &console, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, &console, output_format).await,
        Commands::Resellers { cmd } => commands::resellers::handle(cmd, &console, output_format).await,
        Commands::Analytics { cmd } => commands::analytics::handle(cmd, &console, output_format).await,
    };

    // Let deferred navigations (session-expired hints) print before exit
    console.teardown().await;
    result
}
