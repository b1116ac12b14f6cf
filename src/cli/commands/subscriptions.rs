use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::resources::subscriptions::{NewSubscription, SubscriptionStatus};
use crate::types::{AccessId, DepartmentId, PackageId, SubscriptionId, UserId};
use crate::Console;

#[derive(Subcommand)]
pub enum SubscriptionCommands {
    #[command(about = "List subscriptions")]
    List,

    #[command(about = "Show a subscription and who has access")]
    Get {
        #[arg(help = "Subscription ID")]
        id: i64,
    },

    #[command(about = "Subscribe a department to a service package")]
    Create {
        #[arg(long, help = "Department ID")]
        department: i64,
        #[arg(long, help = "Service package ID")]
        package: i64,
    },

    #[command(about = "Change subscription status (active, pending, cancelled, expired)")]
    Status {
        #[arg(help = "Subscription ID")]
        id: i64,
        #[arg(help = "New status")]
        status: String,
    },

    #[command(about = "Grant a user access to a subscription")]
    Grant {
        #[arg(help = "Subscription ID")]
        id: i64,
        #[arg(help = "User ID")]
        user: i64,
    },

    #[command(about = "Revoke a service access grant")]
    Revoke {
        #[arg(help = "Access grant ID")]
        access: i64,
    },
}

pub async fn handle(cmd: SubscriptionCommands, console: &Console, output_format: OutputFormat) -> anyhow::Result<()> {
    let subscriptions = console.subscriptions();

    match cmd {
        SubscriptionCommands::List => {
            let items = subscriptions.list().await?;
            output_collection(
                &output_format,
                "subscriptions",
                &items,
                &format!("{:<6} {:<40} {:<10} {}", "ID", "SUBSCRIPTION", "STATUS", "USERS"),
                |s| format!("{:<6} {:<40} {:<10} {}", s.id, s.title(), s.status, s.users.len()),
            )
        }
        SubscriptionCommands::Get { id } => {
            let subscription = subscriptions.get(SubscriptionId(id)).await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&subscription)?),
                OutputFormat::Text => {
                    println!("{} [{}]", subscription.title(), subscription.status);
                    println!(
                        "Period: {} - {}",
                        cell(subscription.start_date.as_deref()),
                        cell(subscription.end_date.as_deref())
                    );
                    for access in &subscription.users {
                        let email = access.user_details.as_ref().map(|u| u.email.as_str());
                        println!("  access {:<6} {}", access.id, cell(email));
                    }
                }
            }
            Ok(())
        }
        SubscriptionCommands::Create { department, package } => {
            let request = NewSubscription {
                department: DepartmentId(department),
                service_package: PackageId(package),
            };
            let subscription = subscriptions.create(&request).await?;
            output_success(
                &output_format,
                &format!("Subscription {} created ({})", subscription.id, subscription.status),
                Some(json!({ "subscription": subscription })),
            )
        }
        SubscriptionCommands::Status { id, status } => {
            let status = SubscriptionStatus::from(status);
            let subscription = subscriptions.update_status(SubscriptionId(id), &status).await?;
            output_success(
                &output_format,
                &format!("Subscription {} is now {}", subscription.id, subscription.status),
                None,
            )
        }
        SubscriptionCommands::Grant { id, user } => {
            subscriptions.grant_access(SubscriptionId(id), UserId(user)).await?;
            output_success(&output_format, &format!("User {} granted access to subscription {}", user, id), None)
        }
        SubscriptionCommands::Revoke { access } => {
            subscriptions.revoke_access(AccessId(access)).await?;
            output_success(&output_format, &format!("Access grant {} revoked", access), None)
        }
    }
}
