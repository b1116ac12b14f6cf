use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::resources::users::{RoleUpdate, UserRecord};
use crate::types::{DepartmentId, SubscriptionId, UserId};
use crate::Console;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List users")]
    List {
        #[arg(long, conflicts_with = "subscription", help = "Only users of this department")]
        department: Option<i64>,
        #[arg(long, help = "Only users with access to this subscription")]
        subscription: Option<i64>,
    },

    #[command(about = "Search users by name or email")]
    Search {
        #[arg(help = "Search text")]
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    #[command(about = "Show a user")]
    Get {
        #[arg(help = "User ID")]
        id: i64,
    },

    #[command(about = "Change a user's role flags")]
    Role {
        #[arg(help = "User ID")]
        id: i64,
        #[arg(long)]
        root_admin: Option<bool>,
        #[arg(long)]
        reseller_admin: Option<bool>,
        #[arg(long)]
        department_admin: Option<bool>,
    },

    #[command(about = "Delete a user")]
    Delete {
        #[arg(help = "User ID")]
        id: i64,
    },
}

fn user_row(user: &UserRecord) -> String {
    let id = user.identifier().map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
    let role = if user.is_root_admin {
        "root"
    } else if user.is_reseller_admin {
        "reseller"
    } else if user.is_department_admin {
        "department"
    } else {
        "user"
    };
    format!("{:<6} {:<30} {:<25} {}", id, user.email, cell(user.full_name.as_deref()), role)
}

fn user_header() -> String {
    format!("{:<6} {:<30} {:<25} {}", "ID", "EMAIL", "NAME", "ROLE")
}

pub async fn handle(cmd: UserCommands, console: &Console, output_format: OutputFormat) -> anyhow::Result<()> {
    let users = console.users();

    match cmd {
        UserCommands::List { department, subscription } => {
            let items = match (department, subscription) {
                (Some(department), _) => users.by_department(DepartmentId(department)).await?,
                (None, Some(subscription)) => users.by_subscription(SubscriptionId(subscription)).await?,
                (None, None) => users.list().await?,
            };
            output_collection(&output_format, "users", &items, &user_header(), user_row)
        }
        UserCommands::Search { query, page, limit } => {
            let result = users.search(&query, page, limit).await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    if result.users.is_empty() {
                        println!("No users found matching \"{}\"", query);
                        return Ok(());
                    }
                    println!("{}", user_header());
                    for user in &result.users {
                        println!("{}", user_row(user));
                    }
                    if result.has_more() {
                        println!("... {} total, use --page {} for more", result.total, page + 1);
                    }
                }
            }
            Ok(())
        }
        UserCommands::Get { id } => {
            let user = users.get(UserId(id)).await?;
            output_record(&output_format, &user)
        }
        UserCommands::Role { id, root_admin, reseller_admin, department_admin } => {
            let update = RoleUpdate {
                is_root_admin: root_admin,
                is_reseller_admin: reseller_admin,
                is_department_admin: department_admin,
                full_name: None,
            };
            let user = users.update_role(UserId(id), &update).await?;
            output_success(
                &output_format,
                &format!("Updated roles for {}", user.email),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::Delete { id } => {
            users.delete(UserId(id)).await?;
            output_success(&output_format, &format!("User {} deleted", id), None)
        }
    }
}
