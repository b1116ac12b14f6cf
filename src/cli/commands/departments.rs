use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::resources::departments::DepartmentDraft;
use crate::types::{DepartmentId, ResellerId};
use crate::Console;

#[derive(Subcommand)]
pub enum DepartmentCommands {
    #[command(about = "List departments")]
    List,

    #[command(about = "Show a department")]
    Get {
        #[arg(help = "Department ID")]
        id: i64,
    },

    #[command(about = "Create a department")]
    Create {
        #[arg(help = "Department name")]
        name: String,
        #[arg(long, help = "Description")]
        description: Option<String>,
        #[arg(long, help = "Owning reseller ID")]
        reseller: Option<i64>,
    },

    #[command(about = "Update a department")]
    Update {
        #[arg(help = "Department ID")]
        id: i64,
        #[arg(long, help = "New name")]
        name: Option<String>,
        #[arg(long, help = "New description")]
        description: Option<String>,
    },

    #[command(about = "Delete a department")]
    Delete {
        #[arg(help = "Department ID")]
        id: i64,
    },

    #[command(about = "Add a department admin by email")]
    AddAdmin {
        id: i64,
        email: String,
    },

    #[command(about = "Remove a department admin by email")]
    RemoveAdmin {
        id: i64,
        email: String,
    },

    #[command(about = "Add a department user by email")]
    AddUser {
        id: i64,
        email: String,
    },

    #[command(about = "Remove a department user by email")]
    RemoveUser {
        id: i64,
        email: String,
    },
}

pub async fn handle(cmd: DepartmentCommands, console: &Console, output_format: OutputFormat) -> anyhow::Result<()> {
    let departments = console.departments();

    match cmd {
        DepartmentCommands::List => {
            let items = departments.list().await?;
            output_collection(
                &output_format,
                "departments",
                &items,
                &format!("{:<6} {:<30} {:<8} {:<8} {}", "ID", "NAME", "ADMINS", "USERS", "DESCRIPTION"),
                |d| {
                    format!(
                        "{:<6} {:<30} {:<8} {:<8} {}",
                        d.department_id,
                        d.name,
                        d.admins.len(),
                        d.users.len(),
                        cell(d.description.as_deref())
                    )
                },
            )
        }
        DepartmentCommands::Get { id } => {
            let department = departments.get(DepartmentId(id)).await?;
            output_record(&output_format, &department)
        }
        DepartmentCommands::Create { name, description, reseller } => {
            let draft = DepartmentDraft {
                name: Some(name),
                description,
                reseller_id: reseller.map(ResellerId),
            };
            let department = departments.create(&draft).await?;
            output_success(
                &output_format,
                &format!("Department '{}' created with ID {}", department.name, department.department_id),
                Some(json!({ "department": department })),
            )
        }
        DepartmentCommands::Update { id, name, description } => {
            let draft = DepartmentDraft {
                name,
                description,
                reseller_id: None,
            };
            let department = departments.update(DepartmentId(id), &draft).await?;
            output_success(
                &output_format,
                &format!("Department {} updated", department.department_id),
                Some(json!({ "department": department })),
            )
        }
        DepartmentCommands::Delete { id } => {
            departments.delete(DepartmentId(id)).await?;
            output_success(&output_format, &format!("Department {} deleted", id), None)
        }
        DepartmentCommands::AddAdmin { id, email } => {
            departments.add_admin(DepartmentId(id), &email).await?;
            output_success(&output_format, &format!("{} is now an admin of department {}", email, id), None)
        }
        DepartmentCommands::RemoveAdmin { id, email } => {
            departments.remove_admin(DepartmentId(id), &email).await?;
            output_success(&output_format, &format!("{} removed from department {} admins", email, id), None)
        }
        DepartmentCommands::AddUser { id, email } => {
            departments.add_user(DepartmentId(id), &email).await?;
            output_success(&output_format, &format!("{} added to department {}", email, id), None)
        }
        DepartmentCommands::RemoveUser { id, email } => {
            departments.remove_user(DepartmentId(id), &email).await?;
            output_success(&output_format, &format!("{} removed from department {}", email, id), None)
        }
    }
}
