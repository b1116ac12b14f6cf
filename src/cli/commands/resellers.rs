use std::str::FromStr;

use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;

use crate::capability::{Action, Scope};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::resources::resellers::{InviteLink, NewCustomer, ResellerDraft};
use crate::resources::subscriptions::NewSubscription;
use crate::types::{CustomerId, DepartmentId, PackageId, ResellerId};
use crate::Console;

#[derive(Subcommand)]
pub enum ResellerCommands {
    #[command(about = "List resellers")]
    List,

    #[command(about = "Show a reseller")]
    Get {
        #[arg(help = "Reseller ID")]
        id: i64,
    },

    #[command(about = "Create a reseller")]
    Create {
        #[arg(help = "Reseller name")]
        name: String,
        #[arg(long, default_value = "10.00", help = "Commission rate (percent)")]
        commission: String,
        #[arg(long)]
        description: Option<String>,
    },

    #[command(about = "Update a reseller")]
    Update {
        #[arg(help = "Reseller ID")]
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        commission: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },

    #[command(about = "Delete a reseller")]
    Delete {
        #[arg(help = "Reseller ID")]
        id: i64,
    },

    #[command(about = "Add a reseller admin by email")]
    AddAdmin {
        id: i64,
        email: String,
    },

    #[command(about = "Remove a reseller admin by email")]
    RemoveAdmin {
        id: i64,
        email: String,
    },

    #[command(about = "List a reseller's customers")]
    Customers {
        #[arg(help = "Reseller ID")]
        id: i64,
    },

    #[command(about = "Create a customer for a reseller")]
    AddCustomer {
        #[arg(help = "Reseller ID")]
        id: i64,
        #[arg(help = "Customer (department) name")]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    #[command(about = "Remove a customer from a reseller")]
    RemoveCustomer {
        #[arg(help = "Reseller ID")]
        id: i64,
        #[arg(help = "Customer ID")]
        customer: i64,
    },

    #[command(about = "Subscribe a customer department to a package")]
    Subscribe {
        #[arg(help = "Reseller ID")]
        id: i64,
        #[arg(long, help = "Customer department ID")]
        department: i64,
        #[arg(long, help = "Service package ID")]
        package: i64,
    },

    #[command(about = "Build a customer invite link")]
    Invite {
        #[arg(long, help = "Reseller ID (defaults to your own reseller)")]
        id: Option<i64>,
        #[arg(long, help = "Pre-fill the customer's company name")]
        company: Option<String>,
        #[arg(long, env = "CONSOLE_ORIGIN", default_value = "http://localhost:3000", help = "Console origin URL")]
        origin: String,
    },
}

fn parse_rate(raw: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(raw.trim().trim_end_matches('%'))
        .map_err(|e| anyhow::anyhow!("Invalid commission rate '{}': {}", raw, e))
}

pub async fn handle(cmd: ResellerCommands, console: &Console, output_format: OutputFormat) -> anyhow::Result<()> {
    let resellers = console.resellers();

    match cmd {
        ResellerCommands::List => {
            let items = resellers.list().await?;
            output_collection(
                &output_format,
                "resellers",
                &items,
                &format!("{:<6} {:<30} {:<12} {:<10} {}", "ID", "NAME", "COMMISSION", "CUSTOMERS", "ACTIVE"),
                |r| {
                    let commission = r.commission_rate.map(|rate| format!("{}%", rate)).unwrap_or_else(|| "-".to_string());
                    format!("{:<6} {:<30} {:<12} {:<10} {}", r.reseller_id, r.name, commission, r.customers.len(), r.is_active)
                },
            )
        }
        ResellerCommands::Get { id } => {
            let reseller = resellers.get(ResellerId(id)).await?;
            output_record(&output_format, &reseller)
        }
        ResellerCommands::Create { name, commission, description } => {
            let draft = ResellerDraft {
                name: Some(name),
                description,
                commission_rate: Some(parse_rate(&commission)?),
                is_active: Some(true),
            };
            let reseller = resellers.create(&draft).await?;
            output_success(
                &output_format,
                &format!("Reseller '{}' created with ID {}", reseller.name, reseller.reseller_id),
                Some(json!({ "reseller": reseller })),
            )
        }
        ResellerCommands::Update { id, name, commission, description, active } => {
            let draft = ResellerDraft {
                name,
                description,
                commission_rate: commission.as_deref().map(parse_rate).transpose()?,
                is_active: active,
            };
            let reseller = resellers.update(ResellerId(id), &draft).await?;
            output_success(
                &output_format,
                &format!("Reseller {} updated", reseller.reseller_id),
                Some(json!({ "reseller": reseller })),
            )
        }
        ResellerCommands::Delete { id } => {
            resellers.delete(ResellerId(id)).await?;
            output_success(&output_format, &format!("Reseller {} deleted", id), None)
        }
        ResellerCommands::AddAdmin { id, email } => {
            resellers.add_admin(ResellerId(id), &email).await?;
            output_success(&output_format, &format!("{} is now an admin of reseller {}", email, id), None)
        }
        ResellerCommands::RemoveAdmin { id, email } => {
            resellers.remove_admin(ResellerId(id), &email).await?;
            output_success(&output_format, &format!("{} removed from reseller {} admins", email, id), None)
        }
        ResellerCommands::Customers { id } => {
            let customers = resellers.customers(ResellerId(id)).await?;
            output_collection(
                &output_format,
                "customers",
                &customers,
                &format!("{:<6} {:<30} {}", "ID", "NAME", "DESCRIPTION"),
                |c| {
                    let details = c.department_details.as_ref();
                    format!(
                        "{:<6} {:<30} {}",
                        c.id,
                        details.map(|d| d.name.as_str()).unwrap_or("-"),
                        cell(details.and_then(|d| d.description.as_deref()))
                    )
                },
            )
        }
        ResellerCommands::AddCustomer { id, name, description } => {
            let customer = resellers
                .create_customer(ResellerId(id), &NewCustomer { name, description })
                .await?;
            output_success(
                &output_format,
                &format!("Customer {} created", customer.id),
                Some(json!({ "customer": customer })),
            )
        }
        ResellerCommands::RemoveCustomer { id, customer } => {
            resellers.delete_customer(ResellerId(id), CustomerId(customer)).await?;
            output_success(&output_format, &format!("Customer {} removed from reseller {}", customer, id), None)
        }
        ResellerCommands::Subscribe { id, department, package } => {
            let request = NewSubscription {
                department: DepartmentId(department),
                service_package: PackageId(package),
            };
            let subscription = resellers.create_subscription(ResellerId(id), &request).await?;
            output_success(
                &output_format,
                &format!("Subscription {} created for department {}", subscription.id, department),
                Some(json!({ "subscription": subscription })),
            )
        }
        ResellerCommands::Invite { id, company, origin } => {
            let identity = console.auth().bootstrap().await?;
            let reseller_id = id
                .map(ResellerId)
                .or_else(|| identity.as_ref().and_then(|identity| identity.reseller_id))
                .ok_or_else(|| anyhow::anyhow!("No reseller given and you are not a reseller admin"))?;

            if identity.is_some()
                && !console.auth().capabilities().allows(Action::GenerateInviteLink, Scope::Reseller(reseller_id))
            {
                return Err(anyhow::anyhow!("Not allowed to invite customers for reseller {}", reseller_id));
            }

            let mut invite = InviteLink::new(reseller_id);
            if let Some(company) = company {
                invite = invite.with_company(company);
            }
            let url = invite.to_url(&origin)?;
            output_success(
                &output_format,
                &format!("Invite link: {}", url),
                Some(json!({ "invite_link": url.as_str() })),
            )
        }
    }
}
