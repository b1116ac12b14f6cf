use std::str::FromStr;

use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::resources::packages::PackageDraft;
use crate::types::PackageId;
use crate::Console;

#[derive(Subcommand)]
pub enum PackageCommands {
    #[command(about = "List service packages")]
    List {
        #[arg(long, help = "Include inactive packages")]
        all: bool,
    },

    #[command(about = "Show a service package")]
    Get {
        #[arg(help = "Package ID")]
        id: i64,
    },

    #[command(about = "Create a service package")]
    Create {
        #[arg(help = "Package name")]
        name: String,
        #[arg(long, help = "Price, e.g. 19.99")]
        price: String,
        #[arg(long, default_value = "monthly", help = "Billing cycle")]
        billing_cycle: String,
        #[arg(long, help = "Description")]
        description: Option<String>,
    },

    #[command(about = "Update a service package")]
    Update {
        #[arg(help = "Package ID")]
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        billing_cycle: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, help = "Activate (true) or retire (false) the package")]
        active: Option<bool>,
    },

    #[command(about = "Delete a service package")]
    Delete {
        #[arg(help = "Package ID")]
        id: i64,
    },
}

fn parse_price(raw: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(raw.trim().trim_start_matches('$')).map_err(|e| anyhow::anyhow!("Invalid price '{}': {}", raw, e))
}

pub async fn handle(cmd: PackageCommands, console: &Console, output_format: OutputFormat) -> anyhow::Result<()> {
    let packages = console.packages();

    match cmd {
        PackageCommands::List { all } => {
            let items = packages.list(!all).await?;
            output_collection(
                &output_format,
                "packages",
                &items,
                &format!("{:<6} {:<25} {:<20} {}", "ID", "NAME", "PRICE", "ACTIVE"),
                |p| format!("{:<6} {:<25} {:<20} {}", p.id, p.name, p.price_label(), p.is_active),
            )
        }
        PackageCommands::Get { id } => {
            let package = packages.get(PackageId(id)).await?;
            output_record(&output_format, &package)
        }
        PackageCommands::Create { name, price, billing_cycle, description } => {
            let draft = PackageDraft {
                name: Some(name),
                description,
                price: Some(parse_price(&price)?),
                billing_cycle: Some(billing_cycle),
                features: None,
                is_active: Some(true),
            };
            let package = packages.create(&draft).await?;
            output_success(
                &output_format,
                &format!("Package '{}' created with ID {}", package.name, package.id),
                Some(json!({ "package": package })),
            )
        }
        PackageCommands::Update { id, name, price, billing_cycle, description, active } => {
            let draft = PackageDraft {
                name,
                description,
                price: price.as_deref().map(parse_price).transpose()?,
                billing_cycle,
                features: None,
                is_active: active,
            };
            let package = packages.update(PackageId(id), &draft).await?;
            output_success(
                &output_format,
                &format!("Package {} updated", package.id),
                Some(json!({ "package": package })),
            )
        }
        PackageCommands::Delete { id } => {
            packages.delete(PackageId(id)).await?;
            output_success(&output_format, &format!("Package {} deleted", id), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$19.99").unwrap(), Decimal::from_str("19.99").unwrap());
        assert_eq!(parse_price(" 5 ").unwrap(), Decimal::from(5));
        assert!(parse_price("free").is_err());
    }
}
