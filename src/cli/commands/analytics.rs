use clap::Subcommand;

use crate::cli::OutputFormat;
use crate::Console;

#[derive(Subcommand)]
pub enum AnalyticsCommands {
    #[command(about = "Subscription, department and user totals")]
    Dashboard,
}

pub async fn handle(cmd: AnalyticsCommands, console: &Console, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AnalyticsCommands::Dashboard => {
            let metrics = console.dashboard_metrics().await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&metrics)?),
                OutputFormat::Text => {
                    println!("Subscriptions: {} ({}% active)", metrics.total_subscriptions, metrics.active_rate());
                    println!(
                        "  active {}, pending {}, inactive {}",
                        metrics.active_subscriptions, metrics.pending_subscriptions, metrics.inactive_subscriptions
                    );
                    println!("Departments:   {}", metrics.total_departments);
                    println!("Users:         {}", metrics.total_users);
                    println!(
                        "  root {}, reseller {}, department {}, regular {}",
                        metrics.roles.root_admins,
                        metrics.roles.reseller_admins,
                        metrics.roles.department_admins,
                        metrics.roles.users
                    );

                    if !metrics.subscriptions_by_month.is_empty() {
                        println!("\nSubscriptions by month");
                        for (month, count) in &metrics.subscriptions_by_month {
                            println!("  {:<10} {:>4} {}", month, count, "#".repeat((*count).min(50)));
                        }
                    }
                    if !metrics.users_by_department.is_empty() {
                        println!("\nUsers by department");
                        for (department, count) in &metrics.users_by_department {
                            println!("  {:<24} {:>4}", department, count);
                        }
                    }
                }
            }
            Ok(())
        }
    }
}
