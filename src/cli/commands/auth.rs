use clap::Subcommand;
use serde_json::json;

use crate::auth::RegistrationProfile;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::resources::resellers::InviteLink;
use crate::types::ResellerId;
use crate::Console;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login with email and password")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true, help = "Password (read from stdin if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Clear the stored session")]
    Logout,

    #[command(about = "Create a new account")]
    Register {
        #[arg(help = "Full name")]
        full_name: String,
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true, help = "Password (read from stdin if not provided)")]
        password: Option<String>,
        #[arg(long, help = "Department (company) name")]
        department: Option<String>,
        #[arg(long, help = "Register as a customer of this reseller")]
        reseller: Option<i64>,
        #[arg(long, conflicts_with = "reseller", help = "Reseller invite link")]
        invite: Option<String>,
    },

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh the access token")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "List what the current user may do")]
    Capabilities,
}

pub async fn handle(cmd: AuthCommands, console: &Console, output_format: OutputFormat) -> anyhow::Result<()> {
    let auth = console.auth();

    match cmd {
        AuthCommands::Login { email, password } => {
            let password = resolve_password(password)?;
            let session = auth.login(&email, &password).await?;
            if !console.store().is_persistent() {
                eprintln!("Warning: no session storage available, this login lasts for this command only");
            }
            let identity = &session.identity;
            output_success(
                &output_format,
                &format!("Logged in as {} ({})", identity.display_name(), identity.role_label()),
                Some(json!({ "user": identity })),
            )
        }
        AuthCommands::Logout => {
            auth.logout(true)?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Register { full_name, email, password, department, reseller, invite } => {
            let mut department_name = department;
            let reseller_id = match invite {
                Some(link) => {
                    let invite = InviteLink::parse(&link)
                        .ok_or_else(|| anyhow::anyhow!("Invite link does not carry a reseller id: {}", link))?;
                    if department_name.is_none() {
                        department_name = invite.company_name;
                    }
                    Some(invite.reseller_id)
                }
                None => reseller.map(ResellerId),
            };

            let profile = RegistrationProfile {
                full_name,
                email,
                password: resolve_password(password)?,
                department_name,
            };
            let session = auth.register(&profile, reseller_id).await?;
            output_success(
                &output_format,
                &format!("Registered {}", session.identity.email),
                Some(json!({ "user": session.identity })),
            )
        }
        AuthCommands::Status => {
            let status = auth.status();
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
                OutputFormat::Text => {
                    if status.authenticated {
                        println!("Authenticated");
                        println!("Access token: {}", cell(status.access_token.as_deref()));
                        if let Some(expires) = status.access_expires_at {
                            println!("Access expires: {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
                        }
                        if let Some(expires) = status.session_expires_at {
                            println!("Session expires: {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
                        }
                    } else {
                        println!("Not authenticated");
                    }
                    if !status.persistent {
                        println!("Session storage: unavailable (sessions are not saved)");
                    }
                }
            }
            Ok(())
        }
        AuthCommands::Refresh => {
            auth.refresh().await?;
            output_success(&output_format, "Access token refreshed", None)
        }
        AuthCommands::Whoami => {
            let identity = auth
                .bootstrap()
                .await?
                .ok_or_else(|| anyhow::anyhow!("Not logged in"))?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&identity)?),
                OutputFormat::Text => {
                    println!("Name:  {}", identity.display_name());
                    println!("Email: {}", identity.email);
                    println!("Role:  {}", identity.role_label());
                    if let Some(reseller) = &identity.reseller_name {
                        println!("Reseller: {}", reseller);
                    }
                }
            }
            Ok(())
        }
        AuthCommands::Capabilities => {
            if auth.bootstrap().await?.is_some() {
                // Department admin grants come from department membership
                if let Ok(departments) = console.departments().list().await {
                    auth.apply_department_memberships(&departments);
                }
            }
            let capabilities = auth.capabilities();
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({
                    "capabilities": capabilities,
                    "navigation": capabilities.navigation(),
                }))?),
                OutputFormat::Text => {
                    if capabilities.is_empty() {
                        println!("No capabilities (not logged in)");
                        return Ok(());
                    }
                    let menu: Vec<_> = capabilities.navigation().iter().map(|item| item.label()).collect();
                    println!("Navigation: {}", menu.join(", "));
                    for capability in capabilities.iter() {
                        println!("  {:?} @ {:?}", capability.action, capability.scope);
                    }
                }
            }
            Ok(())
        }
    }
}
