//! Orderdesk command-line client.

#![forbid(unsafe_code)]

mod client_config;
mod client_services;
mod commands;

use clap::{Parser, Subcommand};
use orderdesk_core::AppError;
use tracing::warn;

use crate::client_config::{ClientConfig, init_tracing};
use crate::client_services::build_services;

/// Orderdesk workspace client.
#[derive(Debug, Parser)]
#[command(name = "orderdesk", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session on this device.
    SignIn {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long, env = "ORDERDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session.
    SignOut,
    /// Show the signed-in user, subscription state and accessible panels.
    Whoami,
    /// Send an API request with the session credential.
    Request {
        /// HTTP method.
        method: String,
        /// Target path relative to the API base URL.
        target: String,
        /// JSON request body.
        #[arg(long)]
        body: Option<String>,
        /// Send without the session credential.
        #[arg(long)]
        anonymous: bool,
    },
    /// Decide how navigation to a workspace path resolves.
    Navigate {
        /// Workspace path, for example `/orders/42`.
        path: String,
        /// Password to answer a re-entry challenge.
        #[arg(long, env = "ORDERDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Switch the role this device operates as.
    SelectRole {
        /// `owner` or a role id.
        selection: String,
        /// Account password, when the tenant requires it for role switches.
        #[arg(long, env = "ORDERDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::load()?;
    let services = build_services(&config).await?;

    let result = match cli.command {
        Command::SignIn { email, password } => {
            commands::sign_in(&services, email, password).await
        }
        Command::SignOut => commands::sign_out(&services).await,
        Command::Whoami => commands::whoami(&services).await,
        Command::Request {
            method,
            target,
            body,
            anonymous,
        } => commands::request(&services, method.as_str(), target, body, anonymous).await,
        Command::Navigate { path, password } => {
            commands::navigate(&services, path.as_str(), password).await
        }
        Command::SelectRole {
            selection,
            password,
        } => commands::select_role(&services, selection.as_str(), password).await,
    };

    if services.notifier.was_triggered() {
        warn!("the stored session has ended; run `orderdesk sign-in` again");
    }

    result
}
