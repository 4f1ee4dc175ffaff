//! Bazaar CLI - Session table setup, catalog seeding, and admin management.
//!
//! # Usage
//!
//! ```bash
//! # Create the session store table
//! bzr-cli migrate
//!
//! # Replace the catalog with the built-in sample products
//! bzr-cli seed products
//!
//! # Replace the catalog with products from a YAML file
//! bzr-cli seed products --file catalog.yaml
//!
//! # Give an existing account the admin role
//! bzr-cli admin promote -e owner@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the `tower_sessions` schema and table
//! - `seed products` - Replace the catalog
//! - `admin promote` / `admin demote` - Change a user's role

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bzr-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session store table in the storefront database
    Migrate,
    /// Load data into the hosted backend
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Replace every product with the sample catalog or a YAML file
    Products {
        /// YAML file with a list of products (defaults to the built-in samples)
        #[arg(short, long)]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing user the admin role
    Promote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin to the customer role
    Demote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(file.as_deref()).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                commands::admin::set_role(&email, bazaar_core::UserRole::Admin).await?;
            }
            AdminAction::Demote { email } => {
                commands::admin::set_role(&email, bazaar_core::UserRole::Customer).await?;
            }
        },
    }
    Ok(())
}
