//! Smartcartify CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! smartcartify-cli migrate
//!
//! # Re-sync every installed shop's rules to Shopify
//! smartcartify-cli resync
//!
//! # Re-sync one section of one shop
//! smartcartify-cli resync -s cool-store.myshopify.com --section bxgy
//!
//! # Fix a shop's billing state
//! smartcartify-cli plan set -s cool-store.myshopify.com -p Pro --status ACTIVE
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `resync` - Re-run Shopify sync for stored rules
//! - `plan set` - Create or replace a shop's plan

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "smartcartify-cli")]
#[command(author, version, about = "Smartcartify CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Re-run Shopify sync for stored rules
    Resync {
        /// Shop domain; every installed shop when omitted
        #[arg(short, long)]
        shop: Option<String>,

        /// Section (`shipping`, `discount`, `free_gift`, `bxgy`); all when omitted
        #[arg(long)]
        section: Option<String>,
    },
    /// Manage billing plans
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
}

#[derive(Subcommand)]
enum PlanAction {
    /// Create or replace a shop's plan
    Set {
        /// Shop domain
        #[arg(short, long)]
        shop: String,

        /// Plan name
        #[arg(short, long)]
        plan: String,

        /// Plan status (`ACTIVE`, `PENDING`, `CANCELED`, ...)
        #[arg(long, default_value = "ACTIVE")]
        status: String,

        /// Shopify charge id
        #[arg(long)]
        charge_id: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Resync { shop, section } => {
            commands::resync::run(shop.as_deref(), section.as_deref()).await?;
        }
        Commands::Plan { action } => match action {
            PlanAction::Set {
                shop,
                plan,
                status,
                charge_id,
            } => {
                commands::plan::set(&shop, &plan, &status, charge_id.as_deref()).await?;
            }
        },
    }
    Ok(())
}
