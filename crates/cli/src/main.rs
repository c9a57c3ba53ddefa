//! Stocks CLI - database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! stocks-cli migrate
//!
//! # Load products and colors from a YAML catalog
//! stocks-cli seed seed/catalog.yaml
//!
//! # Only validate the catalog
//! stocks-cli seed seed/catalog.yaml --dry-run
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "stocks-cli")]
#[command(version, about = "Stocks CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the product catalog from a YAML file
    Seed {
        /// Path to the catalog file
        file: String,

        /// Validate the file without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, dry_run } => commands::seed::catalog(&file, dry_run).await?,
    }
    Ok(())
}
