//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! stocks-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOCKS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/api/migrations/` and are embedded in the API
//! crate, so this applies exactly what the server would apply at startup.

use stocks_api::config::database_url_from_env;
use stocks_api::db;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
