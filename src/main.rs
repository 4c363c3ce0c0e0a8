//! Warden - moderation and fleet control for a network of managed bots.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB integration (models + repositories)
//! - `cache` - LRU-based caching with Moka
//! - `auth` - Rank hierarchy, permission checks, auth codes
//! - `moderation` - Ban/warn state machine with lazy expiry
//! - `supervisor` - Bot process lifecycle against the OS process table
//! - `notify` - Best-effort user notification fan-out
//! - `service` - Command boundary shared by every ingress channel
//! - `console` - Stdin ingress for operator management

mod auth;
mod cache;
mod config;
mod console;
mod database;
mod error;
mod moderation;
mod notify;
mod service;
mod supervisor;
mod utils;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use database::Database;
use service::ControlService;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // Initialize logging with sensible defaults
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Warden...");

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded successfully");
    info!("Super-operator: @{}", config.super_operator);
    info!(
        "Moderation limits: {} warnings, {}h default ban",
        config.max_warns, config.default_ban_hours
    );

    // Connect to MongoDB
    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;

    // Schema initialization is the one fatal path: without the unique
    // indexes the data model cannot be trusted.
    db.ensure_schema().await?;
    info!("Database connected");

    let service = Arc::new(ControlService::build(&db, &config));

    // After a restart the supervisor has no tracked PIDs; fall back to a
    // process-table scan and fix up any stale declared state.
    let corrected = service.reconcile_fleet().await;
    if corrected > 0 {
        info!("Fleet reconciliation corrected {} bot(s)", corrected);
    }

    let purged = service.purge_auth_codes().await;
    if purged > 0 {
        info!("Purged {} stale auth code(s)", purged);
    }

    // Console ingress for operator management
    let console_service = Arc::clone(&service);
    let super_operator = config.super_operator.clone();
    tokio::spawn(async move {
        console::run(console_service, super_operator).await;
    });

    info!("Warden is up; press ctrl-c to shut down");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
