//! DirBridge daemon entry point.
//!
//! Loads configuration, initializes tracing and the database, dispatches the
//! startup interceptor chain exactly once (the feed bootstrap runs there,
//! prompting for credentials when configured to), and then waits for a
//! shutdown signal.

mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dirbridge_core::bootstrap::{FeedBootstrap, FeedState, RESERVED_GROUPS};
use dirbridge_core::config::AppConfig;
use dirbridge_core::credentials::provider_from_config;
use dirbridge_core::db::Database;
use dirbridge_core::guard::MembershipGuard;
use dirbridge_core::hooks::{HookRegistry, StartupContext};

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// DirBridge directory federation gateway daemon.
#[derive(Parser, Debug)]
#[command(
    name = "dirbridge-daemon",
    version,
    about = "Directory federation gateway daemon"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config =
        AppConfig::load_from_file(&args.config).context("failed to load configuration file")?;
    config
        .validate()
        .context("configuration validation failed")?;

    // Initialize tracing, optionally teeing into a rolling log file.
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.daemon.log_level);
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let _appender_guard = match &config.daemon.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).context("failed to create log directory")?;
            let appender = tracing_appender::rolling::daily(dir, "dirbridge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .init();
            None
        }
    };

    // Startup banner
    info!("========================================");
    info!("  DirBridge Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file : {}", args.config.display());
    info!("Feed URL    : {}", config.feed.url);
    info!("Data dir    : {}", config.daemon.data_dir.display());
    info!("Log level   : {}", log_level);
    info!("========================================");

    // Initialize database
    std::fs::create_dir_all(&config.daemon.data_dir)
        .context("failed to create data directory")?;
    let db_path = config.daemon.data_dir.join("dirbridge.db");
    let db = Arc::new(Database::new(&db_path).context("failed to open database")?);
    db.initialize()
        .context("failed to initialize database schema")?;
    info!("Database initialized at {}", db_path.display());

    // The built-in groups must exist before the guard or the feed can
    // reference them.
    for name in RESERVED_GROUPS {
        db.ensure_group(name)
            .with_context(|| format!("failed to ensure built-in group '{name}'"))?;
    }

    // Register the interceptor chains.
    let mut registry = HookRegistry::new();
    registry.register_membership(Box::new(MembershipGuard::new(
        config.guard.restricted_groups.clone(),
    )));
    registry.register_startup(Box::new(FeedBootstrap));

    // Dispatch the startup chain exactly once. The prompt provider blocks on
    // stdin here when credentials.mode = "prompt"; this is the one-time,
    // human-in-the-loop step.
    let provider = provider_from_config(&config.credentials);
    let mut ctx = StartupContext {
        config: &config,
        sources: db.as_ref(),
        groups: db.as_ref(),
        credentials: provider.as_ref(),
        feed: FeedState::default(),
    };
    registry
        .dispatch_startup(&mut ctx)
        .context("startup interceptor chain failed")?;
    let feed = Arc::new(ctx.feed);

    if feed.disabled {
        info!("LDAP feed disabled; identity cache not seeded");
    } else {
        info!(
            entries = feed.extid_cache.len(),
            "feed bootstrap complete"
        );
    }

    signals::wait_for_shutdown().await;
    info!("Shutdown signal received, stopping.");
    Ok(())
}
