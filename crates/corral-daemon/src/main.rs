//! corrald - Corral background reclamation daemon
//!
//! Wires the in-memory stores, the allocation engine, and the periodic
//! pool sweep into a long-running process. Suitable for development and
//! single-node use; persistent backends plug in behind the same storage
//! traits.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod scheduler;

use config::{DaemonConfig, LogFormat};
use corral_audit::TracingAuditTrail;
use corral_engine::{CustomerAllocator, PoolSweeper};
use corral_store::{
    MemoryAclStore, MemoryContactStore, MemoryCustomerStore, MemoryPoolPolicy, MemoryQuotaRules,
    MemoryReferenceCounter, MemoryUserDirectory, ReferenceCounter,
};
use scheduler::SweepScheduler;

/// Corral daemon CLI
#[derive(Parser)]
#[command(name = "corrald")]
#[command(about = "Corral - Customer pool reclamation daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CORRAL_CONFIG")]
    config: Option<String>,

    /// Seconds between sweep cycles
    #[arg(long, env = "CORRAL_SWEEP_INTERVAL")]
    sweep_interval: Option<u64>,

    /// Log level
    #[arg(long, env = "CORRAL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CORRAL_LOG_JSON")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config =
        DaemonConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Override with CLI args
    if let Some(secs) = cli.sweep_interval {
        config.sweep.interval_secs = secs;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Print startup banner
    println!(
        r#"
   ____ ___  ____  ____      _    _
  / ___/ _ \|  _ \|  _ \    / \  | |
 | |  | | | | |_) | |_) |  / _ \ | |
 | |__| |_| |  _ <|  _ <  / ___ \| |___
  \____\___/|_| \_\_| \_\/_/   \_\_____|

  Customer pool ownership daemon
  Version: {}
  Sweep interval: {}s
  Pool reclamation: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.sweep.interval_secs,
        if config.pool.enabled {
            "enabled"
        } else {
            "disabled"
        },
    );

    // Wire the stores and the engine
    let customers = Arc::new(MemoryCustomerStore::new());
    let acl = Arc::new(MemoryAclStore::new());
    let users = Arc::new(MemoryUserDirectory::new());
    let contacts = Arc::new(MemoryContactStore::new());
    let deals = Arc::new(MemoryReferenceCounter::deals());
    let contracts = Arc::new(MemoryReferenceCounter::contracts());
    let quota_rules = Arc::new(MemoryQuotaRules::new());
    let policies = Arc::new(MemoryPoolPolicy::with_policy(config.pool.policy()));
    let audit = Arc::new(TracingAuditTrail::new());

    let allocator = Arc::new(CustomerAllocator::new(
        customers.clone(),
        acl,
        users,
        contacts,
        vec![
            deals as Arc<dyn ReferenceCounter>,
            contracts as Arc<dyn ReferenceCounter>,
        ],
        quota_rules,
        audit,
    ));
    let sweeper = Arc::new(PoolSweeper::new(customers, policies, allocator));

    // Start the sweep scheduler
    let (sched, sweep_rx) = SweepScheduler::new(config.sweep.clone(), sweeper);
    let scheduler_handle = tokio::spawn(sched.clone().start(sweep_rx));

    tracing::info!("corrald started");

    // Run until interrupted
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Received shutdown signal");

    sched.stop().await;
    let _ = scheduler_handle.await;
    tracing::info!("corrald stopped");

    Ok(())
}
