//! Periodic sweep scheduler
//!
//! Drives the pool sweeper on a fixed interval, with a channel for
//! on-demand sweeps and a cooperative stop that never waits out a long
//! interval.

use crate::config::SweepConfig;
use corral_engine::PoolSweeper;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};

/// Scheduler state
pub struct SweepScheduler {
    config: SweepConfig,
    sweeper: Arc<PoolSweeper>,
    sweep_tx: mpsc::Sender<()>,
    running: Arc<RwLock<bool>>,
}

impl SweepScheduler {
    /// Create a new scheduler
    pub fn new(config: SweepConfig, sweeper: Arc<PoolSweeper>) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (sweep_tx, sweep_rx) = mpsc::channel(10);

        let scheduler = Arc::new(Self {
            config,
            sweeper,
            sweep_tx,
            running: Arc::new(RwLock::new(false)),
        });

        (scheduler, sweep_rx)
    }

    /// Request an immediate sweep
    pub async fn trigger_sweep(&self) {
        let _ = self.sweep_tx.send(()).await;
    }

    /// Run the sweep loop until stopped
    pub async fn start(self: Arc<Self>, mut sweep_rx: mpsc::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Sweep scheduler disabled");
            return;
        }

        {
            let mut running = self.running.write().await;
            *running = true;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            "Sweep scheduler started"
        );

        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(scheduler.config.interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        scheduler.run_sweep().await;
                    }
                    Some(_) = sweep_rx.recv() => {
                        // stop() nudges this channel; a shutdown nudge must
                        // not run one more sweep.
                        if *scheduler.running.read().await {
                            scheduler.run_sweep().await;
                        }
                    }
                    else => break,
                }

                let running = scheduler.running.read().await;
                if !*running {
                    break;
                }
            }
        });

        let _ = handle.await;
        tracing::info!("Sweep scheduler stopped");
    }

    /// Stop the scheduler, waking the loop so shutdown never waits for the
    /// next tick
    pub async fn stop(&self) {
        {
            let mut running = self.running.write().await;
            *running = false;
        }
        let _ = self.sweep_tx.send(()).await;
    }

    async fn run_sweep(&self) {
        match self.sweeper.sweep().await {
            Ok(report) if report.reclaimed > 0 || !report.failures.is_empty() => {
                tracing::info!(
                    examined = report.examined,
                    reclaimed = report.reclaimed,
                    failed = report.failures.len(),
                    "Sweep cycle reclaimed customers"
                );
            }
            Ok(report) => {
                tracing::debug!(examined = report.examined, "Sweep cycle idle");
            }
            Err(e) => {
                tracing::error!(error = %e, "Sweep cycle failed");
            }
        }
    }
}
