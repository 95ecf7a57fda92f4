//! Corral daemon library
//!
//! Building blocks for `corrald`:
//! - Configuration loading (file + environment + CLI overrides)
//! - The periodic sweep scheduler

pub mod config;
pub mod scheduler;

pub use config::{DaemonConfig, LogFormat, LoggingConfig, PoolConfig, SweepConfig};
pub use scheduler::SweepScheduler;
