//! Configuration for corrald

use corral_types::PoolPolicy;
use serde::{Deserialize, Serialize};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Sweep scheduler configuration
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Pool reclamation policy seeded into the store at startup
    #[serde(default)]
    pub pool: PoolConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sweep scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Run the periodic reclamation sweep
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between sweep cycles
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

/// Pool reclamation policy
///
/// Disabled by default; a disabled policy makes every sweep a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Reclaim expired customers into the pool
    #[serde(default)]
    pub enabled: bool,

    /// Days an owned customer may stay without reaching a deal
    #[serde(default = "default_deal_expire_days")]
    pub deal_expire_days: i64,

    /// Days a dealt customer may stay without a follow-up
    #[serde(default = "default_contact_expire_days")]
    pub contact_expire_days: i64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            deal_expire_days: 30,
            contact_expire_days: 14,
        }
    }
}

impl PoolConfig {
    /// Convert into the policy record the sweeper reads
    pub fn policy(&self) -> PoolPolicy {
        PoolPolicy {
            enabled: self.enabled,
            deal_expire_days: self.deal_expire_days,
            contact_expire_days: self.contact_expire_days,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,

    /// One JSON object per line
    Json,
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_deal_expire_days() -> i64 {
    30
}

fn default_contact_expire_days() -> i64 {
    14
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from an optional file plus CORRAL_ environment
    /// variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with CORRAL_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("CORRAL")
                .separator("_")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
