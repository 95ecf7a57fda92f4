//! Audit sinks for storing change events

use crate::error::Result;
use crate::event::ChangeEvent;
use async_trait::async_trait;
use corral_types::CustomerId;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

/// Trait for audit sinks
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Record a change event
    async fn record(&self, event: ChangeEvent) -> Result<()>;

    /// Number of events recorded so far
    async fn entry_count(&self) -> Result<u64>;
}

/// In-memory audit trail for development and testing
#[derive(Default)]
pub struct MemoryAuditTrail {
    events: RwLock<Vec<ChangeEvent>>,
}

impl MemoryAuditTrail {
    /// Create a new memory trail
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.read().clone()
    }

    /// Get the events recorded for one customer
    pub fn events_for(&self, customer_id: &CustomerId) -> Vec<ChangeEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.customer_id == *customer_id)
            .cloned()
            .collect()
    }

    /// Clear all events
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl AuditTrail for MemoryAuditTrail {
    async fn record(&self, event: ChangeEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }

    async fn entry_count(&self) -> Result<u64> {
        Ok(self.events.read().len() as u64)
    }
}

/// File-based audit trail with append-only JSONL writes
pub struct FileAuditTrail {
    path: PathBuf,
    count: AtomicU64,
}

impl FileAuditTrail {
    /// Open (or create) a trail file, counting any existing entries
    pub async fn new(path: PathBuf) -> Result<Self> {
        let count = if path.exists() {
            Self::count_entries(&path).await?
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            0
        };

        Ok(Self {
            path,
            count: AtomicU64::new(count),
        })
    }

    async fn count_entries(path: &PathBuf) -> Result<u64> {
        let file = File::open(path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let mut count = 0u64;
        while let Some(line) = lines.next_line().await? {
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Get the file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read all events back from the file
    pub async fn read_all(&self) -> Result<Vec<ChangeEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: ChangeEvent = serde_json::from_str(&line)?;
            events.push(event);
        }

        Ok(events)
    }
}

#[async_trait]
impl AuditTrail for FileAuditTrail {
    async fn record(&self, event: ChangeEvent) -> Result<()> {
        let json = serde_json::to_string(&event)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn entry_count(&self) -> Result<u64> {
        Ok(self.count.load(Ordering::SeqCst))
    }
}

/// Trail that only emits structured log lines
#[derive(Default)]
pub struct TracingAuditTrail {
    count: AtomicU64,
}

impl TracingAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditTrail for TracingAuditTrail {
    async fn record(&self, event: ChangeEvent) -> Result<()> {
        info!(
            kind = %event.kind,
            customer_id = %event.customer_id,
            actor = event.actor.as_ref().map(|a| a.to_string()),
            message = %event.message,
            "audit event"
        );
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn entry_count(&self) -> Result<u64> {
        Ok(self.count.load(Ordering::SeqCst))
    }
}
