//! Telemetry and observability for the policy rule store.
//!
//! Logging goes through `tracing`; [`init_logging`] installs the subscriber
//! used by the `policy-store` binary. [`Telemetry`] keeps in-process counters
//! for store operations that callers can export however they like.

use crate::config::TelemetryConfig;
use crate::{Error, Result};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Store operations tracked by telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `load_policy`
    Load,
    /// `save_policy`
    Save,
    /// `add_policy` / `add_policies`
    Add,
    /// `remove_policy` / `remove_policies`
    Remove,
    /// `remove_filtered_policy`
    RemoveFiltered,
    /// `update_policy` / `update_policies`
    Update,
    /// `update_filtered_policies`
    UpdateFiltered,
}

impl Operation {
    const ALL: [Operation; 7] = [
        Operation::Load,
        Operation::Save,
        Operation::Add,
        Operation::Remove,
        Operation::RemoveFiltered,
        Operation::Update,
        Operation::UpdateFiltered,
    ];

    /// Metric label for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Load => "load",
            Operation::Save => "save",
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::RemoveFiltered => "remove_filtered",
            Operation::Update => "update",
            Operation::UpdateFiltered => "update_filtered",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Telemetry instance for recording store metrics.
#[derive(Debug)]
pub struct Telemetry {
    /// Configuration
    config: TelemetryConfig,
    /// Completed calls per operation
    calls: [AtomicU64; 7],
    /// Rows read by load and filtered snapshots
    rows_read: AtomicU64,
    /// Rows inserted or updated
    rows_written: AtomicU64,
    /// Rows deleted
    rows_deleted: AtomicU64,
    /// Transactions rolled back
    rollbacks: AtomicU64,
    /// Errors by category
    errors: Mutex<BTreeMap<&'static str, u64>>,
    /// Total operation time in microseconds
    total_time_us: AtomicU64,
}

impl Telemetry {
    /// Create a new telemetry instance.
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            config: config.clone(),
            calls: Default::default(),
            rows_read: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            rows_deleted: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            errors: Mutex::new(BTreeMap::new()),
            total_time_us: AtomicU64::new(0),
        }
    }

    /// Record a completed operation.
    pub fn record_operation(&self, operation: Operation, rows: RowCounts, duration_ms: f64) {
        if !self.config.enabled {
            return;
        }
        self.calls[operation.index()].fetch_add(1, Ordering::Relaxed);
        self.rows_read.fetch_add(rows.read, Ordering::Relaxed);
        self.rows_written.fetch_add(rows.written, Ordering::Relaxed);
        self.rows_deleted.fetch_add(rows.deleted, Ordering::Relaxed);

        let duration_us = (duration_ms * 1000.0) as u64;
        self.total_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Record a rolled back transaction.
    pub fn record_rollback(&self) {
        if self.config.enabled {
            self.rollbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an error.
    pub fn record_error(&self, error: &Error) {
        if !self.config.enabled {
            return;
        }
        *self.errors.lock().entry(error.category()).or_insert(0) += 1;
    }

    /// Get current metrics.
    pub fn metrics(&self) -> TelemetryMetrics {
        let calls: BTreeMap<String, u64> = Operation::ALL
            .iter()
            .map(|op| (op.as_str().to_string(), self.calls[op.index()].load(Ordering::Relaxed)))
            .collect();
        let total_operations: u64 = calls.values().sum();

        let total_time_us = self.total_time_us.load(Ordering::Relaxed);
        let avg_operation_time_ms = if total_operations > 0 {
            (total_time_us as f64 / total_operations as f64) / 1000.0
        } else {
            0.0
        };

        let errors = self
            .errors
            .lock()
            .iter()
            .map(|(category, count)| (category.to_string(), *count))
            .collect();

        TelemetryMetrics {
            total_operations,
            calls,
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            rows_deleted: self.rows_deleted.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            errors,
            avg_operation_time_ms,
        }
    }

    /// Check if telemetry is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the service name.
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }
}

/// Row counts attributed to one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    /// Rows read
    pub read: u64,
    /// Rows inserted or updated
    pub written: u64,
    /// Rows deleted
    pub deleted: u64,
}

impl RowCounts {
    /// Rows read only.
    pub fn read(rows: u64) -> Self {
        Self {
            read: rows,
            ..Default::default()
        }
    }

    /// Rows written only.
    pub fn written(rows: u64) -> Self {
        Self {
            written: rows,
            ..Default::default()
        }
    }

    /// Rows deleted only.
    pub fn deleted(rows: u64) -> Self {
        Self {
            deleted: rows,
            ..Default::default()
        }
    }
}

/// Metrics collected by telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryMetrics {
    /// Total number of completed operations
    pub total_operations: u64,
    /// Completed calls per operation label
    pub calls: BTreeMap<String, u64>,
    /// Rows read
    pub rows_read: u64,
    /// Rows inserted or updated
    pub rows_written: u64,
    /// Rows deleted
    pub rows_deleted: u64,
    /// Transactions rolled back
    pub rollbacks: u64,
    /// Errors per category
    pub errors: BTreeMap<String, u64>,
    /// Average operation time in milliseconds
    pub avg_operation_time_ms: f64,
}

/// A timer for one store operation.
pub struct Span {
    operation: Operation,
    start: Instant,
}

impl Span {
    /// Start timing an operation.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// The operation being timed.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Get the elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// End the span and return the duration.
    pub fn end(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Start a span for an operation.
pub fn span(operation: Operation) -> Span {
    Span::new(operation)
}

/// Initialize the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config_key(e.to_string(), "telemetry.log_level"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::internal(format!("Failed to set logging subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_telemetry_creation() {
        let config = TelemetryConfig::default();
        let telemetry = Telemetry::new(&config);
        assert!(telemetry.is_enabled());
        assert_eq!(telemetry.service_name(), "policy-rule-store");
    }

    #[test]
    fn test_record_operation() {
        let telemetry = Telemetry::new(&TelemetryConfig::default());

        telemetry.record_operation(Operation::Add, RowCounts::written(3), 2.0);
        telemetry.record_operation(Operation::Load, RowCounts::read(5), 4.0);
        telemetry.record_operation(Operation::RemoveFiltered, RowCounts::deleted(2), 0.0);
        telemetry.record_rollback();
        telemetry.record_error(&Error::invalid_arity(7, 6));

        let metrics = telemetry.metrics();
        assert_eq!(metrics.total_operations, 3);
        assert_eq!(metrics.calls["add"], 1);
        assert_eq!(metrics.calls["update"], 0);
        assert_eq!(metrics.rows_written, 3);
        assert_eq!(metrics.rows_read, 5);
        assert_eq!(metrics.rows_deleted, 2);
        assert_eq!(metrics.rollbacks, 1);
        assert_eq!(metrics.errors["invalid_arity"], 1);
        assert!((metrics.avg_operation_time_ms - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_error_counts_survive_panicking_holder() {
        let telemetry = Arc::new(Telemetry::new(&TelemetryConfig::default()));
        telemetry.record_error(&Error::invalid_rule("empty"));

        let holder = Arc::clone(&telemetry);
        let joined = std::thread::spawn(move || {
            let _guard = holder.errors.lock();
            panic!("panicked while holding the error map");
        })
        .join();
        assert!(joined.is_err());

        telemetry.record_error(&Error::invalid_rule("empty"));
        assert_eq!(telemetry.metrics().errors["invalid_rule"], 2);
    }

    #[test]
    fn test_concurrent_error_counts() {
        let telemetry = Arc::new(Telemetry::new(&TelemetryConfig::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let telemetry = Arc::clone(&telemetry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        telemetry.record_error(&Error::config("bad"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(telemetry.metrics().errors["config"], 800);
    }

    #[test]
    fn test_disabled_telemetry_records_nothing() {
        let config = TelemetryConfig {
            enabled: false,
            ..Default::default()
        };
        let telemetry = Telemetry::new(&config);
        telemetry.record_operation(Operation::Save, RowCounts::written(10), 1.0);
        assert_eq!(telemetry.metrics().total_operations, 0);
    }

    #[test]
    fn test_span() {
        let span = span(Operation::UpdateFiltered);
        assert_eq!(span.operation(), Operation::UpdateFiltered);

        std::thread::sleep(std::time::Duration::from_millis(10));

        let duration = span.end();
        assert!(duration >= 10.0);
    }
}
