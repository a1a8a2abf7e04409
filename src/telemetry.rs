//! Observability collaborators.
//!
//! Components receive an `Arc<dyn LedgerObserver>` at construction and report
//! to it; nothing here is process-global except the log subscriber installed
//! by [`init_logging`].

use crate::error::LedgerError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    GetAccount,
    UpdateAccount,
    DeleteAccount,
    ListAccounts,
    Transfer,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::CreateAccount,
        Operation::GetAccount,
        Operation::UpdateAccount,
        Operation::DeleteAccount,
        Operation::ListAccounts,
        Operation::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateAccount => "create_account",
            Operation::GetAccount => "get_account",
            Operation::UpdateAccount => "update_account",
            Operation::DeleteAccount => "delete_account",
            Operation::ListAccounts => "list_accounts",
            Operation::Transfer => "transfer",
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

pub trait LedgerObserver: Send + Sync {
    fn request(&self, op: Operation);
    fn completed(&self, op: Operation, elapsed: Duration);
    fn failed(&self, op: Operation, error: &LedgerError);
    /// A transfer attempt failed transiently and is about to be re-executed.
    fn retry(&self, attempt: u32, error: &LedgerError);
}

/// Emits every observation as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LedgerObserver for TracingObserver {
    fn request(&self, op: Operation) {
        tracing::debug!(operation = %op, "request");
    }

    fn completed(&self, op: Operation, elapsed: Duration) {
        tracing::debug!(
            operation = %op,
            elapsed_us = elapsed.as_micros() as u64,
            "completed"
        );
    }

    fn failed(&self, op: Operation, error: &LedgerError) {
        if error.is_transient() || matches!(error, LedgerError::StoreUnavailable(_)) {
            tracing::warn!(operation = %op, error = %error, "failed");
        } else {
            tracing::info!(operation = %op, error = %error, "rejected");
        }
    }

    fn retry(&self, attempt: u32, error: &LedgerError) {
        tracing::warn!(attempt, error = %error, "retrying transfer");
    }
}

#[derive(Debug, Default)]
struct OperationCounters {
    requests: AtomicU64,
    errors: AtomicU64,
    latency_us: AtomicU64,
}

/// In-process counters per operation, readable through [`snapshot`](Self::snapshot).
/// Every observation is also forwarded to a [`TracingObserver`].
#[derive(Debug, Default)]
pub struct LedgerMetrics {
    operations: [OperationCounters; 6],
    retries: AtomicU64,
    log: TracingObserver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperationStats {
    pub requests: u64,
    pub errors: u64,
    pub total_latency: Duration,
}

impl LedgerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, op: Operation) -> OperationStats {
        let counters = &self.operations[op.index()];
        OperationStats {
            requests: counters.requests.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            total_latency: Duration::from_micros(counters.latency_us.load(Ordering::Relaxed)),
        }
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Logs one summary line per operation that saw any traffic.
    pub fn log_summary(&self) {
        for op in Operation::ALL {
            let stats = self.snapshot(op);
            if stats.requests > 0 {
                tracing::info!(
                    operation = %op,
                    requests = stats.requests,
                    errors = stats.errors,
                    latency_ms = stats.total_latency.as_millis() as u64,
                    "operation summary"
                );
            }
        }
        tracing::info!(retries = self.retries(), "transfer retries");
    }
}

impl LedgerObserver for LedgerMetrics {
    fn request(&self, op: Operation) {
        self.operations[op.index()]
            .requests
            .fetch_add(1, Ordering::Relaxed);
        self.log.request(op);
    }

    fn completed(&self, op: Operation, elapsed: Duration) {
        self.operations[op.index()]
            .latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.log.completed(op, elapsed);
    }

    fn failed(&self, op: Operation, error: &LedgerError) {
        self.operations[op.index()]
            .errors
            .fetch_add(1, Ordering::Relaxed);
        self.log.failed(op, error);
    }

    fn retry(&self, attempt: u32, error: &LedgerError) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        self.log.retry(attempt, error);
    }
}

/// Installs a stderr `fmt` subscriber. `RUST_LOG` takes precedence over
/// `level`. Calling it twice is harmless.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_count_per_operation() {
        let metrics = LedgerMetrics::new();
        metrics.request(Operation::Transfer);
        metrics.request(Operation::Transfer);
        metrics.failed(
            Operation::Transfer,
            &LedgerError::ValidationError("x".to_string()),
        );
        metrics.completed(Operation::Transfer, Duration::from_micros(250));
        metrics.request(Operation::GetAccount);

        let transfer = metrics.snapshot(Operation::Transfer);
        assert_eq!(transfer.requests, 2);
        assert_eq!(transfer.errors, 1);
        assert_eq!(transfer.total_latency, Duration::from_micros(250));
        assert_eq!(metrics.snapshot(Operation::GetAccount).requests, 1);
        assert_eq!(metrics.snapshot(Operation::DeleteAccount).requests, 0);
    }

    #[test]
    fn test_metrics_count_retries() {
        let metrics = LedgerMetrics::new();
        metrics.retry(1, &LedgerError::Conflict("busy".to_string()));
        assert_eq!(metrics.retries(), 1);
    }

    #[test]
    fn test_operation_indices_cover_all() {
        for (i, op) in Operation::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
    }
}
