use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sqlx::PgPool;

use crate::coordinator::SyncCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: SyncCoordinator,
    /// PostgreSQL pool backing the manifest store. None when running on the in-memory store.
    pub db: Option<PgPool>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    snapshot_requests_total: AtomicU64,
    sync_runs_total: AtomicU64,
    sync_failures_total: AtomicU64,
    manifest_runs_total: AtomicU64,
    manifest_failures_total: AtomicU64,
    command_failures_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilitySnapshot {
    pub snapshot_requests_total: u64,
    pub sync_runs_total: u64,
    pub sync_failures_total: u64,
    pub manifest_runs_total: u64,
    pub manifest_failures_total: u64,
    pub command_failures_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            snapshot_requests_total: self.snapshot_requests_total.load(Ordering::Relaxed),
            sync_runs_total: self.sync_runs_total.load(Ordering::Relaxed),
            sync_failures_total: self.sync_failures_total.load(Ordering::Relaxed),
            manifest_runs_total: self.manifest_runs_total.load(Ordering::Relaxed),
            manifest_failures_total: self.manifest_failures_total.load(Ordering::Relaxed),
            command_failures_total: self.command_failures_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_snapshot_request(&self) {
        self.snapshot_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one sync attempt, and a failure when `ok` is false.
    pub fn record_sync(&self, ok: bool) {
        self.sync_runs_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.sync_failures_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_manifest_sync(&self, ok: bool) {
        self.manifest_runs_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.manifest_failures_total
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_command_failure(&self) {
        self.command_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(coordinator: SyncCoordinator, db: Option<PgPool>) -> Self {
        Self {
            coordinator,
            db,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }
}
