//! Lightweight global metrics for snapmirror.
//!
//! Атомарные счётчики по подсистемам:
//! - Inventory (запросы zfs list)
//! - Reconcile (решения по томам)
//! - Transfer (отправки и строки аудита)

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// ----- Inventory -----
static INVENTORY_QUERIES: AtomicU64 = AtomicU64::new(0);

// ----- Reconcile -----
static VOLUMES_SEEN: AtomicU64 = AtomicU64::new(0);
static VOLUMES_SKIPPED: AtomicU64 = AtomicU64::new(0);

// ----- Transfer -----
static SEED_TRANSFERS: AtomicU64 = AtomicU64::new(0);
static INCREMENTAL_TRANSFERS: AtomicU64 = AtomicU64::new(0);
static TRANSFER_FAILURES: AtomicU64 = AtomicU64::new(0);
static AUDIT_LINES_WRITTEN: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    // Inventory
    pub inventory_queries: u64,

    // Reconcile
    pub volumes_seen: u64,
    pub volumes_skipped: u64,

    // Transfer
    pub seed_transfers: u64,
    pub incremental_transfers: u64,
    pub transfer_failures: u64,
    pub audit_lines_written: u64,
}

impl MetricsSnapshot {
    pub fn transfers_total(&self) -> u64 {
        self.seed_transfers + self.incremental_transfers
    }
}

// ----- Recorders (Inventory) -----
pub fn record_inventory_query() {
    INVENTORY_QUERIES.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Reconcile) -----
pub fn record_volume_seen() {
    VOLUMES_SEEN.fetch_add(1, Ordering::Relaxed);
}

pub fn record_volume_skipped() {
    VOLUMES_SKIPPED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Transfer) -----
pub fn record_seed_transfer() {
    SEED_TRANSFERS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_incremental_transfer() {
    INCREMENTAL_TRANSFERS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_transfer_failure() {
    TRANSFER_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_audit_line() {
    AUDIT_LINES_WRITTEN.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        inventory_queries: INVENTORY_QUERIES.load(Ordering::Relaxed),

        volumes_seen: VOLUMES_SEEN.load(Ordering::Relaxed),
        volumes_skipped: VOLUMES_SKIPPED.load(Ordering::Relaxed),

        seed_transfers: SEED_TRANSFERS.load(Ordering::Relaxed),
        incremental_transfers: INCREMENTAL_TRANSFERS.load(Ordering::Relaxed),
        transfer_failures: TRANSFER_FAILURES.load(Ordering::Relaxed),
        audit_lines_written: AUDIT_LINES_WRITTEN.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let before = snapshot();
        record_seed_transfer();
        record_incremental_transfer();
        record_volume_seen();
        let after = snapshot();
        assert!(after.transfers_total() >= before.transfers_total() + 2);
        assert!(after.volumes_seen > before.volumes_seen);
    }
}
