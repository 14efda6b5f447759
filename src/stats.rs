//! Normalization of server stats snapshots into a fixed gauge set.

use serde::Serialize;
use serde_json::Value;

/// The fixed set of server-health gauges emitted every cycle.
///
/// A snapshot normalizes to exactly these six values whether the server
/// runs standalone or clustered. In clustered mode the per-worker pool
/// gauges are summed across all workers, while `workers` and
/// `booted_workers` stay deployment-level counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GaugeSet {
    /// Number of configured worker processes. `1` for standalone servers.
    pub workers: u64,
    /// Number of workers that finished booting. `1` for standalone servers.
    pub booted_workers: u64,
    /// Threads currently processing a request, summed across workers.
    pub running: u64,
    /// Requests queued waiting for a free thread, summed across workers.
    pub backlog: u64,
    /// Additional requests the pools can accept before queuing, summed
    /// across workers.
    pub pool_capacity: u64,
    /// Configured thread pool ceiling, summed across workers.
    pub max_threads: u64,
}

impl GaugeSet {
    /// Normalizes a raw stats snapshot.
    ///
    /// Total on any input: missing or non-numeric keys resolve to their
    /// documented defaults rather than failing the cycle. A snapshot is
    /// treated as clustered iff it has a `workers` key; a `worker_status`
    /// entry without a `last_status` mapping contributes zero to every
    /// summed gauge.
    pub fn from_snapshot(snapshot: &Value) -> Self {
        let clustered = snapshot.get("workers").is_some();
        Self {
            workers: read_gauge(snapshot, "workers", 1),
            booted_workers: read_gauge(snapshot, "booted_workers", 1),
            running: pool_gauge(snapshot, clustered, "running"),
            backlog: pool_gauge(snapshot, clustered, "backlog"),
            pool_capacity: pool_gauge(snapshot, clustered, "pool_capacity"),
            max_threads: pool_gauge(snapshot, clustered, "max_threads"),
        }
    }

    /// The gauges in their fixed emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> {
        [
            ("workers", self.workers),
            ("booted_workers", self.booted_workers),
            ("backlog", self.backlog),
            ("running", self.running),
            ("pool_capacity", self.pool_capacity),
            ("max_threads", self.max_threads),
        ]
        .into_iter()
    }
}

/// Reads a non-negative integer from a mapping, falling back on missing,
/// non-numeric, or negative values.
fn read_gauge(mapping: &Value, key: &str, default: u64) -> u64 {
    mapping.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn pool_gauge(snapshot: &Value, clustered: bool, key: &str) -> u64 {
    if clustered {
        sum_across_workers(snapshot, key)
    } else {
        read_gauge(snapshot, key, 0)
    }
}

fn sum_across_workers(snapshot: &Value, key: &str) -> u64 {
    let entries = match snapshot.get("worker_status").and_then(Value::as_array) {
        Some(entries) => entries,
        None => return 0,
    };
    entries
        .iter()
        .map(|entry| {
            entry
                .get("last_status")
                .map_or(0, |status| read_gauge(status, key, 0))
        })
        .sum()
}
