use std::sync::atomic::{AtomicU64, Ordering};

/// Relay-internal counters for record dispatch.
///
/// Dropped and rejected records are silent on the data plane; these counters
/// are the only place they become observable. The telemetry layer reads them
/// through [`snapshot`](Self::snapshot), and the health-metrics cluster
/// receives them as synthesized gauges.
#[derive(Debug, Default)]
pub struct DispatchCounters {
    dispatched: AtomicU64,
    malformed: AtomicU64,
    filtered: AtomicU64,
    cardinality_rejected: AtomicU64,
    no_route: AtomicU64,
}

impl DispatchCounters {
    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cardinality_rejected(&self) {
        self.cardinality_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_no_route(&self) {
        self.no_route.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot of all counters.
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            cardinality_rejected: self.cardinality_rejected.load(Ordering::Relaxed),
            no_route: self.no_route.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`DispatchCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    /// Well-formed records that entered routing.
    pub dispatched: u64,
    /// Records dropped for all clusters because they did not parse or
    /// validate.
    pub malformed: u64,
    /// Per-cluster drops by ingress filters.
    pub filtered: u64,
    /// Per-cluster drops by the cardinality gate.
    pub cardinality_rejected: u64,
    /// Per-cluster skips because the shard ring was empty.
    pub no_route: u64,
}

impl CountersSnapshot {
    /// Iterates over `(metric name, value)` pairs for health-metrics export.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> {
        [
            ("mrelay.records.dispatched", self.dispatched),
            ("mrelay.records.malformed", self.malformed),
            ("mrelay.records.filtered", self.filtered),
            ("mrelay.records.cardinality_rejected", self.cardinality_rejected),
            ("mrelay.records.no_route", self.no_route),
        ]
        .into_iter()
    }
}
