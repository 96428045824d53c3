use std::time::Duration;

use mrelay_protocol::MetricType;
use serde::{Deserialize, Serialize};

/// Default per-type cardinality ceiling.
pub const DEFAULT_MAX_CARDINALITY: usize = 10_000;

/// Default purge sweep cadence in seconds (hourly).
pub const DEFAULT_PURGE_INTERVAL: u64 = 3600;

/// Default tracked-entry lifetime in seconds (six hours).
pub const DEFAULT_ENTRY_TTL: u64 = 21_600;

/// The sampling gate configuration for a single metric type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingLimit {
    /// Per-window record count above which sampling kicks in.
    ///
    /// Negative values disable sampling for this metric type entirely, which
    /// is the default.
    pub threshold: i64,
    /// The sampling window in seconds.
    pub window: i64,
    /// Hard ceiling on distinct tracked keys for this metric type.
    pub max_cardinality: usize,
}

impl SamplingLimit {
    /// Returns `true` if sampling is enabled for this metric type.
    pub fn is_enabled(&self) -> bool {
        self.threshold >= 0
    }
}

impl Default for SamplingLimit {
    fn default() -> Self {
        Self {
            threshold: -1,
            window: -1,
            max_cardinality: DEFAULT_MAX_CARDINALITY,
        }
    }
}

/// Cardinality limiter configuration for one downstream cluster.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CardinalityConfig {
    /// Sampling gate for counters.
    pub counter: SamplingLimit,
    /// Sampling gate for timers.
    pub timer: SamplingLimit,
    /// Sampling gate for gauges.
    pub gauge: SamplingLimit,
    /// Sampling gate for histograms.
    pub histogram: SamplingLimit,
    /// Sampling gate for sets.
    pub set: SamplingLimit,
    /// Sampling gate for key/value records.
    pub key_value: SamplingLimit,

    /// Cadence of the periodic purge sweep, in seconds.
    pub purge_interval: u64,
    /// Lifetime of a tracked key since it was last seen, in seconds.
    pub entry_ttl: u64,
}

impl CardinalityConfig {
    /// Returns the sampling gate for the given metric type.
    pub fn limit(&self, metric_type: MetricType) -> &SamplingLimit {
        match metric_type {
            MetricType::Counter => &self.counter,
            MetricType::Timer => &self.timer,
            MetricType::Gauge => &self.gauge,
            MetricType::Histogram => &self.histogram,
            MetricType::Set => &self.set,
            MetricType::KeyValue => &self.key_value,
        }
    }

    /// Returns `true` if sampling is enabled for any metric type.
    pub fn sampling_enabled(&self) -> bool {
        MetricType::ALL
            .iter()
            .any(|metric_type| self.limit(*metric_type).is_enabled())
    }

    /// Returns the purge cadence as a duration.
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval)
    }

    /// Returns the tracked-entry lifetime as a duration.
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_ttl)
    }
}

impl Default for CardinalityConfig {
    fn default() -> Self {
        Self {
            counter: SamplingLimit::default(),
            timer: SamplingLimit::default(),
            gauge: SamplingLimit::default(),
            histogram: SamplingLimit::default(),
            set: SamplingLimit::default(),
            key_value: SamplingLimit::default(),
            purge_interval: DEFAULT_PURGE_INTERVAL,
            entry_ttl: DEFAULT_ENTRY_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: CardinalityConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.sampling_enabled());
        assert_eq!(config.counter.max_cardinality, DEFAULT_MAX_CARDINALITY);
        assert_eq!(config.purge_interval(), Duration::from_secs(3600));
        assert_eq!(config.entry_ttl(), Duration::from_secs(21_600));
    }

    #[test]
    fn test_partial_overrides() {
        let config: CardinalityConfig = serde_json::from_str(
            r#"{
                "timer": {"threshold": 200, "window": 10, "max_cardinality": 50},
                "entry_ttl": 60
            }"#,
        )
        .unwrap();

        assert!(config.sampling_enabled());
        assert!(config.limit(MetricType::Timer).is_enabled());
        assert!(!config.limit(MetricType::Counter).is_enabled());
        assert_eq!(config.timer.max_cardinality, 50);
        assert_eq!(config.entry_ttl(), Duration::from_secs(60));
    }
}
