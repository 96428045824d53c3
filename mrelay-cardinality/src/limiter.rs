use hashbrown::HashMap;
use mrelay_common::time::UnixTimestamp;
use mrelay_protocol::MetricType;
use parking_lot::Mutex;

use crate::CardinalityConfig;

/// Tracks the set of seen metric keys per metric type with a hard ceiling.
///
/// One limiter instance belongs to one downstream cluster. The tracked sets
/// are the only shared-mutable state on the record hot path; each metric type
/// has its own map behind its own mutex, so workers dispatching different
/// metric types do not contend. Every insert and refresh happens under the
/// same lock as the size check that gated it, which upholds the ceiling even
/// when admits and purges interleave.
#[derive(Debug)]
pub struct CardinalityLimiter {
    config: CardinalityConfig,
    tracked: [Mutex<HashMap<Box<[u8]>, UnixTimestamp>>; MetricType::ALL.len()],
}

impl CardinalityLimiter {
    /// Creates a limiter from the given configuration.
    pub fn new(config: CardinalityConfig) -> Self {
        Self {
            config,
            tracked: Default::default(),
        }
    }

    /// Returns the limiter's configuration.
    pub fn config(&self) -> &CardinalityConfig {
        &self.config
    }

    /// Decides whether a record with the given key may pass the sampling gate.
    ///
    /// Always admits when sampling is disabled for the metric type. Otherwise
    /// a known key is refreshed and admitted, an unknown key is tracked and
    /// admitted while the tracked set is below the ceiling, and rejected once
    /// the ceiling is reached. A rejection only affects the cluster owning
    /// this limiter.
    pub fn admit(&self, metric_type: MetricType, key: &[u8], now: UnixTimestamp) -> bool {
        let limit = self.config.limit(metric_type);
        if !limit.is_enabled() {
            return true;
        }

        let mut tracked = self.tracked[index(metric_type)].lock();
        if let Some(last_seen) = tracked.get_mut(key) {
            *last_seen = now;
            return true;
        }
        if tracked.len() < limit.max_cardinality {
            tracked.insert(key.into(), now);
            return true;
        }
        false
    }

    /// Removes every tracked key not seen within the configured entry TTL.
    ///
    /// Intended to run on the configured purge cadence, independent of the
    /// admit path. Each per-type sweep holds that type's lock for the whole
    /// pass; admits for that type wait rather than observing a half-swept
    /// map.
    pub fn purge(&self, now: UnixTimestamp) {
        let deadline = now.saturating_sub(self.config.entry_ttl());
        for tracked in &self.tracked {
            tracked.lock().retain(|_, last_seen| *last_seen > deadline);
        }
    }

    /// Returns the number of tracked keys for the given metric type.
    pub fn tracked_len(&self, metric_type: MetricType) -> usize {
        self.tracked[index(metric_type)].lock().len()
    }
}

fn index(metric_type: MetricType) -> usize {
    metric_type as usize
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::SamplingLimit;

    use super::*;

    fn sampled_config(max_cardinality: usize) -> CardinalityConfig {
        CardinalityConfig {
            counter: SamplingLimit {
                threshold: 100,
                window: 10,
                max_cardinality,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_admit_all_when_disabled() {
        let limiter = CardinalityLimiter::new(CardinalityConfig::default());
        let now = UnixTimestamp::from_secs(1_700_000_000);

        for i in 0..100_000u32 {
            let key = format!("metric.{i}");
            assert!(limiter.admit(MetricType::Counter, key.as_bytes(), now));
        }
        // Disabled sampling tracks nothing.
        assert_eq!(limiter.tracked_len(MetricType::Counter), 0);
    }

    #[test]
    fn test_rejects_at_ceiling() {
        let limiter = CardinalityLimiter::new(sampled_config(3));
        let now = UnixTimestamp::from_secs(1_700_000_000);

        assert!(limiter.admit(MetricType::Counter, b"a", now));
        assert!(limiter.admit(MetricType::Counter, b"b", now));
        assert!(limiter.admit(MetricType::Counter, b"c", now));
        assert!(!limiter.admit(MetricType::Counter, b"d", now));

        // Known keys stay admissible at the ceiling.
        assert!(limiter.admit(MetricType::Counter, b"a", now));
        assert_eq!(limiter.tracked_len(MetricType::Counter), 3);
    }

    #[test]
    fn test_ceiling_is_per_metric_type() {
        let mut config = sampled_config(1);
        config.timer = SamplingLimit {
            threshold: 100,
            window: 10,
            max_cardinality: 1,
        };
        let limiter = CardinalityLimiter::new(config);
        let now = UnixTimestamp::from_secs(1_700_000_000);

        assert!(limiter.admit(MetricType::Counter, b"a", now));
        assert!(limiter.admit(MetricType::Timer, b"b", now));
        assert!(!limiter.admit(MetricType::Counter, b"b", now));
    }

    #[test]
    fn test_purge_expires_stale_keys() {
        let mut config = sampled_config(2);
        config.entry_ttl = 60;
        let limiter = CardinalityLimiter::new(config);

        let start = UnixTimestamp::from_secs(1_700_000_000);
        assert!(limiter.admit(MetricType::Counter, b"a", start));
        assert!(limiter.admit(MetricType::Counter, b"b", start));
        assert!(!limiter.admit(MetricType::Counter, b"c", start));

        let later = start + Duration::from_secs(61);
        limiter.purge(later);
        assert_eq!(limiter.tracked_len(MetricType::Counter), 0);

        // Previously rejected keys become admissible again.
        assert!(limiter.admit(MetricType::Counter, b"c", later));
    }

    #[test]
    fn test_purge_keeps_fresh_keys() {
        let mut config = sampled_config(2);
        config.entry_ttl = 60;
        let limiter = CardinalityLimiter::new(config);

        let start = UnixTimestamp::from_secs(1_700_000_000);
        assert!(limiter.admit(MetricType::Counter, b"stale", start));

        // Refreshing moves the expiry forward.
        let mid = start + Duration::from_secs(40);
        assert!(limiter.admit(MetricType::Counter, b"fresh", start));
        assert!(limiter.admit(MetricType::Counter, b"fresh", mid));

        limiter.purge(start + Duration::from_secs(70));
        assert_eq!(limiter.tracked_len(MetricType::Counter), 1);
        assert!(limiter.admit(MetricType::Counter, b"fresh", mid));
    }
}
