use std::time::Duration;

use mrelay_buffer::{Buffer, BufferError};
use mrelay_common::time::UnixTimestamp;
use mrelay_protocol::ParsedRecord;
use smallvec::SmallVec;

use crate::{
    ClusterTarget, ConfigError, DispatchCounters, DispatchError, RouterConfig, ShardSelector,
    TargetRole,
};

/// Scratch space for assembling rewritten metric names without allocating.
type NameScratch = SmallVec<[u8; 256]>;

/// The outcome of dispatching one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The record was staged for this many cluster endpoints.
    ///
    /// Zero is possible when every ring was empty or every duplicate cluster
    /// filtered or rejected the record.
    Dispatched {
        /// Number of outbound queues the record was staged into.
        staged: usize,
    },
    /// The record failed parsing or validation and was dropped everywhere.
    Malformed,
}

/// The routing policy for one statsd ingress.
///
/// Holds the primary cluster, the duplicate clusters and the optional
/// health-metrics cluster. Static configuration is immutable after
/// construction; [`dispatch`](Self::dispatch) may be called concurrently
/// from any number of worker contexts, each with its own
/// [`OutboundQueues`].
pub struct RoutingPolicy {
    validate: bool,
    targets: Vec<ClusterTarget>,
    health: Option<usize>,
    selector: Box<dyn ShardSelector>,
    counters: DispatchCounters,
}

impl RoutingPolicy {
    /// Builds a policy from configuration and a shard selector.
    ///
    /// Fails with [`ConfigError::SamplingWithoutValidation`] if any cluster
    /// enables sampling while line validation is off, and with
    /// [`ConfigError::InvalidFilter`] if an ingress pattern does not
    /// compile.
    pub fn new(
        config: &RouterConfig,
        selector: impl ShardSelector + 'static,
    ) -> Result<Self, ConfigError> {
        let mut targets = vec![ClusterTarget::primary(config.shard_map.clone())];

        for duplicate in &config.duplicate_to {
            targets.push(Self::build_secondary(
                TargetRole::Duplicate,
                duplicate,
                config.validate,
            )?);
        }

        let mut health = None;
        if let Some(health_config) = &config.health_metrics_to {
            targets.push(Self::build_secondary(
                TargetRole::HealthMetrics,
                health_config,
                config.validate,
            )?);
            health = Some(targets.len() - 1);
        }

        Ok(Self {
            validate: config.validate,
            targets,
            health,
            selector: Box::new(selector),
            counters: DispatchCounters::default(),
        })
    }

    fn build_secondary(
        role: TargetRole,
        config: &crate::TargetConfig,
        validate: bool,
    ) -> Result<ClusterTarget, ConfigError> {
        if config.sampling.sampling_enabled() && !validate {
            return Err(ConfigError::SamplingWithoutValidation);
        }
        let target = ClusterTarget::secondary(role, config)?;
        mrelay_log::info!(
            prefix = config.prefix.as_deref().unwrap_or(""),
            suffix = config.suffix.as_deref().unwrap_or(""),
            servers = target.ring().len(),
            "adding {role:?} cluster"
        );
        Ok(target)
    }

    /// Returns the configured clusters, primary first.
    pub fn targets(&self) -> &[ClusterTarget] {
        &self.targets
    }

    /// Returns the dispatch counters.
    pub fn counters(&self) -> &DispatchCounters {
        &self.counters
    }

    /// Returns the shortest purge cadence across all clusters.
    ///
    /// The periodic sweep driving [`purge`](Self::purge) should run at this
    /// interval.
    pub fn purge_interval(&self) -> Duration {
        self.targets
            .iter()
            .map(|target| target.limiter().config().purge_interval())
            .min()
            .unwrap_or(Duration::from_secs(
                mrelay_cardinality::DEFAULT_PURGE_INTERVAL,
            ))
    }

    /// Routes one record to every applicable cluster.
    ///
    /// `span` is one length-delimited record, optionally newline-terminated.
    /// Drop decisions (malformed input, ingress filters, cardinality
    /// rejections, empty rings) are counted and reported in the outcome;
    /// only staging failures surface as errors.
    pub fn dispatch(
        &self,
        span: &[u8],
        now: UnixTimestamp,
        queues: &mut OutboundQueues,
    ) -> Result<DispatchOutcome, DispatchError> {
        let record = match ParsedRecord::parse(span) {
            Ok(record) => record,
            Err(error) => {
                mrelay_log::debug!("dropping unparseable record: {error}");
                self.counters.record_malformed();
                return Ok(DispatchOutcome::Malformed);
            }
        };

        let metric_type = if self.validate {
            match record.validate() {
                Ok(metric_type) => Some(metric_type),
                Err(error) => {
                    mrelay_log::debug!("dropping invalid record: {error}");
                    self.counters.record_malformed();
                    return Ok(DispatchOutcome::Malformed);
                }
            }
        } else {
            record.metric_type()
        };

        let mut staged = 0;
        for (index, target) in self.targets.iter().enumerate() {
            match target.role() {
                TargetRole::Primary => {}
                TargetRole::Duplicate => {
                    if !target.filter().accepts(record.name) {
                        self.counters.record_filtered();
                        continue;
                    }
                    if let Some(metric_type) = metric_type {
                        if !target.limiter().admit(metric_type, record.name, now) {
                            self.counters.record_cardinality_rejected();
                            continue;
                        }
                    }
                }
                // Health metrics are synthesized periodically, never
                // per-record.
                TargetRole::HealthMetrics => continue,
            }

            staged += usize::from(self.stage(index, &record, queues)?);
        }

        self.counters.record_dispatched();
        Ok(DispatchOutcome::Dispatched { staged })
    }

    /// Stages relay-internal counters for the health-metrics cluster.
    ///
    /// Driven externally on a fixed period. No-op without a configured
    /// health-metrics cluster.
    pub fn stage_health_metrics(
        &self,
        queues: &mut OutboundQueues,
    ) -> Result<usize, DispatchError> {
        let Some(index) = self.health else {
            return Ok(0);
        };

        let mut staged = 0;
        for (name, value) in self.counters.snapshot().iter() {
            let line = format!("{name}:{value}|g");
            // Synthesized lines always parse.
            if let Ok(record) = ParsedRecord::parse(line.as_bytes()) {
                staged += usize::from(self.stage(index, &record, queues)?);
            }
        }
        Ok(staged)
    }

    /// Runs one purge sweep over every cluster's cardinality limiter.
    pub fn purge(&self, now: UnixTimestamp) {
        for target in &self.targets {
            target.limiter().purge(now);
        }
    }

    /// Stages one record for one cluster, rewriting the name if needed.
    ///
    /// Returns `false` if the cluster's ring is empty; the record is skipped
    /// for this cluster only.
    fn stage(
        &self,
        index: usize,
        record: &ParsedRecord<'_>,
        queues: &mut OutboundQueues,
    ) -> Result<bool, DispatchError> {
        let target = &self.targets[index];
        let (prefix, suffix) = match target.role() {
            // The primary never rewrites.
            TargetRole::Primary => (&[][..], &[][..]),
            _ => (target.prefix(), target.suffix()),
        };

        let shard = if target.rewrites() {
            let mut key = NameScratch::new();
            key.extend_from_slice(prefix);
            key.extend_from_slice(record.name);
            key.extend_from_slice(suffix);
            self.selector.select_shard(target.ring(), &key)
        } else {
            self.selector.select_shard(target.ring(), record.name)
        };

        let Some(shard) = shard else {
            self.counters.record_no_route();
            return Ok(false);
        };

        let queue = queues.queue_mut(index, shard);
        let total =
            prefix.len() + record.name.len() + suffix.len() + 1 + record.payload().len() + 1;
        // Reserve once so the record is staged with at most one reallocation.
        queue.grow(total)?;
        queue.write(prefix)?;
        queue.write(record.name)?;
        queue.write(suffix)?;
        queue.write(b":")?;
        queue.write(record.payload())?;
        queue.write(b"\n")?;
        Ok(true)
    }
}

/// Per-worker outbound staging buffers, one per cluster endpoint.
///
/// Each worker context owns one instance exclusively, so staging requires no
/// locking. The connection layer drains the buffers and enforces the
/// `max_send_queue` ceiling against [`Buffer::len`].
pub struct OutboundQueues {
    targets: Vec<Vec<(String, Buffer)>>,
}

impl OutboundQueues {
    /// Creates queues shaped after the policy's clusters and rings.
    pub fn new(policy: &RoutingPolicy) -> Result<Self, BufferError> {
        let mut targets = Vec::with_capacity(policy.targets().len());
        for target in policy.targets() {
            let mut queues = Vec::with_capacity(target.ring().len());
            for endpoint in target.ring() {
                queues.push((endpoint.clone(), Buffer::new()?));
            }
            targets.push(queues);
        }
        Ok(Self { targets })
    }

    /// Returns the queue for the given cluster and shard index.
    pub fn queue(&self, target: usize, shard: usize) -> &Buffer {
        &self.targets[target][shard].1
    }

    pub(crate) fn queue_mut(&mut self, target: usize, shard: usize) -> &mut Buffer {
        &mut self.targets[target][shard].1
    }

    /// Iterates over all queues as `(cluster index, endpoint, buffer)`.
    ///
    /// The connection layer consumes staged bytes through the returned
    /// mutable buffer references.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &str, &mut Buffer)> {
        self.targets
            .iter_mut()
            .enumerate()
            .flat_map(|(index, queues)| {
                queues
                    .iter_mut()
                    .map(move |(endpoint, buffer)| (index, endpoint.as_str(), buffer))
            })
    }
}

#[cfg(test)]
mod tests {
    use mrelay_cardinality::{CardinalityConfig, SamplingLimit};
    use similar_asserts::assert_eq;

    use crate::{FnvShardSelector, TargetConfig};

    use super::*;

    fn now() -> UnixTimestamp {
        UnixTimestamp::from_secs(1_700_000_000)
    }

    fn ring(endpoints: &[&str]) -> Vec<String> {
        endpoints.iter().map(|s| (*s).to_owned()).collect()
    }

    fn sampled(max_cardinality: usize) -> CardinalityConfig {
        CardinalityConfig {
            counter: SamplingLimit {
                threshold: 100,
                window: 10,
                max_cardinality,
            },
            ..Default::default()
        }
    }

    fn policy(config: &RouterConfig) -> RoutingPolicy {
        RoutingPolicy::new(config, FnvShardSelector).unwrap()
    }

    #[test]
    fn test_dispatch_fans_out_to_duplicate_with_prefix() {
        let config = RouterConfig {
            shard_map: ring(&["10.0.0.1:8125"]),
            duplicate_to: vec![TargetConfig {
                shard_map: ring(&["10.1.0.1:8125"]),
                prefix: Some("dup.".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        let outcome = policy
            .dispatch(b"payments.success:1|c", now(), &mut queues)
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Dispatched { staged: 2 });
        assert_eq!(queues.queue(0, 0).data(), b"payments.success:1|c\n");
        assert_eq!(queues.queue(1, 0).data(), b"dup.payments.success:1|c\n");
    }

    #[test]
    fn test_primary_never_rewrites() {
        // The duplicate carries the rewrite; the primary must not.
        let config = RouterConfig {
            shard_map: ring(&["10.0.0.1:8125"]),
            duplicate_to: vec![TargetConfig {
                shard_map: ring(&["10.1.0.1:8125"]),
                suffix: Some(".copy".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        policy.dispatch(b"glork:320|ms\n", now(), &mut queues).unwrap();
        assert_eq!(queues.queue(0, 0).data(), b"glork:320|ms\n");
        assert_eq!(queues.queue(1, 0).data(), b"glork.copy:320|ms\n");
    }

    #[test]
    fn test_unrecognized_type_drops_everywhere() {
        let config = RouterConfig {
            shard_map: ring(&["10.0.0.1:8125"]),
            duplicate_to: vec![TargetConfig {
                shard_map: ring(&["10.1.0.1:8125"]),
                ..Default::default()
            }],
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        let outcome = policy.dispatch(b"name:1|xx", now(), &mut queues).unwrap();

        assert_eq!(outcome, DispatchOutcome::Malformed);
        assert!(queues.queue(0, 0).is_empty());
        assert!(queues.queue(1, 0).is_empty());
        assert_eq!(policy.counters().snapshot().malformed, 1);
        assert_eq!(policy.counters().snapshot().dispatched, 0);
    }

    #[test]
    fn test_validation_disabled_routes_unknown_types() {
        let config = RouterConfig {
            validate: false,
            shard_map: ring(&["10.0.0.1:8125"]),
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        let outcome = policy.dispatch(b"name:1|xx", now(), &mut queues).unwrap();
        assert_eq!(outcome, DispatchOutcome::Dispatched { staged: 1 });
        assert_eq!(queues.queue(0, 0).data(), b"name:1|xx\n");
    }

    #[test]
    fn test_sampling_without_validation_is_rejected() {
        let config = RouterConfig {
            validate: false,
            shard_map: ring(&["10.0.0.1:8125"]),
            duplicate_to: vec![TargetConfig {
                shard_map: ring(&["10.1.0.1:8125"]),
                sampling: sampled(100),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(matches!(
            RoutingPolicy::new(&config, FnvShardSelector),
            Err(ConfigError::SamplingWithoutValidation)
        ));
    }

    #[test]
    fn test_ingress_filter_gates_duplicate_only() {
        let config = RouterConfig {
            shard_map: ring(&["10.0.0.1:8125"]),
            duplicate_to: vec![TargetConfig {
                shard_map: ring(&["10.1.0.1:8125"]),
                input_filter: Some("payments.*".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        policy.dispatch(b"checkout.done:1|c", now(), &mut queues).unwrap();

        assert_eq!(queues.queue(0, 0).data(), b"checkout.done:1|c\n");
        assert!(queues.queue(1, 0).is_empty());
        assert_eq!(policy.counters().snapshot().filtered, 1);
    }

    #[test]
    fn test_cardinality_gate_drops_for_duplicate_only() {
        let config = RouterConfig {
            shard_map: ring(&["10.0.0.1:8125"]),
            duplicate_to: vec![TargetConfig {
                shard_map: ring(&["10.1.0.1:8125"]),
                sampling: sampled(1),
                ..Default::default()
            }],
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        policy.dispatch(b"first:1|c", now(), &mut queues).unwrap();
        policy.dispatch(b"second:1|c", now(), &mut queues).unwrap();

        assert_eq!(queues.queue(0, 0).data(), b"first:1|c\nsecond:1|c\n");
        assert_eq!(queues.queue(1, 0).data(), b"first:1|c\n");
        assert_eq!(policy.counters().snapshot().cardinality_rejected, 1);

        // After a purge past the TTL the key set resets.
        policy.purge(now() + policy.targets()[1].limiter().config().entry_ttl()
            + Duration::from_secs(1));
        policy.dispatch(b"second:1|c", now(), &mut queues).unwrap();
        assert_eq!(queues.queue(1, 0).data(), b"first:1|c\nsecond:1|c\n");
    }

    #[test]
    fn test_empty_ring_is_skipped_and_counted() {
        let config = RouterConfig {
            shard_map: Vec::new(),
            duplicate_to: vec![TargetConfig {
                shard_map: ring(&["10.1.0.1:8125"]),
                ..Default::default()
            }],
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        let outcome = policy.dispatch(b"gorets:1|c", now(), &mut queues).unwrap();

        assert_eq!(outcome, DispatchOutcome::Dispatched { staged: 1 });
        assert_eq!(queues.queue(1, 0).data(), b"gorets:1|c\n");
        assert_eq!(policy.counters().snapshot().no_route, 1);
    }

    #[test]
    fn test_health_metrics_are_rewritten_and_staged() {
        let config = RouterConfig {
            shard_map: ring(&["10.0.0.1:8125"]),
            health_metrics_to: Some(TargetConfig {
                shard_map: ring(&["10.2.0.1:8125"]),
                prefix: Some("relay-health.".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        policy.dispatch(b"gorets:1|c", now(), &mut queues).unwrap();
        // Per-record dispatch never touches the health cluster.
        assert!(queues.queue(1, 0).is_empty());

        let staged = policy.stage_health_metrics(&mut queues).unwrap();
        assert_eq!(staged, 5);

        let health = queues.queue(1, 0).data();
        let lines: Vec<&[u8]> = health.split(|&b| b == b'\n').filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 5);
        assert!(lines.contains(&&b"relay-health.mrelay.records.dispatched:1|g"[..]));
        for line in lines {
            assert!(line.starts_with(b"relay-health."));
        }
    }

    #[test]
    fn test_purge_interval_is_minimum_across_targets() {
        let mut sampling = sampled(10);
        sampling.purge_interval = 60;
        let config = RouterConfig {
            shard_map: ring(&["10.0.0.1:8125"]),
            duplicate_to: vec![TargetConfig {
                shard_map: ring(&["10.1.0.1:8125"]),
                sampling,
                ..Default::default()
            }],
            ..Default::default()
        };
        let policy = policy(&config);
        assert_eq!(policy.purge_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_queue_iteration_exposes_endpoints() {
        let config = RouterConfig {
            shard_map: ring(&["10.0.0.1:8125", "10.0.0.2:8125"]),
            ..Default::default()
        };
        let policy = policy(&config);
        let mut queues = OutboundQueues::new(&policy).unwrap();

        let endpoints: Vec<String> = queues
            .iter_mut()
            .map(|(_, endpoint, _)| endpoint.to_owned())
            .collect();
        assert_eq!(endpoints, ring(&["10.0.0.1:8125", "10.0.0.2:8125"]));
    }
}
