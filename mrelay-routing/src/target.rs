use mrelay_cardinality::CardinalityLimiter;

use crate::{ConfigError, IngressFilter, TargetConfig};

/// The role of a cluster within a routing policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetRole {
    /// The guaranteed-delivery cluster; no filters, sampling or rewrites.
    Primary,
    /// A duplicate cluster receiving filtered, gated, rewritten copies.
    Duplicate,
    /// The cluster receiving relay-internal health metrics.
    HealthMetrics,
}

/// A fully constructed downstream cluster.
///
/// Immutable after construction except for the embedded cardinality
/// limiter's tracked state; safe to share across worker contexts.
#[derive(Debug)]
pub struct ClusterTarget {
    role: TargetRole,
    ring: Vec<String>,
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    filter: IngressFilter,
    limiter: CardinalityLimiter,
}

impl ClusterTarget {
    /// Creates the primary cluster from its shard ring.
    pub fn primary(ring: Vec<String>) -> Self {
        Self {
            role: TargetRole::Primary,
            ring,
            prefix: Vec::new(),
            suffix: Vec::new(),
            filter: IngressFilter::default(),
            limiter: CardinalityLimiter::new(Default::default()),
        }
    }

    /// Creates a duplicate or health-metrics cluster from configuration.
    pub fn secondary(role: TargetRole, config: &TargetConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            role,
            ring: config.shard_map.clone(),
            prefix: config.prefix.clone().unwrap_or_default().into_bytes(),
            suffix: config.suffix.clone().unwrap_or_default().into_bytes(),
            filter: IngressFilter::new(
                config.input_filter.as_deref(),
                config.input_blacklist.as_deref(),
            )?,
            limiter: CardinalityLimiter::new(config.sampling.clone()),
        })
    }

    /// Returns the cluster's role.
    pub fn role(&self) -> TargetRole {
        self.role
    }

    /// Returns the cluster's shard ring.
    pub fn ring(&self) -> &[String] {
        &self.ring
    }

    /// Returns the name prefix applied to records entering this cluster.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Returns the name suffix applied to records entering this cluster.
    pub fn suffix(&self) -> &[u8] {
        &self.suffix
    }

    /// Returns `true` if this cluster rewrites metric names.
    pub fn rewrites(&self) -> bool {
        !self.prefix.is_empty() || !self.suffix.is_empty()
    }

    /// Returns the cluster's ingress filter.
    pub fn filter(&self) -> &IngressFilter {
        &self.filter
    }

    /// Returns the cluster's cardinality limiter.
    pub fn limiter(&self) -> &CardinalityLimiter {
        &self.limiter
    }
}
