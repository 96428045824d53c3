use mrelay_cardinality::CardinalityConfig;
use serde::{Deserialize, Deserializer, Serialize};

/// Default listen address for the statsd ingress.
pub const DEFAULT_BIND: &str = "127.0.0.1:8125";

/// Default ceiling on queued outbound bytes per backend connection (128 MiB).
pub const DEFAULT_MAX_SEND_QUEUE: u64 = 134_217_728;

/// Configuration of one downstream cluster.
///
/// Used for duplicate and health-metrics clusters; the primary cluster only
/// carries a shard map and takes no filters, sampling or rewrites.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// The cluster's shard ring, an ordered list of endpoint identifiers.
    pub shard_map: Vec<String>,

    /// Prepended to every metric name routed to this cluster.
    pub prefix: Option<String>,
    /// Appended to every metric name routed to this cluster.
    pub suffix: Option<String>,

    /// Glob over metric names; only matching records enter this cluster.
    pub input_filter: Option<String>,
    /// Glob over metric names; matching records never enter this cluster.
    pub input_blacklist: Option<String>,

    /// Sampling gates and cardinality ceilings for this cluster.
    #[serde(flatten)]
    pub sampling: CardinalityConfig,
}

/// Configuration of the statsd routing policy.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// The listen address of the statsd ingress.
    pub bind: String,

    /// Validates the statsd line format before routing.
    ///
    /// Required for any form of sampling; turning it off routes raw lines.
    pub validate: bool,

    /// Coalesces small TCP sends towards the backends.
    pub tcp_cork: bool,

    /// Reconnects backends proactively instead of on the next send.
    pub auto_reconnect: bool,

    /// Fraction of failed backends that triggers a reconnect cycle.
    pub reconnect_threshold: f64,

    /// Ceiling on queued outbound bytes per backend connection.
    ///
    /// Enforced by the connection layer against the staged queue length.
    pub max_send_queue: u64,

    /// The primary cluster's shard ring.
    pub shard_map: Vec<String>,

    /// Duplicate clusters; accepts a single cluster or a list.
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub duplicate_to: Vec<TargetConfig>,

    /// The health-metrics cluster.
    ///
    /// At most one; relay-internal counters are staged here.
    pub health_metrics_to: Option<TargetConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            validate: true,
            tcp_cork: true,
            auto_reconnect: false,
            reconnect_threshold: 1.0,
            max_send_queue: DEFAULT_MAX_SEND_QUEUE,
            shard_map: Vec::new(),
            duplicate_to: Vec::new(),
            health_metrics_to: None,
        }
    }
}

/// Accepts either a single [`TargetConfig`] object or a list of them.
fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<TargetConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Box<TargetConfig>),
        Many(Vec<TargetConfig>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(target) => vec![*target],
        OneOrMany::Many(targets) => targets,
    })
}
