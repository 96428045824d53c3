//! Per-cluster routing, filtering and sampling policy for mrelay.
//!
//! A [`RoutingPolicy`] decides, for every parsed statsd record, which
//! downstream clusters receive it and in what form. The primary cluster is
//! the guaranteed-delivery path and receives every well-formed record
//! unchanged. Duplicate clusters receive a copy after passing that cluster's
//! ingress filters and cardinality gate, optionally rewritten with a name
//! prefix or suffix. A dedicated health-metrics cluster can receive
//! relay-internal counters.
//!
//! The policy itself is immutable after construction and safe for concurrent
//! use; all per-record mutability lives in the caller's [`OutboundQueues`]
//! and in the per-cluster cardinality limiters.

#![warn(missing_docs)]

mod config;
mod counters;
mod filter;
mod policy;
mod shard;
mod target;

pub use self::config::*;
pub use self::counters::*;
pub use self::filter::*;
pub use self::policy::*;
pub use self::shard::*;
pub use self::target::*;

use mrelay_buffer::BufferError;

/// An error raised while constructing a [`RoutingPolicy`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Sampling requires the line-format validator.
    ///
    /// Without validation the relay cannot safely classify records, so a
    /// policy enabling any sampling threshold while validation is off is
    /// rejected before it can serve traffic.
    #[error("sampling requires validation of the statsd packet format")]
    SamplingWithoutValidation,

    /// An ingress filter pattern failed to compile.
    #[error("invalid ingress filter pattern")]
    InvalidFilter(#[from] globset::Error),
}

/// An error raised while dispatching a record.
///
/// Malformed records, filtered records and cardinality rejections are not
/// errors; they are drop decisions reported through [`DispatchCounters`].
/// Only a failure to stage bytes into an outbound queue is fatal to the
/// dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Staging into an outbound queue failed.
    #[error("failed to stage record: {0}")]
    Stage(#[from] BufferError),
}
