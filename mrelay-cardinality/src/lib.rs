//! Bounded, TTL-evicting metric key tracking for mrelay.
//!
//! When sampling is enabled for a downstream cluster, the relay must know
//! which metric keys it has recently seen so the sampler operates on a
//! bounded key set. The [`CardinalityLimiter`] tracks keys per metric type
//! with a hard per-type ceiling and evicts stale keys on a periodic purge
//! sweep, so that sustained unique-key churn can never grow memory without
//! bound.

#![warn(missing_docs)]

mod config;
mod limiter;

pub use self::config::*;
pub use self::limiter::*;
