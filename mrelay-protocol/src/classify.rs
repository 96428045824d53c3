use std::fmt;

use serde::{Deserialize, Serialize};

/// The type of a statsd metric, determining its downstream aggregation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Counts instances of an event (`c`).
    Counter,
    /// Measures the duration of an operation in milliseconds (`ms`).
    Timer,
    /// Stores absolute snapshots of a value (`g`).
    Gauge,
    /// Builds a statistical distribution over reported values (`h`).
    Histogram,
    /// Counts the number of unique reported values (`s`).
    Set,
    /// Carries an arbitrary key/value payload (`kv`).
    KeyValue,
}

impl MetricType {
    /// All metric types, in classification-slot order.
    pub const ALL: [MetricType; 6] = [
        MetricType::Counter,
        MetricType::Timer,
        MetricType::Gauge,
        MetricType::Histogram,
        MetricType::Set,
        MetricType::KeyValue,
    ];

    /// Returns the wire token for this metric type.
    pub fn as_token(&self) -> &'static str {
        match self {
            MetricType::Counter => "c",
            MetricType::Timer => "ms",
            MetricType::Gauge => "g",
            MetricType::Histogram => "h",
            MetricType::Set => "s",
            MetricType::KeyValue => "kv",
        }
    }

    /// Classifies a wire token into a metric type in constant time.
    ///
    /// Uses a minimal perfect hash over the token length and first byte to
    /// narrow to a single candidate slot, then confirms with an exact byte
    /// comparison. The confirmation is required for soundness: the hash table
    /// has unused slots and collisions from unknown tokens must not match.
    /// Tokens outside the 1..=2 byte length bound and all unknown tokens
    /// yield `None`.
    pub fn classify(token: &[u8]) -> Option<MetricType> {
        if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
            return None;
        }
        let slot = token.len() + ASSO[token[0] as usize] as usize;
        let (candidate, metric_type) = SLOTS.get(slot)?;
        if *candidate == token {
            Some(*metric_type)
        } else {
            None
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

const MAX_TOKEN_LENGTH: usize = 2;

/// Association values for the perfect hash; `slot = len + ASSO[first_byte]`.
///
/// All bytes that cannot start a known token map past the last slot.
const ASSO: [u8; 256] = {
    let mut table = [7u8; 256];
    table[b'c' as usize] = 5;
    table[b'g' as usize] = 4;
    table[b'h' as usize] = 3;
    table[b'k' as usize] = 1;
    table[b'm' as usize] = 0;
    table[b's' as usize] = 0;
    table
};

/// Slot table of the perfect hash. Slot 0 is the unused padding slot.
const SLOTS: [(&[u8], MetricType); 7] = [
    (b"", MetricType::Counter),
    (b"s", MetricType::Set),
    (b"ms", MetricType::Timer),
    (b"kv", MetricType::KeyValue),
    (b"h", MetricType::Histogram),
    (b"g", MetricType::Gauge),
    (b"c", MetricType::Counter),
];
