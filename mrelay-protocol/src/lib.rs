//! StatsD line parsing and metric type classification for mrelay.
//!
//! The relay receives newline-separated records of the form
//! `name:value|type` (optionally followed by `|@rate` sections). This crate
//! locates the record and field boundaries inside a staging buffer's unread
//! span without copying, and maps the short type token to a [`MetricType`]
//! in constant time.

#![warn(missing_docs)]

mod classify;
mod record;

pub use self::classify::*;
pub use self::record::*;

/// An error returned when a record cannot be parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The record does not have the `name:value|type` shape.
    #[error("malformed record")]
    Malformed,
    /// The record's type token is not one of the known statsd types.
    #[error("unrecognized metric type token")]
    UnknownType,
    /// The record's value or sample-rate section failed validation.
    #[error("invalid record value")]
    InvalidValue,
}

/// Returns the offset of the first `delimiter` in `span`.
///
/// An empty span, like a span without the delimiter, yields `None`; neither
/// is an error. For statsd records the first interesting delimiter is `:`,
/// separating the metric name from the `value|type` remainder.
pub fn find_field_boundary(span: &[u8], delimiter: u8) -> Option<usize> {
    if span.is_empty() {
        return None;
    }
    memchr::memchr(delimiter, span)
}
