use mrelay_buffer::Buffer;

use crate::{find_field_boundary, MetricType, ProtocolError};

/// A parsed statsd record.
///
/// All fields are borrowed views into the input span, never copies. A record
/// is only valid until the staging buffer it was parsed from is consumed or
/// mutated; the borrow checker enforces this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedRecord<'a> {
    /// The metric name, the bytes before the first `:`.
    pub name: &'a [u8],
    /// The metric value, the bytes between `:` and the first `|`.
    pub value: &'a [u8],
    /// The raw type token, the bytes after the first `|` up to the next
    /// section or the end of the record.
    pub type_token: &'a [u8],
    /// Everything after the name separator, `value|type[|section...]`.
    payload: &'a [u8],
    /// Total bytes consumed from the input span, including the terminating
    /// newline when present.
    consumed: usize,
}

impl<'a> ParsedRecord<'a> {
    /// Parses the first record from `span`.
    ///
    /// The record runs to the first newline, or to the end of the span when
    /// no newline is present. The consumed length includes the newline, so
    /// `buffer.consume(record.consumed())` always advances past the record.
    pub fn parse(span: &'a [u8]) -> Result<Self, ProtocolError> {
        let (line, consumed) = match find_field_boundary(span, b'\n') {
            Some(index) => (&span[..index], index + 1),
            None => (span, span.len()),
        };

        let name_len = find_field_boundary(line, b':').ok_or(ProtocolError::Malformed)?;
        if name_len == 0 {
            return Err(ProtocolError::Malformed);
        }
        let (name, rest) = line.split_at(name_len);
        let payload = &rest[1..];

        let value_len = find_field_boundary(payload, b'|').ok_or(ProtocolError::Malformed)?;
        if value_len == 0 {
            return Err(ProtocolError::Malformed);
        }
        let (value, rest) = payload.split_at(value_len);
        let after_value = &rest[1..];

        let type_token = match find_field_boundary(after_value, b'|') {
            Some(index) => &after_value[..index],
            None => after_value,
        };
        if type_token.is_empty() {
            return Err(ProtocolError::Malformed);
        }

        Ok(Self {
            name,
            value,
            type_token,
            payload,
            consumed,
        })
    }

    /// Parses the first record from the unread span of `buffer`.
    pub fn from_buffer(buffer: &'a Buffer) -> Result<Self, ProtocolError> {
        Self::parse(buffer.data())
    }

    /// Returns the record's payload, everything after the name separator.
    ///
    /// Staging a rewritten record re-emits this span verbatim after the new
    /// name, so sample-rate sections survive rewrites untouched.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Returns the total bytes this record consumed from the input span.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Classifies the record's type token.
    pub fn metric_type(&self) -> Option<MetricType> {
        MetricType::classify(self.type_token)
    }

    /// Validates the record's value and trailing sections.
    ///
    /// Numeric metric types require a numeric value; sets and key/value
    /// records accept any non-empty value. Every section after the type token
    /// must be a `@rate` sample-rate section with a numeric rate. The type
    /// token itself must classify; unknown tokens fail with
    /// [`ProtocolError::UnknownType`].
    pub fn validate(&self) -> Result<MetricType, ProtocolError> {
        let metric_type = self.metric_type().ok_or(ProtocolError::UnknownType)?;

        match metric_type {
            MetricType::Counter
            | MetricType::Timer
            | MetricType::Gauge
            | MetricType::Histogram => {
                parse_number(self.value).ok_or(ProtocolError::InvalidValue)?;
            }
            MetricType::Set | MetricType::KeyValue => {}
        }

        for section in self.sections() {
            match section.strip_prefix(b"@") {
                Some(rate) => {
                    parse_number(rate).ok_or(ProtocolError::InvalidValue)?;
                }
                None => return Err(ProtocolError::InvalidValue),
            }
        }

        Ok(metric_type)
    }

    /// Iterates over the `|`-separated sections after the type token.
    fn sections(&self) -> impl Iterator<Item = &'a [u8]> {
        self.payload
            .split(|&byte| byte == b'|')
            .skip(2)
    }
}

fn parse_number(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
