use globset::{Glob, GlobMatcher};

use crate::ConfigError;

/// Ingress allow/deny filter over metric names.
///
/// Both patterns are globs compiled once at policy construction. The deny
/// list wins over the allow list. Metric names that are not valid UTF-8
/// never match the allow pattern and are therefore rejected whenever an
/// allow pattern is configured.
#[derive(Debug, Default)]
pub struct IngressFilter {
    allow: Option<GlobMatcher>,
    deny: Option<GlobMatcher>,
}

impl IngressFilter {
    /// Compiles the filter from optional allow and deny glob patterns.
    pub fn new(allow: Option<&str>, deny: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            allow: allow.map(compile).transpose()?,
            deny: deny.map(compile).transpose()?,
        })
    }

    /// Returns `true` if a record with this metric name may enter.
    pub fn accepts(&self, name: &[u8]) -> bool {
        let name = match std::str::from_utf8(name) {
            Ok(name) => name,
            Err(_) => return self.allow.is_none() && self.deny.is_none(),
        };

        if let Some(deny) = &self.deny {
            if deny.is_match(name) {
                return false;
            }
        }
        match &self.allow {
            Some(allow) => allow.is_match(name),
            None => true,
        }
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher, ConfigError> {
    Ok(Glob::new(pattern)?.compile_matcher())
}
