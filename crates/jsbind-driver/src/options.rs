//! Options of a resolution pass.

use jsbind_common::limits::DEFAULT_PARSE_THRESHOLD;
use serde::{Deserialize, Serialize};

/// How a [`UnitResolver`](crate::UnitResolver) runs its passes.
///
/// Read from JSON with camelCase keys; every key is optional:
///
/// ```json
/// { "bindingsRecovery": true, "parseThreshold": 4 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverOptions {
    /// Synthesize recovered bindings for types that do not resolve.
    pub bindings_recovery: bool,
    /// Analyze units whose description could not be read (as empty units)
    /// instead of handing them back syntax-only.
    pub statements_recovery: bool,
    /// Units submitted after this many are diet-parsed; their bodies are
    /// parsed right before the unit is resolved.
    pub parse_threshold: usize,
    /// `false` parses the whole batch syntax-only.
    pub resolve_bindings: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            bindings_recovery: false,
            statements_recovery: false,
            parse_threshold: DEFAULT_PARSE_THRESHOLD,
            resolve_bindings: true,
        }
    }
}

impl ResolverOptions {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_recovery(mut self, enabled: bool) -> Self {
        self.bindings_recovery = enabled;
        self
    }

    pub fn with_parse_threshold(mut self, threshold: usize) -> Self {
        self.parse_threshold = threshold;
        self
    }
}

#[cfg(test)]
#[path = "../tests/options_tests.rs"]
mod options_tests;
