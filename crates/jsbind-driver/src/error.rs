//! What escapes a resolution pass.

use jsbind_common::Cancelled;
use jsbind_lookup::AnalyzerError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The caller's cancellation token fired at a checkpoint.
    Cancelled,
    /// A unit failed in a way the pass cannot recover from. The unit's
    /// unresolved bindings were stripped before the error was raised.
    Internal(AnalyzerError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Cancelled => f.write_str("resolution pass cancelled"),
            DriverError::Internal(err) => write!(f, "resolution pass failed: {err}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Cancelled => None,
            DriverError::Internal(err) => Some(err),
        }
    }
}

impl From<Cancelled> for DriverError {
    fn from(_: Cancelled) -> Self {
        DriverError::Cancelled
    }
}
