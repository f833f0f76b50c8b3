//! Analyzer failures.

use std::fmt;
use std::sync::Arc;

/// What stops the analyzer while it processes a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// A type the analyzer cannot work without is missing from the name
    /// environment. The unit is abandoned; the pass may continue.
    Abort { file_name: Arc<str>, missing: String },
    /// The unit's tree is inconsistent (e.g. a child index points nowhere).
    Internal { file_name: Arc<str>, message: String },
}

impl AnalyzerError {
    pub fn file_name(&self) -> &Arc<str> {
        match self {
            AnalyzerError::Abort { file_name, .. } | AnalyzerError::Internal { file_name, .. } => {
                file_name
            }
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, AnalyzerError::Abort { .. })
    }
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerError::Abort { file_name, missing } => {
                write!(f, "{file_name}: compilation aborted, cannot find type `{missing}`")
            }
            AnalyzerError::Internal { file_name, message } => {
                write!(f, "{file_name}: internal analyzer error: {message}")
            }
        }
    }
}

impl std::error::Error for AnalyzerError {}
