//! Errors raised by malformed resolver and facade requests.
//!
//! "No binding" is never an error; it is `None`. These errors signal a
//! request that could not have been answered in any state of the code.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The pass that produced the resolver has ended.
    NoActivePass,
    /// Arrays cannot be built over a recovered element type.
    RecoveredArrayType,
    /// The total dimension count of a requested array type is out of range.
    InvalidDimensions { dimensions: i64 },
    /// `void` cannot be an array element.
    VoidArray,
    /// The binding belongs to another pass.
    ForeignBinding,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NoActivePass => {
                f.write_str("bindings are not available outside an active resolution pass")
            }
            ResolveError::RecoveredArrayType => {
                f.write_str("cannot create an array type over a recovered binding")
            }
            ResolveError::InvalidDimensions { dimensions } => write!(
                f,
                "invalid array dimensions {dimensions}, expected 1..={}",
                jsbind_common::limits::MAX_ARRAY_DIMENSIONS
            ),
            ResolveError::VoidArray => f.write_str("cannot create an array type of void"),
            ResolveError::ForeignBinding => {
                f.write_str("binding was created by a different resolution pass")
            }
        }
    }
}

impl std::error::Error for ResolveError {}
