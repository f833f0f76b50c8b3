//! Centralized limits and thresholds for the binding engine.

// =============================================================================
// Array types
// =============================================================================

/// Maximum number of dimensions an array type may have.
///
/// Both `TypeBinding::create_array_type` and the resolver's
/// `resolve_array_type` refuse requests whose total dimension count falls
/// outside `1..=MAX_ARRAY_DIMENSIONS`.
pub const MAX_ARRAY_DIMENSIONS: u32 = 255;

// =============================================================================
// Driver
// =============================================================================

/// Default number of units parsed with function bodies before the driver
/// switches to diet parsing for the rest of the batch.
pub const DEFAULT_PARSE_THRESHOLD: usize = 10;

// =============================================================================
// Analyzer
// =============================================================================

/// Maximum superclass chain walked by compatibility checks and member lookup.
///
/// Hierarchy cycles are broken when type bindings are completed, but the
/// lookup walks still stop here so a corrupted chain cannot loop forever.
pub const MAX_HIERARCHY_DEPTH: usize = 256;

/// Maximum expression nesting resolved by the analyzer. Deeper expressions
/// are left without a type.
pub const MAX_EXPRESSION_DEPTH: u32 = 500;
