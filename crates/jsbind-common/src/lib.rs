//! Common types and utilities for the jsbind binding resolution engine.
//!
//! This crate provides foundational types used across all jsbind crates:
//! - String interning (`Atom`, `Interner`)
//! - Declaration modifier flags (`Modifiers`)
//! - Source spans (`Span`)
//! - Cooperative cancellation (`CancellationToken`, `Cancelled`)
//! - Centralized limits and thresholds (`limits`)

// String interner - identifier deduplication for syntax trees
pub mod interner;
pub use interner::{Atom, Interner};

// Modifier flags shared by raw bindings, facades and declarations
pub mod modifiers;
pub use modifiers::Modifiers;

// Source positions
pub mod span;
pub use span::Span;

// Cooperative cancellation
pub mod cancel;
pub use cancel::{CancellationToken, Cancelled};

// Centralized limits and thresholds
pub mod limits;
