//! Binding facades and the binding resolver.
//!
//! This crate turns the analyzer's raw bindings into the stable, read-only
//! view callers work with:
//! - [`comparator`]: structural equality of raw bindings, also across passes
//! - [`context`]: the pass-scoped tables that intern facades
//! - facades: [`TypeBinding`], [`MethodBinding`], [`VariableBinding`],
//!   [`PackageBinding`], unified by [`Binding`]
//! - [`recovered`]: type bindings synthesized from syntax when a type does
//!   not resolve
//! - [`resolver`]: the [`BindingResolver`] seam with its null and live
//!   variants, and [`ResolvedAst`]

pub mod comparator;
pub use comparator::{BindingComparator, is_equal};

pub mod error;
pub use error::ResolveError;

pub mod context;
pub use context::PassContext;

// Facades
mod binding;
pub use binding::{Binding, BindingKind};
mod method_binding;
pub use method_binding::MethodBinding;
mod package_binding;
pub use package_binding::PackageBinding;
mod type_binding;
pub use type_binding::TypeBinding;
mod variable_binding;
pub use variable_binding::VariableBinding;

pub mod recovered;
pub use recovered::{RECOVERED_KEY_PREFIX, RecoveredType};

pub mod resolver;
pub use resolver::{BindingResolver, DefaultBindingResolver, NullResolver, ResolvedAst, WELL_KNOWN_TYPES};

#[cfg(test)]
pub(crate) mod test_fixtures;
