//! Resolution passes over batches of units and binding keys.
//!
//! A [`UnitResolver`] takes a [`ResolveRequest`] (source units, the units
//! whose resolved trees are wanted, and binding keys), runs one pass against
//! a [`Project`] and reports results through an [`AstRequestor`]:
//! - `accept_ast` once per requested unit, with a live or syntax-only tree
//! - `accept_binding` once per requested key, with the binding or `None`
//!
//! Units nobody asked about are released as soon as every request has been
//! answered.

pub mod options;
pub use options::ResolverOptions;

pub mod error;
pub use error::DriverError;

pub mod project;
pub use project::{Project, StandardProject};

pub mod requestor;
pub use requestor::{AstRequestor, CollectingRequestor};

pub mod driver;
pub use driver::{PassStats, ResolveRequest, SourceUnit, UnitResolver};
