//! Raw bindings and the lookup environment.
//!
//! This crate is the semantic core the binding resolver sits on:
//! - [`raw`] / [`store`]: the analyzer's mutable binding records, addressed by
//!   [`BindingId`] inside a per-pass [`BindingStore`]
//! - [`environment`]: type and package lookup, unit registration and lazy
//!   member signatures
//! - [`analyzer`]: walks a unit's tree and records, per node, the binding it
//!   declares or refers to
//! - [`key`]: binding keys, their grammar and the reverse lookup from a key to
//!   a raw binding

pub mod raw;
pub use raw::{
    ArrayData, BaseType, BindingId, CompoundName, Constant, FieldData, ImportData, LocalData,
    MethodData, PackageData, ProblemReason, RawBinding, ReferenceData, StoreId, TypeFlags,
};

pub mod store;
pub use store::BindingStore;

pub mod constants;

pub mod error;
pub use error::AnalyzerError;

pub mod name_env;
pub use name_env::{LibraryField, LibraryMethod, LibraryType, NameEnvironment, StandardLibrary};

pub mod environment;
pub use environment::{LookupEnvironment, TypeRef, UnitScope};

// Hierarchy queries, key lookup and batch ordering extend LookupEnvironment.
mod hierarchy;
mod order;
mod resolve_key;

pub mod key;
pub use key::{KeyDescriptor, KeyError, unique_key};

pub mod analyzer;
pub use analyzer::{Analyzer, CompilerNode, CompilerUnit, ImplicitConversion, ScopeInfo, UnitState};
