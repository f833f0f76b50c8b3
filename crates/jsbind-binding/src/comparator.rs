//! Structural equality of raw bindings.
//!
//! Two bindings are equal when they denote the same declaration, whether or
//! not they are the same record. Bindings from two different passes (two
//! stores) compare by name, shape and declaration order, never by id.
//!
//! Comparison is total: unknown ids and mismatched kinds compare unequal.

use jsbind_common::Modifiers;
use jsbind_lookup::{BindingId, BindingStore, MethodData, RawBinding, ReferenceData, unique_key};
use rustc_hash::FxHashSet;
use tracing::trace;

/// Whether binding `a` of `left` and binding `b` of `right` denote the same
/// entity. `left` and `right` may be the same store.
pub fn is_equal(left: &BindingStore, a: BindingId, right: &BindingStore, b: BindingId) -> bool {
    BindingComparator::new(left, right).equal(a, b)
}

/// Comparison state for one top-level `is_equal` call.
///
/// The visited set holds the pairs of reference types whose comparison is in
/// progress; meeting a pair again answers `true` so self-referential shapes
/// terminate.
pub struct BindingComparator<'a> {
    left: &'a BindingStore,
    right: &'a BindingStore,
    visited: FxHashSet<(BindingId, BindingId)>,
}

impl<'a> BindingComparator<'a> {
    pub fn new(left: &'a BindingStore, right: &'a BindingStore) -> Self {
        BindingComparator {
            left,
            right,
            visited: FxHashSet::default(),
        }
    }

    fn same_store(&self) -> bool {
        self.left.id() == self.right.id()
    }

    pub fn equal(&mut self, a: BindingId, b: BindingId) -> bool {
        if a.is_none() || b.is_none() {
            return a.is_none() && b.is_none();
        }
        if self.same_store() && a == b {
            return true;
        }
        let (left_store, right_store) = (self.left, self.right);
        let (Some(left), Some(right)) = (left_store.get(a), right_store.get(b)) else {
            return false;
        };
        match (left, right) {
            (RawBinding::Base(x), RawBinding::Base(y)) => x.type_id() == y.type_id(),
            (RawBinding::Array(x), RawBinding::Array(y)) => {
                x.dimensions == y.dimensions && self.equal(x.leaf, y.leaf)
            }
            (RawBinding::Reference(x), RawBinding::Reference(y)) => self.references(a, x, b, y),
            (RawBinding::Method(x), RawBinding::Method(y)) => self.methods(x, y),
            (RawBinding::Field(x), RawBinding::Field(y)) => {
                x.name == y.name
                    && self.equal(x.ty, y.ty)
                    && (x.modifiers & Modifiers::DECLARED) == (y.modifiers & Modifiers::DECLARED)
                    && x.id == y.id
                    && self.equal(x.declaring_class, y.declaring_class)
            }
            (RawBinding::Variable(x), RawBinding::Variable(y)) => {
                x.name == y.name
                    && self.equal(x.ty, y.ty)
                    && (x.modifiers & Modifiers::DECLARED) == (y.modifiers & Modifiers::DECLARED)
                    && x.id == y.id
                    && self.equal(x.declaring_method, y.declaring_method)
            }
            (RawBinding::Package(x), RawBinding::Package(y)) => x.compound_name == y.compound_name,
            (RawBinding::Import(x), RawBinding::Import(y)) => {
                x.on_demand == y.on_demand && x.compound_name == y.compound_name
            }
            (
                RawBinding::Base(_)
                | RawBinding::Array(_)
                | RawBinding::Reference(_)
                | RawBinding::Method(_)
                | RawBinding::Field(_)
                | RawBinding::Variable(_)
                | RawBinding::Package(_)
                | RawBinding::Import(_),
                _,
            ) => false,
        }
    }

    fn references(
        &mut self,
        a: BindingId,
        x: &ReferenceData,
        b: BindingId,
        y: &ReferenceData,
    ) -> bool {
        if !self.visited.insert((a, b)) {
            trace!(left = a.0, right = b.0, "reference comparison already in progress");
            return true;
        }
        let same_name = match (&x.constant_pool_name, &y.constant_pool_name) {
            (Some(p), Some(q)) => p == q,
            _ => unique_key(self.left, a) == unique_key(self.right, b),
        };
        let ignored = Modifiers::SUPER | Modifiers::UNRESOLVED;
        same_name
            && x.compound_name == y.compound_name
            && x.modifiers.difference(ignored) == y.modifiers.difference(ignored)
            && self.equal(x.enclosing, y.enclosing)
    }

    fn methods(&mut self, x: &MethodData, y: &MethodData) -> bool {
        let selectors_match = x.selector == y.selector
            || Self::normalized_selector(self.left, x) == Self::normalized_selector(self.right, y);
        if !selectors_match || x.parameters.len() != y.parameters.len() {
            return false;
        }
        if !self.equal(x.return_type, y.return_type)
            || !self.equal(x.declaring_class, y.declaring_class)
        {
            return false;
        }
        x.parameters
            .iter()
            .zip(&y.parameters)
            .all(|(p, q)| self.equal(*p, *q))
    }

    /// Constructors compare by their declaring class's simple name, so a
    /// constructor matches a same-named plain method.
    fn normalized_selector<'s>(store: &'s BindingStore, method: &'s MethodData) -> &'s str {
        if method.is_constructor()
            && let Some(declaring) = store.reference(method.declaring_class)
        {
            return &declaring.source_name;
        }
        &method.selector
    }
}

#[cfg(test)]
#[path = "../tests/comparator_tests.rs"]
mod comparator_tests;
