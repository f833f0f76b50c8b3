//! Hierarchy queries: member lookup and type compatibility.

use crate::environment::LookupEnvironment;
use crate::raw::{BaseType, BindingId, RawBinding};
use jsbind_common::limits::MAX_HIERARCHY_DEPTH;

impl LookupEnvironment {
    /// Superclass chain starting at `ty` (inclusive), bounded by
    /// [`MAX_HIERARCHY_DEPTH`].
    pub fn superclass_chain(&self, ty: BindingId) -> Vec<BindingId> {
        let mut chain = Vec::new();
        let mut current = ty;
        while let Some(data) = self.store.reference(current) {
            if chain.len() >= MAX_HIERARCHY_DEPTH || chain.contains(&current) {
                break;
            }
            chain.push(current);
            current = data.superclass;
        }
        chain
    }

    /// Whether `sup` is `sub` or one of its superclasses.
    pub fn is_subclass_of(&self, sub: BindingId, sup: BindingId) -> bool {
        self.superclass_chain(sub).contains(&sup)
    }

    pub fn find_member_type(&self, ty: BindingId, name: &str) -> Option<BindingId> {
        for current in self.superclass_chain(ty) {
            let Some(data) = self.store.reference(current) else {
                continue;
            };
            for member in &data.member_types {
                if self
                    .store
                    .reference(*member)
                    .is_some_and(|m| &*m.source_name == name)
                {
                    return Some(*member);
                }
            }
        }
        None
    }

    /// Field `name` declared by `ty` or inherited. Array types answer with
    /// the fields of the library `Array` type.
    pub fn find_field(&mut self, ty: BindingId, name: &str) -> Option<BindingId> {
        let owner = if self.store.array(ty).is_some() {
            self.well_known_type("Array")?
        } else {
            ty
        };
        for current in self.superclass_chain(owner) {
            self.resolve_types_for(current);
            let Some(data) = self.store.reference(current) else {
                continue;
            };
            let found = data.fields.iter().copied().find(|field| {
                self.store
                    .field(*field)
                    .is_some_and(|f| &*f.name == name)
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Methods named `selector` visible on `ty`, nearest declarations first.
    /// Constructors are never inherited.
    pub fn find_methods(&mut self, ty: BindingId, selector: &str) -> Vec<BindingId> {
        let owner = if self.store.array(ty).is_some() {
            match self.well_known_type("Array") {
                Some(array) => array,
                None => return Vec::new(),
            }
        } else {
            ty
        };
        let constructor = selector == crate::raw::MethodData::CONSTRUCTOR_SELECTOR;
        let mut found = Vec::new();
        for current in self.superclass_chain(owner) {
            self.resolve_types_for(current);
            if let Some(data) = self.store.reference(current) {
                found.extend(data.methods.iter().copied().filter(|method| {
                    self.store
                        .method(*method)
                        .is_some_and(|m| &*m.selector == selector)
                }));
            }
            if constructor {
                break;
            }
        }
        found
    }

    // =========================================================================
    // Compatibility
    // =========================================================================

    /// Assignment compatibility without boxing.
    pub fn is_compatible_with(&mut self, from: BindingId, to: BindingId) -> bool {
        if from == to {
            return true;
        }
        let object = self.object_type();
        let (Some(from_binding), Some(to_binding)) = (self.store.get(from), self.store.get(to))
        else {
            return false;
        };
        match (from_binding, to_binding) {
            (RawBinding::Base(a), RawBinding::Base(b)) => {
                a.type_id() == b.type_id() || (a.is_numeric() && b.is_numeric())
            }
            (RawBinding::Base(a), RawBinding::Reference(_) | RawBinding::Array(_)) => {
                a.is_nullish()
            }
            (RawBinding::Reference(_), RawBinding::Reference(_)) => {
                Some(to) == object || self.is_subclass_of(from, to)
            }
            (RawBinding::Array(_), RawBinding::Reference(_)) => Some(to) == object,
            (RawBinding::Array(a), RawBinding::Array(b)) => {
                let (a_leaf, a_dims, b_leaf, b_dims) = (a.leaf, a.dimensions, b.leaf, b.dimensions);
                if a_dims == b_dims {
                    a_leaf == b_leaf
                        || (self.store.reference(a_leaf).is_some()
                            && self.is_compatible_with(a_leaf, b_leaf))
                } else {
                    a_dims > b_dims && Some(b_leaf) == object
                }
            }
            _ => false,
        }
    }

    /// Library type a base type boxes to.
    pub fn boxing_type(&mut self, base: BaseType) -> Option<BindingId> {
        let name = match base {
            BaseType::Boolean => "Boolean",
            BaseType::Char => "String",
            b if b.is_numeric() => "Number",
            _ => return None,
        };
        self.well_known_type(name)
    }

    /// Compatibility through a boxing or unboxing conversion.
    pub fn is_boxing_compatible(&mut self, from: BindingId, to: BindingId) -> bool {
        match (self.store.get(from), self.store.get(to)) {
            (Some(RawBinding::Base(base)), Some(RawBinding::Reference(_))) => {
                let base = *base;
                match self.boxing_type(base) {
                    Some(boxed) => self.is_compatible_with(boxed, to),
                    None => false,
                }
            }
            (Some(RawBinding::Reference(_)), Some(RawBinding::Base(base))) => {
                let base = *base;
                self.boxing_type(base) == Some(from)
            }
            _ => false,
        }
    }

    /// Cast compatibility: either direction of assignment compatibility.
    pub fn check_cast(&mut self, from: BindingId, to: BindingId) -> bool {
        self.is_compatible_with(from, to)
            || self.is_compatible_with(to, from)
            || self.is_boxing_compatible(from, to)
    }
}

#[cfg(test)]
#[path = "../tests/hierarchy_tests.rs"]
mod hierarchy_tests;
