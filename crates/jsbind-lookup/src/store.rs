//! Arena of raw bindings for one resolution pass.

use crate::raw::{
    ArrayData, BindingId, FieldData, LocalData, MethodData, PackageData, RawBinding,
    ReferenceData, StoreId,
};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter handing out store identities.
static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Owns every raw binding created during a pass.
///
/// Each store carries a unique [`StoreId`], which lets callers tell a binding
/// of the current pass apart from one that leaked in from another pass.
#[derive(Debug)]
pub struct BindingStore {
    id: StoreId,
    bindings: Vec<RawBinding>,
}

impl Default for BindingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingStore {
    pub fn new() -> Self {
        BindingStore {
            id: StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed)),
            bindings: Vec::with_capacity(256),
        }
    }

    #[inline]
    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn alloc(&mut self, binding: RawBinding) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(binding);
        id
    }

    #[inline]
    pub fn get(&self, id: BindingId) -> Option<&RawBinding> {
        if id.is_none() {
            return None;
        }
        self.bindings.get(id.0 as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, id: BindingId) -> Option<&mut RawBinding> {
        if id.is_none() {
            return None;
        }
        self.bindings.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    pub fn reference(&self, id: BindingId) -> Option<&ReferenceData> {
        match self.get(id)? {
            RawBinding::Reference(data) => Some(data),
            _ => None,
        }
    }

    pub fn reference_mut(&mut self, id: BindingId) -> Option<&mut ReferenceData> {
        match self.get_mut(id)? {
            RawBinding::Reference(data) => Some(data),
            _ => None,
        }
    }

    pub fn array(&self, id: BindingId) -> Option<&ArrayData> {
        match self.get(id)? {
            RawBinding::Array(data) => Some(data),
            _ => None,
        }
    }

    pub fn method(&self, id: BindingId) -> Option<&MethodData> {
        match self.get(id)? {
            RawBinding::Method(data) => Some(data),
            _ => None,
        }
    }

    pub fn method_mut(&mut self, id: BindingId) -> Option<&mut MethodData> {
        match self.get_mut(id)? {
            RawBinding::Method(data) => Some(data),
            _ => None,
        }
    }

    pub fn field(&self, id: BindingId) -> Option<&FieldData> {
        match self.get(id)? {
            RawBinding::Field(data) => Some(data),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, id: BindingId) -> Option<&mut FieldData> {
        match self.get_mut(id)? {
            RawBinding::Field(data) => Some(data),
            _ => None,
        }
    }

    pub fn local(&self, id: BindingId) -> Option<&LocalData> {
        match self.get(id)? {
            RawBinding::Variable(data) => Some(data),
            _ => None,
        }
    }

    pub fn package(&self, id: BindingId) -> Option<&PackageData> {
        match self.get(id)? {
            RawBinding::Package(data) => Some(data),
            _ => None,
        }
    }

    /// Array dimensions of a type binding (0 for non-arrays).
    pub fn dimensions(&self, id: BindingId) -> u32 {
        self.array(id).map_or(0, |array| array.dimensions)
    }

    /// Leaf component of an array type, or the type itself.
    pub fn leaf_component(&self, id: BindingId) -> BindingId {
        self.array(id).map_or(id, |array| array.leaf)
    }

    /// Type of a field or local variable.
    pub fn variable_type(&self, id: BindingId) -> BindingId {
        match self.get(id) {
            Some(RawBinding::Field(data)) => data.ty,
            Some(RawBinding::Variable(data)) => data.ty,
            _ => BindingId::NONE,
        }
    }
}
