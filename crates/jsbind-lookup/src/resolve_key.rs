//! Binding keys back to raw bindings.

use crate::environment::LookupEnvironment;
use crate::key::{KeyDescriptor, unique_key};
use crate::raw::BindingId;

impl LookupEnvironment {
    /// Find the raw binding a parsed key denotes. Problem types never match
    /// a type key; member signatures are matched by key text, so a parameter
    /// whose type did not resolve still matches.
    pub fn binding_for_key(&mut self, key: &KeyDescriptor) -> Option<BindingId> {
        match key {
            KeyDescriptor::Base(base) => self.base_type(*base).to_option(),
            KeyDescriptor::Array { dimensions, leaf } => {
                let leaf = self.binding_for_key(leaf)?;
                Some(self.create_array_type(leaf, *dimensions))
            }
            KeyDescriptor::Type { compound_name } => {
                let segments: Vec<&str> = compound_name.iter().map(String::as_str).collect();
                let ty = self.get_type(&segments)?;
                self.store
                    .reference(ty)
                    .is_some_and(|data| data.is_valid())
                    .then_some(ty)
            }
            KeyDescriptor::Package { compound_name } => {
                let segments: Vec<&str> = compound_name.iter().map(String::as_str).collect();
                self.get_package(&segments)
            }
            KeyDescriptor::Method {
                declaring,
                selector,
                parameters,
                return_type,
            } => {
                let declaring = self.binding_for_key(declaring)?;
                self.resolve_types_for(declaring);
                let methods = self.store.reference(declaring)?.methods.clone();
                let param_keys: Vec<String> = parameters.iter().map(ToString::to_string).collect();
                let return_key = return_type.as_ref().map(|ret| ret.to_string());
                methods.into_iter().find(|method| {
                    let Some(data) = self.store.method(*method) else {
                        return false;
                    };
                    &*data.selector == selector
                        && data.parameters.len() == param_keys.len()
                        && data
                            .parameters
                            .iter()
                            .zip(&param_keys)
                            .all(|(have, want)| unique_key(&self.store, *have) == *want)
                        && return_key
                            .as_ref()
                            .is_none_or(|want| unique_key(&self.store, data.return_type) == *want)
                })
            }
            KeyDescriptor::Field { declaring, name, .. } => {
                let declaring = self.binding_for_key(declaring)?;
                self.resolve_types_for(declaring);
                let fields = &self.store.reference(declaring)?.fields;
                fields.iter().copied().find(|field| {
                    self.store
                        .field(*field)
                        .is_some_and(|data| &*data.name == name)
                })
            }
            KeyDescriptor::Local { method, name, id } => {
                let method = self.binding_for_key(method)?;
                let locals = &self.store.method(method)?.locals;
                locals.iter().copied().find(|local| {
                    self.store
                        .local(*local)
                        .is_some_and(|data| &*data.name == name && data.id == *id)
                })
            }
        }
    }

    /// Look up a key given as text.
    pub fn binding_for_key_text(&mut self, key: &str) -> Option<BindingId> {
        let descriptor = KeyDescriptor::parse(key).ok()?;
        self.binding_for_key(&descriptor)
    }
}
