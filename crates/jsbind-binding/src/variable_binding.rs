//! Field, parameter and local variable facades.

use crate::comparator::is_equal;
use crate::context::PassContext;
use crate::method_binding::MethodBinding;
use crate::type_binding::TypeBinding;
use jsbind_ast::{NodeIndex, SyntaxTree};
use jsbind_common::Modifiers;
use jsbind_lookup::{BindingId, Constant, LookupEnvironment, RawBinding};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Declaration of a variable whose declared type did not resolve.
#[derive(Clone)]
pub(crate) struct RecoveredDeclaration {
    pub tree: Arc<SyntaxTree>,
    pub node: NodeIndex,
}

pub struct VariableBinding {
    context: Arc<PassContext>,
    id: BindingId,
    recovered: Option<RecoveredDeclaration>,
    key: OnceCell<String>,
    name: OnceCell<String>,
}

impl fmt::Debug for VariableBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableBinding")
            .field("key", &self.key())
            .field("recovered", &self.is_recovered())
            .finish()
    }
}

impl VariableBinding {
    pub(crate) fn new(
        context: Arc<PassContext>,
        id: BindingId,
        recovered: Option<RecoveredDeclaration>,
    ) -> Self {
        VariableBinding {
            context,
            id,
            recovered,
            key: OnceCell::new(),
            name: OnceCell::new(),
        }
    }

    pub(crate) fn raw_id(&self) -> BindingId {
        self.id
    }

    fn with_raw<R>(&self, f: impl FnOnce(&LookupEnvironment, &RawBinding) -> R) -> Option<R> {
        let context = &self.context;
        let env = context.read();
        let binding = env.store.get(self.id)?;
        Some(f(&env, binding))
    }

    pub fn key(&self) -> &str {
        self.key.get_or_init(|| {
            jsbind_lookup::unique_key(&self.context.read().store, self.id)
        })
    }

    pub fn name(&self) -> &str {
        self.name.get_or_init(|| {
            self.with_raw(|_, binding| match binding {
                RawBinding::Field(data) => data.name.to_string(),
                RawBinding::Variable(data) => data.name.to_string(),
                _ => String::new(),
            })
            .unwrap_or_default()
        })
    }

    pub fn modifiers(&self) -> Modifiers {
        self.with_raw(|_, binding| binding.modifiers().visible())
            .unwrap_or_default()
    }

    pub fn is_deprecated(&self) -> bool {
        self.with_raw(|_, binding| binding.modifiers().contains(Modifiers::DEPRECATED))
            .unwrap_or(false)
    }

    /// The declared type did not resolve; [`ty`](Self::ty) is synthesized
    /// from the declaration.
    pub fn is_recovered(&self) -> bool {
        self.recovered.is_some()
    }

    pub fn is_field(&self) -> bool {
        self.with_raw(|_, binding| matches!(binding, RawBinding::Field(_)))
            .unwrap_or(false)
    }

    pub fn is_parameter(&self) -> bool {
        self.with_raw(|_, binding| matches!(binding, RawBinding::Variable(data) if data.is_parameter))
            .unwrap_or(false)
    }

    /// Index of a field among its class's fields, or of a local among its
    /// method's locals. Stable across passes.
    pub fn variable_id(&self) -> u32 {
        self.with_raw(|_, binding| match binding {
            RawBinding::Field(data) => data.id,
            RawBinding::Variable(data) => data.id,
            _ => 0,
        })
        .unwrap_or(0)
    }

    pub fn ty(&self) -> Option<Arc<TypeBinding>> {
        let context = &self.context;
        if let Some(declaration) = &self.recovered {
            return Some(context.recovered_for_declaration(&declaration.tree, declaration.node));
        }
        let env = context.read();
        let ty = env.store.variable_type(self.id);
        context.type_facade(&env, ty)
    }

    /// Declaring class of a field.
    pub fn declaring_class(&self) -> Option<Arc<TypeBinding>> {
        let context = &self.context;
        let env = context.read();
        let declaring = env.store.field(self.id)?.declaring_class;
        context.type_facade(&env, declaring)
    }

    /// Method a local or parameter is declared in.
    pub fn declaring_method(&self) -> Option<Arc<MethodBinding>> {
        let context = &self.context;
        let env = context.read();
        let method = env.store.local(self.id)?.declaring_method;
        context.method_facade(&env, method)
    }

    pub fn constant_value(&self) -> Option<Constant> {
        self.with_raw(|_, binding| match binding {
            RawBinding::Field(data) => data.constant.clone(),
            RawBinding::Variable(data) => data.constant.clone(),
            _ => None,
        })?
    }

    /// Structural equality, also across passes. Recovered variables compare
    /// by key.
    pub fn is_equal_to(&self, other: &VariableBinding) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.is_recovered() || other.is_recovered() {
            return self.is_recovered() && other.is_recovered() && self.key() == other.key();
        }
        let (left, right) = (&self.context, &other.context);
        if Arc::ptr_eq(left, right) {
            let env = left.read();
            return is_equal(&env.store, self.id, &env.store, other.id);
        }
        let left_env = left.read();
        let right_env = right.read();
        is_equal(&left_env.store, self.id, &right_env.store, other.id)
    }
}
