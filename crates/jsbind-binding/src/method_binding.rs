//! Method and constructor facades.

use crate::comparator::is_equal;
use crate::context::PassContext;
use crate::type_binding::TypeBinding;
use jsbind_common::Modifiers;
use jsbind_lookup::{BindingId, LookupEnvironment, MethodData};
use once_cell::sync::OnceCell;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

pub struct MethodBinding {
    context: Arc<PassContext>,
    id: BindingId,
    key: OnceCell<String>,
    name: OnceCell<String>,
    parameter_types: OnceCell<SmallVec<[Arc<TypeBinding>; 4]>>,
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("key", &self.key())
            .finish()
    }
}

impl MethodBinding {
    pub(crate) fn new(context: Arc<PassContext>, id: BindingId) -> Self {
        MethodBinding {
            context,
            id,
            key: OnceCell::new(),
            name: OnceCell::new(),
            parameter_types: OnceCell::new(),
        }
    }

    pub(crate) fn raw_id(&self) -> BindingId {
        self.id
    }

    fn with_data<R>(&self, f: impl FnOnce(&LookupEnvironment, &MethodData) -> R) -> Option<R> {
        let context = &self.context;
        let env = context.read();
        let data = env.store.method(self.id)?;
        Some(f(&env, data))
    }

    fn type_of(&self, select: impl FnOnce(&MethodData) -> BindingId) -> Option<Arc<TypeBinding>> {
        let context = &self.context;
        let env = context.read();
        let ty = select(env.store.method(self.id)?);
        context.type_facade(&env, ty)
    }

    pub fn key(&self) -> &str {
        self.key.get_or_init(|| {
            jsbind_lookup::unique_key(&self.context.read().store, self.id)
        })
    }

    /// Selector; constructors are named after their declaring class.
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| {
            self.with_data(|env, data| {
                if data.is_constructor() {
                    env.store
                        .reference(data.declaring_class)
                        .map(|declaring| declaring.source_name.to_string())
                        .unwrap_or_default()
                } else {
                    data.selector.to_string()
                }
            })
            .unwrap_or_default()
        })
    }

    pub fn modifiers(&self) -> Modifiers {
        self.with_data(|_, data| data.modifiers.visible())
            .unwrap_or_default()
    }

    pub fn is_deprecated(&self) -> bool {
        self.with_data(|_, data| data.modifiers.contains(Modifiers::DEPRECATED))
            .unwrap_or(false)
    }

    pub fn is_constructor(&self) -> bool {
        self.with_data(|_, data| data.is_constructor())
            .unwrap_or(false)
    }

    pub fn declaring_class(&self) -> Option<Arc<TypeBinding>> {
        self.type_of(|data| data.declaring_class)
    }

    /// Constructors return `void`.
    pub fn return_type(&self) -> Option<Arc<TypeBinding>> {
        self.type_of(|data| data.return_type)
    }

    /// Parameter types in declaration order. Empty when any parameter type
    /// has no binding.
    pub fn parameter_types(&self) -> &[Arc<TypeBinding>] {
        self.parameter_types.get_or_init(|| {
            let context = &self.context;
            let env = context.read();
            let Some(data) = env.store.method(self.id) else {
                return SmallVec::new();
            };
            data.parameters
                .iter()
                .map(|parameter| context.type_facade(&env, *parameter))
                .collect::<Option<SmallVec<_>>>()
                .unwrap_or_default()
        })
    }

    pub fn is_equal_to(&self, other: &MethodBinding) -> bool {
        if std::ptr::eq(self, other) {
            return true;
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
