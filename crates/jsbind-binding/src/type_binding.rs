//! Type facades.

use crate::comparator::is_equal;
use crate::context::PassContext;
use crate::error::ResolveError;
use crate::method_binding::MethodBinding;
use crate::package_binding::PackageBinding;
use crate::recovered::{RecoveredSource, RecoveredType};
use crate::variable_binding::VariableBinding;
use jsbind_common::Modifiers;
use jsbind_common::limits::MAX_ARRAY_DIMENSIONS;
use jsbind_lookup::{BaseType, BindingId, BindingStore, LookupEnvironment, RawBinding};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

pub(crate) enum TypeRepr {
    Raw(BindingId),
    Recovered(RecoveredType),
}

/// A base, array, reference or recovered type.
///
/// Names, keys and declared members are computed on first use and cached;
/// concurrent readers either wait for the first computation or see its
/// result.
pub struct TypeBinding {
    context: Arc<PassContext>,
    repr: TypeRepr,
    key: OnceCell<String>,
    name: OnceCell<String>,
    qualified_name: OnceCell<String>,
    declared_fields: OnceCell<Vec<Arc<VariableBinding>>>,
    declared_methods: OnceCell<Vec<Arc<MethodBinding>>>,
    declared_types: OnceCell<Vec<Arc<TypeBinding>>>,
}

impl fmt::Debug for TypeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBinding")
            .field("key", &self.key())
            .field("recovered", &self.is_recovered())
            .finish()
    }
}

impl TypeBinding {
    pub(crate) fn raw(context: Arc<PassContext>, id: BindingId) -> Self {
        Self::with_repr(context, TypeRepr::Raw(id))
    }

    pub(crate) fn recovered(context: Arc<PassContext>, recovered: RecoveredType) -> Self {
        Self::with_repr(context, TypeRepr::Recovered(recovered))
    }

    fn with_repr(context: Arc<PassContext>, repr: TypeRepr) -> Self {
        TypeBinding {
            context,
            repr,
            key: OnceCell::new(),
            name: OnceCell::new(),
            qualified_name: OnceCell::new(),
            declared_fields: OnceCell::new(),
            declared_methods: OnceCell::new(),
            declared_types: OnceCell::new(),
        }
    }

    pub(crate) fn raw_id(&self) -> Option<BindingId> {
        match self.repr {
            TypeRepr::Raw(id) => Some(id),
            TypeRepr::Recovered(_) => None,
        }
    }

    pub(crate) fn recovered_repr(&self) -> Option<&RecoveredType> {
        match &self.repr {
            TypeRepr::Recovered(recovered) => Some(recovered),
            TypeRepr::Raw(_) => None,
        }
    }

    pub(crate) fn context(&self) -> &Arc<PassContext> {
        &self.context
    }

    /// Run `f` on the raw binding under a read lock.
    fn with_raw<R>(&self, f: impl FnOnce(&LookupEnvironment, BindingId) -> R) -> Option<R> {
        let id = self.raw_id()?;
        let env = self.context.read();
        Some(f(&env, id))
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn key(&self) -> &str {
        self.key.get_or_init(|| match &self.repr {
            TypeRepr::Raw(id) => jsbind_lookup::unique_key(&self.context.read().store, *id),
            TypeRepr::Recovered(recovered) => recovered.key(&self.context),
        })
    }

    /// Simple name; arrays append `[]` per dimension.
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| match &self.repr {
            TypeRepr::Raw(_) => self
                .with_raw(|env, id| simple_name(&env.store, id))
                .unwrap_or_default(),
            TypeRepr::Recovered(recovered) => recovered.name(&self.context),
        })
    }

    /// Dotted name: the package prefix for top-level types, the declaring
    /// class prefix for member types. Recovered types have no prefix.
    pub fn qualified_name(&self) -> &str {
        self.qualified_name.get_or_init(|| match &self.repr {
            TypeRepr::Raw(_) => self
                .with_raw(|env, id| qualified_name(&env.store, id))
                .unwrap_or_default(),
            TypeRepr::Recovered(_) => self.name().to_string(),
        })
    }

    /// Class-file style name (`p.Outer$Inner`, `[I`).
    pub fn binary_name(&self) -> Option<String> {
        self.with_raw(|env, id| binary_name(&env.store, id))?
    }

    pub fn modifiers(&self) -> Modifiers {
        self.with_raw(|env, id| match env.store.get(id) {
            Some(RawBinding::Reference(data)) => data.modifiers.visible(),
            _ => Modifiers::empty(),
        })
        .unwrap_or_default()
    }

    pub fn is_deprecated(&self) -> bool {
        self.with_raw(|env, id| {
            env.store
                .reference(id)
                .is_some_and(|data| data.modifiers.contains(Modifiers::DEPRECATED))
        })
        .unwrap_or(false)
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    pub fn is_recovered(&self) -> bool {
        matches!(self.repr, TypeRepr::Recovered(_))
    }

    pub fn is_array(&self) -> bool {
        self.dimensions() > 0
    }

    pub fn is_primitive(&self) -> bool {
        self.base_type().is_some_and(|base| !base.is_nullish())
    }

    pub fn is_null_type(&self) -> bool {
        self.base_type() == Some(BaseType::Null)
    }

    pub fn is_class(&self) -> bool {
        match &self.repr {
            TypeRepr::Raw(_) => self
                .with_raw(|env, id| env.store.reference(id).is_some())
                .unwrap_or(false),
            TypeRepr::Recovered(_) => true,
        }
    }

    pub fn is_member(&self) -> bool {
        self.with_raw(|env, id| env.store.reference(id).is_some_and(|data| data.is_member()))
            .unwrap_or(false)
    }

    pub fn is_top_level(&self) -> bool {
        match &self.repr {
            TypeRepr::Raw(_) => self
                .with_raw(|env, id| {
                    env.store
                        .reference(id)
                        .is_some_and(|data| !data.is_member())
                })
                .unwrap_or(false),
            TypeRepr::Recovered(_) => true,
        }
    }

    pub fn is_from_source(&self) -> bool {
        self.with_raw(|env, id| env.store.reference(id).is_some_and(|data| !data.is_binary()))
            .unwrap_or(false)
    }

    /// The type holding a unit's top-level functions and variables.
    pub fn is_compilation_unit(&self) -> bool {
        self.with_raw(|env, id| {
            env.store
                .reference(id)
                .is_some_and(|data| data.is_compilation_unit())
        })
        .unwrap_or(false)
    }

    fn base_type(&self) -> Option<BaseType> {
        self.with_raw(|env, id| match env.store.get(id) {
            Some(RawBinding::Base(base)) => Some(*base),
            _ => None,
        })?
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn dimensions(&self) -> u32 {
        match &self.repr {
            TypeRepr::Raw(_) => self
                .with_raw(|env, id| env.store.dimensions(id))
                .unwrap_or(0),
            TypeRepr::Recovered(recovered) => recovered.dimensions(),
        }
    }

    /// Leaf type of an array.
    pub fn element_type(self: &Arc<Self>) -> Option<Arc<TypeBinding>> {
        let context = &self.context;
        match &self.repr {
            TypeRepr::Raw(id) => {
                let env = context.read();
                let array = env.store.array(*id)?;
                context.type_facade(&env, array.leaf)
            }
            TypeRepr::Recovered(recovered) => match recovered.source() {
                RecoveredSource::Binding(id) => {
                    let env = context.read();
                    let leaf = if env.store.array(*id).is_some() {
                        env.store.leaf_component(*id)
                    } else {
                        *id
                    };
                    Some(context.recovered_for_binding(&env, leaf))
                }
                RecoveredSource::Inner(inner) => inner.element_type(),
                RecoveredSource::TypeNode { .. } | RecoveredSource::Declaration { .. } => {
                    let (tree, ty) = recovered.syntactic_type()?;
                    let tree = tree.clone();
                    match tree.kind(ty) {
                        Some(jsbind_ast::NodeKind::ArrayType { element, .. }) => {
                            Some(context.recovered_for_type_node(&tree, *element))
                        }
                        _ if recovered.dimensions() > 0 => {
                            Some(context.recovered_for_type_node(&tree, ty))
                        }
                        _ => None,
                    }
                }
            },
        }
    }

    /// The type with one dimension less; `None` for non-array types.
    pub fn component_type(self: &Arc<Self>) -> Option<Arc<TypeBinding>> {
        let context = &self.context;
        match &self.repr {
            TypeRepr::Raw(id) => {
                let mut env = context.write();
                let array = env.store.array(*id)?;
                let (leaf, dimensions) = (array.leaf, array.dimensions);
                let component = env.create_array_type(leaf, dimensions - 1);
                context.type_facade(&env, component)
            }
            TypeRepr::Recovered(recovered) => {
                if recovered.dimensions() == 0 {
                    return None;
                }
                Some(context.recovered_array(self, -1))
            }
        }
    }

    /// Recovered types answer `Object`.
    pub fn superclass(&self) -> Option<Arc<TypeBinding>> {
        let context = &self.context;
        match &self.repr {
            TypeRepr::Raw(id) => {
                let env = context.read();
                let data = env.store.reference(*id)?;
                let superclass = data.superclass;
                context.type_facade(&env, superclass)
            }
            TypeRepr::Recovered(_) => {
                let object = context.write().object_type()?;
                let env = context.read();
                context.type_facade(&env, object)
            }
        }
    }

    pub fn declaring_class(&self) -> Option<Arc<TypeBinding>> {
        let context = &self.context;
        let id = self.raw_id()?;
        let env = context.read();
        let data = env.store.reference(id)?;
        if !data.is_member() {
            return None;
        }
        let enclosing = data.enclosing;
        context.type_facade(&env, enclosing)
    }

    pub fn package(&self) -> Option<Arc<PackageBinding>> {
        let context = &self.context;
        match &self.repr {
            TypeRepr::Raw(id) => {
                let env = context.read();
                let package = env.store.reference(*id)?.package;
                context.package_facade(&env, package)
            }
            TypeRepr::Recovered(recovered) => match recovered.source() {
                RecoveredSource::Inner(inner) => inner.package(),
                RecoveredSource::Binding(id) => {
                    let env = context.read();
                    let package = env
                        .store
                        .reference(env.store.leaf_component(*id))
                        .map(|data| data.package)
                        .filter(|package| package.is_some())
                        .unwrap_or_else(|| env.default_package());
                    context.package_facade(&env, package)
                }
                RecoveredSource::Declaration { tree, .. } | RecoveredSource::TypeNode { tree, .. } => {
                    let env = context.read();
                    let package = env
                        .unit_scope(&tree.file_name)
                        .map(|scope| scope.package)
                        .unwrap_or_else(|| env.default_package());
                    context.package_facade(&env, package)
                }
            },
        }
    }

    // =========================================================================
    // Declared members
    // =========================================================================

    /// Member signatures are resolved on first access.
    fn member_lists(&self) -> Option<(Arc<PassContext>, Vec<BindingId>, Vec<BindingId>, Vec<BindingId>)> {
        let context = &self.context;
        let id = self.raw_id()?;
        let lists = {
            let mut env = context.write();
            env.store.reference(id)?;
            env.resolve_types_for(id);
            let data = env.store.reference(id)?;
            (data.fields.clone(), data.methods.clone(), data.member_types.clone())
        };
        Some((context.clone(), lists.0, lists.1, lists.2))
    }

    pub fn declared_fields(&self) -> &[Arc<VariableBinding>] {
        self.declared_fields.get_or_init(|| {
            let Some((context, fields, _, _)) = self.member_lists() else {
                return Vec::new();
            };
            let env = context.read();
            fields
                .into_iter()
                .filter_map(|field| context.variable_facade(&env, field, None))
                .collect()
        })
    }

    /// Declared methods, constructors included; inherited abstract methods
    /// are left out.
    pub fn declared_methods(&self) -> &[Arc<MethodBinding>] {
        self.declared_methods.get_or_init(|| {
            let Some((context, _, methods, _)) = self.member_lists() else {
                return Vec::new();
            };
            let env = context.read();
            methods
                .into_iter()
                .filter(|method| {
                    env.store
                        .method(*method)
                        .is_some_and(|data| !data.modifiers.contains(Modifiers::DEFAULT_ABSTRACT))
                })
                .filter_map(|method| context.method_facade(&env, method))
                .collect()
        })
    }

    pub fn declared_types(&self) -> &[Arc<TypeBinding>] {
        self.declared_types.get_or_init(|| {
            let Some((context, _, _, types)) = self.member_lists() else {
                return Vec::new();
            };
            let env = context.read();
            types
                .into_iter()
                .filter_map(|ty| context.type_facade(&env, ty))
                .collect()
        })
    }

    // =========================================================================
    // Derived types
    // =========================================================================

    /// This type with `dimensions` more dimensions.
    ///
    /// Fails when the total falls outside `1..=255` or the leaf is `void`.
    /// Compilation-unit types have no array type.
    pub fn create_array_type(
        self: &Arc<Self>,
        dimensions: i32,
    ) -> Result<Option<Arc<TypeBinding>>, ResolveError> {
        let total = i64::from(self.dimensions()) + i64::from(dimensions);
        if total < 1 || total > i64::from(MAX_ARRAY_DIMENSIONS) {
            return Err(ResolveError::InvalidDimensions { dimensions: total });
        }
        match &self.repr {
            TypeRepr::Recovered(_) => Ok(Some(self.context.recovered_array(self, i64::from(dimensions)))),
            TypeRepr::Raw(id) => array_of(&self.context, *id, total),
        }
    }

    // =========================================================================
    // Compatibility
    // =========================================================================

    /// Whether a value of this type can be assigned to `other`.
    ///
    /// Recovered types only know `Object` and themselves: they are
    /// compatible with `Object` in either direction and otherwise only with
    /// an equal recovered type.
    pub fn is_assignment_compatible(&self, other: &TypeBinding) -> bool {
        self.compatible(other, |env, from, to| {
            env.is_compatible_with(from, to) || env.is_boxing_compatible(from, to)
        })
    }

    pub fn is_cast_compatible(&self, other: &TypeBinding) -> bool {
        self.compatible(other, |env, from, to| env.check_cast(from, to))
    }

    pub fn is_subtype_compatible(&self, other: &TypeBinding) -> bool {
        if self.base_type().is_some() {
            return false;
        }
        self.compatible(other, |env, from, to| {
            env.store.get(to).is_some_and(|binding| !matches!(binding, RawBinding::Base(_)))
                && env.is_compatible_with(from, to)
        })
    }

    fn compatible(
        &self,
        other: &TypeBinding,
        check: impl FnOnce(&mut LookupEnvironment, BindingId, BindingId) -> bool,
    ) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.is_recovered() || other.is_recovered() {
            return self.qualified_name() == "Object"
                || other.qualified_name() == "Object"
                || self.is_equal_to(other);
        }
        let (Some(from), Some(to)) = (self.raw_id(), other.raw_id()) else {
            return false;
        };
        if other.context.store_id() != self.context.store_id() {
            return false;
        }
        let mut env = self.context.write();
        check(&mut env, from, to)
    }

    /// Structural equality, also across passes. Recovered types are equal
    /// when their keys are.
    pub fn is_equal_to(&self, other: &TypeBinding) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.is_recovered() || other.is_recovered() {
            return self.is_recovered() && other.is_recovered() && self.key() == other.key();
        }
        let (Some(a), Some(b)) = (self.raw_id(), other.raw_id()) else {
            return false;
        };
        let (left, right) = (&self.context, &other.context);
        if Arc::ptr_eq(left, right) {
            let env = left.read();
            return is_equal(&env.store, a, &env.store, b);
        }
        let left_env = left.read();
        let right_env = right.read();
        is_equal(&left_env.store, a, &right_env.store, b)
    }
}

/// Array of `total` dimensions over the leaf of `id`.
pub(crate) fn array_of(
    context: &Arc<PassContext>,
    id: BindingId,
    total: i64,
) -> Result<Option<Arc<TypeBinding>>, ResolveError> {
    let mut env = context.write();
    let leaf = env.store.leaf_component(id);
    match env.store.get(leaf) {
        Some(RawBinding::Base(BaseType::Void)) => return Err(ResolveError::VoidArray),
        Some(RawBinding::Reference(data)) if data.is_compilation_unit() => return Ok(None),
        None => return Ok(None),
        _ => {}
    }
    let dimensions =
        u32::try_from(total).map_err(|_| ResolveError::InvalidDimensions { dimensions: total })?;
    let array = env.create_array_type(leaf, dimensions);
    Ok(context.type_facade(&env, array))
}

fn simple_name(store: &BindingStore, id: BindingId) -> String {
    match store.get(id) {
        Some(RawBinding::Base(base)) => base.keyword().to_string(),
        Some(RawBinding::Array(array)) => {
            let mut name = simple_name(store, array.leaf);
            push_brackets(&mut name, array.dimensions);
            name
        }
        Some(RawBinding::Reference(data)) => data.source_name.to_string(),
        _ => String::new(),
    }
}

fn qualified_name(store: &BindingStore, id: BindingId) -> String {
    match store.get(id) {
        Some(RawBinding::Base(base)) => base.keyword().to_string(),
        Some(RawBinding::Array(array)) => {
            let mut name = qualified_name(store, array.leaf);
            push_brackets(&mut name, array.dimensions);
            name
        }
        Some(RawBinding::Reference(data)) => {
            if data.is_member() && data.enclosing.is_some() {
                return format!("{}.{}", qualified_name(store, data.enclosing), data.source_name);
            }
            match store.package(data.package) {
                Some(package) if !package.compound_name.is_empty() => {
                    let prefix: Vec<&str> = package.compound_name.iter().map(|s| &**s).collect();
                    format!("{}.{}", prefix.join("."), data.source_name)
                }
                _ => data.source_name.to_string(),
            }
        }
        _ => String::new(),
    }
}

fn binary_name(store: &BindingStore, id: BindingId) -> Option<String> {
    match store.get(id)? {
        RawBinding::Base(base) => Some(base.key_char().to_string()),
        RawBinding::Array(array) => {
            let leaf = match store.get(array.leaf)? {
                RawBinding::Base(base) => base.key_char().to_string(),
                RawBinding::Reference(_) => format!("L{};", binary_name(store, array.leaf)?),
                _ => return None,
            };
            Some(format!("{}{}", "[".repeat(array.dimensions as usize), leaf))
        }
        RawBinding::Reference(data) => data
            .constant_pool_name
            .as_ref()
            .map(|pool| pool.replace('/', ".")),
        _ => None,
    }
}

fn push_brackets(name: &mut String, dimensions: u32) {
    for _ in 0..dimensions {
        name.push_str("[]");
    }
}

#[cfg(test)]
#[path = "../tests/type_binding_tests.rs"]
mod type_binding_tests;
