//! Pass-scoped binding tables.
//!
//! A [`PassContext`] owns the lookup environment of one resolution pass and
//! interns every facade handed out during that pass. Two lookups of the same
//! raw binding return the same `Arc`, which is what lets
//! [`TypeBinding::is_equal_to`] and friends short-circuit on identity.
//!
//! The context is created by the driver at the start of a pass. Every facade
//! holds a strong handle back to it, while the intern tables only hold weak
//! handles to the facades, so the pass lives exactly as long as the last
//! resolved tree or delivered binding that refers to it.

use crate::binding::Binding;
use crate::method_binding::MethodBinding;
use crate::package_binding::PackageBinding;
use crate::recovered::RecoveredType;
use crate::type_binding::TypeBinding;
use crate::variable_binding::{RecoveredDeclaration, VariableBinding};
use dashmap::DashMap;
use jsbind_ast::{NodeIndex, SyntaxTree};
use jsbind_lookup::{
    BindingId, KeyDescriptor, LookupEnvironment, ProblemReason, RawBinding, StoreId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::{debug, trace};

pub struct PassContext {
    env: RwLock<LookupEnvironment>,
    store_id: StoreId,
    recovery: bool,
    active: AtomicBool,

    /// Facades of raw types, and of the recovered types standing in for
    /// `NotFound` ones.
    types: DashMap<BindingId, Weak<TypeBinding>>,
    methods: DashMap<BindingId, Weak<MethodBinding>>,
    variables: DashMap<BindingId, Weak<VariableBinding>>,
    packages: DashMap<BindingId, Weak<PackageBinding>>,
    /// Recovered types synthesized from syntax, by unit and node.
    recovered: DashMap<(Arc<str>, NodeIndex), Weak<TypeBinding>>,
    /// Bindings registered by key, so keys of recovered and declared
    /// bindings can be found again while someone still holds them.
    keys: DashMap<String, WeakBinding>,
}

/// Registry entry of [`PassContext::register_key`].
enum WeakBinding {
    Type(Weak<TypeBinding>),
    Method(Weak<MethodBinding>),
    Variable(Weak<VariableBinding>),
    Package(Weak<PackageBinding>),
}

impl WeakBinding {
    fn new(binding: &Binding) -> Self {
        match binding {
            Binding::Type(b) => WeakBinding::Type(Arc::downgrade(b)),
            Binding::Method(b) => WeakBinding::Method(Arc::downgrade(b)),
            Binding::Variable(b) => WeakBinding::Variable(Arc::downgrade(b)),
            Binding::Package(b) => WeakBinding::Package(Arc::downgrade(b)),
        }
    }

    fn upgrade(&self) -> Option<Binding> {
        match self {
            WeakBinding::Type(b) => b.upgrade().map(Binding::Type),
            WeakBinding::Method(b) => b.upgrade().map(Binding::Method),
            WeakBinding::Variable(b) => b.upgrade().map(Binding::Variable),
            WeakBinding::Package(b) => b.upgrade().map(Binding::Package),
        }
    }
}

/// Live facade under `key`, or a fresh one from `create`.
fn intern<K: Eq + Hash, T>(
    table: &DashMap<K, Weak<T>>,
    key: K,
    create: impl FnOnce() -> T,
) -> Arc<T> {
    let mut entry = table.entry(key).or_default();
    if let Some(live) = entry.upgrade() {
        return live;
    }
    let fresh = Arc::new(create());
    *entry = Arc::downgrade(&fresh);
    fresh
}

fn cached<K: Eq + Hash, T>(table: &DashMap<K, Weak<T>>, key: &K) -> Option<Arc<T>> {
    table.get(key).and_then(|entry| entry.upgrade())
}

impl std::fmt::Debug for PassContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassContext")
            .field("store_id", &self.store_id)
            .field("recovery", &self.recovery)
            .field("active", &self.is_active())
            .field("types", &self.types.len())
            .finish_non_exhaustive()
    }
}

impl PassContext {
    pub fn new(env: LookupEnvironment, recovery: bool) -> Arc<Self> {
        let store_id = env.store.id();
        debug!(store = store_id.0, recovery, "pass context created");
        Arc::new(PassContext {
            env: RwLock::new(env),
            store_id,
            recovery,
            active: AtomicBool::new(true),
            types: DashMap::new(),
            methods: DashMap::new(),
            variables: DashMap::new(),
            packages: DashMap::new(),
            recovered: DashMap::new(),
            keys: DashMap::new(),
        })
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    /// Whether recovered bindings are synthesized for unresolved types.
    pub fn recovery(&self) -> bool {
        self.recovery
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the pass as finished. Resolvers keep answering queries from
    /// their trees, but batch key resolution is refused from now on.
    pub fn end_pass(&self) {
        self.active.store(false, Ordering::Release);
        debug!(
            store = self.store_id.0,
            types = self.types.len(),
            methods = self.methods.len(),
            variables = self.variables.len(),
            "pass ended"
        );
    }

    pub fn read(&self) -> RwLockReadGuard<'_, LookupEnvironment> {
        self.env.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, LookupEnvironment> {
        self.env.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Public lookups
    // =========================================================================

    /// Facade of any raw binding.
    pub fn binding(self: &Arc<Self>, id: BindingId) -> Option<Binding> {
        let env = self.read();
        self.facade(&env, id)
    }

    /// Resolve a parsed key against the environment.
    pub fn binding_for_key(self: &Arc<Self>, key: &KeyDescriptor) -> Option<Binding> {
        let id = self.write().binding_for_key(key)?;
        let binding = self.binding(id);
        trace!(key = %key, found = binding.is_some(), "binding for key");
        binding
    }

    /// Resolve key text: keys registered during the pass first, then the
    /// environment. Malformed keys resolve to nothing.
    pub fn binding_for_key_text(self: &Arc<Self>, key: &str) -> Option<Binding> {
        if let Some(registered) = self.registered(key) {
            return Some(registered);
        }
        let descriptor = match KeyDescriptor::parse(key) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                trace!(error = %err, "unparsable binding key");
                return None;
            }
        };
        let binding = self.binding_for_key(&descriptor)?;
        self.register_key(key, &binding);
        Some(binding)
    }

    /// A binding registered under `key` earlier in the pass.
    pub fn registered(&self, key: &str) -> Option<Binding> {
        self.keys.get(key).and_then(|entry| entry.upgrade())
    }

    pub fn register_key(&self, key: &str, binding: &Binding) {
        if key.is_empty() {
            return;
        }
        let mut entry = self
            .keys
            .entry(key.to_string())
            .or_insert_with(|| WeakBinding::new(binding));
        if entry.upgrade().is_none() {
            *entry = WeakBinding::new(binding);
        }
    }

    // =========================================================================
    // Facade construction
    // =========================================================================

    pub(crate) fn facade(self: &Arc<Self>, env: &LookupEnvironment, id: BindingId) -> Option<Binding> {
        match env.store.get(id)? {
            RawBinding::Base(_) | RawBinding::Array(_) | RawBinding::Reference(_) => {
                self.type_facade(env, id).map(Binding::Type)
            }
            RawBinding::Method(_) => self.method_facade(env, id).map(Binding::Method),
            RawBinding::Field(_) | RawBinding::Variable(_) => {
                self.variable_facade(env, id, None).map(Binding::Variable)
            }
            RawBinding::Package(_) => self.package_facade(env, id).map(Binding::Package),
            RawBinding::Import(data) => {
                let resolved = data.resolved;
                if resolved.is_some() && resolved != id {
                    self.facade(env, resolved)
                } else {
                    None
                }
            }
        }
    }

    pub(crate) fn type_facade(
        self: &Arc<Self>,
        env: &LookupEnvironment,
        id: BindingId,
    ) -> Option<Arc<TypeBinding>> {
        if let Some(cached) = cached(&self.types, &id) {
            return Some(cached);
        }
        let problem = match env.store.get(id)? {
            RawBinding::Base(_) => None,
            RawBinding::Array(array) => env
                .store
                .reference(array.leaf)
                .and_then(|leaf| leaf.problem.map(|reason| (reason, BindingId::NONE))),
            RawBinding::Reference(data) => data.problem.map(|reason| (reason, data.closest_match)),
            _ => return None,
        };
        match problem {
            None => Some(self.intern_type(id, || TypeBinding::raw(self.clone(), id))),
            Some((ProblemReason::NotVisible | ProblemReason::NonStaticReferenceInStaticContext, closest))
                if closest.is_some() && closest != id =>
            {
                self.type_facade(env, closest)
            }
            Some((ProblemReason::NotFound, _)) if self.recovery => {
                trace!(id = id.0, "recovered type for missing binding");
                Some(self.intern_type(id, || {
                    TypeBinding::recovered(
                        self.clone(),
                        RecoveredType::from_binding(&env.store, id),
                    )
                }))
            }
            Some(_) => None,
        }
    }

    fn intern_type(&self, id: BindingId, create: impl FnOnce() -> TypeBinding) -> Arc<TypeBinding> {
        intern(&self.types, id, create)
    }

    pub(crate) fn method_facade(
        self: &Arc<Self>,
        env: &LookupEnvironment,
        id: BindingId,
    ) -> Option<Arc<MethodBinding>> {
        if let Some(cached) = cached(&self.methods, &id) {
            return Some(cached);
        }
        let data = env.store.method(id)?;
        if !data.is_valid() {
            let closest = data.closest_match;
            if closest.is_none() || closest == id {
                return None;
            }
            return self.method_facade(env, closest);
        }
        Some(intern(&self.methods, id, || MethodBinding::new(self.clone(), id)))
    }

    /// Facade of a field or local. `declaration` is the syntax that declared
    /// it, used to recover a variable whose type did not resolve.
    pub(crate) fn variable_facade(
        self: &Arc<Self>,
        env: &LookupEnvironment,
        id: BindingId,
        declaration: Option<(&Arc<SyntaxTree>, NodeIndex)>,
    ) -> Option<Arc<VariableBinding>> {
        if let Some(cached) = cached(&self.variables, &id) {
            return Some(cached);
        }
        let ty = match env.store.get(id)? {
            RawBinding::Field(data) => {
                if let Some(reason) = data.problem {
                    let closest = data.closest_match;
                    return match reason {
                        ProblemReason::NotVisible
                        | ProblemReason::NonStaticReferenceInStaticContext
                            if closest.is_some() && closest != id =>
                        {
                            self.variable_facade(env, closest, None)
                        }
                        _ => None,
                    };
                }
                data.ty
            }
            RawBinding::Variable(data) => data.ty,
            _ => return None,
        };
        let recovered = if ty.is_some() {
            None
        } else {
            match declaration {
                Some((tree, node)) if self.recovery => Some(RecoveredDeclaration {
                    tree: tree.clone(),
                    node,
                }),
                _ => return None,
            }
        };
        Some(intern(&self.variables, id, || {
            VariableBinding::new(self.clone(), id, recovered)
        }))
    }

    pub(crate) fn package_facade(
        self: &Arc<Self>,
        env: &LookupEnvironment,
        id: BindingId,
    ) -> Option<Arc<PackageBinding>> {
        if let Some(cached) = cached(&self.packages, &id) {
            return Some(cached);
        }
        if !env.store.package(id)?.is_valid() {
            return None;
        }
        Some(intern(&self.packages, id, || PackageBinding::new(self.clone(), id)))
    }

    // =========================================================================
    // Recovered types
    // =========================================================================

    pub(crate) fn recovered_for_declaration(
        self: &Arc<Self>,
        tree: &Arc<SyntaxTree>,
        declaration: NodeIndex,
    ) -> Arc<TypeBinding> {
        intern(&self.recovered, (tree.file_name.clone(), declaration), || {
            TypeBinding::recovered(self.clone(), RecoveredType::from_declaration(tree, declaration))
        })
    }

    pub(crate) fn recovered_for_type_node(
        self: &Arc<Self>,
        tree: &Arc<SyntaxTree>,
        ty: NodeIndex,
    ) -> Arc<TypeBinding> {
        intern(&self.recovered, (tree.file_name.clone(), ty), || {
            TypeBinding::recovered(self.clone(), RecoveredType::from_type_node(tree, ty))
        })
    }

    /// Wrap a raw type (valid or not) as a recovered one.
    pub(crate) fn recovered_for_binding(
        self: &Arc<Self>,
        env: &LookupEnvironment,
        id: BindingId,
    ) -> Arc<TypeBinding> {
        Arc::new(TypeBinding::recovered(
            self.clone(),
            RecoveredType::from_binding(&env.store, id),
        ))
    }

    /// `inner` with `delta` more (or, when negative, fewer) dimensions.
    pub(crate) fn recovered_array(
        self: &Arc<Self>,
        inner: &Arc<TypeBinding>,
        delta: i64,
    ) -> Arc<TypeBinding> {
        Arc::new(TypeBinding::recovered(
            self.clone(),
            RecoveredType::from_inner(inner.clone(), delta),
        ))
    }
}

#[cfg(test)]
#[path = "../tests/context_tests.rs"]
mod context_tests;
