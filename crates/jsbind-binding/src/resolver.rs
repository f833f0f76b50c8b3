//! The binding resolver: the one place a syntax node asks what it means.
//!
//! [`BindingResolver`] has one query per semantic question. Every query has a
//! default answer of "nothing", which is what [`NullResolver`] gives for
//! trees parsed without bindings. [`DefaultBindingResolver`] answers from the
//! analyzer's per-node records and the pass context.
//!
//! Queries never fail for unresolved code; they return `None`. Only requests
//! that are malformed in any state (an array of `void`, a binding from
//! another pass, batch key resolution after the pass) return an error.

use crate::binding::Binding;
use crate::context::PassContext;
use crate::error::ResolveError;
use crate::method_binding::MethodBinding;
use crate::package_binding::PackageBinding;
use crate::type_binding::{TypeBinding, array_of};
use crate::variable_binding::VariableBinding;
use dashmap::DashMap;
use jsbind_ast::{NodeIndex, NodeKind, SyntaxFlags, SyntaxTree};
use jsbind_common::limits::MAX_ARRAY_DIMENSIONS;
use jsbind_lookup::{
    BindingId, CompilerNode, CompilerUnit, Constant, ImplicitConversion, KeyDescriptor, ScopeInfo,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Names `resolve_well_known_type` answers.
pub const WELL_KNOWN_TYPES: &[&str] = &["Object", "String", "Number", "Function", "Boolean"];

pub trait BindingResolver: Send + Sync {
    // =========================================================================
    // Names and references
    // =========================================================================

    /// Binding a name refers to. The name of a declaration resolves to the
    /// declared binding.
    fn resolve_name(&self, _name: NodeIndex) -> Option<Binding> {
        None
    }

    /// What an import declaration imports: a type, or a package for
    /// on-demand imports.
    fn resolve_import(&self, _import: NodeIndex) -> Option<Binding> {
        None
    }

    /// Target of a doc comment member or function reference.
    fn resolve_reference(&self, _reference: NodeIndex) -> Option<Binding> {
        None
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Function declarations, and the method invoked by a function or super
    /// method invocation.
    fn resolve_method(&self, _node: NodeIndex) -> Option<Arc<MethodBinding>> {
        None
    }

    fn resolve_variable(&self, _declaration: NodeIndex) -> Option<Arc<VariableBinding>> {
        None
    }

    /// Type declarations, type nodes and the source file (its
    /// compilation-unit type).
    fn resolve_type(&self, _node: NodeIndex) -> Option<Arc<TypeBinding>> {
        None
    }

    fn resolve_package(&self, _declaration: NodeIndex) -> Option<Arc<PackageBinding>> {
        None
    }

    // =========================================================================
    // Calls and member access
    // =========================================================================

    /// Constructor invoked by an instance creation or an explicit
    /// constructor call.
    fn resolve_constructor(&self, _node: NodeIndex) -> Option<Arc<MethodBinding>> {
        None
    }

    fn resolve_field(&self, _access: NodeIndex) -> Option<Arc<VariableBinding>> {
        None
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn resolve_expression_type(&self, _expression: NodeIndex) -> Option<Arc<TypeBinding>> {
        None
    }

    fn resolve_boxing(&self, _expression: NodeIndex) -> bool {
        false
    }

    fn resolve_unboxing(&self, _expression: NodeIndex) -> bool {
        false
    }

    /// Compile-time constant of an expression. `null` never has one.
    fn resolve_constant_expression_value(&self, _expression: NodeIndex) -> Option<Constant> {
        None
    }

    // =========================================================================
    // Derived bindings
    // =========================================================================

    fn resolve_well_known_type(&self, _name: &str) -> Option<Arc<TypeBinding>> {
        None
    }

    /// Array of `dimensions` more dimensions over `element`.
    fn resolve_array_type(
        &self,
        _element: &Arc<TypeBinding>,
        _dimensions: i32,
    ) -> Result<Option<Arc<TypeBinding>>, ResolveError> {
        Ok(None)
    }

    /// Recovered type of a variable declaration, built from its syntax.
    fn recovered_type_for_declaration(&self, _declaration: NodeIndex) -> Option<Arc<TypeBinding>> {
        None
    }

    /// Recovered type of a type node, built from its syntax.
    fn recovered_type_for_type(&self, _ty: NodeIndex) -> Option<Arc<TypeBinding>> {
        None
    }

    // =========================================================================
    // Declaring nodes
    // =========================================================================

    fn find_declaring_node(&self, _binding: &Binding) -> Option<NodeIndex> {
        None
    }

    fn find_declaring_node_for_key(&self, _key: &str) -> Option<NodeIndex> {
        None
    }

    // =========================================================================
    // Batch keys
    // =========================================================================

    /// One entry per key, `None` for keys that do not resolve. Fails as a
    /// whole only when no pass is active.
    fn create_bindings(&self, _keys: &[&str]) -> Result<Vec<Option<Binding>>, ResolveError> {
        Err(ResolveError::NoActivePass)
    }

    // =========================================================================
    // Record keeping
    // =========================================================================

    fn record_scope(&self, _node: NodeIndex, _scope: ScopeInfo) {}

    /// `node` is a copy of `original` and resolves like it.
    fn store(&self, _node: NodeIndex, _original: NodeIndex) {}

    /// `old` was replaced by `new`.
    fn update_key(&self, _old: NodeIndex, _new: NodeIndex) {}
}

/// Resolver of trees parsed without bindings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl BindingResolver for NullResolver {}

// =============================================================================
// DefaultBindingResolver
// =============================================================================

/// Resolver of one analyzed unit.
pub struct DefaultBindingResolver {
    context: Arc<PassContext>,
    unit: Arc<CompilerUnit>,
    declaring_nodes: DashMap<BindingId, NodeIndex>,
    scopes: DashMap<NodeIndex, ScopeInfo>,
    /// Node copies made after analysis, mapped to the analyzed node.
    aliases: DashMap<NodeIndex, NodeIndex>,
    /// Declared bindings by key. Keeps them findable by key while the tree
    /// is alive.
    registered: DashMap<String, Binding>,
}

impl fmt::Debug for DefaultBindingResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultBindingResolver")
            .field("file", self.unit.file_name())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl DefaultBindingResolver {
    pub fn new(context: Arc<PassContext>, unit: Arc<CompilerUnit>) -> Self {
        DefaultBindingResolver {
            context,
            unit,
            declaring_nodes: DashMap::new(),
            scopes: DashMap::new(),
            aliases: DashMap::new(),
            registered: DashMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<PassContext> {
        &self.context
    }

    pub fn tree(&self) -> &Arc<SyntaxTree> {
        &self.unit.tree
    }

    fn kind(&self, node: NodeIndex) -> Option<&NodeKind> {
        self.unit.tree.kind(node)
    }

    fn original(&self, node: NodeIndex) -> NodeIndex {
        self.aliases.get(&node).map_or(node, |entry| *entry.value())
    }

    fn record(&self, node: NodeIndex) -> Option<&CompilerNode> {
        self.unit.node(self.original(node))
    }

    fn recorded_binding(&self, node: NodeIndex) -> BindingId {
        self.record(node).map_or(BindingId::NONE, |record| record.binding)
    }

    fn recorded_type(&self, node: NodeIndex) -> BindingId {
        self.record(node)
            .map_or(BindingId::NONE, |record| record.resolved_type)
    }

    fn type_of(&self, id: BindingId) -> Option<Arc<TypeBinding>> {
        let env = self.context.read();
        self.context.type_facade(&env, id)
    }

    fn method_of(&self, id: BindingId) -> Option<Arc<MethodBinding>> {
        let env = self.context.read();
        self.context.method_facade(&env, id)
    }

    /// Remember where a declared binding comes from.
    fn register(&self, binding: Binding, node: NodeIndex) {
        if let Some(id) = binding.raw_id() {
            self.declaring_nodes.insert(id, node);
        }
        let key = binding.key();
        if key.is_empty() {
            return;
        }
        self.context.register_key(key, &binding);
        self.registered.entry(key.to_string()).or_insert(binding);
    }

    fn scope_of(&self, node: NodeIndex) -> Option<ScopeInfo> {
        let mut current = node;
        while current.is_some() {
            if let Some(scope) = self.scopes.get(&current) {
                return Some(*scope);
            }
            if let Some(scope) = self.unit.scope(self.original(current)) {
                return Some(scope);
            }
            current = self.unit.tree.parent(current);
        }
        None
    }

    fn has_conversion(&self, node: NodeIndex, conversion: ImplicitConversion) -> bool {
        self.record(node)
            .is_some_and(|record| record.conversion.contains(conversion))
    }

    /// Declaration node of a raw binding in this unit.
    fn declaring_node_of(&self, id: BindingId) -> Option<NodeIndex> {
        if let Some(node) = self.declaring_nodes.get(&id) {
            return Some(*node);
        }
        let is_unit_type = {
            let env = self.context.read();
            env.unit_scope(self.unit.file_name())
                .is_some_and(|scope| scope.unit_type == id)
        };
        if is_unit_type {
            return Some(self.unit.tree.root);
        }
        let found = self
            .unit
            .nodes()
            .filter(|(_, record)| record.binding == id)
            .map(|(node, _)| node)
            .filter(|node| {
                self.kind(*node).is_some_and(|kind| {
                    kind.is_variable_declaration()
                        || matches!(
                            kind,
                            NodeKind::TypeDeclaration { .. }
                                | NodeKind::FunctionDeclaration { .. }
                                | NodeKind::PackageDeclaration { .. }
                        )
                })
            })
            .min_by_key(|node| node.0)?;
        self.declaring_nodes.insert(id, found);
        Some(found)
    }
}

impl BindingResolver for DefaultBindingResolver {
    fn resolve_name(&self, name: NodeIndex) -> Option<Binding> {
        let tree = &self.unit.tree;
        if !tree.kind(name)?.is_name() {
            return None;
        }
        let parent = tree.parent(name);
        match tree.kind(parent) {
            Some(NodeKind::TypeDeclaration { name: declared, .. }) if *declared == name => {
                return self.resolve_type(parent).map(Binding::Type);
            }
            Some(NodeKind::FunctionDeclaration { name: declared, .. }) if *declared == name => {
                return self.resolve_method(parent).map(Binding::Method);
            }
            Some(kind) if kind.is_variable_declaration() && tree.declaration_name(parent) == name => {
                return self.resolve_variable(parent).map(Binding::Variable);
            }
            _ => {}
        }
        let id = self.recorded_binding(name);
        let env = self.context.read();
        self.context.facade(&env, id)
    }

    fn resolve_import(&self, import: NodeIndex) -> Option<Binding> {
        if !matches!(self.kind(import)?, NodeKind::ImportDeclaration { .. }) {
            return None;
        }
        let id = self.recorded_binding(import);
        let env = self.context.read();
        self.context.facade(&env, id)
    }

    fn resolve_reference(&self, reference: NodeIndex) -> Option<Binding> {
        if !matches!(
            self.kind(reference)?,
            NodeKind::MemberRef { .. } | NodeKind::FunctionRef { .. }
        ) {
            return None;
        }
        let id = self.recorded_binding(reference);
        let env = self.context.read();
        self.context.facade(&env, id)
    }

    fn resolve_method(&self, node: NodeIndex) -> Option<Arc<MethodBinding>> {
        match self.kind(node)? {
            NodeKind::FunctionDeclaration { .. } => {
                let method = self.method_of(self.recorded_binding(node))?;
                self.register(Binding::Method(method.clone()), node);
                Some(method)
            }
            NodeKind::FunctionInvocation { .. } | NodeKind::SuperMethodInvocation { .. } => {
                self.method_of(self.recorded_binding(node))
            }
            _ => None,
        }
    }

    fn resolve_variable(&self, declaration: NodeIndex) -> Option<Arc<VariableBinding>> {
        if !self.kind(declaration)?.is_variable_declaration() {
            return None;
        }
        let id = self.recorded_binding(declaration);
        let variable = {
            let env = self.context.read();
            self.context
                .variable_facade(&env, id, Some((&self.unit.tree, declaration)))?
        };
        self.register(Binding::Variable(variable.clone()), declaration);
        Some(variable)
    }

    fn resolve_type(&self, node: NodeIndex) -> Option<Arc<TypeBinding>> {
        let kind = self.kind(node)?;
        match kind {
            NodeKind::TypeDeclaration { .. } => {
                let ty = self.type_of(self.recorded_binding(node))?;
                self.register(Binding::Type(ty.clone()), node);
                Some(ty)
            }
            NodeKind::SourceFile { .. } => {
                let env = self.context.read();
                let unit_type = env.unit_scope(self.unit.file_name())?.unit_type;
                self.context.type_facade(&env, unit_type)
            }
            kind if kind.is_type() => self
                .type_of(self.recorded_type(node))
                .or_else(|| self.recovered_type_for_type(node)),
            _ => None,
        }
    }

    fn resolve_package(&self, declaration: NodeIndex) -> Option<Arc<PackageBinding>> {
        if !matches!(self.kind(declaration)?, NodeKind::PackageDeclaration { .. }) {
            return None;
        }
        let package = {
            let env = self.context.read();
            self.context
                .package_facade(&env, self.recorded_binding(declaration))?
        };
        self.register(Binding::Package(package.clone()), declaration);
        Some(package)
    }

    fn resolve_constructor(&self, node: NodeIndex) -> Option<Arc<MethodBinding>> {
        match self.kind(node)? {
            NodeKind::ClassInstanceCreation { .. }
            | NodeKind::ConstructorInvocation { .. }
            | NodeKind::SuperConstructorInvocation { .. } => {
                self.method_of(self.recorded_binding(node))
            }
            _ => None,
        }
    }

    fn resolve_field(&self, access: NodeIndex) -> Option<Arc<VariableBinding>> {
        match self.kind(access)? {
            NodeKind::FieldAccess { .. } | NodeKind::SuperFieldAccess { .. } => {
                let env = self.context.read();
                self.context
                    .variable_facade(&env, self.recorded_binding(access), None)
            }
            _ => None,
        }
    }

    fn resolve_expression_type(&self, expression: NodeIndex) -> Option<Arc<TypeBinding>> {
        let kind = self.kind(expression)?;
        let ty = self.recorded_type(expression);
        if ty.is_some() {
            return self.type_of(ty);
        }
        if matches!(kind, NodeKind::ThisExpression) {
            let scope = self.scope_of(expression)?;
            return self.type_of(scope.enclosing_type);
        }
        None
    }

    fn resolve_boxing(&self, expression: NodeIndex) -> bool {
        self.has_conversion(expression, ImplicitConversion::BOXING)
    }

    fn resolve_unboxing(&self, expression: NodeIndex) -> bool {
        self.has_conversion(expression, ImplicitConversion::UNBOXING)
    }

    fn resolve_constant_expression_value(&self, expression: NodeIndex) -> Option<Constant> {
        if matches!(self.kind(expression)?, NodeKind::NullLiteral) {
            return None;
        }
        self.record(expression)?.constant.clone()
    }

    fn resolve_well_known_type(&self, name: &str) -> Option<Arc<TypeBinding>> {
        if !WELL_KNOWN_TYPES.contains(&name) {
            return None;
        }
        let id = self.context.write().well_known_type(name)?;
        self.type_of(id)
    }

    fn resolve_array_type(
        &self,
        element: &Arc<TypeBinding>,
        dimensions: i32,
    ) -> Result<Option<Arc<TypeBinding>>, ResolveError> {
        if element.is_recovered() {
            return Err(ResolveError::RecoveredArrayType);
        }
        let Some(id) = element.raw_id() else {
            return Ok(None);
        };
        if element.context().store_id() != self.context.store_id() {
            return Err(ResolveError::ForeignBinding);
        }
        let total = i64::from(element.dimensions()) + i64::from(dimensions);
        if total < 1 || total > i64::from(MAX_ARRAY_DIMENSIONS) {
            return Err(ResolveError::InvalidDimensions { dimensions: total });
        }
        array_of(&self.context, id, total)
    }

    fn recovered_type_for_declaration(&self, declaration: NodeIndex) -> Option<Arc<TypeBinding>> {
        if !self.context.recovery() || !self.kind(declaration)?.is_variable_declaration() {
            return None;
        }
        Some(
            self.context
                .recovered_for_declaration(&self.unit.tree, declaration),
        )
    }

    fn recovered_type_for_type(&self, ty: NodeIndex) -> Option<Arc<TypeBinding>> {
        if !self.context.recovery() || !self.kind(ty)?.is_type() {
            return None;
        }
        Some(self.context.recovered_for_type_node(&self.unit.tree, ty))
    }

    fn find_declaring_node(&self, binding: &Binding) -> Option<NodeIndex> {
        self.declaring_node_of(binding.raw_id()?)
    }

    fn find_declaring_node_for_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(binding) = self.registered.get(key) {
            return self.find_declaring_node(binding.value());
        }
        if let Some(binding) = self.context.registered(key) {
            return self.find_declaring_node(&binding);
        }
        let descriptor = KeyDescriptor::parse(key).ok()?;
        let id = self.context.write().binding_for_key(&descriptor)?;
        self.declaring_node_of(id)
    }

    fn create_bindings(&self, keys: &[&str]) -> Result<Vec<Option<Binding>>, ResolveError> {
        if !self.context.is_active() {
            return Err(ResolveError::NoActivePass);
        }
        let bindings: Vec<Option<Binding>> = keys
            .iter()
            .map(|key| self.context.binding_for_key_text(key))
            .collect();
        debug!(
            requested = keys.len(),
            found = bindings.iter().filter(|b| b.is_some()).count(),
            "created bindings"
        );
        Ok(bindings)
    }

    fn record_scope(&self, node: NodeIndex, scope: ScopeInfo) {
        self.scopes.insert(node, scope);
    }

    fn store(&self, node: NodeIndex, original: NodeIndex) {
        let original = self.original(original);
        trace!(node = node.0, original = original.0, "stored node copy");
        self.aliases.insert(node, original);
    }

    fn update_key(&self, old: NodeIndex, new: NodeIndex) {
        let original = self
            .aliases
            .remove(&old)
            .map_or(old, |(_, original)| original);
        self.aliases.insert(new, original);
    }
}

// =============================================================================
// ResolvedAst
// =============================================================================

/// A syntax tree together with the resolver that answers for its nodes.
#[derive(Clone)]
pub struct ResolvedAst {
    pub tree: Arc<SyntaxTree>,
    pub resolver: Arc<dyn BindingResolver>,
}

impl fmt::Debug for ResolvedAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAst")
            .field("file", &self.tree.file_name)
            .field("has_bindings", &self.has_bindings())
            .finish()
    }
}

impl ResolvedAst {
    pub fn new(tree: Arc<SyntaxTree>, resolver: Arc<dyn BindingResolver>) -> Self {
        ResolvedAst { tree, resolver }
    }

    /// A tree without bindings: every query answers "nothing".
    pub fn syntax_only(tree: Arc<SyntaxTree>) -> Self {
        ResolvedAst {
            tree,
            resolver: Arc::new(NullResolver),
        }
    }

    pub fn file_name(&self) -> &Arc<str> {
        &self.tree.file_name
    }

    pub fn has_bindings(&self) -> bool {
        self.tree.flags.contains(SyntaxFlags::RESOLVED_BINDINGS)
    }

    /// Bindings of every declaration in the tree, in source order.
    pub fn declarations(&self) -> Vec<(NodeIndex, Binding)> {
        let resolver = &self.resolver;
        self.tree
            .preorder()
            .into_iter()
            .filter_map(|node| {
                let binding = match self.tree.kind(node)? {
                    NodeKind::PackageDeclaration { .. } => {
                        resolver.resolve_package(node).map(Binding::Package)
                    }
                    NodeKind::TypeDeclaration { .. } => resolver.resolve_type(node).map(Binding::Type),
                    NodeKind::FunctionDeclaration { .. } => {
                        resolver.resolve_method(node).map(Binding::Method)
                    }
                    kind if kind.is_variable_declaration() => {
                        resolver.resolve_variable(node).map(Binding::Variable)
                    }
                    _ => None,
                }?;
                Some((node, binding))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../tests/default_resolver_tests.rs"]
mod default_resolver_tests;
