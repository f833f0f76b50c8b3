//! Semantic analyzer.
//!
//! The analyzer walks one unit after the environment has built and completed
//! its type bindings. It resolves every type node, name, member access and
//! expression of the unit and records the results in the unit's
//! [`CompilerUnit`], where the binding resolver picks them up.
//!
//! Types are processed in declaration order, and each type's signatures are
//! resolved right before its members are analyzed. When analysis stops early
//! the types not reached yet keep their `UNRESOLVED` bits, which is what
//! [`LookupEnvironment::scrub_unit`] looks for.
//!
//! The analyzer is split across files like a state machine:
//! - `mod.rs`: declarations and statements
//! - `expressions.rs`: expression typing, constants and implicit conversions
//! - `names.rs`: names, member lookup and problem bindings

mod expressions;
mod names;
mod unit;

pub use unit::{CompilerNode, CompilerUnit, ImplicitConversion, ScopeInfo, UnitState};

use crate::environment::{LookupEnvironment, TypeRef};
use crate::error::AnalyzerError;
use crate::raw::{BindingId, LocalData, RawBinding};
use jsbind_ast::{NodeIndex, NodeKind, SyntaxTree};
use jsbind_common::Modifiers;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, debug_span, trace};

/// Where the analyzer currently is.
#[derive(Clone, Copy, Debug)]
struct Context {
    enclosing_type: BindingId,
    method: BindingId,
    is_static: bool,
}

pub struct Analyzer<'a> {
    env: &'a mut LookupEnvironment,
    unit: &'a mut CompilerUnit,
    tree: Arc<SyntaxTree>,
    file_name: Arc<str>,
    unit_type: BindingId,
    context: Context,
    /// Innermost block last.
    locals: Vec<FxHashMap<Arc<str>, BindingId>>,
    /// Locals declared outside any method, numbered per unit.
    loose_locals: u32,
    depth: u32,
}

impl<'a> Analyzer<'a> {
    /// Resolve everything in `unit`. The unit must have been registered with
    /// `env` through `build_type_bindings` and `complete_type_bindings`.
    pub fn process(
        env: &'a mut LookupEnvironment,
        unit: &'a mut CompilerUnit,
    ) -> Result<(), AnalyzerError> {
        let tree = unit.tree.clone();
        let file_name = tree.file_name.clone();
        let _span = debug_span!("analyze", file = %file_name).entered();

        let Some(scope) = env.unit_scope(&file_name) else {
            return Err(AnalyzerError::Internal {
                file_name,
                message: "unit is not registered with the lookup environment".to_string(),
            });
        };
        if scope.released {
            return Err(AnalyzerError::Internal {
                file_name,
                message: "unit was released before it was resolved".to_string(),
            });
        }
        let unit_type = scope.unit_type;
        let mut declarations: Vec<(NodeIndex, BindingId)> = scope
            .declarations
            .iter()
            .map(|(node, binding)| (*node, *binding))
            .collect();
        declarations.sort_unstable();
        let package = scope.package;

        if env.object_type().is_none() {
            unit.state = UnitState::Aborted;
            return Err(AnalyzerError::Abort {
                file_name,
                missing: "Object".to_string(),
            });
        }

        let mut analyzer = Analyzer {
            env,
            unit,
            tree,
            file_name,
            unit_type,
            context: Context {
                enclosing_type: unit_type,
                method: BindingId::NONE,
                is_static: false,
            },
            locals: Vec::new(),
            loose_locals: 0,
            depth: 0,
        };
        let result = analyzer.run(&declarations, package);
        let state = if result.is_ok() {
            UnitState::Resolved
        } else {
            UnitState::Aborted
        };
        analyzer.unit.state = state;
        debug!(?state, "unit analyzed");
        result
    }

    fn internal(&self, message: String) -> AnalyzerError {
        AnalyzerError::Internal {
            file_name: self.file_name.clone(),
            message,
        }
    }

    /// Payload of a child node. `NONE` is an absent child; an index that
    /// points outside the arena is an inconsistent tree.
    fn kind(&self, index: NodeIndex) -> Result<Option<NodeKind>, AnalyzerError> {
        if index.is_none() {
            return Ok(None);
        }
        match self.tree.kind(index) {
            Some(kind) => Ok(Some(kind.clone())),
            None => Err(self.internal(format!("node {} does not exist", index.0))),
        }
    }

    fn scope_info(&self) -> ScopeInfo {
        ScopeInfo {
            enclosing_type: self.context.enclosing_type,
            method: self.context.method,
            is_static: self.context.is_static,
        }
    }

    fn record(&mut self, node: NodeIndex, binding: BindingId, resolved_type: BindingId) {
        if node.is_none() {
            return;
        }
        let record = self.unit.node_mut(node);
        record.binding = binding;
        record.resolved_type = resolved_type;
    }

    // =========================================================================
    // Unit and type declarations
    // =========================================================================

    fn run(
        &mut self,
        declarations: &[(NodeIndex, BindingId)],
        package: BindingId,
    ) -> Result<(), AnalyzerError> {
        let root = self.tree.root;
        let Some(NodeKind::SourceFile {
            package: package_node,
            imports,
            types,
            statements,
        }) = self.kind(root)?
        else {
            return Err(self.internal("root is not a source file".to_string()));
        };

        for (node, binding) in declarations {
            self.unit.node_mut(*node).binding = *binding;
        }
        if let Some(NodeKind::PackageDeclaration { name }) = self.kind(package_node)? {
            self.record(package_node, package, BindingId::NONE);
            self.record(name, package, BindingId::NONE);
        }
        for import in imports {
            let Some(NodeKind::ImportDeclaration { name, .. }) = self.kind(import)? else {
                continue;
            };
            let binding = self.unit.binding(import);
            if let Some(RawBinding::Import(data)) = self.env.store.get(binding) {
                let resolved = data.resolved;
                self.record(name, resolved, BindingId::NONE);
            }
        }

        self.unit.record_scope(root, self.scope_info());
        for decl in types {
            self.type_declaration(decl)?;
        }

        self.env.resolve_types_for(self.unit_type);
        self.context = Context {
            enclosing_type: self.unit_type,
            method: BindingId::NONE,
            is_static: false,
        };
        for statement in statements {
            self.unit_statement(statement)?;
        }
        Ok(())
    }

    fn type_declaration(&mut self, decl: NodeIndex) -> Result<(), AnalyzerError> {
        let ty = self.unit.binding(decl);
        let Some(NodeKind::TypeDeclaration {
            name,
            superclass,
            doc,
            body,
            ..
        }) = self.kind(decl)?
        else {
            return Ok(());
        };
        if ty.is_none() {
            trace!(node = decl.0, "type declaration without binding");
            return Ok(());
        }
        self.env.resolve_types_for(ty);
        self.record(name, ty, ty);
        self.unit.node_mut(name).is_type_reference = true;
        self.unit.node_mut(decl).resolved_type = ty;

        let previous = self.context;
        let outer = self
            .env
            .store
            .reference(ty)
            .map_or(BindingId::NONE, |data| data.enclosing);
        self.context.enclosing_type = if outer.is_some() { outer } else { self.unit_type };
        self.resolve_type_node(superclass)?;

        self.context = Context {
            enclosing_type: ty,
            method: BindingId::NONE,
            is_static: false,
        };
        self.unit.record_scope(decl, self.scope_info());
        self.doc(doc)?;
        for member in body {
            match self.kind(member)? {
                Some(NodeKind::FieldDeclaration {
                    modifiers,
                    ty: declared,
                    fragments,
                }) => {
                    self.resolve_type_node(declared)?;
                    for fragment in fragments {
                        self.field_fragment(fragment, modifiers)?;
                    }
                }
                Some(NodeKind::FunctionDeclaration { .. }) => self.function(member)?,
                Some(NodeKind::TypeDeclaration { .. }) => self.type_declaration(member)?,
                _ => {}
            }
        }
        self.context = previous;
        Ok(())
    }

    fn field_fragment(&mut self, fragment: NodeIndex, modifiers: Modifiers) -> Result<(), AnalyzerError> {
        let field = self.unit.binding(fragment);
        let Some(NodeKind::VariableDeclarationFragment {
            name, initializer, ..
        }) = self.kind(fragment)?
        else {
            return Ok(());
        };
        let field_type = self.env.store.variable_type(field);
        self.record(name, field, field_type);
        self.unit.node_mut(fragment).resolved_type = field_type;
        if initializer.is_none() {
            return Ok(());
        }

        let previous = self.context;
        self.context.is_static = modifiers.contains(Modifiers::STATIC);
        self.expression(initializer)?;
        self.convert(initializer, field_type);
        self.context = previous;

        if modifiers.contains(Modifiers::FINAL)
            && let Some(folded) = self.constant_of(initializer)
            && let Some(data) = self.env.store.field_mut(field)
            && data.constant.is_none()
        {
            data.constant = Some(folded);
        }
        Ok(())
    }

    fn function(&mut self, decl: NodeIndex) -> Result<(), AnalyzerError> {
        let method = self.unit.binding(decl);
        let Some(NodeKind::FunctionDeclaration {
            modifiers,
            name,
            return_type,
            parameters,
            doc,
            body,
            ..
        }) = self.kind(decl)?
        else {
            return Ok(());
        };
        if method.is_none() {
            return Ok(());
        }
        let (declaring_class, return_binding, parameter_types) = match self.env.store.method(method) {
            Some(data) => (data.declaring_class, data.return_type, data.parameters.clone()),
            None => return Err(self.internal(format!("node {} is not bound to a method", decl.0))),
        };
        self.record(name, method, return_binding);
        self.resolve_type_node(return_type)?;

        let previous = self.context;
        self.context = Context {
            enclosing_type: declaring_class,
            method,
            is_static: modifiers.contains(Modifiers::STATIC),
        };
        self.unit.record_scope(decl, self.scope_info());
        self.doc(doc)?;

        self.locals.push(FxHashMap::default());
        for (i, param) in parameters.into_iter().enumerate() {
            let Some(NodeKind::SingleVariableDeclaration { ty, name, .. }) = self.kind(param)? else {
                continue;
            };
            self.resolve_type_node(ty)?;
            let declared = parameter_types.get(i).copied().unwrap_or(BindingId::NONE);
            let local_type = if self.env.is_problem_type(self.env.store.leaf_component(declared)) {
                BindingId::NONE
            } else {
                declared
            };
            self.declare_local(param, name, local_type, Modifiers::empty(), true, None);
        }
        if body.is_some() {
            self.statement(body)?;
        }
        self.locals.pop();
        self.context = previous;
        Ok(())
    }

    fn declare_local(
        &mut self,
        declaration: NodeIndex,
        name: NodeIndex,
        ty: BindingId,
        modifiers: Modifiers,
        is_parameter: bool,
        constant: Option<crate::raw::Constant>,
    ) -> BindingId {
        let Some(identifier) = self.tree.identifier(name).map(Arc::<str>::from) else {
            return BindingId::NONE;
        };
        let id = match self.env.store.method(self.context.method) {
            Some(method) => method.locals.len() as u32,
            None => {
                self.loose_locals += 1;
                self.loose_locals - 1
            }
        };
        let local = self.env.store.alloc(RawBinding::Variable(LocalData {
            name: identifier.clone(),
            ty,
            modifiers,
            id,
            declaring_method: self.context.method,
            is_parameter,
            constant,
        }));
        if let Some(method) = self.env.store.method_mut(self.context.method) {
            method.locals.push(local);
        }
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(identifier, local);
        }
        self.record(declaration, local, ty);
        self.record(name, local, ty);
        local
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Top-level statement: functions and variables belong to the unit type.
    fn unit_statement(&mut self, statement: NodeIndex) -> Result<(), AnalyzerError> {
        match self.kind(statement)? {
            Some(NodeKind::FunctionDeclaration { .. }) => self.function(statement),
            Some(NodeKind::VariableDeclarationStatement {
                modifiers,
                ty,
                fragments,
            }) => {
                self.resolve_type_node(ty)?;
                for fragment in fragments {
                    self.field_fragment(fragment, modifiers)?;
                }
                Ok(())
            }
            Some(NodeKind::Block { statements }) => {
                self.unit.record_scope(statement, self.scope_info());
                for inner in statements {
                    self.unit_statement(inner)?;
                }
                Ok(())
            }
            Some(_) => self.statement(statement),
            None => Ok(()),
        }
    }

    fn statement(&mut self, statement: NodeIndex) -> Result<(), AnalyzerError> {
        match self.kind(statement)? {
            Some(NodeKind::Block { statements }) => {
                self.unit.record_scope(statement, self.scope_info());
                self.locals.push(FxHashMap::default());
                for inner in statements {
                    self.statement(inner)?;
                }
                self.locals.pop();
            }
            Some(NodeKind::VariableDeclarationStatement {
                modifiers,
                ty,
                fragments,
            }) => {
                self.resolve_type_node(ty)?;
                for fragment in fragments {
                    self.local_fragment(fragment, ty, modifiers)?;
                }
            }
            Some(NodeKind::ExpressionStatement { expression }) => {
                self.expression(expression)?;
            }
            Some(NodeKind::ReturnStatement { expression }) => {
                if expression.is_some() {
                    self.expression(expression)?;
                    let expected = self
                        .env
                        .store
                        .method(self.context.method)
                        .map_or(BindingId::NONE, |data| data.return_type);
                    self.convert(expression, expected);
                }
            }
            Some(NodeKind::FunctionDeclaration { .. }) => self.function(statement)?,
            Some(other) => trace!(kind = other.type_name(), "statement ignored"),
            None => {}
        }
        Ok(())
    }

    fn local_fragment(
        &mut self,
        fragment: NodeIndex,
        declared: NodeIndex,
        modifiers: Modifiers,
    ) -> Result<(), AnalyzerError> {
        let Some(NodeKind::VariableDeclarationFragment {
            name,
            extra_dimensions,
            initializer,
        }) = self.kind(fragment)?
        else {
            return Ok(());
        };
        let type_ref = TypeRef::from_node(&self.tree, declared, extra_dimensions);
        let file = self.file_name.clone();
        let mut ty =
            self.env
                .resolve_variable_type(Some(&*file), self.context.enclosing_type, &type_ref);

        let mut constant = None;
        if initializer.is_some() {
            let init_type = self.expression(initializer)?;
            if type_ref == TypeRef::Untyped && self.is_value_type(init_type) {
                ty = init_type;
            }
            self.convert(initializer, ty);
            if modifiers.contains(Modifiers::FINAL) {
                constant = self.constant_of(initializer);
            }
        }
        self.declare_local(fragment, name, ty, modifiers, false, constant);
        Ok(())
    }

    /// A type a variable can take from its initializer.
    fn is_value_type(&self, ty: BindingId) -> bool {
        match self.env.store.get(ty) {
            Some(RawBinding::Base(base)) => !base.is_nullish() && *base != crate::raw::BaseType::Void,
            Some(RawBinding::Reference(data)) => data.is_valid(),
            Some(RawBinding::Array(_)) => true,
            _ => false,
        }
    }

    // =========================================================================
    // Type nodes and doc comments
    // =========================================================================

    /// Resolve a type node and record the type on it and on its names.
    fn resolve_type_node(&mut self, node: NodeIndex) -> Result<BindingId, AnalyzerError> {
        let Some(kind) = self.kind(node)? else {
            return Ok(BindingId::NONE);
        };
        if !kind.is_type() {
            return Ok(BindingId::NONE);
        }
        let type_ref = TypeRef::from_node(&self.tree, node, 0);
        let file = self.file_name.clone();
        let resolved = self
            .env
            .resolve_type_ref(Some(&*file), self.context.enclosing_type, &type_ref);
        self.record(node, resolved, resolved);
        self.unit.node_mut(node).is_type_reference = true;

        let leaf = self.env.store.leaf_component(resolved);
        match kind {
            NodeKind::ArrayType { element, .. } => {
                self.kind(element)?;
                self.record(element, leaf, leaf);
                self.record_type_names(element, leaf)?;
            }
            _ => self.record_type_names(node, leaf)?,
        }
        Ok(resolved)
    }

    fn record_type_names(&mut self, node: NodeIndex, ty: BindingId) -> Result<(), AnalyzerError> {
        match self.kind(node)? {
            Some(NodeKind::SimpleType { name }) => {
                self.record(name, ty, ty);
                self.unit.node_mut(name).is_type_reference = true;
            }
            Some(NodeKind::QualifiedType { qualifier, name }) => {
                self.record(name, ty, ty);
                self.unit.node_mut(name).is_type_reference = true;
                self.resolve_type_node(qualifier)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn doc(&mut self, doc: NodeIndex) -> Result<(), AnalyzerError> {
        let Some(NodeKind::JsDoc { tags }) = self.kind(doc)? else {
            return Ok(());
        };
        for tag in tags {
            match self.kind(tag)? {
                Some(NodeKind::MemberRef { qualifier, name }) => {
                    let target = self.doc_target(qualifier)?;
                    let Some(member) = self.tree.identifier(name).map(str::to_string) else {
                        continue;
                    };
                    let binding = self.doc_member(target, &member);
                    let ty = self.env.store.variable_type(binding);
                    self.record(tag, binding, ty);
                    self.record(name, binding, ty);
                }
                Some(NodeKind::FunctionRef {
                    qualifier,
                    name,
                    parameters,
                }) => {
                    let target = self.doc_target(qualifier)?;
                    let mut wanted = Vec::with_capacity(parameters.len());
                    for param in parameters {
                        wanted.push(self.resolve_type_node(param)?);
                    }
                    let Some(member) = self.tree.identifier(name).map(str::to_string) else {
                        continue;
                    };
                    let binding = self.doc_function(target, &member, &wanted);
                    self.record(tag, binding, BindingId::NONE);
                    self.record(name, binding, BindingId::NONE);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn doc_target(&mut self, qualifier: NodeIndex) -> Result<BindingId, AnalyzerError> {
        if qualifier.is_none() {
            return Ok(self.context.enclosing_type);
        }
        self.kind(qualifier)?;
        let segments = self.tree.name_segments(qualifier);
        let refs: Vec<&str> = segments.iter().map(|s| &**s).collect();
        let file = self.file_name.clone();
        let target = match self
            .env
            .lookup_type(Some(&*file), self.context.enclosing_type, &refs)
        {
            Some(ty) => ty,
            None => self.env.missing_type(&refs),
        };
        self.record(qualifier, target, target);
        self.unit.node_mut(qualifier).is_type_reference = true;
        Ok(target)
    }

    fn doc_member(&mut self, target: BindingId, member: &str) -> BindingId {
        if !self.env.store.reference(target).is_some_and(|data| data.is_valid()) {
            return BindingId::NONE;
        }
        if let Some(field) = self.env.find_field(target, member) {
            return field;
        }
        if let Some(method) = self.env.find_methods(target, member).first() {
            return *method;
        }
        self.env.find_member_type(target, member).unwrap_or(BindingId::NONE)
    }

    fn doc_function(&mut self, target: BindingId, member: &str, wanted: &[BindingId]) -> BindingId {
        let Some(data) = self.env.store.reference(target) else {
            return BindingId::NONE;
        };
        if !data.is_valid() {
            return BindingId::NONE;
        }
        let selector = if *data.source_name == *member {
            crate::raw::MethodData::CONSTRUCTOR_SELECTOR
        } else {
            member
        };
        let candidates = self.env.find_methods(target, selector);
        candidates
            .iter()
            .copied()
            .find(|method| {
                self.env
                    .store
                    .method(*method)
                    .is_some_and(|data| data.parameters.as_slice() == wanted)
            })
            .or_else(|| candidates.first().copied())
            .unwrap_or(BindingId::NONE)
    }
}
