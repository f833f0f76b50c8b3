//! Type bindings synthesized from syntax.
//!
//! When a declared type does not resolve, a recovered binding stands in for
//! it so editors still get a name, a key and array structure. A recovered
//! type is built from exactly one source:
//!
//! | source | dimensions |
//! |--------|------------|
//! | variable declaration | extra dimensions + dimensions of the declared array type |
//! | type node | dimensions of the node when it is an array type |
//! | raw binding | dimensions of the binding |
//! | inner recovered type + delta | inner dimensions + delta |
//!
//! Names come from the syntax only; nothing is looked up. Recovered types
//! carry no type arguments since the syntax tree has no generics.

use crate::context::PassContext;
use crate::type_binding::TypeBinding;
use jsbind_ast::{NodeIndex, NodeKind, SyntaxTree, type_text};
use jsbind_lookup::{BindingId, BindingStore, RawBinding, unique_key};
use std::sync::Arc;

pub const RECOVERED_KEY_PREFIX: &str = "Recovered#";

#[derive(Clone)]
pub(crate) enum RecoveredSource {
    Declaration {
        tree: Arc<SyntaxTree>,
        node: NodeIndex,
    },
    TypeNode {
        tree: Arc<SyntaxTree>,
        node: NodeIndex,
    },
    Binding(BindingId),
    Inner(Arc<TypeBinding>),
}

#[derive(Clone)]
pub struct RecoveredType {
    source: RecoveredSource,
    dimensions: u32,
}

impl RecoveredType {
    pub(crate) fn from_declaration(tree: &Arc<SyntaxTree>, declaration: NodeIndex) -> Self {
        let declared = tree.declared_type(declaration);
        RecoveredType {
            dimensions: tree.extra_dimensions(declaration) + tree.type_dimensions(declared),
            source: RecoveredSource::Declaration {
                tree: tree.clone(),
                node: declaration,
            },
        }
    }

    pub(crate) fn from_type_node(tree: &Arc<SyntaxTree>, ty: NodeIndex) -> Self {
        RecoveredType {
            dimensions: tree.type_dimensions(ty),
            source: RecoveredSource::TypeNode {
                tree: tree.clone(),
                node: ty,
            },
        }
    }

    pub(crate) fn from_binding(store: &BindingStore, id: BindingId) -> Self {
        RecoveredType {
            dimensions: store.dimensions(id),
            source: RecoveredSource::Binding(id),
        }
    }

    pub(crate) fn from_inner(inner: Arc<TypeBinding>, delta: i64) -> Self {
        let dimensions = (i64::from(inner.dimensions()) + delta).clamp(0, i64::from(u32::MAX));
        RecoveredType {
            dimensions: u32::try_from(dimensions).unwrap_or(0),
            source: RecoveredSource::Inner(inner),
        }
    }

    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }

    pub(crate) fn source(&self) -> &RecoveredSource {
        &self.source
    }

    /// The type node the binding was written as, if any.
    pub(crate) fn syntactic_type(&self) -> Option<(&Arc<SyntaxTree>, NodeIndex)> {
        match &self.source {
            RecoveredSource::TypeNode { tree, node } => Some((tree, *node)),
            RecoveredSource::Declaration { tree, node } => {
                tree.declared_type(*node).to_option().map(|ty| (tree, ty))
            }
            RecoveredSource::Binding(_) | RecoveredSource::Inner(_) => None,
        }
    }

    /// Name without the array brackets.
    pub(crate) fn internal_name(&self, context: &PassContext) -> String {
        match &self.source {
            RecoveredSource::Inner(inner) => match inner.recovered_repr() {
                Some(recovered) => recovered.internal_name(context),
                None => inner.name().trim_end_matches("[]").to_string(),
            },
            RecoveredSource::Binding(id) => leaf_name(&context.read().store, *id),
            RecoveredSource::Declaration { .. } | RecoveredSource::TypeNode { .. } => self
                .syntactic_type()
                .map(|(tree, ty)| type_node_name(tree, ty))
                .unwrap_or_default(),
        }
    }

    pub(crate) fn name(&self, context: &PassContext) -> String {
        let mut name = self.internal_name(context);
        for _ in 0..self.dimensions {
            name.push_str("[]");
        }
        name
    }

    /// Opaque, comparison-only key: the prefix, the first available source
    /// and the dimension count.
    pub(crate) fn key(&self, context: &PassContext) -> String {
        let mut key = String::from(RECOVERED_KEY_PREFIX);
        match (&self.source, self.syntactic_type()) {
            (RecoveredSource::Inner(inner), _) => {
                key.push_str("innerTypeBinding");
                key.push_str(inner.key());
            }
            (_, Some((tree, ty))) => {
                key.push_str("currentType");
                key.push_str(&type_text(tree, ty));
            }
            (RecoveredSource::Binding(id), None) => {
                key.push_str("referenceBinding");
                key.push_str(&unique_key(&context.read().store, *id));
            }
            (RecoveredSource::Declaration { tree, node }, None) => {
                key.push_str("variableDeclaration");
                if let Some(kind) = tree.kind(*node) {
                    key.push_str(kind.type_name());
                }
                if let Some(identifier) = tree.identifier(tree.declaration_name(*node)) {
                    key.push_str(identifier);
                }
                key.push_str(&tree.extra_dimensions(*node).to_string());
            }
            (RecoveredSource::TypeNode { .. }, None) => {}
        }
        key.push_str(&self.dimensions.to_string());
        key
    }
}

/// Last segment of the written type: arrays name their element, primitives
/// their keyword.
fn type_node_name(tree: &SyntaxTree, ty: NodeIndex) -> String {
    match tree.kind(ty) {
        Some(NodeKind::ArrayType { element, .. }) => type_node_name(tree, *element),
        Some(NodeKind::PrimitiveType { code }) => code.keyword().to_string(),
        Some(NodeKind::SimpleType { name } | NodeKind::QualifiedType { name, .. }) => {
            tree.identifier(*name).unwrap_or_default().to_string()
        }
        _ => String::new(),
    }
}

fn leaf_name(store: &BindingStore, id: BindingId) -> String {
    match store.get(store.leaf_component(id)) {
        Some(RawBinding::Reference(data)) => data
            .compound_name
            .last()
            .map(|segment| segment.to_string())
            .unwrap_or_default(),
        Some(RawBinding::Base(base)) => base.keyword().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
#[path = "../tests/recovered_tests.rs"]
mod recovered_tests;
