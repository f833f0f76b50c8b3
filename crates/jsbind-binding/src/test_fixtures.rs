//! Analyzed passes over JSON units, shared by the unit tests.

use crate::context::PassContext;
use crate::resolver::DefaultBindingResolver;
use jsbind_ast::{NodeIndex, NodeKind, SyntaxTree};
use jsbind_lookup::{Analyzer, CompilerUnit, LookupEnvironment, StandardLibrary};
use jsbind_parser::{Frontend, JsonFrontend, ParseMode};
use std::sync::Arc;

pub(crate) struct Pass {
    pub context: Arc<PassContext>,
    pub resolvers: Vec<Arc<DefaultBindingResolver>>,
}

impl Pass {
    pub fn resolver(&self, index: usize) -> &DefaultBindingResolver {
        &self.resolvers[index]
    }

    pub fn shared(&self, index: usize) -> Arc<DefaultBindingResolver> {
        self.resolvers[index].clone()
    }

    pub fn tree(&self, index: usize) -> &Arc<SyntaxTree> {
        self.resolvers[index].tree()
    }
}

/// Parse, register and analyze every unit, then open a pass over them.
pub(crate) fn resolve_units(sources: &[(&str, &str)], recovery: bool) -> Pass {
    let frontend = JsonFrontend::new();
    let trees: Vec<Arc<SyntaxTree>> = sources
        .iter()
        .map(|(name, contents)| Arc::new(frontend.parse(name, contents, ParseMode::Full).tree))
        .collect();
    let mut env = LookupEnvironment::new(Arc::new(StandardLibrary::new()));
    for tree in &trees {
        env.build_type_bindings(tree);
    }
    let refs: Vec<&SyntaxTree> = trees.iter().map(|t| &**t).collect();
    env.complete_type_bindings(&refs);

    let mut units = Vec::new();
    for tree in trees {
        let mut unit = CompilerUnit::new(tree);
        Analyzer::process(&mut env, &mut unit).expect("analysis succeeds");
        units.push(Arc::new(unit));
    }
    let context = PassContext::new(env, recovery);
    let resolvers = units
        .into_iter()
        .map(|unit| Arc::new(DefaultBindingResolver::new(context.clone(), unit)))
        .collect();
    Pass { context, resolvers }
}

pub(crate) fn resolve(source: &str) -> Pass {
    resolve_units(&[("Test.js", source)], true)
}

pub(crate) fn nodes(tree: &SyntaxTree, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeIndex> {
    tree.preorder()
        .into_iter()
        .filter(|index| tree.kind(*index).is_some_and(&pred))
        .collect()
}

/// First variable declaration declaring `name`.
pub(crate) fn declaration(tree: &SyntaxTree, name: &str) -> NodeIndex {
    nodes(tree, NodeKind::is_variable_declaration)
        .into_iter()
        .find(|node| tree.identifier(tree.declaration_name(*node)) == Some(name))
        .expect("declaration")
}

pub(crate) fn type_declaration(tree: &SyntaxTree, name: &str) -> NodeIndex {
    nodes(tree, |k| matches!(k, NodeKind::TypeDeclaration { .. }))
        .into_iter()
        .find(|node| match tree.kind(*node) {
            Some(NodeKind::TypeDeclaration { name: declared, .. }) => {
                tree.identifier(*declared) == Some(name)
            }
            _ => false,
        })
        .expect("type declaration")
}

/// Declared type node of the declaration of `name`.
pub(crate) fn declared_type(tree: &SyntaxTree, name: &str) -> NodeIndex {
    tree.declared_type(declaration(tree, name))
}
