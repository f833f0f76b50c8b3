//! Per-unit analysis results.

use crate::raw::{BindingId, Constant};
use bitflags::bitflags;
use jsbind_ast::{NodeIndex, SyntaxTree};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

bitflags! {
    /// Implicit conversions applied to an expression where it is used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImplicitConversion: u8 {
        const BOXING = 0x01;
        const UNBOXING = 0x02;
    }
}

/// What the analyzer recorded for one syntax node.
#[derive(Debug, Clone, Default)]
pub struct CompilerNode {
    /// Binding the node declares or refers to.
    pub binding: BindingId,
    /// Static type of an expression, or the type a type node denotes.
    pub resolved_type: BindingId,
    pub constant: Option<Constant>,
    pub conversion: ImplicitConversion,
    /// The name denotes a type rather than a value.
    pub is_type_reference: bool,
    /// For the outermost node of a qualified name: the binding of every
    /// segment, first segment first.
    pub segment_bindings: SmallVec<[BindingId; 4]>,
}

impl CompilerNode {
    fn new() -> Self {
        CompilerNode {
            binding: BindingId::NONE,
            resolved_type: BindingId::NONE,
            ..Default::default()
        }
    }
}

/// The declaration context of a block or declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeInfo {
    pub enclosing_type: BindingId,
    pub method: BindingId,
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Built,
    Resolved,
    Aborted,
}

/// A unit as the analyzer sees it: the syntax tree plus everything recorded
/// about its nodes.
#[derive(Debug, Clone)]
pub struct CompilerUnit {
    pub tree: Arc<SyntaxTree>,
    pub state: UnitState,
    nodes: FxHashMap<NodeIndex, CompilerNode>,
    scopes: FxHashMap<NodeIndex, ScopeInfo>,
}

impl CompilerUnit {
    pub fn new(tree: Arc<SyntaxTree>) -> Self {
        CompilerUnit {
            tree,
            state: UnitState::Built,
            nodes: FxHashMap::default(),
            scopes: FxHashMap::default(),
        }
    }

    pub fn file_name(&self) -> &Arc<str> {
        &self.tree.file_name
    }

    pub fn node(&self, index: NodeIndex) -> Option<&CompilerNode> {
        self.nodes.get(&index)
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut CompilerNode {
        self.nodes.entry(index).or_insert_with(CompilerNode::new)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &CompilerNode)> {
        self.nodes.iter().map(|(index, node)| (*index, node))
    }

    /// Binding recorded for a node, `NONE` when there is none.
    pub fn binding(&self, index: NodeIndex) -> BindingId {
        self.nodes
            .get(&index)
            .map_or(BindingId::NONE, |node| node.binding)
    }

    pub fn resolved_type(&self, index: NodeIndex) -> BindingId {
        self.nodes
            .get(&index)
            .map_or(BindingId::NONE, |node| node.resolved_type)
    }

    pub fn scope(&self, index: NodeIndex) -> Option<ScopeInfo> {
        self.scopes.get(&index).copied()
    }

    pub fn scopes(&self) -> impl Iterator<Item = (NodeIndex, ScopeInfo)> + '_ {
        self.scopes.iter().map(|(index, scope)| (*index, *scope))
    }

    pub(crate) fn record_scope(&mut self, index: NodeIndex, scope: ScopeInfo) {
        self.scopes.insert(index, scope);
    }
}
