//! Node arena.

use crate::node::{Node, NodeIndex, NodeKind};
use jsbind_common::Span;

/// Flat storage for the nodes of one syntax tree.
///
/// Adding a node links every child it names back to it, so parents are always
/// consistent with the payloads that were added.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        NodeArena {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Append a node and adopt its children.
    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        for child in kind.children() {
            if let Some(node) = self.nodes.get_mut(child.0 as usize) {
                node.parent = index;
            }
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: NodeIndex::NONE,
        });
        index
    }

    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        if index.is_none() {
            return None;
        }
        self.nodes.get(index.0 as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        if index.is_none() {
            return None;
        }
        self.nodes.get_mut(index.0 as usize)
    }

    #[inline]
    pub fn kind(&self, index: NodeIndex) -> Option<&NodeKind> {
        self.get(index).map(|node| &node.kind)
    }

    /// Parent of a node, `NONE` for the root or an unknown index.
    #[inline]
    pub fn parent(&self, index: NodeIndex) -> NodeIndex {
        self.get(index).map_or(NodeIndex::NONE, |node| node.parent)
    }

    /// Replace the payload of an existing node, re-linking the new children.
    pub fn replace(&mut self, index: NodeIndex, kind: NodeKind) -> bool {
        if self.get(index).is_none() {
            return false;
        }
        for child in kind.children() {
            if let Some(node) = self.nodes.get_mut(child.0 as usize) {
                node.parent = index;
            }
        }
        if let Some(node) = self.get_mut(index) {
            node.kind = kind;
        }
        true
    }

    /// Nearest ancestor (including `index` itself) accepted by `predicate`.
    pub fn find_ancestor(
        &self,
        index: NodeIndex,
        mut predicate: impl FnMut(&NodeKind) -> bool,
    ) -> Option<NodeIndex> {
        let mut current = index;
        let mut steps = 0usize;
        while let Some(node) = self.get(current) {
            if predicate(&node.kind) {
                return Some(current);
            }
            current = node.parent;
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
        }
        None
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i as u32), node))
    }
}

#[cfg(test)]
#[path = "../tests/arena_tests.rs"]
mod arena_tests;
