//! A parsed unit: arena, interner and root.

use crate::arena::NodeArena;
use crate::node::{NodeIndex, NodeKind};
use bitflags::bitflags;
use jsbind_common::{Atom, Interner};
use std::sync::Arc;

bitflags! {
    /// Facts about how a tree was produced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SyntaxFlags: u8 {
        /// The unit description could not be read; the tree is empty.
        const MALFORMED = 0x01;
        /// Function bodies were skipped by a diet parse and not materialized yet.
        const DIET = 0x02;
        /// A live binding resolver is attached to the tree.
        const RESOLVED_BINDINGS = 0x04;
        /// The live resolver may synthesize recovered bindings.
        const BINDINGS_RECOVERY = 0x08;
    }
}

#[derive(Clone, Debug)]
pub struct SyntaxTree {
    pub file_name: Arc<str>,
    pub arena: NodeArena,
    pub interner: Interner,
    pub root: NodeIndex,
    pub flags: SyntaxFlags,
}

impl SyntaxTree {
    /// An empty tree (a bare source file).
    pub fn empty(file_name: Arc<str>) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.add(
            NodeKind::SourceFile {
                package: NodeIndex::NONE,
                imports: Vec::new(),
                types: Vec::new(),
                statements: Vec::new(),
            },
            Default::default(),
        );
        SyntaxTree {
            file_name,
            arena,
            interner: Interner::new(),
            root,
            flags: SyntaxFlags::empty(),
        }
    }

    #[inline]
    pub fn kind(&self, index: NodeIndex) -> Option<&NodeKind> {
        self.arena.kind(index)
    }

    #[inline]
    pub fn parent(&self, index: NodeIndex) -> NodeIndex {
        self.arena.parent(index)
    }

    #[inline]
    pub fn text(&self, atom: Atom) -> &str {
        self.interner.resolve(atom)
    }

    /// Identifier of a `SimpleName`, or the last segment of a `QualifiedName`.
    pub fn identifier(&self, name: NodeIndex) -> Option<&str> {
        match self.kind(name)? {
            NodeKind::SimpleName { id, .. } => Some(self.text(*id)),
            NodeKind::QualifiedName { name, .. } => self.identifier(*name),
            _ => None,
        }
    }

    /// Segments of a name node, outermost qualifier first.
    pub fn name_segments(&self, name: NodeIndex) -> Vec<Arc<str>> {
        let mut segments = Vec::new();
        self.collect_segments(name, &mut segments);
        segments
    }

    fn collect_segments(&self, name: NodeIndex, out: &mut Vec<Arc<str>>) {
        match self.kind(name) {
            Some(NodeKind::SimpleName { id, .. }) => out.push(self.interner.resolve_shared(*id)),
            Some(NodeKind::QualifiedName {
                qualifier, name, ..
            }) => {
                self.collect_segments(*qualifier, out);
                self.collect_segments(*name, out);
            }
            _ => {}
        }
    }

    /// Outermost name containing `name` (itself when not qualified).
    pub fn outermost_name(&self, name: NodeIndex) -> NodeIndex {
        let mut current = name;
        loop {
            let parent = self.parent(current);
            match self.kind(parent) {
                Some(NodeKind::QualifiedName { .. }) => current = parent,
                _ => return current,
            }
        }
    }

    /// Declared type of a variable declaration.
    ///
    /// A fragment takes its type from the statement, expression or field
    /// declaration that owns it.
    pub fn declared_type(&self, declaration: NodeIndex) -> NodeIndex {
        match self.kind(declaration) {
            Some(NodeKind::SingleVariableDeclaration { ty, .. }) => *ty,
            Some(NodeKind::VariableDeclarationFragment { .. }) => {
                match self.kind(self.parent(declaration)) {
                    Some(NodeKind::VariableDeclarationStatement { ty, .. })
                    | Some(NodeKind::VariableDeclarationExpression { ty, .. })
                    | Some(NodeKind::FieldDeclaration { ty, .. }) => *ty,
                    _ => NodeIndex::NONE,
                }
            }
            _ => NodeIndex::NONE,
        }
    }

    /// Extra dimensions written after a declared variable name (`x[][]`).
    pub fn extra_dimensions(&self, declaration: NodeIndex) -> u32 {
        match self.kind(declaration) {
            Some(NodeKind::SingleVariableDeclaration {
                extra_dimensions, ..
            })
            | Some(NodeKind::VariableDeclarationFragment {
                extra_dimensions, ..
            }) => *extra_dimensions,
            _ => 0,
        }
    }

    /// Name node of a variable declaration.
    pub fn declaration_name(&self, declaration: NodeIndex) -> NodeIndex {
        match self.kind(declaration) {
            Some(NodeKind::SingleVariableDeclaration { name, .. })
            | Some(NodeKind::VariableDeclarationFragment { name, .. }) => *name,
            _ => NodeIndex::NONE,
        }
    }

    /// Array dimensions of a type node (0 when it is not an array type).
    pub fn type_dimensions(&self, ty: NodeIndex) -> u32 {
        match self.kind(ty) {
            Some(NodeKind::ArrayType { dimensions, .. }) => *dimensions,
            _ => 0,
        }
    }

    /// All nodes reachable from the root, preorder.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut out = Vec::with_capacity(self.arena.len());
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let Some(kind) = self.kind(index) else {
                continue;
            };
            out.push(index);
            let children = kind.children();
            stack.extend(children.iter().rev().copied());
        }
        out
    }
}
