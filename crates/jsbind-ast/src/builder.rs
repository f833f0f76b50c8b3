//! Convenience construction of syntax trees.
//!
//! Used by the front end and by tests. Names and type texts are split on `.`
//! and expanded into nested name and type nodes with their segment indices.

use crate::arena::NodeArena;
use crate::node::{NodeIndex, NodeKind, PrimitiveCode};
use crate::tree::{SyntaxFlags, SyntaxTree};
use jsbind_common::{Interner, Modifiers, Span};
use std::sync::Arc;

pub struct TreeBuilder {
    file_name: Arc<str>,
    arena: NodeArena,
    interner: Interner,
}

impl TreeBuilder {
    pub fn new(file_name: impl Into<Arc<str>>) -> Self {
        let mut interner = Interner::new();
        interner.intern_common();
        TreeBuilder {
            file_name: file_name.into(),
            arena: NodeArena::with_capacity(64),
            interner,
        }
    }

    pub fn file_name(&self) -> &Arc<str> {
        &self.file_name
    }

    #[inline]
    pub fn add(&mut self, kind: NodeKind) -> NodeIndex {
        self.arena.add(kind, Span::EMPTY)
    }

    #[inline]
    pub fn add_spanned(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        self.arena.add(kind, span)
    }

    /// Access to already added nodes (the front end patches payloads).
    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    // ------------------------------------------------------------------------
    // Names and types
    // ------------------------------------------------------------------------

    pub fn simple_name(&mut self, identifier: &str) -> NodeIndex {
        let id = self.interner.intern(identifier);
        self.add(NodeKind::SimpleName { id, index: 1 })
    }

    /// `a.b.c` becomes `QualifiedName(QualifiedName(a, b), c)`.
    pub fn name(&mut self, dotted: &str) -> NodeIndex {
        let mut current = NodeIndex::NONE;
        for (i, segment) in dotted.split('.').filter(|s| !s.is_empty()).enumerate() {
            let index = i as u32 + 1;
            let id = self.interner.intern(segment);
            let simple = self.add(NodeKind::SimpleName { id, index });
            current = if current.is_none() {
                simple
            } else {
                self.add(NodeKind::QualifiedName {
                    qualifier: current,
                    name: simple,
                    index,
                })
            };
        }
        if current.is_none() {
            current = self.simple_name("");
        }
        current
    }

    /// Parse a type text such as `int`, `Foo`, `a.b.Foo` or `Foo[][]`.
    pub fn type_from_text(&mut self, text: &str) -> NodeIndex {
        let text = text.trim();
        let mut base = text;
        let mut dimensions = 0u32;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dimensions += 1;
        }
        let element = match PrimitiveCode::from_keyword(base) {
            Some(code) => self.add(NodeKind::PrimitiveType { code }),
            None => {
                let name = self.name(base);
                self.add(NodeKind::SimpleType { name })
            }
        };
        if dimensions == 0 {
            element
        } else {
            self.add(NodeKind::ArrayType {
                element,
                dimensions,
            })
        }
    }

    /// `Outer.Inner` written as a qualified type over an existing type node.
    pub fn qualified_type(&mut self, qualifier: NodeIndex, identifier: &str) -> NodeIndex {
        let name = self.simple_name(identifier);
        self.add(NodeKind::QualifiedType { qualifier, name })
    }

    /// Wrap `element` into an array type of `dimensions`.
    pub fn array_type(&mut self, element: NodeIndex, dimensions: u32) -> NodeIndex {
        self.add(NodeKind::ArrayType {
            element,
            dimensions,
        })
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    pub fn fragment(&mut self, name: &str, extra_dimensions: u32, initializer: NodeIndex) -> NodeIndex {
        let name = self.simple_name(name);
        self.add(NodeKind::VariableDeclarationFragment {
            name,
            extra_dimensions,
            initializer,
        })
    }

    pub fn single_variable(
        &mut self,
        type_text: &str,
        name: &str,
        extra_dimensions: u32,
    ) -> NodeIndex {
        let ty = self.type_from_text(type_text);
        let name = self.simple_name(name);
        self.add(NodeKind::SingleVariableDeclaration {
            ty,
            name,
            extra_dimensions,
            initializer: NodeIndex::NONE,
        })
    }

    /// `type_text name[]... = initializer;` as a statement with one fragment.
    pub fn variable_statement(
        &mut self,
        type_text: &str,
        name: &str,
        extra_dimensions: u32,
        initializer: NodeIndex,
    ) -> NodeIndex {
        let ty = self.type_from_text(type_text);
        let fragment = self.fragment(name, extra_dimensions, initializer);
        self.add(NodeKind::VariableDeclarationStatement {
            modifiers: Modifiers::empty(),
            ty,
            fragments: vec![fragment],
        })
    }

    pub fn field(
        &mut self,
        modifiers: Modifiers,
        type_text: &str,
        name: &str,
        initializer: NodeIndex,
    ) -> NodeIndex {
        let ty = self.type_from_text(type_text);
        let fragment = self.fragment(name, 0, initializer);
        self.add(NodeKind::FieldDeclaration {
            modifiers,
            ty,
            fragments: vec![fragment],
        })
    }

    pub fn block(&mut self, statements: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Block { statements })
    }

    pub fn expression_statement(&mut self, expression: NodeIndex) -> NodeIndex {
        self.add(NodeKind::ExpressionStatement { expression })
    }

    /// Continue adding nodes to an existing tree (deferred body parsing).
    pub fn resume(tree: SyntaxTree) -> (Self, NodeIndex, SyntaxFlags) {
        let builder = TreeBuilder {
            file_name: tree.file_name,
            arena: tree.arena,
            interner: tree.interner,
        };
        (builder, tree.root, tree.flags)
    }

    /// Close a resumed builder back into a tree.
    pub fn finish_with_root(self, root: NodeIndex, flags: SyntaxFlags) -> SyntaxTree {
        SyntaxTree {
            file_name: self.file_name,
            arena: self.arena,
            interner: self.interner,
            root,
            flags,
        }
    }

    /// Finish into a tree rooted at a new `SourceFile`.
    pub fn finish(
        mut self,
        package: NodeIndex,
        imports: Vec<NodeIndex>,
        types: Vec<NodeIndex>,
        statements: Vec<NodeIndex>,
    ) -> SyntaxTree {
        let root = self.add(NodeKind::SourceFile {
            package,
            imports,
            types,
            statements,
        });
        SyntaxTree {
            file_name: self.file_name,
            arena: self.arena,
            interner: self.interner,
            root,
            flags: SyntaxFlags::empty(),
        }
    }
}
