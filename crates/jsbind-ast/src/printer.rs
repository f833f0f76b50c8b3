//! Source-like text for names and types.

use crate::node::{NodeIndex, NodeKind};
use crate::tree::SyntaxTree;

/// Dotted text of a name node.
pub fn name_text(tree: &SyntaxTree, name: NodeIndex) -> String {
    let mut out = String::new();
    write_name(tree, name, &mut out);
    out
}

fn write_name(tree: &SyntaxTree, name: NodeIndex, out: &mut String) {
    match tree.kind(name) {
        Some(NodeKind::SimpleName { id, .. }) => out.push_str(tree.text(*id)),
        Some(NodeKind::QualifiedName {
            qualifier, name, ..
        }) => {
            write_name(tree, *qualifier, out);
            out.push('.');
            write_name(tree, *name, out);
        }
        _ => {}
    }
}

/// Text of a type node, e.g. `a.b.Foo[][]`. Empty for non-type nodes.
pub fn type_text(tree: &SyntaxTree, ty: NodeIndex) -> String {
    let mut out = String::new();
    write_type(tree, ty, &mut out);
    out
}

fn write_type(tree: &SyntaxTree, ty: NodeIndex, out: &mut String) {
    match tree.kind(ty) {
        Some(NodeKind::PrimitiveType { code }) => out.push_str(code.keyword()),
        Some(NodeKind::SimpleType { name }) => write_name(tree, *name, out),
        Some(NodeKind::QualifiedType { qualifier, name }) => {
            write_type(tree, *qualifier, out);
            out.push('.');
            write_name(tree, *name, out);
        }
        Some(NodeKind::ArrayType {
            element,
            dimensions,
        }) => {
            write_type(tree, *element, out);
            for _ in 0..*dimensions {
                out.push_str("[]");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "../tests/printer_tests.rs"]
mod printer_tests;
