use super::*;
use crate::builder::TreeBuilder;

#[test]
fn test_type_text_round_trips_builder_input() {
    let mut builder = TreeBuilder::new("a.js");
    let simple = builder.type_from_text("Foo");
    let qualified = builder.type_from_text("a.b.Foo");
    let array = builder.type_from_text("Foo[][]");
    let primitive = builder.type_from_text("int[]");
    let tree = builder.finish(NodeIndex::NONE, vec![], vec![], vec![]);
    assert_eq!(type_text(&tree, simple), "Foo");
    assert_eq!(type_text(&tree, qualified), "a.b.Foo");
    assert_eq!(type_text(&tree, array), "Foo[][]");
    assert_eq!(type_text(&tree, primitive), "int[]");
    assert_eq!(tree.type_dimensions(array), 2);
}

#[test]
fn test_qualified_type_text() {
    let mut builder = TreeBuilder::new("a.js");
    let outer = builder.type_from_text("Outer");
    let inner = builder.qualified_type(outer, "Inner");
    let tree = builder.finish(NodeIndex::NONE, vec![], vec![], vec![]);
    assert_eq!(type_text(&tree, inner), "Outer.Inner");
}

#[test]
fn test_name_indices_and_segments() {
    let mut builder = TreeBuilder::new("a.js");
    let name = builder.name("a.b.c");
    let tree = builder.finish(NodeIndex::NONE, vec![], vec![], vec![]);
    assert_eq!(name_text(&tree, name), "a.b.c");
    assert_eq!(tree.kind(name).map(|k| k.name_index()), Some(3));
    let segments: Vec<String> = tree.name_segments(name).iter().map(|s| s.to_string()).collect();
    assert_eq!(segments, vec!["a", "b", "c"]);
    assert_eq!(tree.identifier(name), Some("c"));
}

#[test]
fn test_declared_type_of_fragment_comes_from_statement() {
    let mut builder = TreeBuilder::new("a.js");
    let stmt = builder.variable_statement("Foo", "x", 2, NodeIndex::NONE);
    let tree = builder.finish(NodeIndex::NONE, vec![], vec![], vec![stmt]);
    let fragment = match tree.kind(stmt) {
        Some(NodeKind::VariableDeclarationStatement { fragments, .. }) => fragments[0],
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(type_text(&tree, tree.declared_type(fragment)), "Foo");
    assert_eq!(tree.extra_dimensions(fragment), 2);
    assert_eq!(tree.identifier(tree.declaration_name(fragment)), Some("x"));
}
