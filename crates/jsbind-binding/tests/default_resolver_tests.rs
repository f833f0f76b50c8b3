use super::*;
use crate::binding::BindingKind;
use crate::test_fixtures::{Pass, declaration, nodes, resolve_units, type_declaration};

const SHOP: &str = r#"{
    "package": "shop",
    "types": [{
        "name": "Item",
        "fields": [
            { "name": "price", "type": "int" },
            { "name": "LIMIT", "type": "int", "modifiers": ["static", "final"],
              "init": { "kind": "number", "value": "10" } }
        ],
        "methods": [
            { "name": "itself", "returnType": "Item",
              "body": [{ "kind": "return", "expr": { "kind": "this" } }] },
            { "name": "values", "returnType": "int", "body": [
                { "kind": "var", "type": "int", "name": "one", "init": { "kind": "number", "value": "1" } },
                { "kind": "var", "type": "int", "name": "two", "init": { "kind": "number", "value": "2" } },
                { "kind": "var", "type": "int", "name": "three", "init": { "kind": "number", "value": "3" } },
                { "kind": "var", "name": "nothing", "init": { "kind": "null" } },
                { "kind": "var", "type": "Foo", "name": "lost" },
                { "kind": "var", "type": "Foo", "name": "grid", "dims": 2 },
                { "kind": "return", "expr": { "kind": "name", "name": "one" } }
            ] }
        ]
    }]
}"#;

fn shop() -> Pass {
    resolve_units(&[("Shop.js", SHOP)], true)
}

fn initializer(tree: &SyntaxTree, name: &str) -> NodeIndex {
    match tree.kind(declaration(tree, name)) {
        Some(NodeKind::VariableDeclarationFragment { initializer, .. }) => *initializer,
        _ => NodeIndex::NONE,
    }
}

// =============================================================================
// Recovery
// =============================================================================

#[test]
fn test_unresolved_local_gets_a_recovered_type() {
    let pass = shop();
    let resolver = pass.resolver(0);
    let lost = resolver
        .resolve_variable(declaration(pass.tree(0), "lost"))
        .expect("lost is still a variable");
    assert!(lost.is_recovered());
    assert_eq!(lost.name(), "lost");

    let ty = lost.ty().expect("recovered type");
    assert!(ty.is_recovered());
    assert_eq!(ty.name(), "Foo");
    let object = resolver.resolve_well_known_type("Object").expect("Object");
    assert!(ty.is_assignment_compatible(&object));

    let by_name = resolver
        .resolve_name(pass.tree(0).declaration_name(declaration(pass.tree(0), "lost")))
        .expect("name of the declaration");
    assert!(by_name.ptr_eq(&Binding::Variable(lost)));
}

#[test]
fn test_recovered_array_local() {
    let pass = shop();
    let grid = pass
        .resolver(0)
        .resolve_variable(declaration(pass.tree(0), "grid"))
        .expect("grid");
    let ty = grid.ty().expect("recovered type");
    assert_eq!(ty.dimensions(), 2);
    assert_eq!(ty.key(), "Recovered#currentTypeFoo2");
    assert_eq!(ty.component_type().expect("component").dimensions(), 1);

    assert_eq!(
        pass.resolver(0).resolve_array_type(&ty, 1).err(),
        Some(ResolveError::RecoveredArrayType)
    );
}

#[test]
fn test_recovery_queries_require_recovery() {
    let pass = resolve_units(&[("Shop.js", SHOP)], false);
    let resolver = pass.resolver(0);
    let lost = declaration(pass.tree(0), "lost");
    assert!(resolver.resolve_variable(lost).is_none());
    assert!(resolver.recovered_type_for_declaration(lost).is_none());
    assert!(
        resolver
            .recovered_type_for_type(pass.tree(0).declared_type(lost))
            .is_none()
    );
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn test_this_and_constants() {
    let pass = shop();
    let resolver = pass.resolver(0);
    let tree = pass.tree(0);
    let item = resolver
        .resolve_type(type_declaration(tree, "Item"))
        .expect("Item");

    let this = nodes(tree, |k| matches!(k, NodeKind::ThisExpression))[0];
    let this_type = resolver.resolve_expression_type(this).expect("type of this");
    assert!(Arc::ptr_eq(&this_type, &item));

    let one = initializer(tree, "one");
    assert_eq!(resolver.resolve_constant_expression_value(one), Some(Constant::Int(1)));
    let int = resolver.resolve_expression_type(one).expect("int");
    assert_eq!(int.name(), "int");

    let null = initializer(tree, "nothing");
    assert!(matches!(tree.kind(null), Some(NodeKind::NullLiteral)));
    assert_eq!(resolver.resolve_constant_expression_value(null), None);
    assert!(!resolver.resolve_boxing(one));
    assert!(!resolver.resolve_unboxing(one));
}

#[test]
fn test_well_known_types() {
    let pass = shop();
    let resolver = pass.resolver(0);
    for name in WELL_KNOWN_TYPES {
        let ty = resolver.resolve_well_known_type(name).expect("well-known type");
        assert_eq!(ty.name(), *name);
    }
    assert!(resolver.resolve_well_known_type("Item").is_none());
}

#[test]
fn test_array_type_of_a_raw_element() {
    let pass = shop();
    let resolver = pass.resolver(0);
    let item = resolver
        .resolve_type(type_declaration(pass.tree(0), "Item"))
        .expect("Item");
    let array = resolver
        .resolve_array_type(&item, 3)
        .expect("valid")
        .expect("array");
    assert_eq!(array.name(), "Item[][][]");
    assert_eq!(
        resolver.resolve_array_type(&item, 0).err(),
        Some(ResolveError::InvalidDimensions { dimensions: 0 })
    );

    let other = shop();
    let foreign = other
        .resolver(0)
        .resolve_type(type_declaration(other.tree(0), "Item"))
        .expect("Item of another pass");
    assert_eq!(
        resolver.resolve_array_type(&foreign, 1).err(),
        Some(ResolveError::ForeignBinding)
    );
}

// =============================================================================
// Node copies
// =============================================================================

#[test]
fn test_stored_copies_resolve_like_their_original() {
    let pass = shop();
    let resolver = pass.resolver(0);
    let tree = pass.tree(0);
    let (one, two, three) = (
        initializer(tree, "one"),
        initializer(tree, "two"),
        initializer(tree, "three"),
    );
    assert_eq!(resolver.resolve_constant_expression_value(two), Some(Constant::Int(2)));

    resolver.store(two, one);
    assert_eq!(resolver.resolve_constant_expression_value(two), Some(Constant::Int(1)));

    resolver.update_key(two, three);
    assert_eq!(resolver.resolve_constant_expression_value(three), Some(Constant::Int(1)));
    assert_eq!(resolver.resolve_constant_expression_value(two), Some(Constant::Int(2)));
}

#[test]
fn test_recorded_scope_answers_for_this() {
    let pass = shop();
    let resolver = pass.resolver(0);
    let tree = pass.tree(0);
    let this = nodes(tree, |k| matches!(k, NodeKind::ThisExpression))[0];
    let scope = resolver.scope_of(this).expect("analyzed scope");
    let item = resolver
        .resolve_type(type_declaration(tree, "Item"))
        .expect("Item");
    assert_eq!(Some(scope.enclosing_type), item.raw_id());

    let moved = ScopeInfo {
        enclosing_type: BindingId::NONE,
        ..scope
    };
    resolver.record_scope(this, moved);
    assert_eq!(resolver.scope_of(this), Some(moved));
}

// =============================================================================
// Declaring nodes and keys
// =============================================================================

#[test]
fn test_find_declaring_node() {
    let pass = shop();
    let resolver = pass.resolver(0);
    let tree = pass.tree(0);
    let item_decl = type_declaration(tree, "Item");

    let item = Binding::Type(resolver.resolve_type(item_decl).expect("Item"));
    assert_eq!(resolver.find_declaring_node(&item), Some(item_decl));
    assert_eq!(resolver.find_declaring_node_for_key("Lshop/Item;"), Some(item_decl));

    let unit = Binding::Type(resolver.resolve_type(tree.root).expect("unit type"));
    assert_eq!(resolver.find_declaring_node(&unit), Some(tree.root));

    let one_decl = declaration(tree, "one");
    let one = pass
        .context
        .binding_for_key_text(
            resolver
                .resolve_variable(one_decl)
                .expect("one")
                .key(),
        )
        .expect("local by key");
    assert_eq!(resolver.find_declaring_node(&one), Some(one_decl));
    assert_eq!(resolver.find_declaring_node_for_key("Lshop/Nope;"), None);
}

#[test]
fn test_declaring_node_found_without_prior_resolution() {
    let pass = shop();
    let resolver = pass.resolver(0);
    let item_decl = type_declaration(pass.tree(0), "Item");
    assert_eq!(resolver.find_declaring_node_for_key("Lshop/Item;"), Some(item_decl));
}

#[test]
fn test_create_bindings() {
    let pass = shop();
    let resolver = pass.resolver(0);
    let bindings = resolver
        .create_bindings(&["Lshop/Item;", "Lshop/Missing;", "Lshop/Item;.price)I"])
        .expect("active pass");
    assert_eq!(bindings.len(), 3);
    assert_eq!(bindings[0].as_ref().map(Binding::kind), Some(BindingKind::Type));
    assert!(bindings[1].is_none());
    let price = bindings[2].as_ref().expect("price");
    assert_eq!(price.kind(), BindingKind::Variable);
    assert_eq!(price.name(), "price");

    let method = resolver
        .create_bindings(&["Lshop/Item;.values()I"])
        .expect("active pass");
    assert_eq!(method[0].as_ref().map(Binding::name), Some("values"));

    pass.context.end_pass();
    assert_eq!(
        resolver.create_bindings(&["Lshop/Item;"]).err(),
        Some(ResolveError::NoActivePass)
    );
}

// =============================================================================
// NullResolver and ResolvedAst
// =============================================================================

#[test]
fn test_null_resolver_answers_nothing() {
    let pass = shop();
    let tree = pass.tree(0);
    let resolver = NullResolver;
    let item_decl = type_declaration(tree, "Item");
    assert!(resolver.resolve_type(item_decl).is_none());
    assert!(resolver.resolve_variable(declaration(tree, "one")).is_none());
    assert!(resolver.resolve_well_known_type("Object").is_none());
    assert!(resolver.find_declaring_node_for_key("Lshop/Item;").is_none());
    assert_eq!(
        resolver.create_bindings(&["Lshop/Item;"]).err(),
        Some(ResolveError::NoActivePass)
    );
}

#[test]
fn test_resolved_ast_lists_declarations() {
    let pass = shop();
    let tree = pass.tree(0).clone();
    let ast = ResolvedAst::new(tree.clone(), pass.shared(0));
    let declarations = ast.declarations();
    let names: Vec<&str> = declarations.iter().map(|(_, b)| b.name()).collect();
    assert_eq!(names.first(), Some(&"shop"));
    assert!(names.contains(&"Item"));
    assert!(names.contains(&"price"));
    assert!(names.contains(&"values"));
    assert!(names.contains(&"lost"));

    let bare = ResolvedAst::syntax_only(tree);
    assert!(!bare.has_bindings());
    assert!(bare.declarations().is_empty());
}
