use super::*;
use crate::binding::BindingKind;
use crate::resolver::BindingResolver;
use crate::test_fixtures::{declaration, declared_type, resolve, resolve_units, type_declaration};

const SHAPES: &str = r#"{
    "types": [
        { "name": "Point", "fields": [{ "name": "x", "type": "int" }] },
        { "name": "Line", "fields": [{ "name": "from", "type": "Point" }] }
    ],
    "functions": [{ "name": "f", "body": [
        { "kind": "var", "type": "Foo", "name": "lost" },
        { "kind": "var", "type": "Point", "name": "p" }
    ] }]
}"#;

#[test]
fn test_same_declaration_yields_same_facade() {
    let pass = resolve(SHAPES);
    let resolver = pass.resolver(0);
    let tree = pass.tree(0);
    let point = type_declaration(tree, "Point");

    let first = resolver.resolve_type(point).expect("Point");
    let second = resolver.resolve_type(point).expect("Point again");
    assert!(Arc::ptr_eq(&first, &second));

    let p = resolver.resolve_variable(declaration(tree, "p")).expect("p");
    let p_type = p.ty().expect("p has a type");
    assert!(Arc::ptr_eq(&first, &p_type), "the local's type is the declared type");

    let id = first.raw_id().expect("raw type");
    let by_id = pass.context.binding(id).expect("binding by id");
    assert!(by_id.ptr_eq(&Binding::Type(first.clone())));
}

#[test]
fn test_missing_type_is_recovered_only_with_recovery() {
    let with = resolve_units(&[("Test.js", SHAPES)], true);
    let tree = with.tree(0);
    let foo = declared_type(tree, "lost");
    let recovered = with.resolver(0).resolve_type(foo).expect("recovered Foo");
    assert!(recovered.is_recovered());
    assert_eq!(recovered.name(), "Foo");

    let without = resolve_units(&[("Test.js", SHAPES)], false);
    let tree = without.tree(0);
    let foo = declared_type(tree, "lost");
    assert!(without.resolver(0).resolve_type(foo).is_none());
    assert!(
        without
            .resolver(0)
            .resolve_variable(declaration(tree, "lost"))
            .is_none()
    );
}

#[test]
fn test_binding_for_key_text() {
    let pass = resolve(SHAPES);
    let point = pass
        .context
        .binding_for_key_text("LPoint;")
        .expect("Point by key");
    assert_eq!(point.kind(), BindingKind::Type);
    assert_eq!(point.name(), "Point");

    let again = pass.context.binding_for_key_text("LPoint;").expect("registered");
    assert!(point.ptr_eq(&again));

    assert!(pass.context.binding_for_key_text("LNope;").is_none());
    assert!(pass.context.binding_for_key_text("not a key").is_none());
    assert!(pass.context.binding_for_key_text("").is_none());
}

#[test]
fn test_recovered_variable_key_is_registered() {
    let pass = resolve(SHAPES);
    let tree = pass.tree(0);
    let lost = pass
        .resolver(0)
        .resolve_variable(declaration(tree, "lost"))
        .expect("recovered variable");
    assert!(lost.is_recovered());

    let found = pass.context.registered(lost.key()).expect("registered by key");
    assert!(found.ptr_eq(&Binding::Variable(lost.clone())));
}

#[test]
fn test_end_pass_deactivates() {
    let pass = resolve(SHAPES);
    assert!(pass.context.is_active());
    assert!(pass.context.recovery());
    pass.context.end_pass();
    assert!(!pass.context.is_active());
}

#[test]
fn test_facades_keep_their_pass_alive() {
    let pass = resolve(SHAPES);
    let tree = pass.tree(0).clone();
    let line = pass
        .resolver(0)
        .resolve_type(type_declaration(&tree, "Line"))
        .expect("Line");
    let context = Arc::downgrade(&pass.context);
    drop(pass);

    assert!(context.upgrade().is_some());
    assert_eq!(line.name(), "Line");
    assert_eq!(line.key(), "LLine;");
    let from = &line.declared_fields()[0];
    assert_eq!(from.ty().expect("from has a type").name(), "Point");

    drop(line);
    assert!(context.upgrade().is_none(), "the last facade releases the pass");
}

#[test]
fn test_dropped_facades_are_recreated() {
    let pass = resolve(SHAPES);
    let id = {
        let point = pass.context.binding_for_key_text("LPoint;").expect("Point");
        point.raw_id().expect("raw type")
    };
    assert!(pass.context.registered("LPoint;").is_none());

    let again = pass.context.binding(id).expect("Point again");
    assert_eq!(again.name(), "Point");
    let cached = pass.context.binding(id).expect("cached");
    assert!(again.ptr_eq(&cached));
}
