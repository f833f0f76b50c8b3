use super::*;
use crate::resolver::BindingResolver;
use crate::test_fixtures::{declaration, declared_type, resolve};

const LOST: &str = r#"{ "functions": [{ "name": "f", "body": [
    { "kind": "var", "type": "Foo", "name": "a" },
    { "kind": "var", "type": "Foo", "name": "grid", "dims": 2 },
    { "kind": "var", "type": "Foo[]", "name": "row" }
] }] }"#;

fn recovered_type(pass: &crate::test_fixtures::Pass, name: &str) -> Arc<TypeBinding> {
    let variable = pass
        .resolver(0)
        .resolve_variable(declaration(pass.tree(0), name))
        .expect("variable");
    assert!(variable.is_recovered());
    variable.ty().expect("recovered type")
}

#[test]
fn test_declaration_names_and_keys() {
    let pass = resolve(LOST);

    let a = recovered_type(&pass, "a");
    assert_eq!(a.name(), "Foo");
    assert_eq!(a.qualified_name(), "Foo");
    assert_eq!(a.dimensions(), 0);
    assert_eq!(a.key(), "Recovered#currentTypeFoo0");

    let grid = recovered_type(&pass, "grid");
    assert_eq!(grid.name(), "Foo[][]");
    assert_eq!(grid.dimensions(), 2);
    assert_eq!(grid.key(), "Recovered#currentTypeFoo2");

    let row = recovered_type(&pass, "row");
    assert_eq!(row.name(), "Foo[]");
    assert_eq!(row.dimensions(), 1);
    assert_eq!(row.key(), "Recovered#currentTypeFoo[]1");
}

#[test]
fn test_keys_are_stable_across_passes() {
    let first = resolve(LOST);
    let second = resolve(LOST);
    let a1 = recovered_type(&first, "a");
    let a2 = recovered_type(&second, "a");
    assert!(!Arc::ptr_eq(&a1, &a2));
    assert_eq!(a1.key(), a2.key());
    assert!(a1.is_equal_to(&a2));

    let grid = recovered_type(&first, "grid");
    assert!(!a1.is_equal_to(&grid));
}

#[test]
fn test_declaration_type_is_cached_per_node() {
    let pass = resolve(LOST);
    let first = recovered_type(&pass, "a");
    let again = recovered_type(&pass, "a");
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn test_missing_type_node_recovers_from_its_binding() {
    let pass = resolve(LOST);
    let node = declared_type(pass.tree(0), "a");
    let ty = pass.resolver(0).resolve_type(node).expect("type of the node");
    assert!(ty.is_recovered());
    assert_eq!(ty.name(), "Foo");
    assert_eq!(ty.key(), "Recovered#referenceBindingLFoo;0");
}

#[test]
fn test_component_type_wraps_inner() {
    let pass = resolve(LOST);
    let grid = recovered_type(&pass, "grid");
    let component = grid.component_type().expect("component");
    assert!(component.is_recovered());
    assert_eq!(component.dimensions(), 1);
    assert_eq!(component.name(), "Foo[]");
    assert_eq!(
        component.key(),
        format!("Recovered#innerTypeBinding{}1", grid.key())
    );

    let leaf = component.component_type().expect("leaf");
    assert_eq!(leaf.dimensions(), 0);
    assert_eq!(leaf.name(), "Foo");
    assert!(leaf.component_type().is_none());
}

#[test]
fn test_element_type_of_recovered_array() {
    let pass = resolve(LOST);
    let grid = recovered_type(&pass, "grid");
    let element = grid.element_type().expect("element");
    assert_eq!(element.name(), "Foo");
    assert!(!element.is_array());

    let row = recovered_type(&pass, "row");
    let element = row.element_type().expect("element");
    assert_eq!(element.name(), "Foo");
    assert_eq!(element.key(), "Recovered#currentTypeFoo0");
}

#[test]
fn test_negative_delta_clamps_at_zero() {
    let pass = resolve(LOST);
    let a = recovered_type(&pass, "a");
    assert_eq!(RecoveredType::from_inner(a, -3).dimensions(), 0);
}

#[test]
fn test_qualified_type_names_its_last_segment() {
    let pass = resolve(
        r#"{ "functions": [{ "name": "g", "body": [
            { "kind": "var", "type": "pkg.Bar", "name": "q" }
        ] }] }"#,
    );
    let ty = pass
        .resolver(0)
        .recovered_type_for_declaration(declaration(pass.tree(0), "q"))
        .expect("recovered");
    assert_eq!(ty.name(), "Bar");
    assert_eq!(ty.key(), "Recovered#currentTypepkg.Bar0");
}

#[test]
fn test_recovered_types_answer_object_as_superclass() {
    let pass = resolve(LOST);
    let a = recovered_type(&pass, "a");
    let superclass = a.superclass().expect("superclass");
    assert_eq!(superclass.qualified_name(), "Object");
    assert!(a.is_class());
    assert!(a.is_top_level());
    assert!(!a.is_primitive());
}
