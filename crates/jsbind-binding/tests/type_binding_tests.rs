use super::*;
use crate::resolver::BindingResolver;
use crate::test_fixtures::{Pass, resolve_units, type_declaration};

const GEO: &str = r#"{
    "package": "geo",
    "types": [
        {
            "name": "Point",
            "fields": [
                { "name": "x", "type": "int" },
                { "name": "y", "type": "int" }
            ],
            "methods": [
                { "name": "move", "returnType": "void",
                  "params": [{ "name": "dx", "type": "int" }] }
            ],
            "types": [{ "name": "Inner" }]
        },
        { "name": "Circle", "superclass": "Point" }
    ]
}"#;

fn geo() -> Pass {
    resolve_units(&[("Geo.js", GEO)], true)
}

fn declared(pass: &Pass, name: &str) -> Arc<TypeBinding> {
    pass.resolver(0)
        .resolve_type(type_declaration(pass.tree(0), name))
        .expect("declared type")
}

fn field_type(ty: &TypeBinding, name: &str) -> Arc<TypeBinding> {
    ty.declared_fields()
        .iter()
        .find(|field| field.name() == name)
        .and_then(|field| field.ty())
        .expect("field type")
}

#[test]
fn test_names_of_top_level_and_member_types() {
    let pass = geo();
    let point = declared(&pass, "Point");
    assert_eq!(point.name(), "Point");
    assert_eq!(point.qualified_name(), "geo.Point");
    assert_eq!(point.binary_name().as_deref(), Some("geo.Point"));
    assert_eq!(point.key(), "Lgeo/Point;");
    assert!(point.is_class());
    assert!(point.is_top_level());
    assert!(point.is_from_source());
    assert!(!point.is_recovered());

    let inner = declared(&pass, "Inner");
    assert_eq!(inner.name(), "Inner");
    assert_eq!(inner.qualified_name(), "geo.Point.Inner");
    assert_eq!(inner.binary_name().as_deref(), Some("geo.Point$Inner"));
    assert!(inner.is_member());
    assert!(!inner.is_top_level());
    let declaring = inner.declaring_class().expect("declaring class");
    assert!(Arc::ptr_eq(&declaring, &point));
    assert!(point.declaring_class().is_none());
}

#[test]
fn test_package_of_a_type() {
    let pass = geo();
    let point = declared(&pass, "Point");
    let package = point.package().expect("package");
    assert_eq!(package.name(), "geo");
    assert_eq!(package.key(), "geo");
    assert!(!package.is_unnamed());
}

#[test]
fn test_declared_members() {
    let pass = geo();
    let point = declared(&pass, "Point");

    let fields: Vec<&str> = point.declared_fields().iter().map(|f| f.name()).collect();
    assert_eq!(fields, vec!["x", "y"]);
    let x = &point.declared_fields()[0];
    assert!(x.is_field());
    let x_type = x.ty().expect("int");
    assert!(x_type.is_primitive());
    assert_eq!(x_type.name(), "int");
    let declaring = x.declaring_class().expect("declaring class");
    assert!(Arc::ptr_eq(&declaring, &point));

    let moved = point
        .declared_methods()
        .iter()
        .find(|m| m.name() == "move")
        .expect("move");
    assert!(!moved.is_constructor());
    assert_eq!(moved.parameter_types().len(), 1);
    assert_eq!(moved.parameter_types()[0].name(), "int");
    assert_eq!(moved.return_type().expect("void").name(), "void");

    let types: Vec<&str> = point.declared_types().iter().map(|t| t.name()).collect();
    assert_eq!(types, vec!["Inner"]);
}

#[test]
fn test_array_types_and_components() {
    let pass = geo();
    let point = declared(&pass, "Point");
    let grid = point
        .create_array_type(2)
        .expect("valid dimensions")
        .expect("array type");
    assert_eq!(grid.name(), "Point[][]");
    assert_eq!(grid.qualified_name(), "geo.Point[][]");
    assert_eq!(grid.key(), "[[Lgeo/Point;");
    assert_eq!(grid.dimensions(), 2);
    assert!(grid.is_array());
    assert!(Arc::ptr_eq(&grid.element_type().expect("element"), &point));

    let row = grid.component_type().expect("component");
    assert_eq!(row.dimensions(), 1);
    assert_eq!(row.name(), "Point[]");
    let again = point.create_array_type(1).expect("valid").expect("array");
    assert!(Arc::ptr_eq(&row, &again), "array facades are interned");

    let back = grid.create_array_type(-1).expect("valid").expect("array");
    assert!(Arc::ptr_eq(&back, &row));
    assert!(point.component_type().is_none());
}

#[test]
fn test_array_dimension_limits() {
    let pass = geo();
    let point = declared(&pass, "Point");
    assert_eq!(
        point.create_array_type(0).err(),
        Some(ResolveError::InvalidDimensions { dimensions: 0 })
    );
    assert_eq!(
        point.create_array_type(256).err(),
        Some(ResolveError::InvalidDimensions { dimensions: 256 })
    );
    assert!(point.create_array_type(255).expect("255 is the limit").is_some());

    let moved = point
        .declared_methods()
        .iter()
        .find(|m| m.name() == "move")
        .cloned()
        .expect("move");
    let void = moved.return_type().expect("void");
    assert_eq!(void.create_array_type(1).err(), Some(ResolveError::VoidArray));

    let unit = pass
        .resolver(0)
        .resolve_type(pass.tree(0).root)
        .expect("unit type");
    assert!(unit.is_compilation_unit());
    assert!(matches!(unit.create_array_type(1), Ok(None)));
}

#[test]
fn test_compatibility_follows_the_hierarchy() {
    let pass = geo();
    let point = declared(&pass, "Point");
    let circle = declared(&pass, "Circle");
    let object = pass
        .resolver(0)
        .resolve_well_known_type("Object")
        .expect("Object");

    assert!(circle.is_assignment_compatible(&point));
    assert!(!point.is_assignment_compatible(&circle));
    assert!(point.is_assignment_compatible(&object));
    assert!(point.is_cast_compatible(&circle));
    assert!(circle.is_subtype_compatible(&point));

    let superclass = circle.superclass().expect("superclass");
    assert!(Arc::ptr_eq(&superclass, &point));

    let int = field_type(&point, "x");
    assert!(int.is_assignment_compatible(&int));
    assert!(!int.is_subtype_compatible(&int));
    assert!(!int.is_assignment_compatible(&point));
}

#[test]
fn test_recovered_type_is_compatible_with_object_only() {
    let pass = resolve_units(
        &[(
            "Lost.js",
            r#"{ "types": [{ "name": "Known" }],
                 "functions": [{ "name": "f", "body": [
                    { "kind": "var", "type": "Foo", "name": "x" } ] }] }"#,
        )],
        true,
    );
    let resolver = pass.resolver(0);
    let x = resolver
        .resolve_variable(crate::test_fixtures::declaration(pass.tree(0), "x"))
        .expect("x");
    let lost = x.ty().expect("recovered");
    let object = resolver.resolve_well_known_type("Object").expect("Object");
    let known = declared(&pass, "Known");

    assert!(lost.is_assignment_compatible(&object));
    assert!(object.is_assignment_compatible(&lost));
    assert!(lost.is_assignment_compatible(&lost));
    assert!(!lost.is_assignment_compatible(&known));
    assert!(!known.is_assignment_compatible(&lost));
}

#[test]
fn test_equality_across_passes() {
    let first = geo();
    let second = geo();
    let a = declared(&first, "Point");
    let b = declared(&second, "Point");
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(a.is_equal_to(&b));
    assert!(!a.is_equal_to(&declared(&second, "Circle")));
    assert!(
        !a.is_assignment_compatible(&b),
        "compatibility is only answered within one pass"
    );
}
