use super::*;
use crate::key::unique_key;
use crate::name_env::StandardLibrary;
use jsbind_parser::{Frontend, JsonFrontend, ParseMode};

fn environment(units: &[(&str, &str)]) -> (LookupEnvironment, Vec<SyntaxTree>) {
    environment_with(StandardLibrary::new(), units)
}

fn environment_with(
    library: StandardLibrary,
    units: &[(&str, &str)],
) -> (LookupEnvironment, Vec<SyntaxTree>) {
    let frontend = JsonFrontend::new();
    let trees: Vec<SyntaxTree> = units
        .iter()
        .map(|(name, contents)| frontend.parse(name, contents, ParseMode::Full).tree)
        .collect();
    let mut env = LookupEnvironment::new(Arc::new(library));
    for tree in &trees {
        env.build_type_bindings(tree);
    }
    let refs: Vec<&SyntaxTree> = trees.iter().collect();
    env.complete_type_bindings(&refs);
    (env, trees)
}

fn field_named(env: &LookupEnvironment, ty: BindingId, name: &str) -> BindingId {
    let data = env.store.reference(ty).expect("type");
    data.fields
        .iter()
        .copied()
        .find(|f| env.store.field(*f).is_some_and(|d| &*d.name == name))
        .expect("field")
}

const OUTER: &str = r#"{
    "package": "p",
    "types": [{
        "name": "Outer",
        "fields": [
            { "name": "x", "type": "int" },
            { "name": "o" },
            { "name": "bad", "type": "Nope" }
        ],
        "methods": [{ "name": "m", "params": [{ "name": "a", "type": "String" }] }],
        "types": [{ "name": "Inner" }]
    }]
}"#;

#[test]
fn test_build_registers_types_and_unit_type() {
    let (mut env, _trees) = environment(&[("Outer.js", OUTER)]);
    let outer = env.get_type(&["p", "Outer"]).expect("Outer");
    let inner = env.get_type(&["p", "Outer$Inner"]).expect("Inner");

    let data = env.store.reference(inner).expect("inner data");
    assert!(data.is_member());
    assert_eq!(data.enclosing, outer);
    assert_eq!(&*data.source_name, "Inner");
    assert_eq!(unique_key(&env.store, inner), "Lp/Outer$Inner;");

    let scope = env.unit_scope("Outer.js").expect("scope");
    assert_eq!(scope.types, vec![outer]);
    let unit_type = scope.unit_type;
    assert!(
        env.store
            .reference(unit_type)
            .is_some_and(|d| d.is_compilation_unit())
    );
    assert_eq!(unique_key(&env.store, unit_type), "Lp/Outer.js;");
}

#[test]
fn test_members_resolve_lazily() {
    let (mut env, _trees) = environment(&[("Outer.js", OUTER)]);
    let outer = env.get_type(&["p", "Outer"]).expect("Outer");
    let x = field_named(&env, outer, "x");
    assert!(env.store.field(x).expect("x").modifiers.is_unresolved());

    env.resolve_types_for(outer);
    let object = env.object_type().expect("Object");
    let int = env.base_type(BaseType::Int);
    assert_eq!(env.store.field(x).expect("x").ty, int);
    assert!(!env.store.field(x).expect("x").modifiers.is_unresolved());
    let o = field_named(&env, outer, "o");
    assert_eq!(env.store.field(o).expect("o").ty, object);
    let bad = field_named(&env, outer, "bad");
    assert!(env.store.field(bad).expect("bad").ty.is_none());

    let methods = env.find_methods(outer, "m");
    assert_eq!(methods.len(), 1);
    let m = env.store.method(methods[0]).expect("m");
    assert_eq!(m.return_type, env.base_type(BaseType::Void));
    let string = m.parameters[0];
    assert_eq!(unique_key(&env.store, string), "LString;");

    let constructors = env.find_methods(outer, MethodData::CONSTRUCTOR_SELECTOR);
    assert_eq!(constructors.len(), 1, "default constructor");
}

#[test]
fn test_unresolved_superclass_becomes_object() {
    let (mut env, _trees) = environment(&[(
        "A.js",
        r#"{ "types": [{ "name": "A", "superclass": "Missing" }] }"#,
    )]);
    let a = env.get_type(&["A"]).expect("A");
    let object = env.object_type().expect("Object");
    assert_eq!(env.store.reference(a).expect("A").superclass, object);
}

#[test]
fn test_superclass_cycle_is_broken() {
    let (mut env, _trees) = environment(&[(
        "Cycle.js",
        r#"{ "types": [
            { "name": "A", "superclass": "B" },
            { "name": "B", "superclass": "A" }
        ] }"#,
    )]);
    let a = env.get_type(&["A"]).expect("A");
    let b = env.get_type(&["B"]).expect("B");
    let object = env.object_type().expect("Object");
    assert_eq!(env.superclass_chain(a), vec![a, b, object]);
    assert!(!env.is_subclass_of(b, a));
}

#[test]
fn test_library_types_install_as_binary() {
    let (mut env, _trees) = environment(&[]);
    let number = env.get_type(&["Number"]).expect("Number");
    let data = env.store.reference(number).expect("Number");
    assert!(data.is_binary());
    assert!(data.modifiers.is_unresolved());

    let max = env.find_field(number, "MAX_VALUE");
    assert!(max.is_some());
    assert!(!env.store.reference(number).expect("Number").modifiers.is_unresolved());
    assert!(env.get_type(&["NoSuchType"]).is_none());
}

#[test]
fn test_missing_types_are_shared_problem_bindings() {
    let (mut env, _trees) = environment(&[]);
    let first = env.missing_type(&["a", "Gone"]);
    let second = env.missing_type(&["a", "Gone"]);
    assert_eq!(first, second);
    assert!(env.is_problem_type(first));
}

#[test]
fn test_processing_order_follows_superclasses() {
    let (env, _trees) = environment(&[
        ("B.js", r#"{ "types": [{ "name": "B", "superclass": "A" }] }"#),
        ("A.js", r#"{ "types": [{ "name": "A" }] }"#),
        ("C.js", r#"{ "types": [{ "name": "C" }] }"#),
    ]);
    let files: Vec<Arc<str>> = ["B.js", "C.js", "A.js"].into_iter().map(Arc::from).collect();
    let order: Vec<String> = env
        .processing_order(&files)
        .iter()
        .map(|f| f.to_string())
        .collect();
    assert_eq!(order, vec!["A.js", "B.js", "C.js"]);
    assert_eq!(env.unit_dependencies("B.js"), vec![Arc::<str>::from("A.js")]);
}

#[test]
fn test_binding_for_key_finds_members() {
    let (mut env, _trees) = environment(&[("Outer.js", OUTER)]);
    let outer = env.get_type(&["p", "Outer"]).expect("Outer");
    let method = env.find_methods(outer, "m")[0];
    let key = unique_key(&env.store, method);
    assert_eq!(key, "Lp/Outer;.m(LString;)V");
    assert_eq!(env.binding_for_key_text(&key), Some(method));

    let bad = field_named(&env, outer, "bad");
    assert_eq!(env.binding_for_key_text("Lp/Outer;.bad)"), Some(bad));
    assert_eq!(env.binding_for_key_text("Lp/Nope;"), None);
    assert_eq!(env.binding_for_key_text("not a key"), None);
}

#[test]
fn test_release_unit_forgets_declarations() {
    let (mut env, _trees) = environment(&[("Outer.js", OUTER)]);
    env.release_unit("Outer.js");
    let scope = env.unit_scope("Outer.js").expect("scope");
    assert!(scope.released);
    assert!(scope.declarations.is_empty());
}
