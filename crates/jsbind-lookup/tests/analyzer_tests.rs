//! End-to-end analyzer tests: parse JSON units, register them with a lookup
//! environment, analyze, and inspect what was recorded per node.

use jsbind_ast::{NodeIndex, NodeKind, SyntaxTree, TreeBuilder};
use jsbind_lookup::{
    Analyzer, AnalyzerError, BaseType, BindingId, CompilerUnit, Constant, ImplicitConversion,
    LookupEnvironment, ProblemReason, RawBinding, StandardLibrary, UnitState, unique_key,
};
use jsbind_parser::{Frontend, JsonFrontend, ParseMode};
use std::sync::Arc;

struct Analyzed {
    env: LookupEnvironment,
    units: Vec<CompilerUnit>,
    results: Vec<Result<(), AnalyzerError>>,
}

fn analyze_with(library: StandardLibrary, sources: &[(&str, &str)]) -> Analyzed {
    let frontend = JsonFrontend::new();
    let trees: Vec<Arc<SyntaxTree>> = sources
        .iter()
        .map(|(name, contents)| Arc::new(frontend.parse(name, contents, ParseMode::Full).tree))
        .collect();
    let mut env = LookupEnvironment::new(Arc::new(library));
    for tree in &trees {
        env.build_type_bindings(tree);
    }
    let refs: Vec<&SyntaxTree> = trees.iter().map(|t| &**t).collect();
    env.complete_type_bindings(&refs);

    let mut units = Vec::new();
    let mut results = Vec::new();
    for tree in trees {
        let mut unit = CompilerUnit::new(tree);
        results.push(Analyzer::process(&mut env, &mut unit));
        units.push(unit);
    }
    Analyzed {
        env,
        units,
        results,
    }
}

fn analyze(source: &str) -> Analyzed {
    analyze_with(StandardLibrary::new(), &[("Test.js", source)])
}

fn nodes(tree: &SyntaxTree, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeIndex> {
    tree.preorder()
        .into_iter()
        .filter(|index| tree.kind(*index).is_some_and(&pred))
        .collect()
}

fn returned(tree: &SyntaxTree) -> Vec<NodeIndex> {
    nodes(tree, |k| matches!(k, NodeKind::ReturnStatement { .. }))
        .into_iter()
        .filter_map(|index| match tree.kind(index) {
            Some(NodeKind::ReturnStatement { expression }) => Some(*expression),
            _ => None,
        })
        .collect()
}

fn problem_of(env: &LookupEnvironment, binding: BindingId) -> Option<ProblemReason> {
    match env.store.get(binding)? {
        RawBinding::Field(data) => data.problem,
        RawBinding::Method(data) => data.problem,
        RawBinding::Reference(data) => data.problem,
        _ => None,
    }
}

const COUNTER: &str = r#"{
    "types": [{
        "name": "Counter",
        "fields": [
            { "name": "count", "type": "int" },
            { "name": "LIMIT", "type": "int", "modifiers": ["static", "final"],
              "init": { "kind": "number", "value": "10" } }
        ],
        "methods": [
            {
                "name": "next",
                "returnType": "int",
                "params": [{ "name": "step", "type": "int" }],
                "body": [
                    { "kind": "var", "name": "total", "init": {
                        "kind": "infix", "op": "+",
                        "left": { "kind": "name", "name": "count" },
                        "right": { "kind": "name", "name": "step" } } },
                    { "kind": "return", "expr": { "kind": "name", "name": "total" } }
                ]
            },
            {
                "name": "twice",
                "modifiers": ["static"],
                "returnType": "int",
                "body": [{ "kind": "return", "expr": {
                    "kind": "infix", "op": "*",
                    "left": { "kind": "name", "name": "Counter.LIMIT" },
                    "right": { "kind": "number", "value": "2" } } }]
            },
            {
                "name": "broken",
                "modifiers": ["static"],
                "returnType": "int",
                "body": [{ "kind": "return", "expr": { "kind": "name", "name": "count" } }]
            }
        ]
    }]
}"#;

#[test]
fn test_locals_and_fields_resolve() {
    let analyzed = analyze(COUNTER);
    assert!(analyzed.results[0].is_ok());
    let unit = &analyzed.units[0];
    assert_eq!(unit.state, UnitState::Resolved);
    let env = &analyzed.env;
    let int = env.base_type(BaseType::Int);

    let total = returned(&unit.tree)[0];
    let binding = unit.binding(total);
    let local = env.store.local(binding).expect("total is a local");
    assert_eq!(&*local.name, "total");
    assert_eq!(local.ty, int, "untyped local takes its initializer's type");
    assert_eq!(unit.resolved_type(total), int);

    let method = env.store.method(local.declaring_method).expect("next");
    assert_eq!(&*method.selector, "next");
    assert_eq!(method.locals.len(), 2);
    let step = env.store.local(method.locals[0]).expect("step");
    assert!(step.is_parameter);

    let count = nodes(&unit.tree, |k| matches!(k, NodeKind::InfixExpression { .. }))
        .into_iter()
        .find_map(|infix| match unit.tree.kind(infix) {
            Some(NodeKind::InfixExpression { left, .. }) => Some(*left),
            _ => None,
        })
        .expect("infix");
    let field = env.store.field(unit.binding(count)).expect("count field");
    assert_eq!(&*field.name, "count");
    assert!(field.problem.is_none());
}

#[test]
fn test_qualified_static_field_folds_constant() {
    let analyzed = analyze(COUNTER);
    let unit = &analyzed.units[0];
    let env = &analyzed.env;

    let product = returned(&unit.tree)[1];
    let record = unit.node(product).expect("product");
    assert_eq!(record.constant, Some(Constant::Int(20)));
    assert_eq!(record.resolved_type, env.base_type(BaseType::Int));

    let qualified = nodes(&unit.tree, |k| matches!(k, NodeKind::QualifiedName { .. }))[0];
    let record = unit.node(qualified).expect("Counter.LIMIT");
    assert_eq!(record.segment_bindings.len(), 2);
    assert!(env.store.reference(record.segment_bindings[0]).is_some());
    assert_eq!(record.segment_bindings[1], record.binding);
    assert_eq!(record.constant, Some(Constant::Int(10)));
    assert_eq!(unique_key(&env.store, record.binding), "LCounter;.LIMIT)I");
}

#[test]
fn test_instance_field_in_static_method_is_a_problem() {
    let analyzed = analyze(COUNTER);
    let unit = &analyzed.units[0];
    let env = &analyzed.env;

    let count = returned(&unit.tree)[2];
    let binding = unit.binding(count);
    assert_eq!(
        problem_of(env, binding),
        Some(ProblemReason::NonStaticReferenceInStaticContext)
    );
    let closest = env.store.field(binding).expect("problem field").closest_match;
    assert_eq!(&*env.store.field(closest).expect("count").name, "count");
    assert_eq!(unit.resolved_type(count), env.base_type(BaseType::Int));
}

#[test]
fn test_library_calls_record_boxing() {
    let analyzed = analyze(
        r#"{ "functions": [{ "name": "first", "returnType": "String", "body": [
            { "kind": "return", "expr": {
                "kind": "call",
                "receiver": { "kind": "string", "value": "abc" },
                "name": "charAt",
                "args": [{ "kind": "number", "value": "0" }] } },
            { "kind": "expr", "expr": { "kind": "call", "name": "nothing" } }
        ] }] }"#,
    );
    assert!(analyzed.results[0].is_ok());
    let unit = &analyzed.units[0];
    let env = &analyzed.env;

    let call = returned(&unit.tree)[0];
    let method = env.store.method(unit.binding(call)).expect("charAt");
    assert_eq!(&*method.selector, "charAt");
    assert!(method.problem.is_none());
    let Some(NodeKind::FunctionInvocation { arguments, .. }) = unit.tree.kind(call) else {
        panic!("expected a call");
    };
    let record = unit.node(arguments[0]).expect("argument");
    assert!(record.conversion.contains(ImplicitConversion::BOXING));

    let missing = nodes(&unit.tree, |k| matches!(k, NodeKind::FunctionInvocation { .. }))
        .into_iter()
        .find(|n| *n != call)
        .expect("second call");
    assert_eq!(
        problem_of(env, unit.binding(missing)),
        Some(ProblemReason::NotFound)
    );
}

#[test]
fn test_instance_creation_binds_constructor() {
    let analyzed = analyze(
        r#"{ "types": [{ "name": "Point" }],
             "functions": [{ "name": "make", "body": [
                { "kind": "var", "name": "p", "init": { "kind": "new", "type": "Point" } },
                { "kind": "var", "name": "q", "init": { "kind": "new", "type": "Nowhere" } }
             ] }] }"#,
    );
    let unit = &analyzed.units[0];
    let env = &analyzed.env;
    let creations = nodes(&unit.tree, |k| matches!(k, NodeKind::ClassInstanceCreation { .. }));
    assert_eq!(creations.len(), 2);

    let constructor = env.store.method(unit.binding(creations[0])).expect("Point()");
    assert!(constructor.is_constructor());
    assert!(constructor.problem.is_none());
    assert_eq!(unique_key(&env.store, constructor.declaring_class), "LPoint;");

    let missing = unit.binding(creations[1]);
    assert_eq!(problem_of(env, missing), Some(ProblemReason::NotFound));
    let declaring = env.store.method(missing).expect("problem ctor").declaring_class;
    assert!(env.is_problem_type(declaring));
}

#[test]
fn test_private_member_of_other_type_is_not_visible() {
    let analyzed = analyze(
        r#"{ "types": [
            { "name": "Vault", "fields": [{ "name": "secret", "type": "int", "modifiers": ["private"] }] },
            { "name": "Thief", "methods": [{
                "name": "steal",
                "params": [{ "name": "v", "type": "Vault" }],
                "body": [{ "kind": "return", "expr": {
                    "kind": "field", "receiver": { "kind": "name", "name": "v" }, "name": "secret" } }]
            }] }
        ] }"#,
    );
    let unit = &analyzed.units[0];
    let access = returned(&unit.tree)[0];
    assert_eq!(
        problem_of(&analyzed.env, unit.binding(access)),
        Some(ProblemReason::NotVisible)
    );
}

#[test]
fn test_unit_functions_callable_from_types() {
    let analyzed = analyze(
        r#"{ "types": [{ "name": "User", "methods": [{
                "name": "run", "modifiers": ["static"],
                "body": [{ "kind": "expr", "expr": { "kind": "call", "name": "helper" } }] }] }],
             "functions": [{ "name": "helper" }] }"#,
    );
    let unit = &analyzed.units[0];
    let env = &analyzed.env;
    let call = nodes(&unit.tree, |k| matches!(k, NodeKind::FunctionInvocation { .. }))[0];
    let helper = env.store.method(unit.binding(call)).expect("helper");
    assert!(helper.problem.is_none());
    assert!(
        env.store
            .reference(helper.declaring_class)
            .is_some_and(|d| d.is_compilation_unit())
    );
}

#[test]
fn test_super_members_resolve_against_superclass() {
    let analyzed = analyze(
        r#"{ "types": [
            { "name": "Shape", "fields": [{ "name": "sides", "type": "int" }],
              "methods": [{ "name": "area", "returnType": "Number" }] },
            { "name": "Square", "superclass": "Shape", "methods": [{
                "name": "area", "returnType": "Number",
                "body": [
                    { "kind": "expr", "expr": { "kind": "superField", "name": "sides" } },
                    { "kind": "return", "expr": { "kind": "superCall", "name": "area" } }
                ] }] }
        ] }"#,
    );
    let unit = &analyzed.units[0];
    let env = &analyzed.env;
    let call = returned(&unit.tree)[0];
    let area = env.store.method(unit.binding(call)).expect("area");
    assert_eq!(unique_key(&env.store, area.declaring_class), "LShape;");

    let field = nodes(&unit.tree, |k| matches!(k, NodeKind::SuperFieldAccess { .. }))[0];
    let sides = env.store.field(unit.binding(field)).expect("sides");
    assert_eq!(unique_key(&env.store, sides.declaring_class), "LShape;");
}

#[test]
fn test_doc_member_refs_bind() {
    let analyzed = analyze(
        r#"{ "types": [{
            "name": "Documented",
            "doc": [
                { "kind": "memberRef", "name": "value" },
                { "kind": "functionRef", "name": "Documented" }
            ],
            "fields": [{ "name": "value", "type": "String" }]
        }] }"#,
    );
    let unit = &analyzed.units[0];
    let env = &analyzed.env;
    let member = nodes(&unit.tree, |k| matches!(k, NodeKind::MemberRef { .. }))[0];
    assert_eq!(&*env.store.field(unit.binding(member)).expect("value").name, "value");
    let function = nodes(&unit.tree, |k| matches!(k, NodeKind::FunctionRef { .. }))[0];
    assert!(
        env.store
            .method(unit.binding(function))
            .is_some_and(|m| m.is_constructor())
    );
}

#[test]
fn test_missing_string_aborts_and_scrubs_the_unit() {
    let mut analyzed = analyze_with(
        StandardLibrary::new().without("String"),
        &[(
            "Abort.js",
            r#"{ "types": [
                { "name": "Early", "methods": [{ "name": "greet",
                    "body": [{ "kind": "return", "expr": { "kind": "string", "value": "hi" } }] }] },
                { "name": "Late", "fields": [{ "name": "n", "type": "int" }] }
            ] }"#,
        )],
    );
    let Err(err) = &analyzed.results[0] else {
        panic!("expected an abort");
    };
    assert!(err.is_abort());
    assert_eq!(
        *err,
        AnalyzerError::Abort {
            file_name: Arc::from("Abort.js"),
            missing: "String".to_string(),
        }
    );

    let unit = &analyzed.units[0];
    assert_eq!(unit.state, UnitState::Aborted);
    let declarations = nodes(&unit.tree, |k| matches!(k, NodeKind::TypeDeclaration { .. }));
    let (early, late) = (unit.binding(declarations[0]), unit.binding(declarations[1]));
    assert!(late.is_some());
    let n = analyzed.env.store.reference(late).expect("Late").fields[0];

    let env = &mut analyzed.env;
    assert_eq!(env.binding_for_key_text("LLate;"), Some(late));
    assert!(env.scrub_unit("Abort.js") > 0);
    assert_eq!(env.scrub_unit("Abort.js"), 0);
    assert!(env.unit_scope("Abort.js").expect("scope").released);

    assert!(env.store.reference(early).expect("Early").is_valid(), "resolved before the abort");
    assert_eq!(env.binding_for_key_text("LEarly;"), Some(early));
    assert!(!env.store.reference(late).expect("Late").is_valid());
    assert!(!env.store.field(n).expect("n").is_valid());
    assert_eq!(env.binding_for_key_text("LLate;"), None);
    assert_eq!(env.binding_for_key_text("[LLate;"), None);
    assert_eq!(env.binding_for_key_text("LLate;.n)I"), None);
}

#[test]
fn test_dangling_child_is_an_internal_error() {
    let builder = TreeBuilder::new("Broken.js");
    let tree = Arc::new(builder.finish(NodeIndex::NONE, Vec::new(), vec![NodeIndex(9_999)], Vec::new()));
    let mut env = LookupEnvironment::new(Arc::new(StandardLibrary::new()));
    env.build_type_bindings(&tree);
    env.complete_type_bindings(&[&*tree]);

    let mut unit = CompilerUnit::new(tree);
    let err = Analyzer::process(&mut env, &mut unit).expect_err("dangling node");
    assert!(!err.is_abort());
    assert!(err.to_string().contains("node 9999 does not exist"), "{err}");
    assert_eq!(unit.state, UnitState::Aborted);
}

#[test]
fn test_unregistered_unit_is_rejected() {
    let tree = JsonFrontend::new().parse("Lonely.js", "{}", ParseMode::Full).tree;
    let mut env = LookupEnvironment::new(Arc::new(StandardLibrary::new()));
    let mut unit = CompilerUnit::new(Arc::new(tree));
    let err = Analyzer::process(&mut env, &mut unit).expect_err("not registered");
    assert!(matches!(err, AnalyzerError::Internal { .. }));
    assert_eq!(unit.state, UnitState::Built);
}
