use super::*;
use crate::project::StandardProject;
use crate::requestor::CollectingRequestor;
use jsbind_ast::{NodeIndex, TreeBuilder};
use jsbind_binding::BindingKind;
use jsbind_lookup::{NameEnvironment, StandardLibrary};

fn typed_unit(name: &str) -> String {
    format!(
        r#"{{ "package": "p", "types": [{{ "name": "{name}",
              "fields": [{{ "name": "size", "type": "int" }}] }}] }}"#
    )
}

const BODY: &str = r#"{ "package": "p", "functions": [{ "name": "f", "body": [
    { "kind": "var", "type": "int", "name": "local", "init": { "kind": "number", "value": "4" } }
] }] }"#;

fn five_units() -> ResolveRequest {
    (1..=5).fold(ResolveRequest::new(), |request, i| {
        request.unit(&format!("U{i}.js"), &typed_unit(&format!("T{i}")))
    })
}

fn run(
    options: ResolverOptions,
    request: &ResolveRequest,
) -> (Result<PassStats, DriverError>, CollectingRequestor) {
    let mut out = CollectingRequestor::new();
    let result = UnitResolver::new(options).resolve(&StandardProject::new("test"), request, &mut out);
    (result, out)
}

fn delivered_files(out: &CollectingRequestor) -> Vec<&str> {
    out.asts.iter().map(|ast| &**ast.file_name()).collect()
}

/// Records deliveries as text, in order.
#[derive(Default)]
struct EventLog {
    events: Vec<String>,
}

impl AstRequestor for EventLog {
    fn accept_ast(&mut self, ast: ResolvedAst) {
        self.events.push(format!("ast {}", ast.file_name()));
    }

    fn accept_binding(&mut self, key: &str, binding: Option<Binding>) {
        self.events.push(format!("key {key} {}", binding.is_some()));
    }
}

// =============================================================================
// Early exit and ordering
// =============================================================================

#[test]
fn test_only_requested_results_are_delivered() {
    let request = five_units().ast("U2.js").key("Lp/T4;.size)I");
    let (result, out) = run(ResolverOptions::default(), &request);
    let stats = result.expect("pass succeeds");

    assert_eq!(delivered_files(&out), vec!["U2.js"]);
    assert!(out.asts[0].has_bindings());
    assert_eq!(out.bindings.len(), 1);
    let size = out
        .binding("Lp/T4;.size)I")
        .flatten()
        .expect("field of T4");
    assert_eq!(size.kind(), BindingKind::Variable);
    assert_eq!(size.name(), "size");

    assert_eq!(stats.processed_units, 4);
    assert_eq!(stats.released_units, 1);
    assert_eq!(stats.delivered_asts, 1);
    assert_eq!(stats.delivered_bindings, 1);
    assert!(!stats.any_aborted());
}

#[test]
fn test_nothing_requested_releases_every_unit() {
    let (result, out) = run(ResolverOptions::default(), &five_units());
    let stats = result.expect("pass succeeds");
    assert!(out.asts.is_empty());
    assert!(out.bindings.is_empty());
    assert_eq!(stats.processed_units, 0);
    assert_eq!(stats.released_units, 5);
}

#[test]
fn test_unit_keys_follow_their_unit_and_global_keys_come_last() {
    let request = ResolveRequest::new()
        .unit("Derived.js", r#"{ "types": [{ "name": "Derived", "superclass": "Base" }] }"#)
        .unit("Base.js", r#"{ "types": [{ "name": "Base" }] }"#)
        .all_asts()
        .key("I")
        .key("LDerived;")
        .key("LBase;")
        .key("[LBase;");
    let mut log = EventLog::default();
    UnitResolver::new(ResolverOptions::default())
        .resolve(&StandardProject::new("test"), &request, &mut log)
        .expect("pass succeeds");
    assert_eq!(
        log.events,
        vec![
            "ast Base.js",
            "key LBase; true",
            "ast Derived.js",
            "key LDerived; true",
            "key I true",
            "key [LBase; true",
        ]
    );
}

#[test]
fn test_keys_without_an_owning_unit() {
    let request = five_units()
        .key("I")
        .key("[Lp/T1;")
        .key("p")
        .key("Lp/Nope;")
        .key("Lp/T1;junk");
    let (result, out) = run(ResolverOptions::default(), &request);
    let stats = result.expect("pass succeeds");

    assert_eq!(stats.released_units, 5, "no key keeps a unit alive");
    assert_eq!(stats.delivered_bindings, 5);
    let keys: Vec<&str> = out.bindings.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["I", "[Lp/T1;", "p", "Lp/Nope;", "Lp/T1;junk"]);

    let int = out.binding("I").flatten().expect("int");
    assert_eq!(int.name(), "int");
    let array = out
        .binding("[Lp/T1;")
        .flatten()
        .and_then(Binding::as_type)
        .expect("array of T1");
    assert_eq!(array.dimensions(), 1);
    assert_eq!(array.name(), "T1[]");
    let package = out.binding("p").flatten().expect("package");
    assert_eq!(package.kind(), BindingKind::Package);
    assert!(matches!(out.binding("Lp/Nope;"), Some(None)));
    assert!(matches!(out.binding("Lp/T1;junk"), Some(None)));
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_units_past_the_threshold_are_diet_parsed() {
    let request = ResolveRequest::new()
        .unit("U1.js", &typed_unit("T1"))
        .unit("Body.js", BODY);
    let resolver = UnitResolver::new(ResolverOptions::default().with_parse_threshold(1));
    let units = resolver.parse_units(&request);
    assert!(!units["U1.js"].is_diet());
    assert!(units["Body.js"].is_diet());

    let mut out = CollectingRequestor::new();
    resolver
        .resolve(&StandardProject::new("test"), &request.ast("Body.js"), &mut out)
        .expect("pass succeeds");
    let ast = out.ast("Body.js").expect("body unit");
    assert!(!ast.tree.flags.contains(SyntaxFlags::DIET));
    let names: Vec<String> = ast
        .declarations()
        .iter()
        .map(|(_, binding)| binding.name().to_string())
        .collect();
    assert!(names.contains(&"local".to_string()), "{names:?}");
}

#[test]
fn test_duplicate_units_keep_the_first() {
    let request = ResolveRequest::new()
        .unit("U1.js", &typed_unit("T1"))
        .unit("U1.js", &typed_unit("Other"));
    let units = UnitResolver::new(ResolverOptions::default()).parse_units(&request);
    assert_eq!(units.len(), 1);

    let (result, out) = run(
        ResolverOptions::default(),
        &request.clone().all_asts().key("Lp/T1;").key("Lp/Other;"),
    );
    result.expect("pass succeeds");
    assert_eq!(delivered_files(&out), vec!["U1.js"], "one tree per unit");
    assert!(out.binding("Lp/T1;").flatten().is_some());
    assert!(matches!(out.binding("Lp/Other;"), Some(None)));
}

#[test]
fn test_malformed_unit_needs_statements_recovery() {
    let request = ResolveRequest::new().unit("Bad.js", "not json").all_asts();

    let (result, out) = run(ResolverOptions::default(), &request);
    assert_eq!(result.expect("pass succeeds").processed_units, 0);
    assert!(!out.asts[0].has_bindings());

    let options = ResolverOptions {
        statements_recovery: true,
        ..ResolverOptions::default()
    };
    let (result, out) = run(options, &request);
    assert_eq!(result.expect("pass succeeds").processed_units, 1);
    assert!(out.asts[0].has_bindings());
}

// =============================================================================
// Failures
// =============================================================================

/// Hands out a tree with a dangling child for `Broken.js`.
struct BrokenFrontend;

impl Frontend for BrokenFrontend {
    fn parse(&self, file_name: &str, contents: &str, mode: ParseMode) -> ParsedUnit {
        if file_name == "Broken.js" {
            let tree = TreeBuilder::new(file_name).finish(
                NodeIndex::NONE,
                Vec::new(),
                vec![NodeIndex(9_999)],
                Vec::new(),
            );
            return ParsedUnit {
                tree,
                deferred: Vec::new(),
            };
        }
        JsonFrontend::new().parse(file_name, contents, mode)
    }

    fn parse_bodies(&self, unit: ParsedUnit) -> ParsedUnit {
        JsonFrontend::new().parse_bodies(unit)
    }
}

#[test]
fn test_internal_failure_escapes_after_earlier_units_were_delivered() {
    let request = ResolveRequest::new()
        .unit("Good.js", &typed_unit("Good"))
        .unit("Broken.js", "{}")
        .unit("Late.js", &typed_unit("Late"))
        .all_asts();
    let mut out = CollectingRequestor::new();
    let result = UnitResolver::with_frontend(BrokenFrontend, ResolverOptions::default()).resolve(
        &StandardProject::new("test"),
        &request,
        &mut out,
    );
    match result {
        Err(DriverError::Internal(err)) => {
            assert!(!err.is_abort());
            assert_eq!(&**err.file_name(), "Broken.js");
        }
        other => panic!("expected an internal failure, got {other:?}"),
    }
    assert_eq!(delivered_files(&out), vec!["Good.js"]);
}

#[test]
fn test_abort_falls_back_to_syntax_and_continues() {
    let project =
        StandardProject::with_library("no-object", StandardLibrary::new().without("Object"));
    let request = five_units().ast("U1.js").ast("U3.js").key("Lp/T3;");
    let mut out = CollectingRequestor::new();
    let stats = UnitResolver::new(ResolverOptions::default())
        .resolve(&project, &request, &mut out)
        .expect("aborts do not fail the pass");

    assert_eq!(delivered_files(&out), vec!["U1.js", "U3.js"]);
    assert!(out.asts.iter().all(|ast| !ast.has_bindings()));
    assert!(out.asts[0].declarations().is_empty());
    assert!(matches!(out.binding("Lp/T3;"), Some(None)));
    assert!(stats.any_aborted());
    assert_eq!(stats.aborted_units, 3);
    assert_eq!(stats.released_units, 2);
}

#[test]
fn test_aborted_unit_types_are_gone_for_later_keys() {
    let project =
        StandardProject::with_library("no-object", StandardLibrary::new().without("Object"));
    let request = five_units()
        .ast("U1.js")
        .key("[Lp/T1;")
        .key("Lp/T1;")
        .key("Lp/T1;.size)I");
    let mut out = CollectingRequestor::new();
    let stats = UnitResolver::new(ResolverOptions::default().with_recovery(true))
        .resolve(&project, &request, &mut out)
        .expect("aborts do not fail the pass");

    assert!(stats.any_aborted());
    assert_eq!(out.bindings.len(), 3);
    for (key, binding) in &out.bindings {
        assert!(binding.is_none(), "{key} answered {binding:?}");
    }
}

/// Cancels the pass when the first tree arrives.
struct CancelOnFirstAst {
    token: CancellationToken,
    inner: CollectingRequestor,
}

impl AstRequestor for CancelOnFirstAst {
    fn accept_ast(&mut self, ast: ResolvedAst) {
        self.token.cancel();
        self.inner.accept_ast(ast);
    }

    fn accept_binding(&mut self, key: &str, binding: Option<Binding>) {
        self.inner.accept_binding(key, binding);
    }
}

#[test]
fn test_cancellation_stops_at_the_next_checkpoint() {
    let token = CancellationToken::new();
    let request = five_units().all_asts().key("Lp/T1;").key("I");
    let mut out = CancelOnFirstAst {
        token: token.clone(),
        inner: CollectingRequestor::new(),
    };
    let result = UnitResolver::new(ResolverOptions::default())
        .with_cancellation(token)
        .resolve(&StandardProject::new("test"), &request, &mut out);
    assert_eq!(result, Err(DriverError::Cancelled));
    assert_eq!(delivered_files(&out.inner), vec!["U1.js"]);
    assert!(out.inner.bindings.is_empty(), "no key is answered after cancellation");
}

#[test]
fn test_cancelled_before_the_pass() {
    let token = CancellationToken::new();
    token.cancel();
    let mut out = CollectingRequestor::new();
    let result = UnitResolver::new(ResolverOptions::default())
        .with_cancellation(token)
        .resolve(&StandardProject::new("test"), &five_units().all_asts(), &mut out);
    assert_eq!(result, Err(DriverError::Cancelled));
    assert!(out.asts.is_empty());
}

// =============================================================================
// Syntax only
// =============================================================================

struct MissingProject;

impl Project for MissingProject {
    fn name(&self) -> &str {
        "missing"
    }

    fn name_environment(&self) -> Option<Arc<dyn NameEnvironment>> {
        None
    }
}

#[test]
fn test_missing_project_parses_syntax_only() {
    let request = five_units().ast("U1.js").ast("U4.js").key("Lp/T1;");
    let mut out = CollectingRequestor::new();
    let stats = UnitResolver::new(ResolverOptions::default())
        .resolve(&MissingProject, &request, &mut out)
        .expect("syntax-only pass succeeds");

    assert_eq!(delivered_files(&out), vec!["U1.js", "U4.js"]);
    assert!(out.asts.iter().all(|ast| !ast.has_bindings()));
    assert!(matches!(out.binding("Lp/T1;"), Some(None)));
    assert_eq!(stats.processed_units, 0);
    assert_eq!(stats.delivered_asts, 2);
}

#[test]
fn test_bindings_can_be_turned_off() {
    let options = ResolverOptions {
        resolve_bindings: false,
        ..ResolverOptions::default()
    };
    let (result, out) = run(options, &five_units().ast("U2.js"));
    result.expect("pass succeeds");
    assert_eq!(delivered_files(&out), vec!["U2.js"]);
    assert!(!out.asts[0].has_bindings());
}
