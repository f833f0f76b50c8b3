use super::*;
use std::io::Write;

fn resolve_args(argv: &[&str]) -> ResolveArgs {
    let args = CliArgs::try_parse_from(argv).expect("valid arguments");
    match args.command {
        Command::Resolve(resolve) => resolve,
    }
}

#[test]
fn test_resolve_arguments() {
    let args = resolve_args(&[
        "jsbind",
        "resolve",
        "units/Shapes.js",
        "Canvas.js",
        "--key",
        "Ldraw/Shape;",
        "-k",
        "I",
        "--ast-for",
        "Canvas.js",
        "--recovery",
        "--parse-threshold",
        "3",
    ]);
    assert_eq!(args.units.len(), 2);
    assert_eq!(args.keys, vec!["Ldraw/Shape;", "I"]);
    assert_eq!(args.ast_for, vec![PathBuf::from("Canvas.js")]);
    assert!(args.recovery);
    assert!(!args.all_asts);

    let options = args.resolver_options().expect("no options file");
    assert!(options.bindings_recovery);
    assert_eq!(options.parse_threshold, 3);
    assert!(options.resolve_bindings);
}

#[test]
fn test_units_are_required() {
    assert!(CliArgs::try_parse_from(["jsbind", "resolve"]).is_err());
    assert!(CliArgs::try_parse_from(["jsbind"]).is_err());
}

#[test]
fn test_flags_override_the_options_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{ "bindingsRecovery": false, "parseThreshold": 7, "statementsRecovery": true }}"#
    )
    .expect("write options");
    let path = file.path().to_string_lossy().into_owned();

    let args = resolve_args(&["jsbind", "resolve", "A.js", "--options", &path, "--recovery"]);
    let options = args.resolver_options().expect("options file");
    assert!(options.bindings_recovery);
    assert!(options.statements_recovery);
    assert_eq!(options.parse_threshold, 7);

    let args = resolve_args(&["jsbind", "resolve", "A.js", "--options", &path, "--syntax-only"]);
    assert!(!args.resolver_options().expect("options file").resolve_bindings);
}

#[test]
fn test_unreadable_options_file() {
    let args = resolve_args(&["jsbind", "resolve", "A.js", "--options", "/nonexistent/options.json"]);
    let err = args.resolver_options().expect_err("missing file");
    assert!(err.to_string().contains("failed to read options file"), "{err}");
}

#[test]
fn test_unit_name_is_the_file_name() {
    assert_eq!(unit_name(Path::new("some/dir/Shapes.js")), "Shapes.js");
    assert_eq!(unit_name(Path::new("Canvas.js")), "Canvas.js");
}
