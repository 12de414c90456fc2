//! Integration tests for template execution errors.

use replace_vars::interpreter::{ExecError, ExecErrorKind};
use replace_vars::{Engine, RenderError, VariableMap, vars};

fn exec_error(engine: &Engine, template: &str, vars: &VariableMap) -> ExecError {
    match engine.render_str(template, vars) {
        Err(RenderError::Exec(e)) => e,
        Err(RenderError::Parse(e)) => panic!("unexpected parse error: {e}"),
        Ok(output) => panic!("expected an error, rendered {output:?}"),
    }
}

fn kind(template: &str, vars: &VariableMap) -> ExecErrorKind {
    exec_error(&Engine::new(), template, vars).kind
}

#[test]
fn test_field_on_string() {
    let vars = vars! { "A" => "x" };
    assert_eq!(
        kind("{{.A.B}}", &vars),
        ExecErrorKind::CannotEvaluateField {
            field: "B".into(),
            type_name: "string",
        }
    );
}

#[test]
fn test_arguments_to_non_function() {
    let vars = vars! { "A" => "x" };
    assert_eq!(
        kind("{{.A 1}}", &vars),
        ExecErrorKind::NotAFunction {
            operand: ".A".into()
        }
    );
}

#[test]
fn test_pipe_into_non_function() {
    let vars = vars! { "A" => "x" };
    assert!(matches!(
        kind("{{.A | .A}}", &vars),
        ExecErrorKind::NotAFunction { .. }
    ));
}

#[test]
fn test_range_over_string() {
    let vars = vars! { "A" => "x" };
    assert_eq!(
        kind("{{range .A}}{{end}}", &vars),
        ExecErrorKind::CannotIterate {
            type_name: "string"
        }
    );
}

#[test]
fn test_wrong_argument_count() {
    let vars = vars! {};
    assert!(matches!(
        kind("{{not 1 2}}", &vars),
        ExecErrorKind::ArgumentCount { got: 2, .. }
    ));
}

#[test]
fn test_logic_without_operands() {
    let vars = vars! {};
    assert_eq!(
        kind("{{and}}", &vars),
        ExecErrorKind::ArgumentCount {
            function: "and".into(),
            expected: "at least 1".into(),
            got: 0,
        }
    );
}

#[test]
fn test_and_evaluates_operands_up_to_falsy() {
    let vars = vars! { "A" => "x" };
    assert!(matches!(
        kind(r#"{{and .A (index .A "k")}}"#, &vars),
        ExecErrorKind::InvalidArgument { function: "index", .. }
    ));
}

#[test]
fn test_int_and_float_do_not_compare() {
    let vars = vars! {};
    assert_eq!(
        kind("{{eq 1 1.0}}", &vars),
        ExecErrorKind::IncompatibleTypes {
            left: "int",
            right: "float",
        }
    );
}

#[test]
fn test_incompatible_comparison() {
    let vars = vars! {};
    assert_eq!(
        kind(r#"{{lt 1 "a"}}"#, &vars),
        ExecErrorKind::IncompatibleTypes {
            left: "int",
            right: "string"
        }
    );
}

#[test]
fn test_map_is_not_comparable() {
    let vars = vars! {};
    assert!(matches!(
        kind(r#"{{eq . "a"}}"#, &vars),
        ExecErrorKind::InvalidComparison { type_name: "map" }
    ));
}

#[test]
fn test_printf_unsupported_verb() {
    let vars = vars! {};
    assert_eq!(
        kind(r#"{{printf "%x" 1}}"#, &vars),
        ExecErrorKind::UnsupportedVerb { verb: 'x' }
    );
}

#[test]
fn test_printf_missing_argument() {
    let vars = vars! {};
    assert_eq!(
        kind(r#"{{printf "%s %s" "a"}}"#, &vars),
        ExecErrorKind::MissingFormatArgument { verb: 's' }
    );
}

#[test]
fn test_printf_wrong_type() {
    let vars = vars! { "A" => "x" };
    assert!(matches!(
        kind(r#"{{printf "%d" .A}}"#, &vars),
        ExecErrorKind::InvalidArgument {
            function: "printf",
            ..
        }
    ));
}

#[test]
fn test_len_of_int() {
    let vars = vars! {};
    assert!(matches!(
        kind("{{len 3}}", &vars),
        ExecErrorKind::InvalidArgument { function: "len", .. }
    ));
}

#[test]
fn test_no_such_template() {
    let vars = vars! {};
    assert_eq!(
        kind(r#"{{template "nope"}}"#, &vars),
        ExecErrorKind::NoSuchTemplate {
            name: "nope".into()
        }
    );
}

#[test]
fn test_recursion_is_limited() {
    let vars = vars! {};
    let template = r#"{{define "loop"}}{{template "loop"}}{{end}}{{template "loop"}}"#;
    assert_eq!(
        kind(template, &vars),
        ExecErrorKind::MaxDepthExceeded { max: 100 }
    );

    let shallow = Engine::builder().max_depth(3).build();
    assert_eq!(
        exec_error(&shallow, template, &vars).kind,
        ExecErrorKind::MaxDepthExceeded { max: 3 }
    );
}

#[test]
fn test_bounded_recursion_succeeds() {
    let vars = vars! { "A" => "x" };
    let template = r#"{{define "once"}}[{{.}}]{{end}}{{template "once" .A}}{{template "once" .A}}"#;
    assert_eq!(Engine::new().render_str(template, &vars).unwrap(), "[x][x]");
}

#[test]
fn test_error_reports_action_position() {
    let vars = vars! { "A" => "x" };
    let err = exec_error(&Engine::new(), "line one\n  {{.A.B}}", &vars);
    assert_eq!((err.line, err.column), (2, 3));
    assert_eq!(
        err.to_string(),
        "executing at 2:3: can't evaluate field B in type string"
    );
}

#[test]
fn test_error_after_output_returns_nothing() {
    let vars = vars! { "A" => "x" };
    let result = Engine::new().render_str("partial output {{range .A}}{{end}}", &vars);
    assert!(matches!(result, Err(RenderError::Exec(_))));
}

#[test]
fn test_error_inside_false_branch_is_not_raised() {
    let vars = vars! { "A" => "x" };
    assert_eq!(
        Engine::new()
            .render_str("{{if .MISSING}}{{.A.B}}{{end}}ok", &vars)
            .unwrap(),
        "ok"
    );
}
