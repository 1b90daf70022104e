// ABOUTME: Error discipline tests — catchable vs non-catchable classes,
// the try envelope, and the host-facing report

use basil::error::ErrorClass;
use basil::host::NullHost;
use basil::security::SecurityPolicy;
use basil::value::Value;
use basil::{evaluate, new_environment};
use std::rc::Rc;

fn setup() -> Rc<basil::env::Environment> {
    new_environment(
        Vec::new(),
        indexmap::IndexMap::new(),
        SecurityPolicy::default(),
        Box::new(NullHost),
    )
}

fn run(src: &str) -> Value {
    evaluate(src, &setup()).unwrap_or_else(|e| panic!("eval failed for {src:?}: {e:?}"))
}

#[test]
fn test_try_intercepts_each_catchable_class() {
    // io (NullHost refuses), value (fail), database (no driver).
    for (src, class) in [
        ("try fn(){ <== \"./nope.txt\" }()", "io"),
        ("try fn(){ fail(\"x\") }()", "value"),
        ("try fn(){ @sqlite(\"db\") }()", "database"),
    ] {
        let outcome = run(&format!("let {{error}} = {src}\nerror.class"));
        assert_eq!(outcome, Value::str(class), "for {src}");
    }
}

#[test]
fn test_non_catchable_classes_halt() {
    for (src, class) in [
        ("try fn(){ missing }()", ErrorClass::Undefined),
        ("try fn(){ 1 + [] }()", ErrorClass::Operator),
        ("try fn(){ [1][9] }()", ErrorClass::Index),
        ("try fn(){ 5(1) }()", ErrorClass::Type),
        ("try fn(){ fn(a){a}.bogus() }()", ErrorClass::Undefined),
    ] {
        let err = evaluate(src, &setup()).unwrap_err();
        assert_eq!(err.class, class, "for {src}");
        assert!(!err.class.is_catchable());
    }
}

#[test]
fn test_error_short_circuits_expression() {
    // The second operand is never evaluated once the first errors.
    let src = "
let hits = []
let boom = fn(){ missing }
let note = fn(){ hits.push(1); 1 }
let {error} = try fn(){ boom() + note() }()
hits.length()
";
    let err = evaluate(src, &setup()).unwrap_err();
    assert_eq!(err.class, ErrorClass::Undefined);
}

#[test]
fn test_error_unwinds_through_call_stack() {
    let src = "
let inner = fn(){ fail({message: \"deep\", status: 404}) }
let middle = fn(){ inner() }
let outer = fn(){ middle() }
let {result, error} = try outer()
[result, error.message, error.status]
";
    assert_eq!(
        run(src),
        Value::array(vec![Value::Null, Value::str("deep"), Value::Int(404)])
    );
}

#[test]
fn test_first_failing_statement_ends_block() {
    let src = "
let hits = []
let f = fn() {
  hits.push(1)
  fail(\"stop here\")
  hits.push(2)
}
let {error} = try f()
hits
";
    assert_eq!(run(src), Value::array(vec![Value::Int(1)]));
}

#[test]
fn test_report_envelope_shape() {
    let err = evaluate("let x =\n  1 + []", &setup()).unwrap_err();
    let report = err.to_report();
    assert_eq!(report["class"], "operator");
    assert_eq!(report["code"], "OP-0001");
    assert!(report["message"].is_string());
    assert!(report["line"].is_number());
    assert!(report["column"].is_number());
}

#[test]
fn test_parse_errors_accumulate_but_first_reaches_host() {
    let err = evaluate("let = 1\nlet ok = 2\nlet } = 3", &setup()).unwrap_err();
    assert_eq!(err.class, ErrorClass::Parse);
    assert_eq!(err.line, Some(1));
}

#[test]
fn test_fail_with_fields_round_trips() {
    let src = "
let {error} = try fn(){ fail({message: \"m\", code: \"APP-0001\", detail: [1,2]}) }()
[error.code, error.detail.length()]
";
    assert_eq!(
        run(src),
        Value::array(vec![Value::str("APP-0001"), Value::Int(2)])
    );
}

#[test]
fn test_nested_try() {
    let src = "
let risky = fn(){ fail(\"inner\") }
let wrapper = fn() {
  let {result, error} = try risky()
  if (error) { \"handled: \" + error } else { result }
}
let {result, error} = try wrapper()
[result, error]
";
    assert_eq!(
        run(src),
        Value::array(vec![Value::str("handled: inner"), Value::Null])
    );
}

#[test]
fn test_return_stop_skip_never_reach_try() {
    // Control-flow sentinels pass through `try` untouched.
    let src = "
let f = fn() {
  let {result, error} = try fn(){ 1 }()
  return \"returned\"
}
f()
";
    assert_eq!(run(src), Value::str("returned"));

    let src = "for x in [1,2,3] { let {result} = try fn(){ x }()\nif (x == 2) { stop }\nresult }";
    assert_eq!(run(src), Value::array(vec![Value::Int(1)]));
}

#[test]
fn test_stop_returns_collected_prefix() {
    let src = "for x in [1,2,3,4] { if (x == 3) { stop }; x * 10 }";
    assert_eq!(
        run(src),
        Value::array(vec![Value::Int(10), Value::Int(20)])
    );
}

#[test]
fn test_arity_is_not_enforced_loosely_for_builtins() {
    // Builtins declare arity and reject mismatches hard.
    let err = evaluate("type()", &setup()).unwrap_err();
    assert_eq!(err.class, ErrorClass::Arity);
}

#[test]
fn test_division_by_zero_is_operator_class() {
    let err = evaluate("1 / 0", &setup()).unwrap_err();
    assert_eq!(err.code, "OP-0004");
    assert!(!err.class.is_catchable());
}

#[test]
fn test_import_errors() {
    let err = evaluate("@basil/auth", &setup()).unwrap_err();
    assert_eq!(err.code, "IMPORT-0003");
    let err = evaluate("@std/nope", &setup()).unwrap_err();
    assert_eq!(err.code, "IMPORT-0001");
}
