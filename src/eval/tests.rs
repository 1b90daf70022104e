// ABOUTME: Evaluator unit tests — scoping, control flow, coercion, dispatch

use crate::env::{Context, Environment};
use crate::error::{Error, ErrorClass};
use crate::parser::parse;
use crate::stdlib;
use crate::value::Value;
use std::rc::Rc;

fn test_env() -> Rc<Environment> {
    let env = Environment::root(Context::minimal());
    stdlib::register_globals(&env);
    env
}

fn run(src: &str) -> Value {
    run_in(src, &test_env())
}

fn run_in(src: &str, env: &Rc<Environment>) -> Value {
    let program = parse(src).unwrap_or_else(|e| panic!("parse failed for {src:?}: {e:?}"));
    super::eval_program(&program, env)
        .unwrap_or_else(|e| panic!("eval failed for {src:?}: {e:?}"))
}

fn run_err(src: &str) -> Error {
    let program = parse(src).unwrap_or_else(|e| panic!("parse failed for {src:?}: {e:?}"));
    match super::eval_program(&program, &test_env()) {
        Ok(value) => panic!("expected error from {src:?}, got {value:?}"),
        Err(err) => err,
    }
}

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Int).collect())
}

#[test]
fn test_block_value_is_last_statement() {
    assert_eq!(run("1\n2\n3"), Value::Int(3));
    assert_eq!(run(""), Value::Null);
}

#[test]
fn test_let_shadowing_and_assignment_scope() {
    // `let` shadows; bare assignment writes the defining scope.
    let src = "
let n = 1
let bump = fn() { n = n + 1; n }
bump()
bump()
n
";
    assert_eq!(run(src), Value::Int(3));
}

#[test]
fn test_assignment_creates_when_unbound() {
    assert_eq!(run("fresh = 9\nfresh"), Value::Int(9));
}

#[test]
fn test_if_truthiness_table() {
    for falsy in ["false", "null", "0", "0.0", "\"\"", "[]"] {
        let src = format!("if ({falsy}) 1 else 2");
        assert_eq!(run(&src), Value::Int(2), "{falsy} should be falsy");
    }
    for truthy in ["true", "1", "-1", "0.5", "\"x\"", "[0]", "{}"] {
        let src = format!("let v = {truthy}\nif (v) 1 else 2");
        assert_eq!(run(&src), Value::Int(1), "{truthy} should be truthy");
    }
}

#[test]
fn test_if_without_else_yields_null() {
    assert_eq!(run("if (false) 1"), Value::Null);
}

#[test]
fn test_closures_capture_by_reference() {
    // A counter closure observes its captured cell across calls.
    let src = "let c = fn(){ let n = 0; fn(){ n = n+1; n } }(); [c(), c(), c()]";
    assert_eq!(run(src), ints(&[1, 2, 3]));
}

#[test]
fn test_two_closures_share_environment() {
    let src = "
let make = fn() {
  let n = 0
  { bump: fn(){ n = n + 1; n }, read: fn(){ n } }
}
let pair = make()
pair.bump()
pair.bump()
pair.read()
";
    assert_eq!(run(src), Value::Int(2));
}

#[test]
fn test_for_is_map_and_filter() {
    let src = "for (x in [1,2,3,4,5]) { if (x % 2 == 0) { x * 10 } }";
    assert_eq!(run(src), ints(&[20, 40]));
}

#[test]
fn test_for_stop_and_skip() {
    let src = "for x in [1,2,3,4,5] { if (x == 4) { stop }; if (x == 2) { skip }; x }";
    assert_eq!(run(src), ints(&[1, 3]));
}

#[test]
fn test_for_over_string_yields_characters() {
    let src = "for ch in \"héj\" { ch }";
    assert_eq!(
        run(src),
        Value::array(vec![Value::str("h"), Value::str("é"), Value::str("j")])
    );
}

#[test]
fn test_for_over_dict_bindings() {
    let values = run("for v in {a: 1, b: 2} { v }");
    assert_eq!(values, ints(&[1, 2]));
    let pairs = run("for k, v in {a: 1, b: 2} { k + v }");
    assert_eq!(pairs, Value::array(vec![Value::str("a1"), Value::str("b2")]));
}

#[test]
fn test_for_over_range() {
    assert_eq!(run("for n in 0..4 { n }"), ints(&[0, 1, 2, 3]));
}

#[test]
fn test_for_mapping_form() {
    let src = "let double = fn(x) { x * 2 }\nfor ([1,2,3]) double";
    assert_eq!(run(src), ints(&[2, 4, 6]));
}

#[test]
fn test_check_returns_from_function() {
    let src = "
let guard = fn(x) {
  check x else \"missing\"
  \"have \" + x
}
[guard(null), guard(\"it\")]
";
    assert_eq!(
        run(src),
        Value::array(vec![Value::str("missing"), Value::str("have it")])
    );
}

#[test]
fn test_try_fail_envelope() {
    let src = "let {result, error} = try fn(){ fail(\"x\") }()\n[result, error.message, error.code]";
    assert_eq!(
        run(src),
        Value::array(vec![Value::Null, Value::str("x"), Value::str("USER-0001")])
    );
}

#[test]
fn test_try_success_envelope() {
    let src = "let {result, error} = try fn(){ 7 }()\n[result, error]";
    assert_eq!(run(src), Value::array(vec![Value::Int(7), Value::Null]));
}

#[test]
fn test_try_does_not_catch_type_errors() {
    let err = run_err("try fn(){ 1 + [] }()");
    assert_eq!(err.class, ErrorClass::Operator);
}

#[test]
fn test_error_dictionary_coerces_to_message() {
    let src = "let {error} = try fn(){ fail(\"boom\") }()\n\"got: \" + error";
    assert_eq!(run(src), Value::str("got: boom"));
}

#[test]
fn test_function_defaults_and_extra_args() {
    let src = "let f = fn(a, b = 10) { a + b }\n[f(1), f(1, 2), f(1, 2, 99)]";
    assert_eq!(run(src), ints(&[11, 3, 3]));
}

#[test]
fn test_missing_param_without_default_is_undefined() {
    let err = run_err("let f = fn(a, b) { a + b }\nf(1)");
    assert_eq!(err.class, ErrorClass::Undefined);
}

#[test]
fn test_rest_parameter() {
    let src = "let f = fn(first, ...rest) { [first, rest] }\nf(1, 2, 3)";
    assert_eq!(
        run(src),
        Value::array(vec![Value::Int(1), ints(&[2, 3])])
    );
}

#[test]
fn test_destructuring_with_rest() {
    let src = "let [a, ...rest] = [1,2,3,4]\n[a, rest]";
    assert_eq!(
        run(src),
        Value::array(vec![Value::Int(1), ints(&[2, 3, 4])])
    );
}

#[test]
fn test_dict_destructuring_alias_and_default() {
    let src = "let {a, b as other, c = 30} = {a: 1, b: 2}\n[a, other, c]";
    assert_eq!(run(src), ints(&[1, 2, 30]));
}

#[test]
fn test_method_dispatch_prefers_dict_entry() {
    let src = "
let d = {length: fn(){ \"custom\" }, a: 1}
d.length()
";
    assert_eq!(run(src), Value::str("custom"));
    // Without an override the type table answers.
    assert_eq!(run("{a: 1, b: 2}.length()"), Value::Int(2));
}

#[test]
fn test_method_receiver_binding() {
    let src = "
let counter = {n: 0, bump: fn(){ self.n = self.n + 1; self.n }}
counter.bump()
counter.bump()
";
    assert_eq!(run(src), Value::Int(2));
}

#[test]
fn test_natural_sort() {
    let src = "[\"file2\", \"file10\", \"file1\"].sort()";
    assert_eq!(
        run(src),
        Value::array(vec![
            Value::str("file1"),
            Value::str("file2"),
            Value::str("file10"),
        ])
    );
}

#[test]
fn test_set_operations_spec_scenarios() {
    assert_eq!(run("[1,2,3] & [2,3,4]"), ints(&[2, 3]));
    assert_eq!(run("[1,2,3] | [2,3,4]"), ints(&[1, 2, 3, 4]));
    assert_eq!(run("[1,2,3] - [2]"), ints(&[1, 3]));
}

#[test]
fn test_string_coercion_scenarios() {
    assert_eq!(run("\"100\" + 10"), Value::str("10010"));
    assert_eq!(run("10 + \"px\""), Value::str("10px"));
}

#[test]
fn test_money_arithmetic_scenarios() {
    assert_eq!(run("$10.00 + $5.25").to_string(), "$15.25");
    let err = run_err("$10.00 + €5.00");
    assert_eq!(err.class, ErrorClass::Operator);
    assert_eq!(err.code, "OP-0002");
}

#[test]
fn test_datetime_combine_and_shift() {
    assert_eq!(
        run("@2024-01-15 & @09:30").to_string(),
        "2024-01-15T09:30:00"
    );
    assert_eq!(run("@2024-01-15 + @1d").to_string(), "2024-01-16");
    assert_eq!(
        run("(@2024-01-02 - @2024-01-01).hours()"),
        Value::Int(24)
    );
}

#[test]
fn test_regex_operators() {
    let src = "\"2024-01\" ~ /(\\d+)-(\\d+)/";
    assert_eq!(
        run(src),
        Value::array(vec![
            Value::str("2024-01"),
            Value::str("2024"),
            Value::str("01"),
        ])
    );
    assert_eq!(run("\"abc\" ~ /\\d+/"), Value::Null);
    assert_eq!(run("\"abc\" !~ /\\d+/"), Value::Bool(true));
}

#[test]
fn test_membership_and_identity() {
    assert_eq!(run("2 in [1,2,3]"), Value::Bool(true));
    assert_eq!(run("9 not in [1,2,3]"), Value::Bool(true));
    assert_eq!(run("\"a\" in {a: 1}"), Value::Bool(true));
    assert_eq!(run("42 is \"integer\""), Value::Bool(true));
    assert_eq!(run("42 is not \"string\""), Value::Bool(true));
}

#[test]
fn test_optional_indexing() {
    assert_eq!(run("[1,2][?5]"), Value::Null);
    assert_eq!(run("let xs = null\nxs[?0]"), Value::Null);
    let err = run_err("[1,2][5]");
    assert_eq!(err.class, ErrorClass::Index);
}

#[test]
fn test_slices() {
    assert_eq!(run("[1,2,3,4][1..3]"), ints(&[2, 3]));
    assert_eq!(run("[1,2,3,4][2..]"), ints(&[3, 4]));
    assert_eq!(run("\"hello\"[..2]"), Value::str("he"));
}

#[test]
fn test_coalesce_and_logic_values() {
    assert_eq!(run("null ?? 5"), Value::Int(5));
    assert_eq!(run("0 ?? 5"), Value::Int(0));
    assert_eq!(run("false or 7"), Value::Int(7));
    assert_eq!(run("3 and 7"), Value::Int(7));
    assert_eq!(run("0 and 7"), Value::Int(0));
}

#[test]
fn test_dict_insertion_order_preserved() {
    let src = "let d = {z: 1, a: 2}\nd.set(\"m\", 3)\nd.keys()";
    assert_eq!(
        run(src),
        Value::array(vec![Value::str("z"), Value::str("a"), Value::str("m")])
    );
}

#[test]
fn test_spread_in_dict_literal() {
    let src = "let base = {a: 1, b: 2}\nlet out = {...base, b: 9}\n[out.a, out.b]";
    assert_eq!(run(src), ints(&[1, 9]));
}

#[test]
fn test_tag_rendering_spec_scenario() {
    let src = "(<div class={ \"a \" + \"b\" }><p>\"hello\"</p></div>).render()";
    assert_eq!(
        run(src),
        Value::str("<div class=\"a b\"><p>hello</p></div>")
    );
}

#[test]
fn test_tag_spread_attribute_right_wins() {
    let src = "(<a href=\"x\" {...{href: \"y\"}}>go</a>).render()";
    assert_eq!(run(src), Value::str("<a href=\"y\">go</a>"));
}

#[test]
fn test_component_dispatch() {
    let src = "
let Card = fn(props) {
  <div class=\"card\"><h2>{props.title}</h2>{props.contents}</div>
}
(<Card title=\"Hi\"><p>body</p></Card>).render()
";
    assert_eq!(
        run(src),
        Value::str("<div class=\"card\"><h2>Hi</h2><p>body</p></div>")
    );
}

#[test]
fn test_loop_results_embed_in_tags() {
    let src = "(<ul>{for x in [1,2] { <li>{x}</li> }}</ul>).render()";
    assert_eq!(run(src), Value::str("<ul><li>1</li><li>2</li></ul>"));
}

#[test]
fn test_recursion_limit_is_state_error() {
    let err = run_err("let f = fn(){ f() }\nf()");
    assert_eq!(err.class, ErrorClass::State);
    assert_eq!(err.code, "STATE-0002");
}

#[test]
fn test_undefined_name_carries_position() {
    let err = run_err("let a = 1\nmissing");
    assert_eq!(err.class, ErrorClass::Undefined);
    assert_eq!(err.line, Some(2));
}

#[test]
fn test_schema_declaration_and_record_validation() {
    let src = "
@schema User { name: string.required().min(2), age: int.min(0) }
let ok = User({name: \"Ada\", age: 36})
let bad = User({age: -1})
[ok.valid(), bad.valid(), bad.errors().length()]
";
    assert_eq!(
        run(src),
        Value::array(vec![Value::Bool(true), Value::Bool(false), Value::Int(2)])
    );
}

#[test]
fn test_record_is_schema() {
    let src = "
@schema User { name: string }
@schema Post { title: string }
let u = User({name: \"x\"})
[u is User, u is Post]
";
    assert_eq!(
        run(src),
        Value::array(vec![Value::Bool(true), Value::Bool(false)])
    );
}

#[test]
fn test_fail_if_invalid_is_catchable() {
    let src = "
@schema User { name: string.required() }
let u = User({})
let {result, error} = try u.failIfInvalid()
[error.code, error.status, error.fields.length()]
";
    assert_eq!(
        run(src),
        Value::array(vec![Value::str("USER-0002"), Value::Int(422), Value::Int(1)])
    );
}

#[test]
fn test_query_dsl_over_arrays() {
    let src = "
let users = [{name: \"bo\", age: 40}, {name: \"al\", age: 20}, {name: \"cy\", age: 30}]
@query(users) { where: fn(u){ u.age > 21 }, orderBy: \"age\", select: [\"name\"] }
";
    let result = run(src);
    let Value::Array(rows) = &result else {
        panic!("expected array")
    };
    let rows = rows.borrow();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_key("name"), Some(Value::str("cy")));
    assert_eq!(rows[1].get_key("name"), Some(Value::str("bo")));
}

#[test]
fn test_insert_and_delete_dsl() {
    let src = "
let rows = []
@insert(rows) { name: \"a\" }
@insert(rows) { name: \"b\" }
let removed = @delete(rows) { where: fn(r){ r.name == \"a\" } }
[removed, rows.length()]
";
    assert_eq!(run(src), ints(&[1, 1]));
}

#[test]
fn test_std_module_access() {
    assert_eq!(run("@std/math.abs(-3)"), Value::Float(3.0));
    let src = "import @std/valid as v\nv.email(\"a@b.c\")";
    assert_eq!(run(src), Value::Bool(true));
}

#[test]
fn test_cancellation_surfaces_as_catchable_io() {
    let env = test_env();
    env.context().cancel();
    let program = parse("1 + 1").unwrap();
    let err = super::eval_program(&program, &env).unwrap_err();
    assert_eq!(err.code, "IO-0099");
    assert!(err.class.is_catchable());
}

#[test]
fn test_map_filter_equivalence_property() {
    // A for loop is map followed by filtering out nulls.
    let src_for = "for (x in [1,2,3,4,5,6]) { if (x % 3 == 0) { x } }";
    let src_map = "
[1,2,3,4,5,6].map(fn(x){ if (x % 3 == 0) { x } }).filter(fn(v){ v != null })
";
    assert_eq!(run(src_for), run(src_map));
}

#[test]
fn test_json_round_trip_property() {
    let src = "\"{\\\"a\\\":1,\\\"b\\\":[true,null]}\".parseJSON().toJSON()";
    assert_eq!(run(src), Value::str("{\"a\":1,\"b\":[true,null]}"));
}

#[test]
fn test_interpolated_strings() {
    assert_eq!(run("let n = 6\n`n is {n * 7}`"), Value::str("n is 42"));
    assert_eq!(run("let x = 2\n'raw @{x} here'"), Value::str("raw 2 here"));
}

#[test]
fn test_path_join_operator() {
    assert_eq!(run("(@./static + \"app.css\")").to_string(), "./static/app.css");
}

#[test]
fn test_db_errors_are_catchable() {
    // The NullHost provides no database; the error is catchable.
    let src = "let {result, error} = try fn(){ @sqlite(\":memory:\") }()\nerror.class";
    assert_eq!(run(src), Value::str("database"));
}
