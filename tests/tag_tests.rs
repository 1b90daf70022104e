// ABOUTME: HTML materialisation tests — escaping, singletons, components,
// fragments, and raw-text bodies

use basil::host::NullHost;
use basil::render::render_value;
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

fn render(src: &str) -> String {
    let value = evaluate(src, &setup()).unwrap_or_else(|e| panic!("eval failed: {e:?}"));
    render_value(&value)
}

#[test]
fn test_basic_rendering() {
    assert_eq!(
        render("<div class=\"a\"><p>\"hi\"</p></div>"),
        "<div class=\"a\"><p>hi</p></div>"
    );
}

#[test]
fn test_text_and_attribute_escaping() {
    assert_eq!(
        render("<p title={\"a<b\"}>{\"1 < 2 & 3\"}</p>"),
        "<p title=\"a&lt;b\">1 &lt; 2 &amp; 3</p>"
    );
}

#[test]
fn test_quote_escaping_in_attributes() {
    assert_eq!(
        render("<p data-x={\"say \\\"hi\\\"\"}>x</p>"),
        "<p data-x=\"say &quot;hi&quot;\">x</p>"
    );
}

#[test]
fn test_singletons_render_canonically() {
    assert_eq!(render("<br/>"), "<br />");
    assert_eq!(render("<img src=\"/a.png\"/>"), "<img src=\"/a.png\" />");
}

#[test]
fn test_unclosed_singleton_is_a_parse_error() {
    let env = setup();
    let err = evaluate("<input type=\"text\"></input>", &env).unwrap_err();
    assert_eq!(err.code, "PARSE-0005");
}

#[test]
fn test_fragment_emits_children_only() {
    assert_eq!(render("<><p>a</p><p>b</p></>"), "<p>a</p><p>b</p>");
}

#[test]
fn test_interpolated_children_and_attributes() {
    let src = "
let name = \"du\"
<p id={\"u-\" + 7}>hej {name}!</p>
";
    assert_eq!(render(src), "<p id=\"u-7\">hej du!</p>");
}

#[test]
fn test_null_children_vanish() {
    assert_eq!(render("<p>{null}{if (false) \"x\"}ok</p>"), "<p>ok</p>");
}

#[test]
fn test_boolean_attributes() {
    assert_eq!(
        render("<option selected={true} hidden={false}>x</option>"),
        "<option selected>x</option>"
    );
}

#[test]
fn test_spread_attributes_merge_rightward() {
    let src = "
let defaults = {class: \"btn\", role: \"button\"}
<a class=\"base\" {...defaults}>go</a>
";
    assert_eq!(
        render(src),
        "<a class=\"btn\" role=\"button\">go</a>"
    );
}

#[test]
fn test_component_receives_attrs_and_contents() {
    let src = "
let Layout = fn(props) {
  <main data-title={props.title}>{props.contents}</main>
}
<Layout title=\"Home\"><h1>\"Hi\"</h1></Layout>
";
    assert_eq!(
        render(src),
        "<main data-title=\"Home\"><h1>Hi</h1></main>"
    );
}

#[test]
fn test_nested_components() {
    let src = "
let Item = fn(props) { <li>{props.contents}</li> }
let List = fn(props) { <ul>{props.contents}</ul> }
<List><Item>\"a\"</Item><Item>\"b\"</Item></List>
";
    assert_eq!(render(src), "<ul><li>a</li><li>b</li></ul>");
}

#[test]
fn test_script_body_is_raw() {
    let src = "<script>if (a < b) { run(); }</script>";
    assert_eq!(render(src), "<script>if (a < b) { run(); }</script>");
}

#[test]
fn test_script_interpolation() {
    let src = "
let user = \"ada\"
<script>let who = \"@{user}\";</script>
";
    assert_eq!(render(src), "<script>let who = \"ada\";</script>");
}

#[test]
fn test_style_body_is_raw() {
    let src = "<style>p > a { color: red; }</style>";
    assert_eq!(render(src), "<style>p > a { color: red; }</style>");
}

#[test]
fn test_loops_produce_sibling_nodes() {
    let src = "<tr>{for n in 1..4 { <td>{n}</td> }}</tr>";
    assert_eq!(render(src), "<tr><td>1</td><td>2</td><td>3</td></tr>");
}

#[test]
fn test_conditional_sections() {
    let src = "
let admin = true
<nav>{if (admin) { <a href=\"/admin\">admin</a> } else { <span>guest</span> }}</nav>
";
    assert_eq!(render(src), "<nav><a href=\"/admin\">admin</a></nav>");
}

#[test]
fn test_raw_html_passthrough() {
    let src = "
let html = @std/html
<div>{html.raw(\"<hr>\")}</div>
";
    assert_eq!(render(src), "<div><hr></div>");
}

#[test]
fn test_markdown_in_tag_tree() {
    let src = "
let html = @std/html
let md = @std/markdown
<article>{html.raw(md.render(\"**bold**\"))}</article>
";
    let out = render(src);
    assert!(out.contains("<strong>bold</strong>"), "got {out}");
}

#[test]
fn test_values_render_via_canonical_printer() {
    assert_eq!(render("<p>{42} {2.5}</p>"), "<p>42 2.5</p>");
}

#[test]
fn test_tag_value_shape() {
    let env = setup();
    let tag = evaluate("<div id=\"x\">y</div>", &env).unwrap();
    assert_eq!(tag.type_name(), "tag");
    assert_eq!(tag.get_key("name"), Some(Value::str("div")));
    let attrs = tag.get_key("attributes").unwrap();
    assert_eq!(attrs.get_key("id"), Some(Value::str("x")));
}
