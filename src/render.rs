// ABOUTME: HTML materialisation — serialise tag values to UTF-8 HTML
// Five entities are escaped in text and attribute values. Singletons always
// emit in the canonical `<name ... />` form; fragments emit only children.

use crate::config::TYPE_MARKER;
use crate::types;
use crate::value::Value;

/// Escape `& < > " '` for text nodes and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Render any value the way tag children see it: tags serialise to HTML,
/// everything else goes through the canonical printer and is escaped.
pub fn render_value(value: &Value) -> String {
    let mut out = String::new();
    render_into(value, &mut out);
    out
}

fn render_into(value: &Value, out: &mut String) {
    if types::is_typed(value, types::TYPE_TAG) {
        render_tag(value, out);
        return;
    }
    // Pre-escaped markup from `html.raw` and `markdown.render` passthrough.
    if types::is_typed(value, crate::stdlib::html::TYPE_RAW_HTML) {
        if let Some(Value::Str(html)) = value.get_key("html") {
            out.push_str(&html);
        }
        return;
    }
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items.borrow().iter() {
                render_into(item, out);
            }
        }
        other => out.push_str(&escape_html(&other.to_string())),
    }
}

fn render_tag(tag: &Value, out: &mut String) {
    let name = tag
        .get_key("name")
        .and_then(|n| n.as_str().map(|s| s.to_string()))
        .unwrap_or_default();
    let children = tag.get_key("children").unwrap_or_else(|| Value::array(vec![]));

    // Fragments emit only their children.
    if name.is_empty() {
        render_into(&children, out);
        return;
    }

    out.push('<');
    out.push_str(&name);
    if let Some(Value::Dict(attrs)) = tag.get_key("attributes") {
        for (key, value) in attrs.borrow().iter() {
            if key == TYPE_MARKER {
                continue;
            }
            match value {
                Value::Bool(true) => {
                    out.push(' ');
                    out.push_str(key);
                }
                Value::Bool(false) | Value::Null => {}
                other => {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_html(&other.to_string()));
                    out.push('"');
                }
            }
        }
    }

    let self_closing = matches!(tag.get_key("selfClosing"), Some(Value::Bool(true)))
        || crate::config::is_singleton_element(&name);
    if self_closing {
        out.push_str(" />");
        return;
    }

    out.push('>');
    // Script and style bodies are raw text; escaping would corrupt them.
    if name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style") {
        render_raw(&children, out);
    } else {
        render_into(&children, out);
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn render_raw(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items.borrow().iter() {
                render_raw(item, out);
            }
        }
        other => out.push_str(&other.to_string()),
    }
}
