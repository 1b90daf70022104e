// ABOUTME: std/markdown — CommonMark rendering to HTML

use super::module_dict;
use crate::env::Environment;
use crate::error::Error;
use crate::value::Value;
use pulldown_cmark::{html, Options, Parser};
use std::rc::Rc;

pub fn build() -> Value {
    module_dict(vec![(
        "render",
        Value::builtin("markdown.render", "1", render),
    )])
}

/// Render markdown to an HTML string. The result is trusted markup; wrap it
/// with `html.raw` to embed it in a tag tree unescaped.
fn render(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let source = match args.first() {
        Some(Value::Str(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return Err(Error::arity("markdown.render", "1", 0)),
    };
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(&source, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    Ok(Value::str(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Context;

    #[test]
    fn test_basic_rendering() {
        let env = Environment::root(Context::minimal());
        let Value::Str(out) = render(&env, &[Value::str("# Hi\n\nsome *text*")]).unwrap()
        else {
            panic!("expected string");
        };
        assert!(out.contains("<h1>Hi</h1>"));
        assert!(out.contains("<em>text</em>"));
    }

    #[test]
    fn test_tables_enabled() {
        let env = Environment::root(Context::minimal());
        let table = "| a | b |\n|---|---|\n| 1 | 2 |";
        let Value::Str(out) = render(&env, &[Value::str(table)]).unwrap() else {
            panic!("expected string");
        };
        assert!(out.contains("<table>"));
    }
}
