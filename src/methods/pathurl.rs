// ABOUTME: Path and URL method tables

use super::{want_exact, want_str};
use crate::env::Environment;
use crate::error::Error;
use crate::eval::ops::{join_path, join_url};
use crate::types::{self, TYPE_PATH};
use crate::value::Value;
use std::path::Path;
use std::rc::Rc;

pub(super) fn try_invoke(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Option<Result<Value, Error>> {
    let raw = receiver.get_key("value")?.as_str()?.to_string();
    if types::is_typed(receiver, TYPE_PATH) {
        Some(dispatch_path(&raw, method, args, env))
    } else {
        Some(dispatch_url(&raw, method, args))
    }
}

fn dispatch_path(
    raw: &str,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    let path = Path::new(raw);
    match method {
        "exists" => {
            want_exact(method, args, 0)?;
            let context = env.context();
            let canonical = context.policy.check_read(path)?;
            Ok(Value::Bool(canonical.exists()))
        }
        "basename" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            ))
        }
        "dirname" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(
                path.parent()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default(),
            ))
        }
        "extension" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(
                path.extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default(),
            ))
        }
        "join" => {
            let segment = want_str(method, args, 0)?;
            Ok(types::path_value(join_path(raw, segment)))
        }
        "parent" => {
            want_exact(method, args, 0)?;
            match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    Ok(types::path_value(parent.to_string_lossy().to_string()))
                }
                _ => Ok(Value::Null),
            }
        }
        "segments" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(
                raw.split('/')
                    .filter(|s| !s.is_empty() && *s != ".")
                    .map(Value::str)
                    .collect(),
            ))
        }
        _ => Err(Error::unknown_method("path", method)),
    }
}

fn dispatch_url(raw: &str, method: &str, args: &[Value]) -> Result<Value, Error> {
    let parsed = UrlParts::parse(raw);
    match method {
        "scheme" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(parsed.scheme))
        }
        "host" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(parsed.host))
        }
        "port" => {
            want_exact(method, args, 0)?;
            match parsed.port {
                Some(port) => Ok(Value::Int(port)),
                None => Ok(Value::Null),
            }
        }
        "pathname" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(parsed.path))
        }
        "query" => {
            want_exact(method, args, 0)?;
            let mut out = indexmap::IndexMap::new();
            for pair in parsed.query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                out.insert(key.to_string(), Value::str(value));
            }
            Ok(Value::dict(out))
        }
        "fragment" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(parsed.fragment))
        }
        "withQuery" => {
            want_exact(method, args, 1)?;
            let Value::Dict(entries) = &args[0] else {
                return Err(Error::type_error("withQuery: expected a dictionary"));
            };
            let query: Vec<String> = entries
                .borrow()
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            let base = raw.split('?').next().unwrap_or(raw);
            Ok(types::url_value(format!("{base}?{}", query.join("&"))))
        }
        "join" => {
            let segment = want_str(method, args, 0)?;
            Ok(types::url_value(join_url(raw, segment)))
        }
        _ => Err(Error::unknown_method("url", method)),
    }
}

struct UrlParts {
    scheme: String,
    host: String,
    port: Option<i64>,
    path: String,
    query: String,
    fragment: String,
}

impl UrlParts {
    fn parse(raw: &str) -> UrlParts {
        let (scheme, rest) = raw.split_once("://").unwrap_or(("", raw));
        let (rest, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
                (host.to_string(), port.parse::<i64>().ok())
            }
            _ => (authority.to_string(), None),
        };
        UrlParts {
            scheme: scheme.to_string(),
            host,
            port,
            path: if path.is_empty() { "/" } else { path }.to_string(),
            query: query.to_string(),
            fragment: fragment.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parts() {
        let parts = UrlParts::parse("https://example.com:8080/a/b?x=1&y=2#top");
        assert_eq!(parts.scheme, "https");
        assert_eq!(parts.host, "example.com");
        assert_eq!(parts.port, Some(8080));
        assert_eq!(parts.path, "/a/b");
        assert_eq!(parts.query, "x=1&y=2");
        assert_eq!(parts.fragment, "top");
    }

    #[test]
    fn test_path_accessors() {
        let env = crate::env::Environment::root(crate::env::Context::minimal());
        let result =
            dispatch_path("./static/css/site.css", "basename", &[], &env).unwrap();
        assert_eq!(result, Value::str("site.css"));
        let result =
            dispatch_path("./static/css/site.css", "extension", &[], &env).unwrap();
        assert_eq!(result, Value::str("css"));
    }

    #[test]
    fn test_url_query_dict() {
        let result = dispatch_url("https://e.com/p?a=1&b=two", "query", &[]).unwrap();
        assert_eq!(result.get_key("a"), Some(Value::str("1")));
        assert_eq!(result.get_key("b"), Some(Value::str("two")));
    }
}
