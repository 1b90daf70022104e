// ABOUTME: std/api — HTTP-shaped application errors
// These raise catchable value-class errors carrying a `status` field; a host
// that sees one unhandled turns it into the matching HTTP response.

use super::module_dict;
use crate::env::Environment;
use crate::error::Error;
use crate::value::Value;
use std::rc::Rc;

pub fn build() -> Value {
    module_dict(vec![
        ("error", Value::builtin("api.error", "2", api_error)),
        ("badRequest", Value::builtin("api.badRequest", "0-1", bad_request)),
        ("unauthorized", Value::builtin("api.unauthorized", "0-1", unauthorized)),
        ("forbidden", Value::builtin("api.forbidden", "0-1", forbidden)),
        ("notFound", Value::builtin("api.notFound", "0-1", not_found)),
        ("conflict", Value::builtin("api.conflict", "0-1", conflict)),
        ("serverError", Value::builtin("api.serverError", "0-1", server_error)),
    ])
}

fn raise(status: i64, message: String) -> Result<Value, Error> {
    let code = format!("API-{status:04}");
    Err(Error::value_error(&code, message).with_status(status))
}

fn message_arg(args: &[Value], default: &str) -> String {
    args.first()
        .map(|v| v.to_string())
        .unwrap_or_else(|| default.to_string())
}

fn api_error(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let status = args
        .first()
        .and_then(|v| v.as_int())
        .ok_or_else(|| Error::type_error("api.error: expected a status code"))?;
    let message = args
        .get(1)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "error".to_string());
    raise(status, message)
}

fn bad_request(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    raise(400, message_arg(args, "bad request"))
}

fn unauthorized(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    raise(401, message_arg(args, "unauthorized"))
}

fn forbidden(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    raise(403, message_arg(args, "forbidden"))
}

fn not_found(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    raise(404, message_arg(args, "not found"))
}

fn conflict(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    raise(409, message_arg(args, "conflict"))
}

fn server_error(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    raise(500, message_arg(args, "internal error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Context;

    #[test]
    fn test_not_found_shape() {
        let env = Environment::root(Context::minimal());
        let err = not_found(&env, &[Value::str("no such post")]).unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.code, "API-0404");
        assert!(err.class.is_catchable());
        assert_eq!(err.message, "no such post");
    }
}
