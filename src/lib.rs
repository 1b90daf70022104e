// ABOUTME: Engine crate root — public embedding API for hosts
// Hosts create an environment, evaluate source units in it, and receive a
// value or a structured error. Everything else (HTTP, sessions, CLIs) lives
// outside this crate and talks to the engine through these functions.

pub mod ast;
pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod host;
pub mod lexer;
pub mod methods;
pub mod modules;
pub mod parser;
pub mod render;
pub mod security;
pub mod stdlib;
pub mod token;
pub mod types;
pub mod value;

use env::{Context, Environment};
use error::Error;
use host::HostCallbacks;
use security::SecurityPolicy;
use std::path::Path;
use std::rc::Rc;
use value::Value;

pub use modules::register_host_module;

/// Create a root environment with the standard globals registered.
pub fn new_environment(
    script_args: Vec<Value>,
    env_vars: indexmap::IndexMap<String, String>,
    policy: SecurityPolicy,
    host: Box<dyn HostCallbacks>,
) -> Rc<Environment> {
    let env = Environment::root(Context::new(script_args, env_vars, policy, host));
    stdlib::register_globals(&env);
    // Top-level programs may export too; hosts read the bindings back from
    // this dictionary after evaluation.
    env.define(modules::EXPORTS_BINDING, Value::empty_dict());
    env
}

/// Evaluate a source unit in the supplied environment.
pub fn evaluate(source: &str, env: &Rc<Environment>) -> Result<Value, Error> {
    let program = parser::Parser::new(source)
        .parse_program()
        .map_err(first_error)?;
    eval::eval_program(&program, env)
}

/// Evaluate a script file; relative imports resolve against its directory.
pub fn evaluate_file(path: &Path, env: &Rc<Environment>) -> Result<Value, Error> {
    let context = env.context();
    let canonical = security::canonicalize_lenient(path);
    let source = context.host.read_file(&context.policy, &canonical)?;
    let program = parser::Parser::with_file(&source, canonical.display().to_string())
        .parse_program()
        .map_err(first_error)?;

    context.importing.borrow_mut().push(canonical.clone());
    let result = eval::eval_program(&program, env);
    context.importing.borrow_mut().pop();
    result.map_err(|e| e.in_file(canonical.display().to_string()))
}

fn first_error(mut errors: Vec<Error>) -> Error {
    errors.remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_simple_program() {
        let env = new_environment(
            Vec::new(),
            indexmap::IndexMap::new(),
            SecurityPolicy::default(),
            Box::new(host::NullHost),
        );
        let result = evaluate("let x = 2\nx * 21", &env).unwrap();
        assert_eq!(result, Value::Int(42));
    }

    #[test]
    fn test_parse_error_surfaces_with_position() {
        let env = new_environment(
            Vec::new(),
            indexmap::IndexMap::new(),
            SecurityPolicy::default(),
            Box::new(host::NullHost),
        );
        let err = evaluate("let = ", &env).unwrap_err();
        assert_eq!(err.class, error::ErrorClass::Parse);
        assert!(err.line.is_some());
    }
}
