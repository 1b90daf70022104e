// ABOUTME: Module loader — path resolution, one-shot evaluation, caching
// Filesystem imports resolve against the importing file, project-root
// imports against the process's project root, `std/...` against the built-in
// module table, and `basil/...` against host-registered bindings. A module
// evaluates once per canonical path; revisiting a path mid-evaluation is a
// cycle and errors.

use crate::ast::Expr;
use crate::env::{Context, Environment};
use crate::error::{codes, Error, EvalResult, Signal};
use crate::value::Value;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Name under which a module scope accumulates its exports.
pub const EXPORTS_BINDING: &str = "__exports";

/// Resolve a `std/...` or `basil/...` reference.
pub fn load_named(path: &str, env: &Rc<Environment>) -> Result<Value, Error> {
    if let Some(name) = path.strip_prefix("std/") {
        return crate::stdlib::module(name).ok_or_else(|| {
            Error::import(
                codes::IMPORT_NOT_FOUND,
                format!("no standard library module `std/{name}`"),
            )
        });
    }
    let context = env.context();
    let registered = context.host_modules.borrow().get(path).cloned();
    registered.ok_or_else(|| {
        Error::import(
            codes::IMPORT_UNREGISTERED,
            format!("`{path}` is not registered by this host"),
        )
    })
}

/// Evaluate the source of an `import` statement.
pub fn import_expr(source: &Expr, env: &Rc<Environment>) -> EvalResult {
    match source {
        Expr::ModuleRef { .. } => crate::eval::eval_expr(source, env),
        _ => {
            let value = crate::eval::eval_expr(source, env)?;
            let path = match &value {
                Value::Str(path) => path.clone(),
                other if crate::types::is_typed(other, crate::types::TYPE_PATH) => {
                    other.get_key("value").unwrap_or(Value::Null).to_string()
                }
                other => {
                    return Err(Signal::from(
                        Error::import(
                            codes::IMPORT_NOT_FOUND,
                            format!("cannot import {}", other.type_name()),
                        )
                        .at(source.token().line, source.token().column),
                    ))
                }
            };
            load_file(&path, env).map_err(|e| {
                Signal::from(e.at(source.token().line, source.token().column))
            })
        }
    }
}

/// Derive the binding name for `import X` without an alias.
pub fn binding_name_for(source: &Expr) -> Option<String> {
    match source {
        Expr::ModuleRef { path, .. } => {
            path.rsplit('/').next().map(|s| s.to_string())
        }
        Expr::PathLit { value, .. } | Expr::Str { value, .. } => Path::new(value)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string()),
        _ => None,
    }
}

/// Load and cache a filesystem module.
pub fn load_file(path: &str, env: &Rc<Environment>) -> Result<Value, Error> {
    let context = env.context();
    let resolved = resolve_path(path, &context)?;

    if let Some(cached) = context.module_cache.borrow().get(&resolved) {
        return Ok(cached.clone());
    }
    if context.importing.borrow().contains(&resolved) {
        return Err(Error::import(
            codes::IMPORT_CYCLE,
            format!("import cycle through {}", resolved.display()),
        ));
    }

    let source = context.host.read_file(&context.policy, &resolved)?;
    let program = crate::parser::Parser::with_file(&source, resolved.display().to_string())
        .parse_program()
        .map_err(|mut errors| {
            errors.remove(0)
        })?;

    // Modules evaluate in a fresh scope on the root so they never see the
    // importer's locals.
    let root = Environment::root_of(env);
    let scope = Environment::child(&root);
    let exports = Value::empty_dict();
    scope.define(EXPORTS_BINDING, exports.clone());

    context.importing.borrow_mut().push(resolved.clone());
    let outcome = crate::eval::eval_program(&program, &scope);
    context.importing.borrow_mut().pop();
    outcome.map_err(|e| e.in_file(resolved.display().to_string()))?;

    context
        .module_cache
        .borrow_mut()
        .insert(resolved, exports.clone());
    Ok(exports)
}

/// Resolve an import path against the importing file or the project root,
/// then try the script and partial extensions when none is given.
fn resolve_path(path: &str, context: &Rc<Context>) -> Result<PathBuf, Error> {
    let base = if let Some(rest) = path.strip_prefix("~/") {
        context.project_root.join(rest)
    } else if path.starts_with('/') {
        PathBuf::from(path)
    } else {
        context.current_dir().join(path)
    };

    if base.extension().is_some() {
        return Ok(crate::security::canonicalize_lenient(&base));
    }
    for extension in [crate::config::SCRIPT_EXTENSION, crate::config::PARTIAL_EXTENSION] {
        let candidate = base.with_extension(extension);
        if candidate.exists() {
            return Ok(crate::security::canonicalize_lenient(&candidate));
        }
    }
    Ok(crate::security::canonicalize_lenient(
        &base.with_extension(crate::config::SCRIPT_EXTENSION),
    ))
}

/// Register a framework module (`basil/...`) or context binding (`@DB`).
pub fn register_host_module(env: &Rc<Environment>, name: &str, exports: Value) {
    let context = env.context();
    context
        .host_modules
        .borrow_mut()
        .insert(name.to_string(), exports);
}
