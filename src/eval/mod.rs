// ABOUTME: Tree-walking evaluator for the Basil script language
// Executes an AST in an Environment, producing a Value or an Error.
// `return`, `stop`, and `skip` travel as sentinel signals checked after
// every statement; only genuine errors ever reach `try`.

mod effects;
pub mod ops;

#[cfg(test)]
mod tests;

use crate::ast::*;
use crate::config::{MAX_CALL_DEPTH, MAX_COLLECTED_RESULTS, RECEIVER_NAME, TYPE_MARKER};
use crate::env::Environment;
use crate::error::{codes, Error, EvalResult, Signal};
use crate::token::Token;
use crate::types;
use crate::value::{Closure, FunctionDef, Value};
use indexmap::IndexMap;
use std::rc::Rc;

/// Evaluate a program; the engine's root entry point.
pub fn eval_program(statements: &[Stmt], env: &Rc<Environment>) -> Result<Value, Error> {
    match eval_block_in(statements, env) {
        Ok(value) => Ok(value),
        Err(Signal::Return(value)) => Ok(value),
        Err(Signal::Stop) | Err(Signal::Skip) => Ok(Value::Null),
        Err(Signal::Error(err)) => Err(*err),
    }
}

/// Evaluate statements in the given scope (no new scope is created).
pub(crate) fn eval_block_in(statements: &[Stmt], env: &Rc<Environment>) -> EvalResult {
    let context = env.context();
    let mut last = Value::Null;
    for stmt in statements {
        context.check_cancelled().map_err(Signal::from)?;
        last = eval_stmt(stmt, env)?;
    }
    Ok(last)
}

/// Evaluate a block in a fresh child scope; the block's value is the value
/// of its last statement.
pub(crate) fn eval_block(statements: &[Stmt], env: &Rc<Environment>) -> EvalResult {
    let child = Environment::child(env);
    eval_block_in(statements, &child)
}

fn err_at(err: Error, token: &Token) -> Signal {
    Signal::Error(Box::new(err.at(token.line, token.column)))
}

fn eval_stmt(stmt: &Stmt, env: &Rc<Environment>) -> EvalResult {
    match stmt {
        Stmt::Expr { expr, .. } => eval_expr(expr, env),
        Stmt::Let {
            token,
            pattern,
            value,
        } => {
            let value = eval_expr(value, env)?;
            bind_pattern(pattern, value, env).map_err(|e| err_at(e, token))?;
            Ok(Value::Null)
        }
        Stmt::Assign {
            token,
            target,
            value,
        } => {
            let value = eval_expr(value, env)?;
            assign_target(target, value, env, token)?;
            Ok(Value::Null)
        }
        Stmt::Return { value, .. } => {
            let value = match value {
                Some(expr) => eval_expr(expr, env)?,
                None => Value::Null,
            };
            Err(Signal::Return(value))
        }
        Stmt::Check {
            condition,
            fallback,
            ..
        } => {
            let cond = eval_expr(condition, env)?;
            if cond.truthy() {
                Ok(Value::Null)
            } else {
                let value = eval_expr(fallback, env)?;
                Err(Signal::Return(value))
            }
        }
        Stmt::Stop { .. } => Err(Signal::Stop),
        Stmt::Skip { .. } => Err(Signal::Skip),
        Stmt::Export { token, name, value } => {
            let value = eval_expr(value, env)?;
            let key = match name {
                ExportName::Named(name) => {
                    env.define(name.clone(), value.clone());
                    name.clone()
                }
                ExportName::Default => crate::config::DEFAULT_EXPORT.to_string(),
            };
            if let Some(exports) = env.get(crate::modules::EXPORTS_BINDING) {
                exports.set_key(&key, value);
            } else {
                return Err(err_at(
                    Error::state(
                        codes::STATE_INVALID,
                        "`export` is only valid at module scope",
                    ),
                    token,
                ));
            }
            Ok(Value::Null)
        }
        Stmt::Import {
            token,
            source,
            alias,
        } => {
            let module = crate::modules::import_expr(source, env)?;
            let name = match alias {
                Some(alias) => alias.clone(),
                None => crate::modules::binding_name_for(source).ok_or_else(|| {
                    err_at(
                        Error::import(
                            codes::IMPORT_NOT_FOUND,
                            "cannot derive a name for this import, add `as name`",
                        ),
                        token,
                    )
                })?,
            };
            env.define(name, module);
            Ok(Value::Null)
        }
    }
}

fn assign_target(
    target: &AssignTarget,
    value: Value,
    env: &Rc<Environment>,
    token: &Token,
) -> Result<(), Signal> {
    match target {
        AssignTarget::Name(name) => {
            // Rebind where defined; fall back to creating in this scope.
            if !env.assign(name, value.clone()) {
                env.define(name.clone(), value);
            }
            Ok(())
        }
        AssignTarget::Member { object, property } => {
            let object = eval_expr(object, env)?;
            match &object {
                Value::Dict(map) => {
                    map.borrow_mut().insert(property.clone(), value);
                    Ok(())
                }
                other => Err(err_at(
                    Error::type_error(format!(
                        "cannot assign member `{property}` on {}",
                        other.type_name()
                    )),
                    token,
                )),
            }
        }
        AssignTarget::Index { object, index } => {
            let object = eval_expr(object, env)?;
            let index = eval_expr(index, env)?;
            match (&object, &index) {
                (Value::Array(items), Value::Int(i)) => {
                    let mut items = items.borrow_mut();
                    let len = items.len();
                    let idx = *i;
                    if idx < 0 || idx as usize >= len {
                        return Err(err_at(
                            Error::index(format!(
                                "index {idx} out of bounds for array of length {len}"
                            )),
                            token,
                        ));
                    }
                    items[idx as usize] = value;
                    Ok(())
                }
                (Value::Dict(map), key) => {
                    map.borrow_mut().insert(key.to_string(), value);
                    Ok(())
                }
                (other, _) => Err(err_at(
                    Error::type_error(format!("cannot index-assign {}", other.type_name())),
                    token,
                )),
            }
        }
        AssignTarget::Pattern(pattern) => {
            bind_pattern(pattern, value, env).map_err(|e| err_at(e, token))
        }
    }
}

// ============================================================================
// Pattern binding
// ============================================================================

/// Bind a pattern against a value, defining names in the current scope.
pub(crate) fn bind_pattern(
    pattern: &Pattern,
    value: Value,
    env: &Rc<Environment>,
) -> Result<(), Error> {
    match pattern {
        Pattern::Name(name) => {
            env.define(name.clone(), value);
            Ok(())
        }
        Pattern::Discard => Ok(()),
        Pattern::Array { items, rest } => {
            let elements: Vec<Value> = match &value {
                Value::Array(xs) => xs.borrow().clone(),
                Value::Range(start, end) => (*start..*end).map(Value::Int).collect(),
                other => {
                    return Err(Error::state(
                        codes::STATE_DESTRUCTURE,
                        format!("cannot destructure {} as an array", other.type_name()),
                    ))
                }
            };
            for (i, item) in items.iter().enumerate() {
                let element = elements.get(i).cloned().unwrap_or(Value::Null);
                bind_pattern(item, element, env)?;
            }
            if let Some(rest_name) = rest {
                let tail: Vec<Value> = elements.iter().skip(items.len()).cloned().collect();
                env.define(rest_name.clone(), Value::array(tail));
            }
            Ok(())
        }
        Pattern::Dict { fields, rest } => {
            let map = match &value {
                Value::Dict(map) => map.borrow().clone(),
                other => {
                    return Err(Error::state(
                        codes::STATE_DESTRUCTURE,
                        format!("cannot destructure {} as a dictionary", other.type_name()),
                    ))
                }
            };
            let mut taken: Vec<&str> = Vec::new();
            for field in fields {
                taken.push(field.key.as_str());
                let mut field_value = map.get(&field.key).cloned().unwrap_or(Value::Null);
                if field_value.is_null() {
                    if let Some(default) = &field.default {
                        field_value = match eval_expr(default, env) {
                            Ok(v) => v,
                            Err(Signal::Error(e)) => return Err(*e),
                            Err(_) => Value::Null,
                        };
                    }
                }
                match (&field.nested, &field.alias) {
                    (Some(nested), _) => bind_pattern(nested, field_value, env)?,
                    (None, Some(alias)) => env.define(alias.clone(), field_value),
                    (None, None) => env.define(field.key.clone(), field_value),
                }
            }
            if let Some(rest_name) = rest {
                let mut remaining = IndexMap::new();
                for (key, val) in map.iter() {
                    if !taken.contains(&key.as_str()) {
                        remaining.insert(key.clone(), val.clone());
                    }
                }
                env.define(rest_name.clone(), Value::dict(remaining));
            }
            Ok(())
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

pub(crate) fn eval_expr(expr: &Expr, env: &Rc<Environment>) -> EvalResult {
    match expr {
        Expr::Int { value, .. } => Ok(Value::Int(*value)),
        Expr::Float { value, .. } => Ok(Value::Float(*value)),
        Expr::Str { value, .. } => Ok(Value::str(value)),
        Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
        Expr::Null { .. } => Ok(Value::Null),
        Expr::Interp { pieces, .. } => {
            let mut out = String::new();
            for piece in pieces {
                match piece {
                    Piece::Lit(text) => out.push_str(text),
                    Piece::Expr(inner) => {
                        let value = eval_expr(inner, env)?;
                        out.push_str(&value.to_string());
                    }
                }
            }
            Ok(Value::str(out))
        }
        Expr::Regex {
            pattern, flags, ..
        } => Ok(types::regex_value(pattern, flags)),
        Expr::Money { lit, .. } => Ok(types::money::from_literal(lit)),
        Expr::Datetime { lit, .. } => Ok(types::datetime::from_literal(lit)),
        Expr::Duration { lit, .. } => Ok(types::datetime::duration_from_literal(lit)),
        Expr::PathLit { value, .. } => Ok(types::path_value(value)),
        Expr::UrlLit { value, .. } => Ok(types::url_value(value)),
        Expr::SigilTemplate { token, pieces } => effects::eval_sigil_template(token, pieces, env),
        Expr::ContextRef { token, name } => effects::eval_context_ref(token, name, env),
        Expr::ConnLit {
            token,
            driver,
            target,
        } => effects::eval_conn_lit(token, driver, target.as_deref(), env),
        Expr::ModuleRef { token, path } => {
            crate::modules::load_named(path, env).map_err(|e| err_at(e, token))
        }
        Expr::Ident { token, name } => env
            .get(name)
            .ok_or_else(|| err_at(Error::undefined(name), token)),
        Expr::Array { elements, .. } => {
            let mut out = Vec::with_capacity(elements.len());
            for element in elements {
                out.push(eval_expr(element, env)?);
            }
            Ok(Value::array(out))
        }
        Expr::Dict { entries, .. } => {
            let mut map = IndexMap::new();
            for entry in entries {
                match entry {
                    DictEntry::KeyValue(key, value) => {
                        let key = match key {
                            DictKey::Ident(name) => name.clone(),
                            DictKey::Str(text) => text.clone(),
                            DictKey::Computed(inner) => eval_expr(inner, env)?.to_string(),
                        };
                        let value = eval_expr(value, env)?;
                        map.insert(key, value);
                    }
                    DictEntry::Shorthand(name) => {
                        let value = env.get(name).ok_or_else(|| {
                            err_at(Error::undefined(name), expr.token())
                        })?;
                        map.insert(name.clone(), value);
                    }
                    DictEntry::Spread(inner) => {
                        let spread = eval_expr(inner, env)?;
                        match &spread {
                            Value::Dict(other) => {
                                for (key, value) in other.borrow().iter() {
                                    if key == TYPE_MARKER {
                                        continue;
                                    }
                                    map.insert(key.clone(), value.clone());
                                }
                            }
                            other => {
                                return Err(err_at(
                                    Error::type_error(format!(
                                        "cannot spread {} into a dictionary",
                                        other.type_name()
                                    )),
                                    inner.token(),
                                ))
                            }
                        }
                    }
                }
            }
            Ok(Value::dict(map))
        }
        Expr::Prefix { token, op, right } => {
            let value = eval_expr(right, env)?;
            ops::eval_prefix(op, value).map_err(|e| err_at(e, token))
        }
        Expr::Infix {
            token,
            op,
            left,
            right,
        } => eval_infix_expr(token, op, left, right, env),
        Expr::Index {
            token,
            object,
            index,
            optional,
        } => {
            let object = eval_expr(object, env)?;
            let index = eval_expr(index, env)?;
            eval_index(&object, &index, *optional).map_err(|e| err_at(e, token))
        }
        Expr::Slice {
            token,
            object,
            start,
            end,
        } => {
            let object = eval_expr(object, env)?;
            let start = match start {
                Some(expr) => Some(eval_expr(expr, env)?),
                None => None,
            };
            let end = match end {
                Some(expr) => Some(eval_expr(expr, env)?),
                None => None,
            };
            eval_slice(&object, start, end).map_err(|e| err_at(e, token))
        }
        Expr::Member {
            token,
            object,
            property,
        } => {
            let object = eval_expr(object, env)?;
            eval_member(&object, property).map_err(|e| err_at(e, token))
        }
        Expr::Call { .. } => eval_call(expr, env),
        Expr::Function {
            name,
            params,
            body,
            ..
        } => Ok(Value::Function(Closure {
            def: Rc::new(FunctionDef {
                name: name.clone(),
                params: params.clone(),
                body: body.clone(),
            }),
            env: env.clone(),
        })),
        Expr::Block { body, .. } => eval_block(body, env),
        Expr::If {
            condition,
            consequence,
            alternative,
            ..
        } => {
            let cond = eval_expr(condition, env)?;
            if cond.truthy() {
                eval_block(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, env)
            } else {
                Ok(Value::Null)
            }
        }
        Expr::For {
            token,
            key,
            value,
            iterable,
            body,
        } => eval_for(token, key.as_ref(), value, iterable, body, env),
        Expr::ForMap {
            token,
            iterable,
            mapper,
        } => {
            let iterable = eval_expr(iterable, env)?;
            let mapper = eval_expr(mapper, env)?;
            let items = iteration_values(&iterable)
                .map_err(|e| err_at(e, token))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(call_value(&mapper, &[item], env).map_err(|e| err_at(e, token))?);
            }
            Ok(Value::array(out))
        }
        Expr::Try { call, .. } => eval_try(call, env),
        Expr::Tag { node, .. } => eval_tag(node, env),
        Expr::WriteFile {
            token,
            mode,
            value,
            target,
        } => {
            let value = eval_expr(value, env)?;
            let target = eval_expr(target, env)?;
            effects::eval_write(token, *mode, &value, &target, env)
        }
        Expr::Read { token, source } => {
            let source = eval_expr(source, env)?;
            effects::eval_read(token, &source, env)
        }
        Expr::Db {
            token,
            op,
            left,
            right,
        } => {
            let left = eval_expr(left, env)?;
            let right = eval_expr(right, env)?;
            effects::eval_db(token, *op, &left, &right, env)
        }
        Expr::SchemaDecl {
            token,
            name,
            fields,
        } => effects::eval_schema_decl(token, name, fields, env),
        Expr::QueryDsl {
            token,
            verb,
            source,
            clauses,
        } => effects::eval_query_dsl(token, verb, source.as_deref(), clauses, env),
    }
}

fn eval_infix_expr(
    token: &Token,
    op: &InfixOp,
    left: &Expr,
    right: &Expr,
    env: &Rc<Environment>,
) -> EvalResult {
    // Lazy operators evaluate the right side only when needed.
    match op {
        InfixOp::Or => {
            let left = eval_expr(left, env)?;
            if left.truthy() {
                return Ok(left);
            }
            return eval_expr(right, env);
        }
        InfixOp::Coalesce => {
            let left = eval_expr(left, env)?;
            if !left.is_null() {
                return Ok(left);
            }
            return eval_expr(right, env);
        }
        InfixOp::And => {
            let left = eval_expr(left, env)?;
            if !left.truthy() {
                return Ok(left);
            }
            let right = eval_expr(right, env)?;
            // Date ∧ time composes a datetime.
            if ops::is_datetime_family(&left) && ops::is_datetime_family(&right) {
                return ops::set_intersect(left, right).map_err(|e| err_at(e, token));
            }
            return Ok(right);
        }
        _ => {}
    }
    let left = eval_expr(left, env)?;
    let right = eval_expr(right, env)?;
    ops::eval_infix(op, left, right).map_err(|e| err_at(e, token))
}

fn eval_index(object: &Value, index: &Value, optional: bool) -> Result<Value, Error> {
    let missing = |message: String| {
        if optional {
            Ok(Value::Null)
        } else {
            Err(Error::index(message))
        }
    };
    match (object, index) {
        (Value::Null, _) if optional => Ok(Value::Null),
        (Value::Array(items), Value::Int(i)) => {
            let items = items.borrow();
            if *i < 0 || *i as usize >= items.len() {
                return missing(format!(
                    "index {i} out of bounds for array of length {}",
                    items.len()
                ));
            }
            Ok(items[*i as usize].clone())
        }
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            if *i < 0 || *i as usize >= chars.len() {
                return missing(format!(
                    "index {i} out of bounds for string of length {}",
                    chars.len()
                ));
            }
            Ok(Value::str(chars[*i as usize].to_string()))
        }
        (Value::Dict(map), key) => {
            let key = key.to_string();
            Ok(map.borrow().get(&key).cloned().unwrap_or(Value::Null))
        }
        (other, index) => Err(Error::new(
            crate::error::ErrorClass::Index,
            codes::INDEX_BAD_KEY,
            format!(
                "cannot index {} with {}",
                other.type_name(),
                index.type_name()
            ),
        )),
    }
}

fn eval_slice(object: &Value, start: Option<Value>, end: Option<Value>) -> Result<Value, Error> {
    let to_bound = |v: Option<Value>, default: i64| -> Result<i64, Error> {
        match v {
            None => Ok(default),
            Some(Value::Int(n)) => Ok(n),
            Some(other) => Err(Error::type_error(format!(
                "slice bounds must be integers, got {}",
                other.type_name()
            ))),
        }
    };
    match object {
        Value::Array(items) => {
            let items = items.borrow();
            let len = items.len() as i64;
            let start = to_bound(start, 0)?.clamp(0, len);
            let end = to_bound(end, len)?.clamp(start, len);
            Ok(Value::array(
                items[start as usize..end as usize].to_vec(),
            ))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let start = to_bound(start, 0)?.clamp(0, len);
            let end = to_bound(end, len)?.clamp(start, len);
            Ok(Value::str(
                chars[start as usize..end as usize].iter().collect::<String>(),
            ))
        }
        other => Err(Error::type_error(format!(
            "cannot slice {}",
            other.type_name()
        ))),
    }
}

fn eval_member(object: &Value, property: &str) -> Result<Value, Error> {
    match object {
        Value::Dict(map) => Ok(map.borrow().get(property).cloned().unwrap_or(Value::Null)),
        other => Err(Error::unknown_method(&other.type_name(), property)
            .with_hint(format!("did you mean `{property}()`?"))),
    }
}

// ============================================================================
// Calls and closures
// ============================================================================

fn eval_call(expr: &Expr, env: &Rc<Environment>) -> EvalResult {
    let Expr::Call {
        token,
        callee,
        args,
    } = expr
    else {
        unreachable!()
    };

    // Method invocation: call on a member access dispatches through the
    // receiver's method table, unless the dictionary itself stores a
    // function under that name.
    if let Expr::Member {
        object, property, ..
    } = callee.as_ref()
    {
        let receiver = eval_expr(object, env)?;
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(eval_expr(arg, env)?);
        }
        return invoke_method(&receiver, property, &arg_values, env)
            .map_err(|e| err_at(e, token));
    }

    let callee_value = eval_expr(callee, env)?;
    let mut arg_values = Vec::with_capacity(args.len());
    for arg in args {
        arg_values.push(eval_expr(arg, env)?);
    }
    apply(&callee_value, &arg_values, None, env).map_err(|e| err_at(e, token))
}

/// Method dispatch: dictionary-stored functions win, then the per-type
/// method table.
pub fn invoke_method(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    if let Some(member) = receiver.get_key(method) {
        match &member {
            Value::Function(_) => return apply(&member, args, Some(receiver.clone()), env),
            Value::Builtin(_) => return apply(&member, args, None, env),
            _ => {}
        }
    }
    crate::methods::invoke(receiver, method, args, env)
}

/// Call a callable value. Converts control-flow signals at the function
/// boundary; used by methods (`map`, `filter`, ...) and the stdlib.
pub fn call_value(
    callee: &Value,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    apply(callee, args, None, env)
}

fn apply(
    callee: &Value,
    args: &[Value],
    receiver: Option<Value>,
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    match callee {
        Value::Function(closure) => call_function(closure, args, receiver, env),
        Value::Builtin(def) => (def.func)(env, args),
        other => {
            if types::is_typed(other, types::TYPE_SCHEMA) {
                let data = args.first().cloned().unwrap_or_else(Value::empty_dict);
                return types::schema::make_record(other, data);
            }
            Err(Error::not_callable(&other.type_name()))
        }
    }
}

fn call_function(
    closure: &Closure,
    args: &[Value],
    receiver: Option<Value>,
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    let context = env.context();
    let depth = context.call_depth.get();
    if depth >= MAX_CALL_DEPTH {
        return Err(Error::state(
            codes::STATE_RECURSION,
            format!("call depth exceeded {MAX_CALL_DEPTH}"),
        ));
    }
    context.call_depth.set(depth + 1);
    let result = call_function_inner(closure, args, receiver);
    context.call_depth.set(depth);
    result
}

fn call_function_inner(
    closure: &Closure,
    args: &[Value],
    receiver: Option<Value>,
) -> Result<Value, Error> {
    let scope = Environment::child(&closure.env);
    if let Some(receiver) = receiver {
        scope.define(RECEIVER_NAME, receiver);
    }

    // Parameters bind by position; a missing parameter takes its default,
    // extra arguments are silently ignored, the rest parameter collects the
    // tail.
    let params = &closure.def.params;
    let mut position = 0usize;
    for param in params {
        if param.rest {
            let tail: Vec<Value> = args.iter().skip(position).cloned().collect();
            bind_pattern(&param.pattern, Value::array(tail), &scope)?;
            position = args.len();
            continue;
        }
        match args.get(position) {
            Some(arg) => bind_pattern(&param.pattern, arg.clone(), &scope)?,
            None => {
                if let Some(default) = &param.default {
                    let value = match eval_expr(default, &scope) {
                        Ok(v) => v,
                        Err(Signal::Error(e)) => return Err(*e),
                        Err(_) => Value::Null,
                    };
                    bind_pattern(&param.pattern, value, &scope)?;
                }
                // No default: the name stays unbound and referencing it
                // raises an undefined error.
            }
        }
        position += 1;
    }

    match eval_block_in(&closure.def.body, &scope) {
        Ok(value) => Ok(value),
        Err(Signal::Return(value)) => Ok(value),
        Err(Signal::Stop) | Err(Signal::Skip) => Ok(Value::Null),
        Err(Signal::Error(err)) => Err(*err),
    }
}

// ============================================================================
// try
// ============================================================================

fn eval_try(call: &Expr, env: &Rc<Environment>) -> EvalResult {
    let mut result = IndexMap::new();
    match eval_call(call, env) {
        Ok(value) => {
            result.insert("result".to_string(), value);
            result.insert("error".to_string(), Value::Null);
        }
        Err(Signal::Error(err)) if err.class.is_catchable() => {
            result.insert("result".to_string(), Value::Null);
            result.insert("error".to_string(), err.to_value());
        }
        Err(other) => return Err(other),
    }
    Ok(Value::dict(result))
}

// ============================================================================
// for loops
// ============================================================================

enum IterationItem {
    Value(Value),
    Pair(Value, Value),
}

fn eval_for(
    token: &Token,
    key: Option<&Pattern>,
    value: &Pattern,
    iterable: &Expr,
    body: &[Stmt],
    env: &Rc<Environment>,
) -> EvalResult {
    let iterable = eval_expr(iterable, env)?;
    let items = iteration_items(&iterable, key.is_some()).map_err(|e| err_at(e, token))?;
    let context = env.context();

    let mut collected = Vec::new();
    for item in items {
        context.check_cancelled().map_err(Signal::from)?;
        let scope = Environment::child(env);
        match item {
            IterationItem::Value(v) => {
                bind_pattern(value, v, &scope).map_err(|e| err_at(e, token))?;
            }
            IterationItem::Pair(k, v) => {
                if let Some(key_pattern) = key {
                    bind_pattern(key_pattern, k, &scope).map_err(|e| err_at(e, token))?;
                }
                bind_pattern(value, v, &scope).map_err(|e| err_at(e, token))?;
            }
        }
        match eval_block_in(body, &scope) {
            Ok(Value::Null) => {}
            Ok(result) => {
                if collected.len() >= MAX_COLLECTED_RESULTS {
                    return Err(err_at(
                        Error::state(codes::STATE_INVALID, "loop result overflow"),
                        token,
                    ));
                }
                collected.push(result);
            }
            Err(Signal::Skip) => continue,
            Err(Signal::Stop) => break,
            Err(other) => return Err(other),
        }
    }
    Ok(Value::array(collected))
}

fn iteration_items(iterable: &Value, with_keys: bool) -> Result<Vec<IterationItem>, Error> {
    if types::is_typed(iterable, types::TYPE_TABLE) {
        let rows = iterable.get_key("rows").unwrap_or_else(|| Value::array(vec![]));
        return iteration_items(&rows, with_keys);
    }
    match iterable {
        Value::Array(items) => Ok(items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if with_keys {
                    IterationItem::Pair(Value::Int(i as i64), v.clone())
                } else {
                    IterationItem::Value(v.clone())
                }
            })
            .collect()),
        Value::Str(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, ch)| {
                if with_keys {
                    IterationItem::Pair(Value::Int(i as i64), Value::str(ch.to_string()))
                } else {
                    IterationItem::Value(Value::str(ch.to_string()))
                }
            })
            .collect()),
        Value::Dict(map) => Ok(map
            .borrow()
            .iter()
            .filter(|(key, _)| key.as_str() != TYPE_MARKER)
            .map(|(key, val)| {
                if with_keys {
                    IterationItem::Pair(Value::str(key), val.clone())
                } else {
                    IterationItem::Value(val.clone())
                }
            })
            .collect()),
        Value::Range(start, end) => Ok((*start..*end)
            .enumerate()
            .map(|(i, n)| {
                if with_keys {
                    IterationItem::Pair(Value::Int(i as i64), Value::Int(n))
                } else {
                    IterationItem::Value(Value::Int(n))
                }
            })
            .collect()),
        other => Err(Error::new(
            crate::error::ErrorClass::Type,
            codes::TYPE_NOT_ITERABLE,
            format!("{} is not iterable", other.type_name()),
        )),
    }
}

/// Plain element view used by the mapping `for` and method helpers.
pub(crate) fn iteration_values(iterable: &Value) -> Result<Vec<Value>, Error> {
    Ok(iteration_items(iterable, false)?
        .into_iter()
        .map(|item| match item {
            IterationItem::Value(v) => v,
            IterationItem::Pair(_, v) => v,
        })
        .collect())
}

// ============================================================================
// Tags
// ============================================================================

fn eval_tag(node: &TagNode, env: &Rc<Environment>) -> EvalResult {
    // Capitalised names dispatch to a component function in scope.
    let is_component = node
        .name
        .chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false);

    let mut attributes = IndexMap::new();
    for attr in &node.attrs {
        match attr {
            TagAttr::Literal { name, value } => {
                attributes.insert(name.clone(), Value::str(value));
            }
            TagAttr::Expr { name, value } => {
                attributes.insert(name.clone(), eval_expr(value, env)?);
            }
            TagAttr::Bare(name) => {
                attributes.insert(name.clone(), Value::Bool(true));
            }
            TagAttr::Spread(inner) => {
                let spread = eval_expr(inner, env)?;
                match &spread {
                    Value::Dict(map) => {
                        // Right-hand side wins on duplicate keys.
                        for (key, value) in map.borrow().iter() {
                            if key == TYPE_MARKER {
                                continue;
                            }
                            attributes.insert(key.clone(), value.clone());
                        }
                    }
                    other => {
                        return Err(err_at(
                            Error::type_error(format!(
                                "attribute spread needs a dictionary, got {}",
                                other.type_name()
                            )),
                            inner.token(),
                        ))
                    }
                }
            }
        }
    }

    let mut children = Vec::new();
    for child in &node.children {
        match child {
            TagChild::Text(text) => children.push(Value::str(text)),
            TagChild::Tag(nested) => children.push(eval_tag(nested, env)?),
            TagChild::Expr(inner) => {
                let value = eval_expr(inner, env)?;
                flatten_child(value, &mut children);
            }
        }
    }

    if is_component {
        let component = env.get(&node.name).ok_or_else(|| {
            err_at(Error::undefined(&node.name), &node.token)
        })?;
        if !children.is_empty() {
            attributes.insert(
                crate::config::CONTENTS_KEY.to_string(),
                Value::array(children),
            );
        }
        let props = Value::dict(attributes);
        return apply(&component, &[props], None, env).map_err(|e| err_at(e, &node.token));
    }

    Ok(types::tag_value(
        &node.name,
        attributes,
        children,
        node.self_closing,
    ))
}

/// Null children vanish; arrays (from `for` loops) flatten one level.
fn flatten_child(value: Value, children: &mut Vec<Value>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items.borrow().iter() {
                if !item.is_null() {
                    children.push(item.clone());
                }
            }
        }
        other => children.push(other),
    }
}
