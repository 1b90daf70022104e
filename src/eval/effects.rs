// ABOUTME: Effectful evaluation — context refs, connections, file and
// database operators, schema declarations, and the query DSL
// Every effect routes through the host callbacks with the security policy.

use super::{call_value, err_at, eval_expr};
use crate::ast::{DbOp, Expr, Piece, SchemaField, WriteMode};
use crate::env::Environment;
use crate::error::{codes, Error, EvalResult, Signal};
use crate::host::FetchRequest;
use crate::token::Token;
use crate::types::{self, datetime, schema};
use crate::value::Value;
use chrono::{NaiveDate, Timelike};
use indexmap::IndexMap;
use std::path::Path;
use std::rc::Rc;

// ============================================================================
// Context references
// ============================================================================

pub(super) fn eval_context_ref(
    token: &Token,
    name: &str,
    env: &Rc<Environment>,
) -> EvalResult {
    let context = env.context();
    match name {
        "env" => {
            let mut map = IndexMap::new();
            for (key, value) in &context.env_vars {
                map.insert(key.clone(), Value::str(value));
            }
            Ok(Value::dict(map))
        }
        "args" => Ok(Value::array(context.script_args.clone())),
        "params" => Ok(context
            .host_modules
            .borrow()
            .get("@params")
            .cloned()
            .unwrap_or_else(Value::empty_dict)),
        "now" => {
            let now = context.host.now();
            Ok(datetime::datetime_value(
                now.naive_local(),
                Some(now.offset().local_minus_utc() / 60),
            ))
        }
        "today" | "dateNow" => {
            let now = context.host.now();
            Ok(datetime::date_value(now.date_naive()))
        }
        "timeNow" => {
            let now = context.host.now();
            let time = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());
            Ok(datetime::time_value(time))
        }
        "DB" | "SEARCH" => context
            .host_modules
            .borrow()
            .get(&format!("@{name}"))
            .cloned()
            .ok_or_else(|| {
                err_at(
                    Error::import(
                        codes::IMPORT_UNREGISTERED,
                        format!("`@{name}` is not provided by this host"),
                    ),
                    token,
                )
            }),
        other => Err(err_at(
            Error::undefined(&format!("@{other}")),
            token,
        )),
    }
}

// ============================================================================
// `@(...)` templates
// ============================================================================

/// Render the template, then classify the result as URL, datetime, or path.
pub(super) fn eval_sigil_template(
    token: &Token,
    pieces: &[Piece],
    env: &Rc<Environment>,
) -> EvalResult {
    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Lit(text) => out.push_str(text),
            Piece::Expr(inner) => out.push_str(&eval_expr(inner, env)?.to_string()),
        }
    }
    for scheme in ["http://", "https://", "ftp://", "file://", "ws://", "wss://", "ssh://"] {
        if out.starts_with(scheme) {
            return Ok(types::url_value(out));
        }
    }
    if looks_like_date(&out) {
        if let Ok(datetime) =
            chrono::NaiveDateTime::parse_from_str(&out, "%Y-%m-%dT%H:%M:%S")
        {
            return Ok(datetime::datetime_value(datetime, None));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&out, "%Y-%m-%d") {
            return Ok(datetime::date_value(date));
        }
        return Err(err_at(
            Error::format(codes::FMT_DATETIME, format!("cannot parse datetime `{out}`")),
            token,
        ));
    }
    Ok(types::path_value(out))
}

fn looks_like_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(|b| b.is_ascii_digit())
        && bytes[4] == b'-'
}

// ============================================================================
// Connections
// ============================================================================

pub(super) fn eval_conn_lit(
    token: &Token,
    driver: &str,
    target: Option<&Expr>,
    env: &Rc<Environment>,
) -> EvalResult {
    match driver {
        "sqlite" | "postgres" | "mysql" => {
            let Some(target) = target else {
                return Err(err_at(
                    Error::database(
                        codes::DB_QUERY,
                        format!("`@{driver}` needs a target, e.g. `@{driver}(@./app.db)`"),
                    ),
                    token,
                ));
            };
            let target = eval_expr(target, env)?;
            let target = connection_target(&target);
            let context = env.context();
            let handle = context
                .host
                .db_open(&context.policy, driver, &target)
                .map_err(|e| err_at(e, token))?;
            Ok(types::connection_value(driver, &target, Some(handle)))
        }
        // Shell and SFTP handles carry no database connection.
        _ => Ok(types::connection_value(driver, "", None)),
    }
}

fn connection_target(value: &Value) -> String {
    value
        .get_key("value")
        .map(|v| v.to_string())
        .unwrap_or_else(|| value.to_string())
}

// ============================================================================
// File I/O operators
// ============================================================================

pub(super) fn eval_read(token: &Token, source: &Value, env: &Rc<Environment>) -> EvalResult {
    let context = env.context();
    if types::is_typed(source, types::TYPE_URL) {
        let url = source.get_key("value").unwrap_or(Value::Null).to_string();
        let request = FetchRequest::get(url);
        let response = context
            .host
            .fetch(&context.policy, &request)
            .map_err(|e| err_at(e, token))?;
        return Ok(types::response_value(
            response.status,
            response.headers,
            &response.body,
        ));
    }
    let path = read_target_path(source).map_err(|e| err_at(e, token))?;
    let contents = context
        .host
        .read_file(&context.policy, Path::new(&path))
        .map_err(|e| err_at(e, token))?;
    Ok(Value::str(contents))
}

pub(super) fn eval_write(
    token: &Token,
    mode: WriteMode,
    value: &Value,
    target: &Value,
    env: &Rc<Environment>,
) -> EvalResult {
    let context = env.context();
    let path = read_target_path(target).map_err(|e| err_at(e, token))?;
    let contents = printable(value);
    let (append, create_dirs) = match mode {
        WriteMode::Write => (false, false),
        WriteMode::Append => (true, false),
        WriteMode::ForceWrite => (false, true),
        WriteMode::ForceAppend => (true, true),
    };
    context
        .host
        .write_file(&context.policy, Path::new(&path), &contents, append, create_dirs)
        .map_err(|e| err_at(e, token))?;
    Ok(value.clone())
}

fn read_target_path(value: &Value) -> Result<String, Error> {
    if types::is_typed(value, types::TYPE_PATH) {
        return Ok(value.get_key("value").unwrap_or(Value::Null).to_string());
    }
    match value {
        Value::Str(path) => Ok(path.clone()),
        other => Err(Error::type_error(format!(
            "expected a path, got {}",
            other.type_name()
        ))),
    }
}

/// Canonical textual form for writes: tags render to HTML, strings pass
/// through, everything else goes via the printer.
fn printable(value: &Value) -> String {
    if types::is_typed(value, types::TYPE_TAG) {
        return crate::render::render_value(value);
    }
    value.to_string()
}

// ============================================================================
// Database operators and shell execution
// ============================================================================

pub(super) fn eval_db(
    token: &Token,
    op: DbOp,
    left: &Value,
    right: &Value,
    env: &Rc<Environment>,
) -> EvalResult {
    let context = env.context();

    if op == DbOp::Shell {
        let command = left.to_string();
        let mut words = command.split_whitespace();
        let Some(program) = words.next() else {
            return Err(err_at(
                Error::io(codes::IO_EXEC, "empty shell command"),
                token,
            ));
        };
        let args: Vec<String> = words.map(|w| w.to_string()).collect();
        let result = context
            .host
            .execute(&context.policy, program, &args)
            .map_err(|e| err_at(e, token))?;
        let mut out = IndexMap::new();
        out.insert("status".to_string(), Value::Int(result.status));
        out.insert("stdout".to_string(), Value::str(result.stdout));
        out.insert("stderr".to_string(), Value::str(result.stderr));
        out.insert("ok".to_string(), Value::Bool(result.status == 0));
        return Ok(Value::dict(out));
    }

    let sql = match left {
        Value::Str(sql) => sql.clone(),
        other => {
            return Err(err_at(
                Error::type_error(format!(
                    "database operators take a SQL string, got {}",
                    other.type_name()
                )),
                token,
            ))
        }
    };
    let handle = connection_handle(right).map_err(|e| err_at(e, token))?;

    match op {
        DbOp::QueryOne => {
            let rows = context
                .host
                .db_query(handle, &sql, &[])
                .map_err(|e| err_at(e, token))?;
            Ok(rows
                .into_iter()
                .next()
                .map(Value::dict)
                .unwrap_or(Value::Null))
        }
        DbOp::QueryMany => {
            let rows = context
                .host
                .db_query(handle, &sql, &[])
                .map_err(|e| err_at(e, token))?;
            Ok(Value::array(rows.into_iter().map(Value::dict).collect()))
        }
        DbOp::Execute => {
            let affected = context
                .host
                .db_execute(handle, &sql, &[])
                .map_err(|e| err_at(e, token))?;
            Ok(Value::Int(affected))
        }
        DbOp::Shell => unreachable!(),
    }
}

pub(super) fn connection_handle(value: &Value) -> Result<u64, Error> {
    if !types::is_typed(value, types::TYPE_CONNECTION) {
        return Err(Error::type_error(format!(
            "expected a connection, got {}",
            value.type_name()
        )));
    }
    match value.get_key("handle") {
        Some(Value::Int(handle)) => Ok(handle as u64),
        _ => Err(Error::database(
            codes::DB_CLOSED,
            "connection has no open handle",
        )),
    }
}

// ============================================================================
// Schema declarations
// ============================================================================

/// Field specs evaluate in a scope where the `std/schema` builders are in
/// view, so `@schema User { name: string.required() }` works unqualified.
pub(super) fn eval_schema_decl(
    token: &Token,
    name: &str,
    fields: &[SchemaField],
    env: &Rc<Environment>,
) -> EvalResult {
    let scope = Environment::child(env);
    let builders = crate::stdlib::schema::builder_bindings();
    if let Value::Dict(map) = &builders {
        for (key, value) in map.borrow().iter() {
            scope.define(key.clone(), value.clone());
        }
    }

    let mut field_rules = IndexMap::new();
    for field in fields {
        let rule = eval_expr(&field.spec, &scope)?;
        if !matches!(rule, Value::Dict(_)) {
            return Err(err_at(
                Error::type_error(format!(
                    "field `{}` must be a rule dictionary",
                    field.name
                )),
                token,
            ));
        }
        field_rules.insert(field.name.clone(), rule);
    }

    let schema = schema::define_schema(name, field_rules);
    env.define(name.to_string(), schema.clone());
    Ok(schema)
}

// ============================================================================
// Query DSL
// ============================================================================

pub(super) fn eval_query_dsl(
    token: &Token,
    verb: &str,
    source: Option<&Expr>,
    clauses: &[(String, Expr)],
    env: &Rc<Environment>,
) -> EvalResult {
    let source_value = match source {
        Some(expr) => Some(eval_expr(expr, env)?),
        None => None,
    };
    let mut clause_values: Vec<(String, Value)> = Vec::new();
    for (name, expr) in clauses {
        clause_values.push((name.clone(), eval_expr(expr, env)?));
    }
    let clause = |name: &str| -> Option<Value> {
        clause_values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    };

    match verb {
        "query" => {
            let source = source_value.ok_or_else(|| {
                err_at(Error::type_error("`@query` needs a source"), token)
            })?;
            let mut rows = source_rows(&source).map_err(|e| err_at(e, token))?;
            if let Some(predicate) = clause("where") {
                let mut kept = Vec::new();
                for row in rows {
                    if call_value(&predicate, &[row.clone()], env)
                        .map_err(|e| err_at(e, token))?
                        .truthy()
                    {
                        kept.push(row);
                    }
                }
                rows = kept;
            }
            if let Some(Value::Str(order)) = clause("orderBy") {
                let (key, descending) = match order.strip_prefix('-') {
                    Some(key) => (key.to_string(), true),
                    None => (order.clone(), false),
                };
                rows.sort_by(|a, b| {
                    let left = record_field(a, &key);
                    let right = record_field(b, &key);
                    let ord = super::ops::compare(&left, &right)
                        .unwrap_or(std::cmp::Ordering::Equal);
                    if descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }
            if let Some(offset) = clause("offset").and_then(|v| v.as_int()) {
                let offset = (offset.max(0) as usize).min(rows.len());
                rows.drain(..offset);
            }
            if let Some(limit) = clause("limit").and_then(|v| v.as_int()) {
                rows.truncate(limit.max(0) as usize);
            }
            if let Some(Value::Array(keys)) = clause("select") {
                let keys: Vec<String> =
                    keys.borrow().iter().map(|k| k.to_string()).collect();
                rows = rows
                    .into_iter()
                    .map(|row| {
                        let mut projected = IndexMap::new();
                        for key in &keys {
                            projected.insert(
                                key.clone(),
                                record_field(&row, key),
                            );
                        }
                        Value::dict(projected)
                    })
                    .collect();
            }
            Ok(Value::array(rows))
        }
        "insert" => {
            let source = source_value.ok_or_else(|| {
                err_at(Error::type_error("`@insert` needs a target table"), token)
            })?;
            let mut row_fields = IndexMap::new();
            for (name, value) in &clause_values {
                row_fields.insert(name.clone(), value.clone());
            }
            let row = Value::dict(row_fields);
            let row = match source.get_key("schema") {
                Some(Value::Str(schema_id)) => {
                    record_from_schema_id(&schema_id, row).map_err(|e| err_at(e, token))?
                }
                _ => row,
            };
            push_row(&source, row.clone()).map_err(|e| err_at(e, token))?;
            Ok(row)
        }
        "update" => {
            let source = source_value.ok_or_else(|| {
                err_at(Error::type_error("`@update` needs a target table"), token)
            })?;
            let predicate = clause("where");
            let set = clause("set").unwrap_or_else(Value::empty_dict);
            let rows = source_rows(&source).map_err(|e| err_at(e, token))?;
            let mut updated = 0i64;
            for row in rows {
                let matched = match &predicate {
                    Some(predicate) => call_value(predicate, &[row.clone()], env)
                        .map_err(|e| err_at(e, token))?
                        .truthy(),
                    None => true,
                };
                if matched {
                    if let (Value::Dict(target), Value::Dict(updates)) = (&row, &set) {
                        for (key, value) in updates.borrow().iter() {
                            target.borrow_mut().insert(key.clone(), value.clone());
                        }
                    }
                    updated += 1;
                }
            }
            Ok(Value::Int(updated))
        }
        "delete" => {
            let source = source_value.ok_or_else(|| {
                err_at(Error::type_error("`@delete` needs a target table"), token)
            })?;
            let predicate = clause("where");
            let rows = source_rows(&source).map_err(|e| err_at(e, token))?;
            let mut keep = Vec::new();
            let mut removed = 0i64;
            for row in rows {
                let matched = match &predicate {
                    Some(predicate) => call_value(predicate, &[row.clone()], env)
                        .map_err(|e| err_at(e, token))?
                        .truthy(),
                    None => true,
                };
                if matched {
                    removed += 1;
                } else {
                    keep.push(row);
                }
            }
            replace_rows(&source, keep).map_err(|e| err_at(e, token))?;
            Ok(Value::Int(removed))
        }
        "transaction" => {
            let source = source_value.ok_or_else(|| {
                err_at(
                    Error::type_error("`@transaction` needs a connection"),
                    token,
                )
            })?;
            let body = clause("body").ok_or_else(|| {
                err_at(
                    Error::type_error("`@transaction` needs a function body"),
                    token,
                )
            })?;
            let handle = connection_handle(&source).map_err(|e| err_at(e, token))?;
            let context = env.context();
            context
                .host
                .db_execute(handle, "BEGIN", &[])
                .map_err(|e| err_at(e, token))?;
            match call_value(&body, &[source.clone()], env) {
                Ok(result) => {
                    context
                        .host
                        .db_execute(handle, "COMMIT", &[])
                        .map_err(|e| err_at(e, token))?;
                    Ok(result)
                }
                Err(err) => {
                    let _ = context.host.db_execute(handle, "ROLLBACK", &[]);
                    Err(Signal::from(err))
                }
            }
        }
        other => Err(err_at(
            Error::type_error(format!("unknown query verb `@{other}`")),
            token,
        )),
    }
}

fn source_rows(source: &Value) -> Result<Vec<Value>, Error> {
    if types::is_typed(source, types::TYPE_TABLE) {
        let rows = source.get_key("rows").unwrap_or_else(|| Value::array(vec![]));
        return source_rows(&rows);
    }
    match source {
        Value::Array(items) => Ok(items.borrow().clone()),
        other => Err(Error::type_error(format!(
            "expected a table or array, got {}",
            other.type_name()
        ))),
    }
}

fn push_row(source: &Value, row: Value) -> Result<(), Error> {
    let rows = if types::is_typed(source, types::TYPE_TABLE) {
        source.get_key("rows").unwrap_or(Value::Null)
    } else {
        source.clone()
    };
    match rows {
        Value::Array(items) => {
            items.borrow_mut().push(row);
            Ok(())
        }
        other => Err(Error::type_error(format!(
            "cannot insert into {}",
            other.type_name()
        ))),
    }
}

fn replace_rows(source: &Value, new_rows: Vec<Value>) -> Result<(), Error> {
    let rows = if types::is_typed(source, types::TYPE_TABLE) {
        source.get_key("rows").unwrap_or(Value::Null)
    } else {
        source.clone()
    };
    match rows {
        Value::Array(items) => {
            *items.borrow_mut() = new_rows;
            Ok(())
        }
        other => Err(Error::type_error(format!(
            "cannot delete from {}",
            other.type_name()
        ))),
    }
}

/// Read a field from a record or plain dictionary row.
fn record_field(row: &Value, key: &str) -> Value {
    if types::is_typed(row, types::TYPE_RECORD) {
        if let Some(data) = row.get_key("data") {
            return data.get_key(key).unwrap_or(Value::Null);
        }
    }
    row.get_key(key).unwrap_or(Value::Null)
}

fn record_from_schema_id(schema_id: &str, data: Value) -> Result<Value, Error> {
    let schema = types::typed(
        types::TYPE_SCHEMA,
        vec![
            ("id", Value::str(schema_id)),
            ("name", Value::str(schema_id)),
        ],
    );
    schema::make_record(&schema, data)
}
