// ABOUTME: Host callback surface for I/O, networking, databases, and time
// The evaluator never touches the outside world directly; every effect goes
// through this trait. Each callback receives the security policy and must
// enforce it before acting.

use crate::error::{codes, Error};
use crate::security::SecurityPolicy;
use crate::value::{Dict, Value};
use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        FetchRequest {
            url: url.into(),
            method: "GET".to_string(),
            headers: Vec::new(),
            body: None,
            timeout_ms: 30_000,
        }
    }
}

pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

pub struct ExecResult {
    pub status: i64,
    pub stdout: String,
    pub stderr: String,
}

pub trait HostCallbacks {
    fn read_file(&self, policy: &SecurityPolicy, path: &Path) -> Result<String, Error>;
    fn write_file(
        &self,
        policy: &SecurityPolicy,
        path: &Path,
        contents: &str,
        append: bool,
        create_dirs: bool,
    ) -> Result<(), Error>;
    fn fetch(&self, policy: &SecurityPolicy, request: &FetchRequest)
        -> Result<FetchResponse, Error>;
    fn execute(
        &self,
        policy: &SecurityPolicy,
        program: &str,
        args: &[String],
    ) -> Result<ExecResult, Error>;
    fn db_open(
        &self,
        policy: &SecurityPolicy,
        driver: &str,
        target: &str,
    ) -> Result<u64, Error>;
    fn db_query(&self, handle: u64, sql: &str, params: &[Value]) -> Result<Vec<Dict>, Error>;
    fn db_execute(&self, handle: u64, sql: &str, params: &[Value]) -> Result<i64, Error>;
    fn db_close(&self, handle: u64) -> Result<(), Error>;
    fn log(&self, level: &str, message: &str);
    fn now(&self) -> DateTime<FixedOffset>;
}

// ============================================================================
// Default host: blocking std I/O, ureq, rusqlite
// ============================================================================

pub struct DefaultHost {
    connections: RefCell<HashMap<u64, rusqlite::Connection>>,
    next_handle: Cell<u64>,
}

impl DefaultHost {
    pub fn new() -> Self {
        DefaultHost {
            connections: RefCell::new(HashMap::new()),
            next_handle: Cell::new(1),
        }
    }

    fn with_connection<T>(
        &self,
        handle: u64,
        op: impl FnOnce(&rusqlite::Connection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let connections = self.connections.borrow();
        let conn = connections.get(&handle).ok_or_else(|| {
            Error::database(codes::DB_CLOSED, format!("connection #{handle} is closed"))
        })?;
        op(conn)
    }
}

impl Default for DefaultHost {
    fn default() -> Self {
        Self::new()
    }
}

fn sql_params(params: &[Value]) -> Vec<Box<dyn rusqlite::ToSql>> {
    params
        .iter()
        .map(|value| -> Box<dyn rusqlite::ToSql> {
            match value {
                Value::Int(n) => Box::new(*n),
                Value::Float(f) => Box::new(*f),
                Value::Str(s) => Box::new(s.clone()),
                Value::Bool(b) => Box::new(*b as i64),
                Value::Null => Box::new(rusqlite::types::Null),
                other => Box::new(other.to_string()),
            }
        })
        .collect()
}

impl HostCallbacks for DefaultHost {
    fn read_file(&self, policy: &SecurityPolicy, path: &Path) -> Result<String, Error> {
        let canonical = policy.check_read(path)?;
        std::fs::read_to_string(&canonical).map_err(|e| {
            Error::io(
                codes::IO_READ,
                format!("cannot read {}: {e}", canonical.display()),
            )
        })
    }

    fn write_file(
        &self,
        policy: &SecurityPolicy,
        path: &Path,
        contents: &str,
        append: bool,
        create_dirs: bool,
    ) -> Result<(), Error> {
        let canonical = policy.check_write(path)?;
        if create_dirs {
            if let Some(parent) = canonical.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::io(
                        codes::IO_WRITE,
                        format!("cannot create {}: {e}", parent.display()),
                    )
                })?;
            }
        }
        let result = if append {
            use std::io::Write;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&canonical)
                .and_then(|mut file| file.write_all(contents.as_bytes()))
        } else {
            std::fs::write(&canonical, contents)
        };
        result.map_err(|e| {
            Error::io(
                codes::IO_WRITE,
                format!("cannot write {}: {e}", canonical.display()),
            )
        })
    }

    fn fetch(
        &self,
        _policy: &SecurityPolicy,
        request: &FetchRequest,
    ) -> Result<FetchResponse, Error> {
        let mut req = match request.method.as_str() {
            "GET" => ureq::get(&request.url),
            "POST" => ureq::post(&request.url),
            "PUT" => ureq::put(&request.url),
            "DELETE" => ureq::delete(&request.url),
            "PATCH" => ureq::patch(&request.url),
            "HEAD" => ureq::head(&request.url),
            other => {
                return Err(Error::network(format!("unsupported HTTP method {other}")))
            }
        };
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }
        req = req.timeout(std::time::Duration::from_millis(request.timeout_ms));

        let response = match &request.body {
            Some(body) => req.send_string(body),
            None => req.call(),
        };
        let response = match response {
            Ok(resp) => resp,
            // 4xx/5xx still carry a usable response body.
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(e) => {
                return Err(Error::network(format!(
                    "{} {} failed: {e}",
                    request.method, request.url
                )))
            }
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .iter()
            .map(|name| {
                let value = response.header(name).unwrap_or("").to_string();
                (name.clone(), value)
            })
            .collect();
        let body = response
            .into_string()
            .map_err(|e| Error::network(format!("failed to read response body: {e}")))?;
        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }

    fn execute(
        &self,
        policy: &SecurityPolicy,
        program: &str,
        args: &[String],
    ) -> Result<ExecResult, Error> {
        policy.check_execute(program)?;
        let output = std::process::Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::io(codes::IO_EXEC, format!("cannot run {program}: {e}")))?;
        Ok(ExecResult {
            status: output.status.code().unwrap_or(-1) as i64,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn db_open(
        &self,
        policy: &SecurityPolicy,
        driver: &str,
        target: &str,
    ) -> Result<u64, Error> {
        if driver != "sqlite" {
            return Err(Error::database(
                codes::DB_DRIVER,
                format!("driver `{driver}` is not available in this host"),
            ));
        }
        let conn = if target == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            let canonical = policy.check_write(Path::new(target))?;
            rusqlite::Connection::open(canonical)
        };
        let conn = conn.map_err(|e| {
            Error::database(codes::DB_QUERY, format!("cannot open {target}: {e}"))
        })?;
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        self.connections.borrow_mut().insert(handle, conn);
        Ok(handle)
    }

    fn db_query(&self, handle: u64, sql: &str, params: &[Value]) -> Result<Vec<Dict>, Error> {
        self.with_connection(handle, |conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| Error::database(codes::DB_QUERY, format!("SQL error: {e}")))?;
            let columns: Vec<String> =
                stmt.column_names().iter().map(|s| s.to_string()).collect();
            let boxed = sql_params(params);
            let refs: Vec<&dyn rusqlite::ToSql> =
                boxed.iter().map(|b| &**b as &dyn rusqlite::ToSql).collect();
            let mut rows = stmt
                .query(&refs[..])
                .map_err(|e| Error::database(codes::DB_QUERY, format!("query error: {e}")))?;

            let mut out = Vec::new();
            while let Some(row) = rows
                .next()
                .map_err(|e| Error::database(codes::DB_QUERY, format!("row error: {e}")))?
            {
                let mut dict = IndexMap::new();
                for (idx, column) in columns.iter().enumerate() {
                    let value = match row.get_ref(idx) {
                        Ok(rusqlite::types::ValueRef::Integer(i)) => Value::Int(i),
                        Ok(rusqlite::types::ValueRef::Real(r)) => Value::Float(r),
                        Ok(rusqlite::types::ValueRef::Text(t)) => {
                            Value::str(String::from_utf8_lossy(t))
                        }
                        Ok(rusqlite::types::ValueRef::Blob(_)) => Value::Null,
                        Ok(rusqlite::types::ValueRef::Null) => Value::Null,
                        Err(e) => {
                            return Err(Error::database(
                                codes::DB_QUERY,
                                format!("column error: {e}"),
                            ))
                        }
                    };
                    dict.insert(column.clone(), value);
                }
                out.push(dict);
            }
            Ok(out)
        })
    }

    fn db_execute(&self, handle: u64, sql: &str, params: &[Value]) -> Result<i64, Error> {
        self.with_connection(handle, |conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| Error::database(codes::DB_QUERY, format!("SQL error: {e}")))?;
            let boxed = sql_params(params);
            let refs: Vec<&dyn rusqlite::ToSql> =
                boxed.iter().map(|b| &**b as &dyn rusqlite::ToSql).collect();
            let affected = stmt
                .execute(&refs[..])
                .map_err(|e| Error::database(codes::DB_QUERY, format!("execute error: {e}")))?;
            Ok(affected as i64)
        })
    }

    fn db_close(&self, handle: u64) -> Result<(), Error> {
        self.connections.borrow_mut().remove(&handle);
        Ok(())
    }

    fn log(&self, level: &str, message: &str) {
        match level {
            "error" => log::error!("{message}"),
            "warn" => log::warn!("{message}"),
            "debug" => log::debug!("{message}"),
            _ => log::info!("{message}"),
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }
}

// ============================================================================
// Null host: refuses all effects; the default for tests
// ============================================================================

pub struct NullHost;

impl HostCallbacks for NullHost {
    fn read_file(&self, _policy: &SecurityPolicy, path: &Path) -> Result<String, Error> {
        Err(Error::io(
            codes::IO_READ,
            format!("host provides no filesystem (read {})", path.display()),
        ))
    }

    fn write_file(
        &self,
        _policy: &SecurityPolicy,
        path: &Path,
        _contents: &str,
        _append: bool,
        _create_dirs: bool,
    ) -> Result<(), Error> {
        Err(Error::io(
            codes::IO_WRITE,
            format!("host provides no filesystem (write {})", path.display()),
        ))
    }

    fn fetch(
        &self,
        _policy: &SecurityPolicy,
        request: &FetchRequest,
    ) -> Result<FetchResponse, Error> {
        Err(Error::network(format!(
            "host provides no network (fetch {})",
            request.url
        )))
    }

    fn execute(
        &self,
        _policy: &SecurityPolicy,
        program: &str,
        _args: &[String],
    ) -> Result<ExecResult, Error> {
        Err(Error::io(
            codes::IO_EXEC,
            format!("host provides no process execution ({program})"),
        ))
    }

    fn db_open(
        &self,
        _policy: &SecurityPolicy,
        driver: &str,
        _target: &str,
    ) -> Result<u64, Error> {
        Err(Error::database(
            codes::DB_DRIVER,
            format!("host provides no `{driver}` database"),
        ))
    }

    fn db_query(&self, _handle: u64, _sql: &str, _params: &[Value]) -> Result<Vec<Dict>, Error> {
        Err(Error::database(codes::DB_CLOSED, "no open connection"))
    }

    fn db_execute(&self, _handle: u64, _sql: &str, _params: &[Value]) -> Result<i64, Error> {
        Err(Error::database(codes::DB_CLOSED, "no open connection"))
    }

    fn db_close(&self, _handle: u64) -> Result<(), Error> {
        Ok(())
    }

    fn log(&self, level: &str, message: &str) {
        match level {
            "error" => log::error!("{message}"),
            "warn" => log::warn!("{message}"),
            "debug" => log::debug!("{message}"),
            _ => log::info!("{message}"),
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_host_roundtrip() {
        let host = DefaultHost::new();
        let policy = SecurityPolicy::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");

        host.write_file(&policy, &path, "hello", false, false).unwrap();
        assert_eq!(host.read_file(&policy, &path).unwrap(), "hello");

        host.write_file(&policy, &path, " world", true, false).unwrap();
        assert_eq!(host.read_file(&policy, &path).unwrap(), "hello world");
    }

    #[test]
    #[serial]
    fn test_write_respects_policy() {
        let host = DefaultHost::new();
        let policy = SecurityPolicy {
            no_write: true,
            ..Default::default()
        };
        let err = host
            .write_file(&policy, Path::new("/tmp/denied.txt"), "x", false, false)
            .unwrap_err();
        assert_eq!(err.code, "SEC-0002");
    }

    #[test]
    fn test_sqlite_query_via_host() {
        let host = DefaultHost::new();
        let policy = SecurityPolicy::default();
        let handle = host.db_open(&policy, "sqlite", ":memory:").unwrap();
        host.db_execute(handle, "CREATE TABLE t (id INTEGER, name TEXT)", &[])
            .unwrap();
        host.db_execute(
            handle,
            "INSERT INTO t VALUES (?1, ?2)",
            &[Value::Int(1), Value::str("a")],
        )
        .unwrap();
        let rows = host.db_query(handle, "SELECT * FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::str("a")));
        host.db_close(handle).unwrap();
        assert!(host.db_query(handle, "SELECT 1", &[]).is_err());
    }

    #[test]
    fn test_unknown_driver_is_database_error() {
        let host = DefaultHost::new();
        let err = host
            .db_open(&SecurityPolicy::default(), "postgres", "db")
            .unwrap_err();
        assert_eq!(err.code, "DB-0002");
        assert!(err.class.is_catchable());
    }
}
