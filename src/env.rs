// ABOUTME: Environment module for variable bindings and process-wide context
// Scopes form a parent chain; the root scope additionally owns the script
// arguments, environment-variable view, security policy, module cache, host
// callbacks, and the cancellation flag.

use crate::error::Error;
use crate::host::{HostCallbacks, NullHost};
use crate::security::SecurityPolicy;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide state held by the root environment.
pub struct Context {
    pub script_args: Vec<Value>,
    pub env_vars: IndexMap<String, String>,
    pub policy: SecurityPolicy,
    pub host: Box<dyn HostCallbacks>,
    pub project_root: PathBuf,
    /// Fully-evaluated module exports keyed by canonical path.
    pub module_cache: RefCell<HashMap<PathBuf, Value>>,
    /// Stack of modules currently evaluating; used both for cycle detection
    /// and to resolve relative imports against the importing file.
    pub importing: RefCell<Vec<PathBuf>>,
    /// Framework modules registered by the host (`basil/...`, `@DB`, ...).
    pub host_modules: RefCell<HashMap<String, Value>>,
    pub cancelled: AtomicBool,
    pub call_depth: Cell<usize>,
}

impl Context {
    pub fn new(
        script_args: Vec<Value>,
        env_vars: IndexMap<String, String>,
        policy: SecurityPolicy,
        host: Box<dyn HostCallbacks>,
    ) -> Self {
        Context {
            script_args,
            env_vars,
            policy,
            host,
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            module_cache: RefCell::new(HashMap::new()),
            importing: RefCell::new(Vec::new()),
            host_modules: RefCell::new(HashMap::new()),
            cancelled: AtomicBool::new(false),
            call_depth: Cell::new(0),
        }
    }

    /// Context with no arguments, no environment view, a default policy, and
    /// a host that refuses all I/O. Used by tests and embedding defaults.
    pub fn minimal() -> Self {
        Context::new(
            Vec::new(),
            IndexMap::new(),
            SecurityPolicy::default(),
            Box::new(NullHost),
        )
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn check_cancelled(&self) -> Result<(), Error> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(Error::cancelled())
        } else {
            Ok(())
        }
    }

    /// Directory of the module currently evaluating, for relative imports.
    pub fn current_dir(&self) -> PathBuf {
        self.importing
            .borrow()
            .last()
            .and_then(|path| path.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| self.project_root.clone())
    }

    pub fn current_file(&self) -> Option<String> {
        self.importing
            .borrow()
            .last()
            .map(|path| path.display().to_string())
    }
}

pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
    context: Option<Rc<Context>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &self.bindings.borrow().len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Environment {
    /// Creates a root environment owning the process-wide context.
    pub fn root(context: Context) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
            context: Some(Rc::new(context)),
        })
    }

    /// Creates a child scope for function bodies and block boundaries.
    pub fn child(parent: &Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
            context: None,
        })
    }

    /// Defines a binding in THIS scope, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Looks a name up through the scope chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Writes to the scope where `name` was defined. Returns false when the
    /// name is unbound anywhere in the chain.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// The root scope of the chain; module evaluation parents on this so
    /// modules never see the importer's locals.
    pub fn root_of(env: &Rc<Environment>) -> Rc<Environment> {
        let mut current = env.clone();
        loop {
            let parent = current.parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// The process-wide context, found by walking to the root.
    pub fn context(&self) -> Rc<Context> {
        if let Some(context) = &self.context {
            return context.clone();
        }
        self.parent
            .as_ref()
            .expect("environment chain must end in a root with context")
            .context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Rc<Environment> {
        Environment::root(Context::minimal())
    }

    #[test]
    fn test_define_and_get() {
        let env = root();
        env.define("x", Value::Int(42));
        assert_eq!(env.get("x"), Some(Value::Int(42)));
    }

    #[test]
    fn test_shadowing() {
        let parent = root();
        parent.define("x", Value::Int(1));
        let child = Environment::child(&parent);
        child.define("x", Value::Int(2));
        assert_eq!(child.get("x"), Some(Value::Int(2)));
        assert_eq!(parent.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_assign_writes_defining_scope() {
        let parent = root();
        parent.define("n", Value::Int(0));
        let child = Environment::child(&parent);
        assert!(child.assign("n", Value::Int(5)));
        assert_eq!(parent.get("n"), Some(Value::Int(5)));
    }

    #[test]
    fn test_assign_unbound_reports_false() {
        let env = root();
        assert!(!env.assign("missing", Value::Null));
    }

    #[test]
    fn test_context_reachable_from_nested_scope() {
        let env = root();
        let deep = Environment::child(&Environment::child(&env));
        deep.context().cancel();
        assert!(env.context().check_cancelled().is_err());
    }
}
