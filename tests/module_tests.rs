// ABOUTME: Module loader integration tests — filesystem imports, caching,
// cycles, host modules, and framework context

use basil::host::DefaultHost;
use basil::security::SecurityPolicy;
use basil::value::Value;
use basil::{evaluate_file, new_environment, register_host_module};
use serial_test::serial;
use std::path::Path;
use std::rc::Rc;

fn setup() -> Rc<basil::env::Environment> {
    new_environment(
        Vec::new(),
        indexmap::IndexMap::new(),
        SecurityPolicy::default(),
        Box::new(DefaultHost::new()),
    )
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

#[test]
#[serial]
fn test_relative_import_between_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "util.sl",
        "export fn double(n) { n * 2 }\nexport base = 10\n",
    );
    write(
        dir.path(),
        "main.sl",
        "import @./util.sl as util\nutil.double(util.base)\n",
    );

    let env = setup();
    let result = evaluate_file(&dir.path().join("main.sl"), &env).unwrap();
    assert_eq!(result, Value::Int(20));
}

#[test]
#[serial]
fn test_import_without_extension_resolves_script() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.sl", "export value = 7\n");
    write(dir.path(), "main.sl", "import @./lib as lib\nlib.value\n");

    let env = setup();
    let result = evaluate_file(&dir.path().join("main.sl"), &env).unwrap();
    assert_eq!(result, Value::Int(7));
}

#[test]
#[serial]
fn test_partial_extension_resolves_too() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "header.slp", "export html = \"<header/>\"\n");
    write(
        dir.path(),
        "main.sl",
        "import @./header as header\nheader.html\n",
    );

    let env = setup();
    let result = evaluate_file(&dir.path().join("main.sl"), &env).unwrap();
    assert_eq!(result, Value::str("<header/>"));
}

#[test]
#[serial]
fn test_module_evaluates_once() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "state.sl",
        "let cells = []\nexport cells = cells\n",
    );
    write(
        dir.path(),
        "main.sl",
        "
import @./state.sl as a
import @./state.sl as b
a.cells.push(1)
b.cells.length()
",
    );

    let env = setup();
    let result = evaluate_file(&dir.path().join("main.sl"), &env).unwrap();
    // Both imports observe the same cached exports.
    assert_eq!(result, Value::Int(1));
}

#[test]
#[serial]
fn test_nested_relative_imports() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("lib")).unwrap();
    write(dir.path(), "lib/inner.sl", "export n = 3\n");
    write(
        dir.path(),
        "lib/outer.sl",
        "import @./inner.sl as inner\nexport n = inner.n + 1\n",
    );
    write(
        dir.path(),
        "main.sl",
        "import @./lib/outer.sl as outer\nouter.n\n",
    );

    let env = setup();
    let result = evaluate_file(&dir.path().join("main.sl"), &env).unwrap();
    assert_eq!(result, Value::Int(4));
}

#[test]
#[serial]
fn test_cycle_is_an_import_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.sl", "import @./b.sl as b\nexport x = 1\n");
    write(dir.path(), "b.sl", "import @./a.sl as a\nexport y = 2\n");
    write(dir.path(), "main.sl", "import @./a.sl as a\na.x\n");

    let env = setup();
    let err = evaluate_file(&dir.path().join("main.sl"), &env).unwrap_err();
    assert_eq!(err.code, "IMPORT-0002");
    assert!(!err.class.is_catchable());
}

#[test]
#[serial]
fn test_default_export_key() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "page.sl",
        "export default = \"the page\"\nexport title = \"t\"\n",
    );
    write(
        dir.path(),
        "main.sl",
        "import @./page.sl as page\npage.title\n",
    );

    let env = setup();
    let result = evaluate_file(&dir.path().join("main.sl"), &env).unwrap();
    assert_eq!(result, Value::str("t"));
}

#[test]
#[serial]
fn test_module_locals_stay_private() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "secrets.sl",
        "let hidden = 42\nexport visible = 1\n",
    );
    write(
        dir.path(),
        "main.sl",
        "import @./secrets.sl as secrets\nsecrets.hidden\n",
    );

    let env = setup();
    let result = evaluate_file(&dir.path().join("main.sl"), &env).unwrap();
    // Not exported: member access on the exports dict yields null.
    assert_eq!(result, Value::Null);
}

#[test]
fn test_registered_framework_module() {
    let env = setup();
    let mut exports = indexmap::IndexMap::new();
    exports.insert("currentUser".to_string(), Value::str("ada"));
    register_host_module(&env, "basil/auth", Value::dict(exports));

    let result = basil::evaluate("@basil/auth.currentUser", &env).unwrap();
    assert_eq!(result, Value::str("ada"));
}

#[test]
fn test_db_context_requires_registration() {
    let env = setup();
    let err = basil::evaluate("@DB", &env).unwrap_err();
    assert_eq!(err.code, "IMPORT-0003");

    register_host_module(&env, "@DB", Value::empty_dict());
    assert!(basil::evaluate("@DB", &env).is_ok());
}

#[test]
fn test_params_default_to_empty_dict() {
    let env = setup();
    let result = basil::evaluate("@params.length()", &env).unwrap();
    assert_eq!(result, Value::Int(0));

    let mut params = indexmap::IndexMap::new();
    params.insert("q".to_string(), Value::str("search"));
    register_host_module(&env, "@params", Value::dict(params));
    let result = basil::evaluate("@params.q", &env).unwrap();
    assert_eq!(result, Value::str("search"));
}
