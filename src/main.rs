// ABOUTME: Runner binary — evaluate a script file and print the result
// A minimal embedding of the engine: builds a root environment from CLI
// flags, evaluates the script, prints the value (or the error envelope) and
// exits non-zero on failure.

use basil::error::Error;
use basil::host::DefaultHost;
use basil::security::SecurityPolicy;
use basil::value::Value;
use clap::Parser;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::process::ExitCode;

/// Basil script runner
#[derive(Parser, Debug)]
#[command(name = "basil")]
#[command(version = basil::config::VERSION)]
#[command(about = "Evaluate a Basil script")]
struct CliArgs {
    /// Script file to evaluate
    #[arg(value_name = "FILE")]
    script: PathBuf,

    /// Arguments passed to the script as @args (can be repeated)
    #[arg(long = "arg", value_name = "VALUE", action = clap::ArgAction::Append)]
    args: Vec<String>,

    /// Deny a path prefix for reads (can be repeated)
    #[arg(long = "restrict-read", value_name = "PATH", action = clap::ArgAction::Append)]
    restrict_read: Vec<PathBuf>,

    /// Deny a path prefix for writes (can be repeated)
    #[arg(long = "restrict-write", value_name = "PATH", action = clap::ArgAction::Append)]
    restrict_write: Vec<PathBuf>,

    /// Disable all filesystem reads
    #[arg(long = "no-read")]
    no_read: bool,

    /// Disable all filesystem writes
    #[arg(long = "no-write")]
    no_write: bool,

    /// Allow executing a program (can be repeated)
    #[arg(long = "allow-exec", value_name = "PROGRAM", action = clap::ArgAction::Append)]
    allow_exec: Vec<String>,

    /// Allow executing any program
    #[arg(long = "allow-exec-all")]
    allow_exec_all: bool,

    /// Print the result as JSON instead of the canonical form
    #[arg(long = "json")]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = CliArgs::parse();

    let policy = SecurityPolicy {
        read_restrict: cli.restrict_read.clone(),
        write_restrict: cli.restrict_write.clone(),
        execute_allow: cli.allow_exec.clone(),
        no_read: cli.no_read,
        no_write: cli.no_write,
        allow_execute_all: cli.allow_exec_all,
    };

    let script_args: Vec<Value> = cli.args.iter().map(Value::str).collect();
    let env_vars: IndexMap<String, String> = std::env::vars().collect();

    let env = basil::new_environment(script_args, env_vars, policy, Box::new(DefaultHost::new()));

    match basil::evaluate_file(&cli.script, &env) {
        Ok(value) => {
            print_value(&value, cli.json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn print_value(value: &Value, as_json: bool) {
    if matches!(value, Value::Null) {
        return;
    }
    if as_json {
        match serde_json::to_string_pretty(&value.to_json()) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("cannot encode result: {e}"),
        }
        return;
    }
    if basil::types::is_typed(value, basil::types::TYPE_TAG) {
        println!("{}", basil::render::render_value(value));
        return;
    }
    println!("{value}");
}

fn print_error(err: &Error) {
    match serde_json::to_string_pretty(&err.to_report()) {
        Ok(report) => eprintln!("{report}"),
        Err(_) => eprintln!("{err}"),
    }
}
