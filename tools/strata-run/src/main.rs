//! Runs one registered module with no upstream inputs and prints what it did.
//!
//!   `strata-run`                                   - list registered modules
//!   `strata-run CreateImage --set Width=64`        - run with one override
//!   `strata-run CreateImage --state in.json --save out.json`
//!
//! State files hold the plain key-value form, e.g. `{"Width":{"Int":64}}`.
//! Set `RUST_LOG=debug` to see execution logging.

use std::env;
use std::fs;
use std::process;

use strata_core::{ModuleInstance, ParameterName, PortData, SerialState, StateError, Value, ValueType};
use strata_serde::{ModuleRegistry, SerdeError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Registry(#[from] SerdeError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Module(#[from] strata_core::ModuleError),
}

#[derive(Debug, Default)]
struct Args {
    module: String,
    state: Option<String>,
    sets: Vec<(String, String)>,
    save: Option<String>,
}

const USAGE: &str = "usage: strata-run <Module> [--state FILE] [--set KEY=VALUE]... [--save FILE]";

fn parse_args(raw: &[String]) -> Result<Args, CliError> {
    let mut iter = raw.iter();
    let module = iter
        .next()
        .ok_or_else(|| CliError::Usage(USAGE.into()))?
        .clone();
    let mut args = Args {
        module,
        ..Args::default()
    };
    while let Some(flag) = iter.next() {
        let mut operand = || {
            iter.next()
                .cloned()
                .ok_or_else(|| CliError::Usage(format!("{flag} needs a value\n{USAGE}")))
        };
        match flag.as_str() {
            "--state" => args.state = Some(operand()?),
            "--save" => args.save = Some(operand()?),
            "--set" => {
                let pair = operand()?;
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| CliError::Usage(format!("expected KEY=VALUE, got {pair:?}")))?;
                args.sets.push((key.to_string(), value.to_string()));
            }
            other => return Err(CliError::Usage(format!("unknown flag {other}\n{USAGE}"))),
        }
    }
    Ok(args)
}

/// Parses `text` as the declared type of `name`.
fn parse_value(instance: &ModuleInstance, name: &str, text: &str) -> Result<Value, CliError> {
    let spec = instance.state().schema().require(name)?;
    let bad = |what: &str| CliError::Usage(format!("{name}: {text:?} is not a valid {what}"));
    Ok(match spec.value_type {
        ValueType::Int => Value::Int(text.parse().map_err(|_| bad("int"))?),
        ValueType::Real => Value::Real(text.parse().map_err(|_| bad("real"))?),
        ValueType::Bool => Value::Bool(text.parse().map_err(|_| bad("bool"))?),
        ValueType::String => Value::String(text.to_string()),
        ValueType::Matrix => {
            return Err(CliError::Usage(format!(
                "{name}: matrix parameters cannot be set from the command line"
            )));
        }
    })
}

fn read_state(path: &str) -> Result<SerialState, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_string(),
        source,
    })
}

fn write_state(path: &str, state: &SerialState) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(state).map_err(|source| CliError::Json {
        path: path.to_string(),
        source,
    })?;
    fs::write(path, text).map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })
}

fn run(registry: &ModuleRegistry, args: &Args) -> Result<(), CliError> {
    let mut instance = registry.create(&args.module)?;

    if let Some(path) = &args.state {
        instance.state_mut().load_serial(&read_state(path)?)?;
    }
    for (key, text) in &args.sets {
        let value = parse_value(&instance, key, text)?;
        instance.state_mut().set(&ParameterName::owned(key.as_str()), value)?;
    }

    let report = instance.execute(&PortData::new())?;

    println!("{}", args.module);
    for (port, data) in report.outputs.iter() {
        println!("  output  {port}: {}", data.payload_type());
    }
    for warning in &report.warnings {
        println!("  warning {warning}");
    }
    if report.state_changes > 0 {
        println!("  {} parameter(s) written back", report.state_changes);
    }
    for (name, value) in instance.state().iter() {
        match value {
            Some(value) => println!("  {name} = {value}"),
            None => println!("  {name} = (unset)"),
        }
    }

    if let Some(path) = &args.save {
        write_state(path, &instance.state().to_serial())?;
        log::info!("saved state to {path}");
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let registry = ModuleRegistry::with_builtin();

    if raw.is_empty() {
        for name in registry.registered_types() {
            println!("{name}");
        }
        return;
    }

    let result = parse_args(&raw).and_then(|args| run(&registry, &args));
    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(&strings(&[
            "CreateImage",
            "--set",
            "Width=8",
            "--set",
            "Mode=Auto",
            "--save",
            "out.json",
        ]))
        .unwrap();
        assert_eq!(args.module, "CreateImage");
        assert_eq!(args.sets.len(), 2);
        assert_eq!(args.sets[1], ("Mode".to_string(), "Auto".to_string()));
        assert_eq!(args.save.as_deref(), Some("out.json"));
        assert!(args.state.is_none());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&strings(&["CreateImage", "--set"])).is_err());
        assert!(parse_args(&strings(&["CreateImage", "--set", "Width"])).is_err());
        assert!(parse_args(&strings(&["CreateImage", "--bogus"])).is_err());
    }

    #[test]
    fn test_parse_value_uses_declared_type() {
        let instance = ModuleRegistry::with_builtin().create("CreateImage").unwrap();
        assert_eq!(parse_value(&instance, "Width", "12").unwrap(), Value::Int(12));
        assert_eq!(parse_value(&instance, "PadPercent", "2.5").unwrap(), Value::Real(2.5));
        assert_eq!(
            parse_value(&instance, "Mode", "Auto").unwrap(),
            Value::String("Auto".into())
        );
        assert!(parse_value(&instance, "Width", "wide").is_err());
        assert!(parse_value(&instance, "Nope", "1").is_err());
    }

    #[test]
    fn test_run_without_inputs() {
        let registry = ModuleRegistry::with_builtin();
        let args = parse_args(&strings(&["CreateImage", "--set", "Width=4"])).unwrap();
        run(&registry, &args).unwrap();
    }
}
