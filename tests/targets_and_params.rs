mod common;
use crate::common::{files_under, init_tracing};

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use pipedag::cli::{CliArgs, LogLevel};
use pipedag::config::template::{placeholders, render};
use pipedag::errors::PipedagError;
use pipedag::logging::resolve_level;
use pipedag::storage::{LocalStorage, MemoryStorage, Storage};
use pipedag::target::Target;
use pipedag::task::TaskId;
use pipedag::types::{ParamValue, Params, parse_param};

fn local_target(root: &std::path::Path, location: &str) -> Target {
    Target::new(location, Arc::new(LocalStorage::new(root)))
}

#[test]
fn test_local_target_becomes_visible_only_on_commit() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let target = local_target(dir.path(), "models/m1.bin");
    assert!(!target.exists());

    let mut writer = target.open_write().unwrap();
    writer.write_all(b"weights").unwrap();
    assert!(!target.exists(), "staged bytes must not be visible");

    writer.commit().unwrap();
    assert!(target.exists());
    assert_eq!(target.read_bytes().unwrap(), b"weights");
    assert_eq!(
        target.local_path().unwrap(),
        dir.path().join("models/m1.bin")
    );
    assert_eq!(files_under(dir.path()), vec!["models/m1.bin"]);
}

#[test]
fn test_dropped_local_writer_leaves_nothing_behind() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let target = local_target(dir.path(), "data/raw.csv");

    {
        let mut writer = target.open_write().unwrap();
        writer.write_all(b"half a row").unwrap();
        // Interrupted: dropped without commit.
    }

    assert!(!target.exists());
    assert!(files_under(dir.path()).is_empty());
}

#[test]
fn test_recommit_replaces_previous_artifact() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let target = local_target(dir.path(), "report.txt");

    target.write_all(b"first").unwrap();
    target.write_all(b"second").unwrap();
    assert_eq!(target.read_to_string().unwrap(), "second");
}

#[test]
fn test_reading_absent_target_is_not_found() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let local = local_target(dir.path(), "missing.txt");
    assert!(matches!(
        local.open_read(),
        Err(PipedagError::TargetNotFound(loc)) if loc == "missing.txt"
    ));

    let memory = Target::new("missing", Arc::new(MemoryStorage::new()));
    assert!(matches!(
        memory.read_bytes(),
        Err(PipedagError::TargetNotFound(_))
    ));
}

#[test]
fn test_local_storage_rejects_escaping_locations() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());

    for location in ["../outside.txt", "/etc/passwd", "", "a/../../b"] {
        assert!(!storage.exists(location), "{location}");
        assert!(storage.begin_write(location).is_err(), "{location}");
    }
}

#[test]
fn test_memory_writer_is_staged_until_commit() {
    let storage = MemoryStorage::new();
    let target = Target::new("eval/m1", Arc::new(storage.clone()));

    let mut writer = target.open_write().unwrap();
    writer.write_all(b"0.93").unwrap();
    assert!(storage.get("eval/m1").is_none());
    writer.commit().unwrap();

    assert_eq!(storage.get("eval/m1"), Some(b"0.93".to_vec()));
    assert_eq!(target.to_string(), "eval/m1");

    let dropped = Target::new("eval/m2", Arc::new(storage.clone()));
    drop(dropped.open_write().unwrap());
    assert_eq!(storage.locations(), vec!["eval/m1"]);
}

#[test]
fn test_template_rendering() {
    let params = Params::new().with("data", "raw").with("epochs", 3i64);

    assert_eq!(
        render("train --data {data} --epochs {epochs}", &params).unwrap(),
        "train --data raw --epochs 3"
    );
    assert_eq!(
        render("echo ${HOME} {data} > \"${PIPEDAG_OUTPUT}\"", &params).unwrap(),
        "echo ${HOME} raw > \"${PIPEDAG_OUTPUT}\""
    );
    assert_eq!(render("{model}/{data}", &params), Err("model".to_string()));
    assert_eq!(
        placeholders("{data}-{model}-{data} ${SHELL}"),
        vec!["data", "model"]
    );
}

#[test]
fn test_param_values_parse_like_the_command_line() {
    assert_eq!("true".parse::<ParamValue>().unwrap(), ParamValue::Bool(true));
    assert_eq!("-12".parse::<ParamValue>().unwrap(), ParamValue::Int(-12));
    assert_eq!(
        "0.5".parse::<ParamValue>().unwrap(),
        ParamValue::Str("0.5".to_string())
    );

    assert_eq!(
        parse_param("model=m1").unwrap(),
        ("model".to_string(), ParamValue::Str("m1".to_string()))
    );
    assert_eq!(
        parse_param("expr=a=b").unwrap().1,
        ParamValue::Str("a=b".to_string())
    );
    assert!(parse_param("model").is_err());
    assert!(parse_param("=m1").is_err());
}

#[test]
fn test_task_identity_ignores_insertion_order() {
    let a = Params::new().with("model", "m1").with("data", "raw");
    let b = Params::new().with("data", "raw").with("model", "m1");

    assert_eq!(a, b);
    assert_eq!(
        TaskId::new("Train", a).to_string(),
        "Train(data=raw, model=m1)"
    );
    assert_ne!(
        TaskId::new("Train", b.clone()),
        TaskId::new("Evaluate", b)
    );
}

#[test]
fn test_cli_arguments() {
    let args = CliArgs::try_parse_from([
        "pipedag",
        "Evaluate",
        "-p",
        "data=raw",
        "--param",
        "epochs=3",
        "-w",
        "4",
        "--config",
        "conf/Pipedag.toml",
        "--dry-run",
    ])
    .unwrap();

    assert_eq!(args.task.as_deref(), Some("Evaluate"));
    assert_eq!(args.config, "conf/Pipedag.toml");
    assert_eq!(args.workers.map(|w| w.get()), Some(4));
    assert!(args.dry_run);
    assert_eq!(
        args.params,
        vec![
            ("data".to_string(), ParamValue::Str("raw".to_string())),
            ("epochs".to_string(), ParamValue::Int(3)),
        ]
    );

    let listing = CliArgs::try_parse_from(["pipedag", "--list"]).unwrap();
    assert!(listing.list);
    assert_eq!(listing.config, "Pipedag.toml");

    assert!(CliArgs::try_parse_from(["pipedag"]).is_err());
    assert!(CliArgs::try_parse_from(["pipedag", "Train", "-p", "oops"]).is_err());
}

#[test]
fn test_cli_rejects_zero_workers() {
    assert!(CliArgs::try_parse_from(["pipedag", "Train", "-w", "0"]).is_err());
    assert!(CliArgs::try_parse_from(["pipedag", "Train", "--workers", "-1"]).is_err());

    let one = CliArgs::try_parse_from(["pipedag", "Train", "-w", "1"]).unwrap();
    assert_eq!(one.workers.map(|w| w.get()), Some(1));
}

#[test]
fn test_log_level_priority() {
    assert_eq!(
        resolve_level(Some(LogLevel::Debug), Some("error")),
        tracing::Level::DEBUG
    );
    assert_eq!(resolve_level(None, Some("warn")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("loud")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}
