// tests/config_validation.rs

use std::io::Write;

use tempfile::NamedTempFile;
use pipedag::config::{load_and_validate, load_from_path};
use pipedag::errors::PipedagError;
use pipedag::types::{ParamValue, Params};
use pipedag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn expect_config_error(contents: &str, needle: &str) {
    let file = config_file(contents);
    match load_and_validate(file.path()) {
        Err(PipedagError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message '{msg}' should contain '{needle}'");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_full_config_loads_with_defaults_applied() {
    let file = config_file(
        r#"
[config]
workers = 3

[task.Ingest]
cmd = 'echo {data} > "$PIPEDAG_OUTPUT"'
description = "Fetch the raw dataset"
params = ["data"]

[task.Train]
cmd = 'cp "$PIPEDAG_INPUT_0" "$PIPEDAG_OUTPUT"'
params = ["data", "model", "epochs"]
output = "models/{model}-{data}.bin"
requires = [{ kind = "Ingest", pass = ["data"] }]

[task.Train.defaults]
epochs = 10
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.config().workers, 3);
    assert_eq!(cfg.config().target_root, ".pipedag/targets");
    assert_eq!(cfg.kinds().collect::<Vec<_>>(), vec!["Ingest", "Train"]);

    let train = cfg.task("Train").unwrap();
    assert_eq!(train.defaults.get("epochs"), Some(&ParamValue::Int(10)));
    assert_eq!(train.requires[0].kind, "Ingest");
    assert_eq!(train.requires[0].pass, vec!["data"]);
    assert_eq!(
        cfg.task("Ingest").unwrap().description.as_deref(),
        Some("Fetch the raw dataset")
    );
}

#[test]
fn test_unknown_requirement_is_rejected() {
    expect_config_error(
        r#"
[task.Train]
cmd = "echo train"
requires = [{ kind = "Missing" }]
"#,
        "unknown requirement 'Missing'",
    );
}

#[test]
fn test_undeclared_placeholder_in_cmd_is_rejected() {
    expect_config_error(
        r#"
[task.Train]
cmd = "train --model {model}"
"#,
        "undeclared parameter '{model}' in `cmd`",
    );
}

#[test]
fn test_shell_variables_are_not_placeholders() {
    let file = config_file(
        r#"
[task.Train]
cmd = 'echo ${HOME} > "${PIPEDAG_OUTPUT}"'
"#,
    );
    assert!(load_and_validate(file.path()).is_ok());
}

#[test]
fn test_default_for_undeclared_param_is_rejected() {
    expect_config_error(
        r#"
[task.Train]
cmd = "echo"
params = ["model"]

[task.Train.defaults]
epochs = 3
"#,
        "default for undeclared parameter 'epochs'",
    );
}

#[test]
fn test_pass_of_undeclared_param_is_rejected() {
    expect_config_error(
        r#"
[task.Ingest]
cmd = "echo"
params = ["data"]

[task.Train]
cmd = "echo"
requires = [{ kind = "Ingest", pass = ["data"] }]
"#,
        "passes undeclared parameter 'data'",
    );
}

#[test]
fn test_unprovided_upstream_param_is_rejected() {
    expect_config_error(
        r#"
[task.Ingest]
cmd = "echo"
params = ["data"]

[task.Train]
cmd = "echo"
requires = [{ kind = "Ingest" }]
"#,
        "without providing its parameter 'data'",
    );
}

#[test]
fn test_fixed_upstream_params_satisfy_requirement() {
    let file = config_file(
        r#"
[task.Ingest]
cmd = "echo"
params = ["data"]

[task.Train]
cmd = "echo"
requires = [{ kind = "Ingest", params = { data = "raw" } }]
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();
    let req = &cfg.task("Train").unwrap().requires[0];
    assert_eq!(req.params, Params::new().with("data", "raw"));
}

#[test]
fn test_zero_workers_is_rejected() {
    expect_config_error(
        r#"
[config]
workers = 0

[task.A]
cmd = "echo"
"#,
        "workers must be >= 1",
    );
}

#[test]
fn test_config_without_tasks_is_rejected() {
    expect_config_error("[config]\nworkers = 2\n", "at least one [task.<Kind>]");
}

#[test]
fn test_unknown_field_is_a_toml_error() {
    let file = config_file(
        r#"
[task.A]
cmd = "echo"
after = ["B"]
"#,
    );
    assert!(matches!(
        load_from_path(file.path()),
        Err(PipedagError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("nope.toml"));
    assert!(matches!(result, Err(PipedagError::IoError(_))));
}

#[test]
fn test_kind_level_cycle_is_only_a_warning() {
    // Kinds A and B require each other. Whether instances actually cycle is
    // only known once parameters are resolved, so validation lets it pass.
    let file = config_file(
        r#"
[task.A]
cmd = "echo"
params = ["level"]
requires = [{ kind = "B" }]

[task.B]
cmd = "echo"
requires = [{ kind = "A", params = { level = 1 } }]
"#,
    );
    assert!(load_and_validate(file.path()).is_ok());
}

#[test]
fn test_builders_produce_valid_config() {
    let cfg = ConfigFileBuilder::new()
        .workers(2)
        .with_task("Ingest", TaskConfigBuilder::new("echo {data}").param("data").build())
        .with_task(
            "Train",
            TaskConfigBuilder::new("echo {data} {model}")
                .param("data")
                .param("model")
                .default_value("model", "m1")
                .requires("Ingest", &["data"])
                .build(),
        )
        .build();

    assert_eq!(cfg.config().workers, 2);
    assert_eq!(cfg.tasks().len(), 2);
}

#[test]
fn test_builder_reports_invalid_output_template() {
    let result = ConfigFileBuilder::new()
        .with_task(
            "Train",
            TaskConfigBuilder::new("echo").output("models/{model}.bin").build(),
        )
        .try_build();
    assert!(matches!(result, Err(PipedagError::ConfigError(_))));
}
