// src/config/mod.rs

//! Configuration loading and validation for pipedag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate task definitions and their requirements (`validate.rs`).
//! - Render `{param}` placeholders in commands and output locations
//!   (`template.rs`).

pub mod loader;
pub mod model;
pub mod template;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, Requirement, TaskConfig};
