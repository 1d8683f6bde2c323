// src/pipeline.rs

//! Config-defined pipelines.
//!
//! A [`Pipeline`] turns the `[task.<Kind>]` definitions of a validated
//! [`ConfigFile`] into [`CommandTask`]s whose targets live in one
//! [`Storage`] backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::catalog::TaskCatalog;
use crate::config::model::{ConfigFile, Requirement, TaskConfig};
use crate::config::{load_and_validate, template};
use crate::errors::{PipedagError, Result};
use crate::exec::command::CommandTask;
use crate::storage::{LocalStorage, Storage};
use crate::target::Target;
use crate::task::TaskRef;
use crate::types::{ParamValue, Params};

/// Cheap-to-clone handle over a validated config, its storage backend and
/// the working directory commands run in.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<ConfigFile>,
    storage: Arc<dyn Storage>,
    base_dir: PathBuf,
}

impl Pipeline {
    pub fn new(config: ConfigFile, storage: Arc<dyn Storage>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            base_dir: base_dir.into(),
        }
    }

    /// Load `path` and store targets on disk under `[config].target_root`,
    /// resolved against the config file's directory.
    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = load_and_validate(path)?;
        let base_dir = config_root_dir(path);
        let target_root = base_dir.join(&config.config().target_root);
        debug!(target_root = ?target_root, "using local target storage");

        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(target_root));
        Ok(Self::new(config, storage, base_dir))
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub(crate) fn definition(&self, kind: &str) -> Result<&TaskConfig> {
        self.config
            .task(kind)
            .ok_or_else(|| PipedagError::UnknownTaskKind(kind.to_string()))
    }

    /// Apply defaults and check `given` against the declared parameters.
    pub fn resolve_params(&self, kind: &str, given: &Params) -> Result<Params> {
        let def = self.definition(kind)?;
        let invalid = |message: String| PipedagError::InvalidParams {
            kind: kind.to_string(),
            message,
        };

        if let Some(unknown) = given.names().find(|n| !def.params.iter().any(|p| p == n)) {
            return Err(invalid(format!("unknown parameter '{unknown}'")));
        }

        let mut resolved = Params::new();
        for name in def.params.iter() {
            let value = given
                .get(name)
                .or_else(|| def.defaults.get(name))
                .ok_or_else(|| invalid(format!("missing parameter '{name}'")))?;
            resolved.insert(name.clone(), value.clone());
        }
        Ok(resolved)
    }

    /// Parameters of the dependency described by `req`, for a task with
    /// `params`.
    pub(crate) fn requirement_params(&self, req: &Requirement, params: &Params) -> Result<Params> {
        let mut child = Params::new();
        for name in req.pass.iter() {
            if let Some(value) = params.get(name) {
                child.insert(name.clone(), value.clone());
            }
        }
        for (name, value) in req.params.iter() {
            child.insert(name, value.clone());
        }
        self.resolve_params(&req.kind, &child)
    }

    /// Output target of `kind` with already-resolved `params`.
    pub fn target_for(&self, kind: &str, params: &Params) -> Result<Target> {
        let def = self.definition(kind)?;
        let location = match def.output.as_deref() {
            Some(tpl) => template::render(tpl, params).map_err(|name| PipedagError::InvalidParams {
                kind: kind.to_string(),
                message: format!("output template references missing parameter '{name}'"),
            })?,
            None => default_location(kind, params),
        };
        Ok(Target::new(location, Arc::clone(&self.storage)))
    }
}

impl TaskCatalog for Pipeline {
    fn task(&self, kind: &str, params: &Params) -> Result<TaskRef> {
        let params = self.resolve_params(kind, params)?;
        let task = CommandTask::new(self.clone(), kind, params)?;
        Ok(Arc::new(task))
    }

    fn kinds(&self) -> Vec<String> {
        self.config.kinds().map(|k| k.to_string()).collect()
    }
}

/// `<Kind>/<Kind>-<digest>`, with a blake3 digest over the parameters.
///
/// Each entry is hashed as a length-prefixed name, a type tag and a
/// length-prefixed value, so `Int(1)` and `"1"` differ and no value can
/// imitate an entry boundary.
pub fn default_location(kind: &str, params: &Params) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(params.len() as u64).to_le_bytes());
    for (name, value) in params.iter() {
        hash_field(&mut hasher, name.as_bytes());
        match value {
            ParamValue::Bool(b) => {
                hasher.update(b"b");
                hash_field(&mut hasher, &[u8::from(*b)]);
            }
            ParamValue::Int(i) => {
                hasher.update(b"i");
                hash_field(&mut hasher, &i.to_le_bytes());
            }
            ParamValue::Str(s) => {
                hasher.update(b"s");
                hash_field(&mut hasher, s.as_bytes());
            }
        }
    }
    let digest = hasher.finalize().to_hex();
    format!("{kind}/{kind}-{}", &digest.as_str()[..16])
}

fn hash_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Directory a config file's relative paths are resolved against.
///
/// A bare filename like `Pipedag.toml` (empty parent) falls back to the
/// current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
