// src/storage/mod.rs

//! Storage backends behind [`Target`](crate::target::Target)s.
//!
//! A backend addresses artifacts by a relative, `/`-separated location
//! string. Writes are always staged: nothing becomes visible to
//! [`Storage::exists`] until [`StagedWrite::publish`] succeeds, and a staged
//! write that is dropped unpublished leaves no trace.
//!
//! - [`LocalStorage`] keeps one file per target under a root directory and
//!   publishes with an atomic rename.
//! - [`memory::MemoryStorage`] keeps artifacts in a shared map (tests,
//!   embedding).

use std::fmt::Debug;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{PipedagError, Result};

pub mod memory;

pub use memory::MemoryStorage;

/// Abstract storage backend.
pub trait Storage: Send + Sync + Debug {
    /// True iff a complete artifact is published at `location`.
    fn exists(&self, location: &str) -> bool;

    /// Open a published artifact for reading.
    fn open_read(&self, location: &str) -> Result<Box<dyn Read + Send>>;

    /// Start a staged write to `location`.
    fn begin_write(&self, location: &str) -> Result<Box<dyn StagedWrite>>;

    /// On-disk path of the artifact, if this backend has one.
    fn local_path(&self, _location: &str) -> Option<PathBuf> {
        None
    }
}

/// A write in progress. Bytes written here are invisible until `publish`.
pub trait StagedWrite: Write + Send {
    /// Atomically make the staged bytes the artifact's content.
    fn publish(self: Box<Self>) -> Result<()>;
}

/// Filesystem backend: each location is a single file under `root`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a location to a path under `root`, rejecting anything that could
    /// escape it.
    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let rel = Path::new(location);
        let valid = !location.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(PipedagError::ConfigError(format!(
                "invalid target location '{location}' (must be a relative path without '..')"
            )));
        }
        Ok(self.root.join(rel))
    }
}

impl Storage for LocalStorage {
    fn exists(&self, location: &str) -> bool {
        self.resolve(location)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    fn open_read(&self, location: &str) -> Result<Box<dyn Read + Send>> {
        let path = self.resolve(location)?;
        match fs::File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(PipedagError::TargetNotFound(location.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn begin_write(&self, location: &str) -> Result<Box<dyn StagedWrite>> {
        let dest = self.resolve(location)?;
        let parent = dest
            .parent()
            .ok_or_else(|| PipedagError::ConfigError(format!("target '{location}' has no parent")))?;
        fs::create_dir_all(parent)?;

        // Stage next to the destination so the final rename never crosses
        // filesystems.
        let staged = tempfile::Builder::new()
            .prefix(".pipedag-")
            .suffix(".partial")
            .tempfile_in(parent)?;

        debug!(location, staged = ?staged.path(), "staging local write");

        Ok(Box::new(LocalStagedWrite {
            location: location.to_string(),
            dest,
            file: staged,
        }))
    }

    fn local_path(&self, location: &str) -> Option<PathBuf> {
        self.resolve(location).ok()
    }
}

/// Temp file that is renamed over the destination on publish. Dropping it
/// unpublished deletes the temp file.
struct LocalStagedWrite {
    location: String,
    dest: PathBuf,
    file: NamedTempFile,
}

impl Write for LocalStagedWrite {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl StagedWrite for LocalStagedWrite {
    fn publish(self: Box<Self>) -> Result<()> {
        let LocalStagedWrite {
            location,
            dest,
            mut file,
        } = *self;
        let partial = |message: String| PipedagError::PartialWrite {
            location: location.clone(),
            message,
        };

        file.flush().map_err(|e| partial(e.to_string()))?;
        file.as_file()
            .sync_all()
            .map_err(|e| partial(e.to_string()))?;
        file.persist(&dest)
            .map_err(|e| partial(e.error.to_string()))?;

        debug!(location = %location, path = ?dest, "published local target");
        Ok(())
    }
}
