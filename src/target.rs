// src/target.rs

//! Addressable task outputs.
//!
//! A [`Target`] pairs a location with the [`Storage`] backend that holds it.
//! Its presence is the only durable record that the producing task completed,
//! so the write path is all-or-nothing: [`TargetWriter::commit`] is the only
//! way `exists()` can go from false to true.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{PipedagError, Result};
use crate::storage::{StagedWrite, Storage};

#[derive(Clone)]
pub struct Target {
    location: String,
    storage: Arc<dyn Storage>,
}

impl Target {
    pub fn new(location: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self {
            location: location.into(),
            storage,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// True iff the artifact is fully published. Side-effect free.
    pub fn exists(&self) -> bool {
        self.storage.exists(&self.location)
    }

    /// Open the published artifact; [`PipedagError::TargetNotFound`] if it is
    /// absent.
    pub fn open_read(&self) -> Result<Box<dyn Read + Send>> {
        if !self.exists() {
            return Err(PipedagError::TargetNotFound(self.location.clone()));
        }
        self.storage.open_read(&self.location)
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open_read()?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn read_to_string(&self) -> Result<String> {
        let mut buf = String::new();
        self.open_read()?.read_to_string(&mut buf)?;
        Ok(buf)
    }

    /// Start writing. Nothing is visible until the returned writer is
    /// committed.
    pub fn open_write(&self) -> Result<TargetWriter> {
        let staged = self.storage.begin_write(&self.location)?;
        Ok(TargetWriter {
            location: self.location.clone(),
            staged: Some(staged),
        })
    }

    /// Write `content` and publish it in one step.
    pub fn write_all(&self, content: &[u8]) -> Result<()> {
        let mut writer = self.open_write()?;
        writer.write_all(content)?;
        writer.commit()
    }

    /// On-disk path, for backends that have one.
    pub fn local_path(&self) -> Option<PathBuf> {
        self.storage.local_path(&self.location)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("location", &self.location)
            .field("storage", &self.storage)
            .finish()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Scoped writer for a [`Target`].
///
/// Dropping it without calling [`commit`](TargetWriter::commit) discards the
/// staged bytes and leaves the target absent.
pub struct TargetWriter {
    location: String,
    staged: Option<Box<dyn StagedWrite>>,
}

impl TargetWriter {
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Publish everything written so far.
    pub fn commit(mut self) -> Result<()> {
        let staged = self.staged.take().ok_or_else(|| PipedagError::PartialWrite {
            location: self.location.clone(),
            message: "writer already consumed".to_string(),
        })?;
        staged.publish()?;
        debug!(location = %self.location, "target committed");
        Ok(())
    }

    fn staged(&mut self) -> io::Result<&mut Box<dyn StagedWrite>> {
        self.staged
            .as_mut()
            .ok_or_else(|| io::Error::other("target writer already committed"))
    }
}

impl Write for TargetWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.staged()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.staged()?.flush()
    }
}

impl Drop for TargetWriter {
    fn drop(&mut self) {
        if self.staged.is_some() {
            warn!(location = %self.location, "discarding uncommitted write; target stays absent");
        }
    }
}

impl fmt::Debug for TargetWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetWriter")
            .field("location", &self.location)
            .field("committed", &self.staged.is_none())
            .finish()
    }
}
