// src/storage/memory.rs

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{StagedWrite, Storage};
use crate::errors::{PipedagError, Result};

/// In-memory storage backend.
///
/// Clones share the same underlying map, so a test can keep one handle for
/// assertions while tasks write through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish an artifact directly, bypassing staging.
    pub fn put(&self, location: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.lock().insert(location.into(), content.into());
    }

    pub fn get(&self, location: &str) -> Option<Vec<u8>> {
        self.lock().get(location).cloned()
    }

    pub fn remove(&self, location: &str) -> Option<Vec<u8>> {
        self.lock().remove(location)
    }

    /// All published locations, sorted.
    pub fn locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self.lock().keys().cloned().collect();
        locations.sort();
        locations
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, location: &str) -> bool {
        self.lock().contains_key(location)
    }

    fn open_read(&self, location: &str) -> Result<Box<dyn Read + Send>> {
        let content = self
            .get(location)
            .ok_or_else(|| PipedagError::TargetNotFound(location.to_string()))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn begin_write(&self, location: &str) -> Result<Box<dyn StagedWrite>> {
        Ok(Box::new(MemoryStagedWrite {
            location: location.to_string(),
            buf: Vec::new(),
            entries: Arc::clone(&self.entries),
        }))
    }
}

struct MemoryStagedWrite {
    location: String,
    buf: Vec<u8>,
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl Write for MemoryStagedWrite {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StagedWrite for MemoryStagedWrite {
    fn publish(self: Box<Self>) -> Result<()> {
        let MemoryStagedWrite {
            location,
            buf,
            entries,
        } = *self;
        entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(location, buf);
        Ok(())
    }
}
