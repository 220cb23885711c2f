//! Default filesystem-backed and in-memory port implementations.

use crate::ports::{RecordSource, WritePort};
use camino::{Utf8Path, Utf8PathBuf};
use flowpatch_records::{LoadError, SaveError};
use flowpatch_types::{FieldNames, RecordCollection};
use fs_err as fs;
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::debug;

/// Loads a collection from disk via `flowpatch_records::load_records`.
#[derive(Debug, Clone)]
pub struct FsRecordSource {
    pub path: Utf8PathBuf,
}

impl FsRecordSource {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

impl RecordSource for FsRecordSource {
    fn location(&self) -> String {
        self.path.to_string()
    }

    fn load(&self, field_names: &FieldNames) -> Result<RecordCollection, LoadError> {
        flowpatch_records::load_records(&self.path, field_names)
    }
}

/// Parses a collection from text held in memory, for embedding and testing.
#[derive(Debug, Clone)]
pub struct InMemoryRecordSource {
    location: String,
    text: String,
}

impl InMemoryRecordSource {
    pub fn new(location: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            text: text.into(),
        }
    }
}

impl RecordSource for InMemoryRecordSource {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn load(&self, field_names: &FieldNames) -> Result<RecordCollection, LoadError> {
        Ok(flowpatch_records::parse_records(&self.text, field_names)?)
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_atomic(&self, path: &Utf8Path, contents: &[u8]) -> Result<(), SaveError> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            self.create_dir_all(parent)?;
        }
        flowpatch_records::write_atomic(path, contents)
    }

    fn backup(&self, path: &Utf8Path, suffix: &str) -> Result<Option<Utf8PathBuf>, SaveError> {
        flowpatch_records::backup_file(path, suffix)
    }

    fn create_dir_all(&self, path: &Utf8Path) -> Result<(), SaveError> {
        fs::create_dir_all(path).map_err(|source| SaveError::Io {
            path: path.to_string(),
            source,
        })
    }
}

/// Keeps every written file in memory.
#[derive(Debug, Default)]
pub struct InMemoryWritePort {
    files: RefCell<BTreeMap<Utf8PathBuf, Vec<u8>>>,
}

impl InMemoryWritePort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, e.g. the destination that a backup should copy.
    pub fn with_file(self, path: impl Into<Utf8PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.borrow_mut().insert(path.into(), contents.into());
        self
    }

    pub fn contents(&self, path: &Utf8Path) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    pub fn contents_str(&self, path: &Utf8Path) -> Option<String> {
        self.contents(path).and_then(|bytes| String::from_utf8(bytes).ok())
    }

    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl WritePort for InMemoryWritePort {
    fn write_atomic(&self, path: &Utf8Path, contents: &[u8]) -> Result<(), SaveError> {
        debug!(path = %path, bytes = contents.len(), "in-memory write");
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn backup(&self, path: &Utf8Path, suffix: &str) -> Result<Option<Utf8PathBuf>, SaveError> {
        let mut files = self.files.borrow_mut();
        let Some(existing) = files.get(path).cloned() else {
            return Ok(None);
        };
        let backup = Utf8PathBuf::from(format!("{path}{suffix}"));
        files.insert(backup.clone(), existing);
        Ok(Some(backup))
    }

    fn create_dir_all(&self, _path: &Utf8Path) -> Result<(), SaveError> {
        Ok(())
    }
}
