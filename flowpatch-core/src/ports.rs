//! Port traits abstracting all I/O away from the pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use flowpatch_records::{LoadError, SaveError};
use flowpatch_types::{FieldNames, RecordCollection};

/// Where the collection comes from.
pub trait RecordSource {
    /// Human-readable location used in reports and errors.
    fn location(&self) -> String;
    fn load(&self, field_names: &FieldNames) -> Result<RecordCollection, LoadError>;
}

/// File-system write operations.
pub trait WritePort {
    /// Replace `path` so readers see either the old or the new contents, never a mix.
    fn write_atomic(&self, path: &Utf8Path, contents: &[u8]) -> Result<(), SaveError>;
    /// Copy `path` aside before it is replaced. `None` when `path` does not exist.
    fn backup(&self, path: &Utf8Path, suffix: &str) -> Result<Option<Utf8PathBuf>, SaveError>;
    fn create_dir_all(&self, path: &Utf8Path) -> Result<(), SaveError>;
}
