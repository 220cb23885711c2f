//! Clap-free settings for the patch pipeline.

use camino::Utf8PathBuf;
use flowpatch_types::{FieldNames, PatchRule};

pub const DEFAULT_BACKUP_SUFFIX: &str = ".flowpatch.bak";

#[derive(Debug, Clone)]
pub struct PatchSettings {
    /// Where the patched collection is persisted (usually the source file).
    pub destination: Utf8PathBuf,
    pub field_names: FieldNames,
    pub rules: Vec<PatchRule>,

    /// Compute everything, write nothing.
    pub dry_run: bool,
    /// Refuse to write unless every rule applied.
    pub require_all: bool,

    // Backups
    pub backup_enabled: bool,
    pub backup_suffix: String,
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            destination: Utf8PathBuf::from("flows.json"),
            field_names: FieldNames::default(),
            rules: Vec::new(),
            dry_run: false,
            require_all: false,
            backup_enabled: false,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}
