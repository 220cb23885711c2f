//! Embeddable core library for flowpatch.
//!
//! Provides a clap-free, I/O-abstracted entry point for the load → patch → write pipeline.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`RecordSource`](ports::RecordSource): read and parse the collection
//! - [`WritePort`](ports::WritePort): atomic writes, backups, report files
//!
//! The [`adapters`] module provides filesystem and in-memory implementations.
//!
//! # Entry points
//!
//! - [`run_patch`](pipeline::run_patch): load, apply the rule set, persist
//! - [`write_report_artifacts`](pipeline::write_report_artifacts): report.json, report.md and
//!   patch.diff

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use pipeline::{PatchOutcome, Stage, ToolError, run_patch, write_report_artifacts};
pub use settings::{DEFAULT_BACKUP_SUFFIX, PatchSettings};
