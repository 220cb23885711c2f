//! The load → patch → write pipeline, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: all filesystem operations are performed through the
//! port traits.

use crate::ports::{RecordSource, WritePort};
use crate::settings::PatchSettings;
use anyhow::Context;
use camino::Utf8Path;
use flowpatch_edit::{PatchError, apply_rules, preview_patch};
use flowpatch_hash::sha256_hex;
use flowpatch_records::{LoadError, SaveError, render_records};
use flowpatch_render::render_report_md;
use flowpatch_types::{ApplyReport, FileChange, RecordCollection, ToolInfo};
use std::fmt;
use tracing::{debug, info, warn};

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Patch,
    Write,
    Policy,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Patch => "patch",
            Stage::Write => "write",
            Stage::Policy => "policy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for pipeline results. Exit code 2 = policy block, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("load {location}: {source}")]
    Load {
        location: String,
        #[source]
        source: LoadError,
    },

    #[error("patch: {0}")]
    Patch(#[from] PatchError),

    #[error("write: {0}")]
    Write(#[from] SaveError),

    /// `require_all` was set and at least one rule was skipped. Nothing was written.
    #[error("policy block: {skipped} rule(s) skipped")]
    PolicyBlock {
        skipped: u64,
        report: Box<ApplyReport>,
        /// Diff of the edits that would have been written.
        patch: String,
    },

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ToolError::Load { .. } => Some(Stage::Load),
            ToolError::Patch(_) => Some(Stage::Patch),
            ToolError::Write(_) => Some(Stage::Write),
            ToolError::PolicyBlock { .. } => Some(Stage::Policy),
            ToolError::Internal(_) => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::PolicyBlock { .. } => 2,
            _ => 1,
        }
    }

    /// Record identifier the failure is about, when there is one.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            ToolError::Patch(e) => e.identifier(),
            _ => None,
        }
    }

    /// The report of a blocked run.
    pub fn report(&self) -> Option<&ApplyReport> {
        match self {
            ToolError::PolicyBlock { report, .. } => Some(&**report),
            _ => None,
        }
    }

    /// The diff a blocked run computed but did not write.
    pub fn patch(&self) -> Option<&str> {
        match self {
            ToolError::PolicyBlock { patch, .. } => Some(patch.as_str()),
            _ => None,
        }
    }
}

/// Outcome of `run_patch`.
#[derive(Debug)]
pub struct PatchOutcome {
    pub collection: RecordCollection,
    pub report: ApplyReport,
    /// Unified diff of every changed body.
    pub patch: String,
}

impl PatchOutcome {
    pub fn written(&self) -> bool {
        self.report.file.as_ref().is_some_and(|f| f.written)
    }
}

/// Run the pipeline: load the collection, apply the rules in order, persist the result.
///
/// Structural failures abort before anything is written. Skipped rules do not stop the run
/// unless `require_all` is set, in which case the destination is left alone.
pub fn run_patch(
    settings: &PatchSettings,
    source: &dyn RecordSource,
    writer: &dyn WritePort,
    tool: ToolInfo,
) -> Result<PatchOutcome, ToolError> {
    let location = source.location();
    let original = source
        .load(&settings.field_names)
        .map_err(|source| ToolError::Load {
            location: location.clone(),
            source,
        })?;
    debug!(source = %location, records = original.len(), "collection loaded");

    let mut collection = original.clone();
    let mut report = apply_rules(&mut collection, &settings.rules)?;
    report.tool = tool;
    report.run.dry_run = settings.dry_run;

    let patch = preview_patch(&original, &collection);

    let mut file = FileChange {
        source: location,
        destination: settings.destination.to_string(),
        written: false,
        sha256_before: original.source().map(|text| sha256_hex(text.as_bytes())),
        sha256_after: None,
        backup_path: None,
    };

    if settings.require_all && !report.is_fully_applied() {
        for skipped in report.skipped() {
            warn!(
                rule = %skipped.label,
                target = %skipped.target,
                outcome = ?skipped.outcome,
                "rule skipped"
            );
        }
        report.file = Some(file);
        report.finish();
        return Err(ToolError::PolicyBlock {
            skipped: report.summary.skipped,
            report: Box::new(report),
            patch,
        });
    }

    // Serialize before touching the destination so a failure leaves it intact.
    let rendered = render_records(&collection)?;
    file.sha256_after = Some(sha256_hex(rendered.as_bytes()));

    if !settings.dry_run {
        if settings.backup_enabled {
            file.backup_path = writer
                .backup(&settings.destination, &settings.backup_suffix)?
                .map(|p| p.to_string());
        }
        writer.write_atomic(&settings.destination, rendered.as_bytes())?;
        file.written = true;
        info!(
            destination = %settings.destination,
            bytes = rendered.len(),
            records_modified = report.summary.records_modified,
            "collection written"
        );
    }

    report.file = Some(file);
    report.finish();

    Ok(PatchOutcome {
        collection,
        report,
        patch,
    })
}

/// Write report.json, report.md and patch.diff into `out_dir`.
pub fn write_report_artifacts(
    report: &ApplyReport,
    patch: &str,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> Result<(), ToolError> {
    writer.create_dir_all(out_dir)?;

    let report_json = serde_json::to_string_pretty(report).context("serialize report")?;
    writer.write_atomic(&out_dir.join("report.json"), report_json.as_bytes())?;

    let report_md = render_report_md(report);
    writer.write_atomic(&out_dir.join("report.md"), report_md.as_bytes())?;

    writer.write_atomic(&out_dir.join("patch.diff"), patch.as_bytes())?;

    debug!(out_dir = %out_dir, "report artifacts written");
    Ok(())
}
