//! Shared DTOs (schemas-as-code) for the flowpatch workspace.
//!
//! # Design constraints
//! - `Record` and `RecordCollection` never interpret fields other than the identifier and body.
//! - Report types are serialized to disk; prefer adding optional fields over changing semantics.

pub mod record;
pub mod report;
pub mod rule;

pub use record::{
    DEFAULT_BODY_FIELD, DEFAULT_IDENTIFIER_FIELD, DEFAULT_INDENT, FieldNames, Layout, Record,
    RecordCollection,
};
pub use report::{
    ApplyReport, ApplySummary, FileChange, RuleOutcome, RuleResult, RunInfo, SkipReason, ToolInfo,
};
pub use rule::{AnchorMatch, InsertPolicy, PatchRule};

/// Schema identifiers.
pub mod schema {
    pub const FLOWPATCH_REPORT_V1: &str = "flowpatch.report.v1";
}
