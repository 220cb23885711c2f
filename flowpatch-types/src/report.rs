use crate::rule::InsertPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Default for ToolInfo {
    fn default() -> Self {
        Self {
            name: "flowpatch".to_string(),
            version: None,
        }
    }
}

/// Why a rule did not touch its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoSuchRecord,
    AnchorNotFound,
    /// The target record has no string body field.
    NoBody,
    /// `anchor_match = unique` and the anchor occurs more than once.
    AmbiguousAnchor,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoSuchRecord => "no_such_record",
            SkipReason::AnchorNotFound => "anchor_not_found",
            SkipReason::NoBody => "no_body",
            SkipReason::AmbiguousAnchor => "ambiguous_anchor",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Applied,
    Skipped(SkipReason),
}

impl RuleOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, RuleOutcome::Applied)
    }

    pub fn skip_reason(self) -> Option<SkipReason> {
        match self {
            RuleOutcome::Applied => None,
            RuleOutcome::Skipped(reason) => Some(reason),
        }
    }
}

/// Outcome of one rule, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Zero-based position of the rule in the supplied list.
    pub index: usize,
    pub label: String,
    pub target: String,
    pub policy: InsertPolicy,
    pub outcome: RuleOutcome,

    /// Anchor occurrences found in the body at the time the rule ran.
    #[serde(default)]
    pub occurrences: usize,

    /// Byte offset of the patched occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub rules_total: u64,
    pub applied: u64,
    pub skipped: u64,
    pub records_modified: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub dry_run: bool,
}

impl RunInfo {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            dry_run: false,
        }
    }
}

/// What happened to the destination file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub source: String,
    pub destination: String,
    pub written: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

/// Per-rule outcome ledger of a patch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,

    #[serde(default)]
    pub results: Vec<RuleResult>,

    pub summary: ApplySummary,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileChange>,
}

impl ApplyReport {
    pub fn new(tool: ToolInfo) -> Self {
        Self {
            schema: crate::schema::FLOWPATCH_REPORT_V1.to_string(),
            tool,
            run: RunInfo::start(),
            results: vec![],
            summary: ApplySummary::default(),
            file: None,
        }
    }

    /// Append a result and keep the summary counters in step.
    pub fn push(&mut self, result: RuleResult) {
        self.summary.rules_total += 1;
        if result.outcome.is_applied() {
            self.summary.applied += 1;
        } else {
            self.summary.skipped += 1;
        }
        self.results.push(result);
    }

    /// Every rule applied (vacuously true for an empty rule set).
    pub fn is_fully_applied(&self) -> bool {
        self.summary.skipped == 0
    }

    /// No rule applied, so nothing changed.
    pub fn is_noop(&self) -> bool {
        self.summary.applied == 0
    }

    pub fn skipped(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| !r.outcome.is_applied())
    }

    pub fn outcomes(&self) -> Vec<RuleOutcome> {
        self.results.iter().map(|r| r.outcome).collect()
    }

    pub fn finish(&mut self) {
        self.run.ended_at = Some(Utc::now());
    }
}
