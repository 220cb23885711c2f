//! Patch engine for flowpatch rule sets.
//!
//! Responsibilities:
//! - Validate a rule set against a collection before anything is mutated.
//! - Apply rules in order, each at a single anchor site, using literal substring matching.
//! - Generate a unified diff preview of the changed bodies.

mod error;

pub use error::{PatchError, PatchResult};

use diffy::PatchFormatter;
use flowpatch_types::{
    AnchorMatch, ApplyReport, InsertPolicy, PatchRule, RecordCollection, RuleOutcome, RuleResult,
    SkipReason, ToolInfo,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A successful edit of one body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyEdit {
    pub text: String,
    /// Byte offset of the anchor occurrence that was patched.
    pub offset: usize,
}

/// Apply `rules` to `collection` in order and report every rule's outcome.
///
/// Errors abort before any record is touched; skipped rules never are errors.
pub fn apply_rules(
    collection: &mut RecordCollection,
    rules: &[PatchRule],
) -> PatchResult<ApplyReport> {
    validate_rules(collection, rules)?;

    let mut report = ApplyReport::new(ToolInfo::default());
    let mut touched = BTreeSet::new();

    for (index, rule) in rules.iter().enumerate() {
        let result = apply_rule(collection, index, rule, &mut touched);
        debug!(
            rule = %result.label,
            target = %rule.target,
            outcome = ?result.outcome,
            occurrences = result.occurrences,
            "rule evaluated"
        );
        report.push(result);
    }

    report.summary.records_modified = touched.len() as u64;
    info!(
        rules = report.summary.rules_total,
        applied = report.summary.applied,
        skipped = report.summary.skipped,
        records_modified = report.summary.records_modified,
        "rule set applied"
    );
    Ok(report)
}

/// Check the whole rule set up front: anchors must be non-empty and every targeted identifier
/// must be unique in the collection.
pub fn validate_rules(collection: &RecordCollection, rules: &[PatchRule]) -> PatchResult<()> {
    for (index, rule) in rules.iter().enumerate() {
        if rule.anchor.is_empty() {
            return Err(PatchError::InvalidRule {
                label: rule.label(index),
                message: "anchor is empty".to_string(),
            });
        }
    }

    let mut checked = BTreeSet::new();
    for rule in rules {
        if !checked.insert(rule.target.as_str()) {
            continue;
        }
        let count = collection.positions(&rule.target).len();
        if count > 1 {
            return Err(PatchError::CollectionIntegrity {
                identifier: rule.target.clone(),
                count,
            });
        }
    }

    Ok(())
}

fn apply_rule(
    collection: &mut RecordCollection,
    index: usize,
    rule: &PatchRule,
    touched: &mut BTreeSet<usize>,
) -> RuleResult {
    let mut result = RuleResult {
        index,
        label: rule.label(index),
        target: rule.target.clone(),
        policy: rule.policy,
        outcome: RuleOutcome::Skipped(SkipReason::NoSuchRecord),
        occurrences: 0,
        offset: None,
    };

    let Some(&pos) = collection.positions(&rule.target).first() else {
        return result;
    };
    let Some(body) = collection.body(pos) else {
        result.outcome = RuleOutcome::Skipped(SkipReason::NoBody);
        return result;
    };

    result.occurrences = count_occurrences(body, &rule.anchor);
    match patch_body(body, rule) {
        Ok(edit) => {
            if collection.set_body(pos, edit.text) {
                touched.insert(pos);
            }
            result.outcome = RuleOutcome::Applied;
            result.offset = Some(edit.offset);
        }
        Err(reason) => result.outcome = RuleOutcome::Skipped(reason),
    }
    result
}

/// Apply one rule to a body of text.
pub fn patch_body(body: &str, rule: &PatchRule) -> Result<BodyEdit, SkipReason> {
    if rule.anchor.is_empty() {
        return Err(SkipReason::AnchorNotFound);
    }
    let offset = body.find(&rule.anchor).ok_or(SkipReason::AnchorNotFound)?;

    if rule.anchor_match == AnchorMatch::Unique
        && body[offset + rule.anchor.len()..].contains(&rule.anchor)
    {
        return Err(SkipReason::AmbiguousAnchor);
    }

    Ok(BodyEdit {
        text: splice(body, offset, &rule.anchor, &rule.insertion, rule.policy),
        offset,
    })
}

/// Rebuild `body` around the anchor at `offset`.
pub fn splice(
    body: &str,
    offset: usize,
    anchor: &str,
    insertion: &str,
    policy: InsertPolicy,
) -> String {
    let (before, rest) = body.split_at(offset);
    let after = &rest[anchor.len()..];

    let mut out = String::with_capacity(body.len() + insertion.len());
    out.push_str(before);
    match policy {
        InsertPolicy::InsertBefore => {
            out.push_str(insertion);
            out.push_str(anchor);
        }
        InsertPolicy::InsertAfter => {
            out.push_str(anchor);
            out.push_str(insertion);
        }
        InsertPolicy::Replace => out.push_str(insertion),
    }
    out.push_str(after);
    out
}

/// Non-overlapping occurrences of `anchor` in `body`.
pub fn count_occurrences(body: &str, anchor: &str) -> usize {
    if anchor.is_empty() {
        return 0;
    }
    body.matches(anchor).count()
}

/// Unified diff of every body that differs between `before` and `after`, headed by record id.
pub fn preview_patch(before: &RecordCollection, after: &RecordCollection) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for index in after.modified_indices() {
        let old = before.body(index).unwrap_or_default();
        let new = after.body(index).unwrap_or_default();
        if old == new {
            continue;
        }
        let Some(record) = after.get(index) else {
            continue;
        };

        let patch = diffy::create_patch(old, new);
        let rendered = formatter.fmt_patch(&patch).to_string();
        let hunks = rendered.find("@@").map_or("", |i| &rendered[i..]);

        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", record.identifier()));
        out.push_str(hunks);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
