//! Rendering helpers (markdown and terminal text) for apply reports.

use flowpatch_types::{ApplyReport, InsertPolicy, PatchRule, RuleOutcome, RuleResult};

pub fn render_report_md(report: &ApplyReport) -> String {
    let mut out = String::new();
    out.push_str("# flowpatch apply\n\n");
    out.push_str(&format!(
        "- Rules: {}\n- Applied: {}\n- Skipped: {}\n- Records modified: {}\n",
        report.summary.rules_total,
        report.summary.applied,
        report.summary.skipped,
        report.summary.records_modified
    ));
    if report.run.dry_run {
        out.push_str("- Mode: dry-run\n");
    }
    if let Some(file) = &report.file {
        out.push_str(&format!(
            "- Destination: `{}` (written: `{}`)\n",
            file.destination, file.written
        ));
        if let Some(backup) = &file.backup_path {
            out.push_str(&format!("- Backup: `{}`\n", backup));
        }
    }
    out.push('\n');

    out.push_str("## Rules\n\n");
    if report.results.is_empty() {
        out.push_str("_No rules configured._\n");
        return out;
    }

    for r in &report.results {
        out.push_str(&format!("### {}. {}\n\n", r.index + 1, r.label));
        out.push_str(&format!("- Target: `{}`\n", r.target));
        out.push_str(&format!("- Policy: `{}`\n", r.policy.as_str()));
        out.push_str(&format!("- Status: `{}`\n", outcome_label(r.outcome)));
        out.push_str(&format!("- Anchor occurrences: {}\n", r.occurrences));
        if let Some(offset) = r.offset {
            out.push_str(&format!("- Offset: {}\n", offset));
        }
        out.push('\n');
    }

    out
}

/// One line per rule, in rule order, followed by a summary line.
pub fn render_report_text(report: &ApplyReport) -> String {
    let mut out = String::new();
    for r in &report.results {
        out.push_str(&result_line(r));
        out.push('\n');
    }

    let written = report.file.as_ref().map(|f| f.written);
    out.push_str(&format!(
        "{} applied, {} skipped, {} record(s) modified{}\n",
        report.summary.applied,
        report.summary.skipped,
        report.summary.records_modified,
        match (report.run.dry_run, written) {
            (true, _) => " (dry-run)",
            (false, Some(true)) => ", written",
            (false, Some(false)) => ", not written",
            (false, None) => "",
        }
    ));
    out
}

/// Table of configured rules for `list-rules`.
pub fn render_rules_text(rules: &[PatchRule]) -> String {
    let mut out = String::new();
    out.push_str("  #    TARGET                   POLICY         LABEL\n");
    out.push_str("  -    ------                   ------         -----\n");
    for (i, rule) in rules.iter().enumerate() {
        out.push_str(&format!(
            "  {:<4} {:<24} {:<14} {}\n",
            i + 1,
            rule.target,
            rule.policy.as_str(),
            rule.label(i)
        ));
    }
    if rules.is_empty() {
        out.push_str("  (no rules configured)\n");
    }
    out
}

fn result_line(r: &RuleResult) -> String {
    match r.outcome {
        RuleOutcome::Applied => format!(
            "✓ {} ({} {})",
            r.label,
            policy_verb(r.policy),
            r.target
        ),
        RuleOutcome::Skipped(reason) => {
            format!("✗ {} skipped: {} (target {})", r.label, reason, r.target)
        }
    }
}

fn policy_verb(policy: InsertPolicy) -> &'static str {
    match policy {
        InsertPolicy::InsertBefore => "inserted before anchor in",
        InsertPolicy::InsertAfter => "inserted after anchor in",
        InsertPolicy::Replace => "replaced anchor in",
    }
}

fn outcome_label(outcome: RuleOutcome) -> String {
    match outcome {
        RuleOutcome::Applied => "applied".to_string(),
        RuleOutcome::Skipped(reason) => format!("skipped ({reason})"),
    }
}
