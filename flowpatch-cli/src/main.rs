use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use flowpatch_cli::config::{self, CliOverrides, ConfigMerger, MergedConfig};
use flowpatch_core::adapters::{FsRecordSource, FsWritePort};
use flowpatch_core::{PatchOutcome, PatchSettings, ToolError, run_patch, write_report_artifacts};
use flowpatch_render::{render_report_md, render_report_text, render_rules_text};
use flowpatch_types::{ApplyReport, ToolInfo};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "flowpatch",
    version,
    about = "Anchor-based patcher for Node-RED function node scripts."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply the configured rules and write the patched flows.
    Apply(ApplyArgs),
    /// Show what `apply` would change without writing anything.
    Preview(PreviewArgs),
    /// List the configured rules.
    ListRules(ListRulesArgs),
}

#[derive(Debug, clap::Args)]
struct PatchArgs {
    /// Flows file (JSON array of nodes).
    flows: Utf8PathBuf,

    /// Config file (default: flowpatch.toml next to the flows file, then in the current dir).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Fail with exit code 2 and write nothing if any rule is skipped.
    #[arg(long, default_value_t = false)]
    require_all: bool,

    /// Field holding the record identifier.
    #[arg(long)]
    identifier_field: Option<String>,

    /// Field holding the script body.
    #[arg(long)]
    body_field: Option<String>,

    /// Directory for report.json, report.md and patch.diff.
    #[arg(long)]
    report: Option<Utf8PathBuf>,

    /// Output format for the report printed to stdout.
    #[arg(long, value_enum, default_value = "text")]
    format: ReportFormat,
}

#[derive(Debug, Parser)]
struct ApplyArgs {
    #[command(flatten)]
    patch: PatchArgs,

    /// Write the patched flows here instead of replacing the input file.
    #[arg(long)]
    out: Option<Utf8PathBuf>,

    /// Copy the destination to `<destination><suffix>` before replacing it.
    #[arg(long, default_value_t = false)]
    backup: bool,
}

#[derive(Debug, Parser)]
struct PreviewArgs {
    #[command(flatten)]
    patch: PatchArgs,
}

#[derive(Debug, Parser)]
struct ListRulesArgs {
    /// Config file (default: flowpatch.toml in the current dir).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ReportFormat {
    Text,
    Json,
    Md,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        match e.stage() {
            Some(stage) => error!(stage = %stage, "{}", e),
            None => error!("{:?}", e),
        }
        return ExitCode::from(e.exit_code());
    }
    ExitCode::from(0)
}

fn real_main() -> Result<(), ToolError> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => cmd_apply(args),
        Command::Preview(args) => cmd_preview(args),
        Command::ListRules(args) => cmd_list_rules(args),
    }
}

fn cmd_apply(args: ApplyArgs) -> Result<(), ToolError> {
    let merged = merged_config(&args.patch, args.backup)?;
    let destination = args.out.clone().unwrap_or_else(|| args.patch.flows.clone());
    let settings = settings_from(&merged, destination, false);

    let source = FsRecordSource::new(args.patch.flows.clone());
    let result = run_patch(&settings, &source, &FsWritePort, tool_info());
    finish(result, &args.patch, false)
}

fn cmd_preview(args: PreviewArgs) -> Result<(), ToolError> {
    let merged = merged_config(&args.patch, false)?;
    let settings = settings_from(&merged, args.patch.flows.clone(), true);

    let source = FsRecordSource::new(args.patch.flows.clone());
    let result = run_patch(&settings, &source, &FsWritePort, tool_info());
    finish(result, &args.patch, true)
}

/// Print the report (and the diff for previews), write requested artifacts, pass errors on.
fn finish(
    result: Result<PatchOutcome, ToolError>,
    args: &PatchArgs,
    show_patch: bool,
) -> Result<(), ToolError> {
    match result {
        Ok(outcome) => emit(&outcome.report, &outcome.patch, args, show_patch),
        Err(e) => {
            // A policy block still carries a report worth showing; its exit code wins.
            if let Some(report) = e.report() {
                let patch = e.patch().unwrap_or_default();
                if let Err(emit_err) = emit(report, patch, args, show_patch) {
                    warn!("could not emit blocked run report: {emit_err}");
                }
            }
            Err(e)
        }
    }
}

fn emit(
    report: &ApplyReport,
    patch: &str,
    args: &PatchArgs,
    show_patch: bool,
) -> Result<(), ToolError> {
    if let Some(dir) = &args.report {
        write_report_artifacts(report, patch, dir, &FsWritePort)?;
        info!("wrote report artifacts to {}", dir);
    }

    if show_patch && !matches!(args.format, ReportFormat::Json) {
        if patch.is_empty() {
            println!("(no changes)");
        } else {
            print!("{patch}");
        }
        println!();
    }
    print_report(report, args.format)?;
    Ok(())
}

fn merged_config(args: &PatchArgs, backup: bool) -> anyhow::Result<MergedConfig> {
    let cwd = Utf8Path::new(".");
    let flows_dir = match args.flows.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => cwd,
    };

    let file_config = config::load_or_default(args.config.as_deref(), &[flows_dir, cwd])
        .context("load flowpatch config")?;
    let merged = ConfigMerger::new(file_config).merge(&CliOverrides {
        require_all: args.require_all,
        backup,
        identifier_field: args.identifier_field.clone(),
        body_field: args.body_field.clone(),
    });

    debug!(
        "merged config: rules={}, require_all={}, backups={:?}, fields={:?}",
        merged.rules.len(),
        merged.require_all,
        merged.backups,
        merged.field_names
    );
    Ok(merged)
}

fn settings_from(merged: &MergedConfig, destination: Utf8PathBuf, dry_run: bool) -> PatchSettings {
    PatchSettings {
        destination,
        field_names: merged.field_names.clone(),
        rules: merged.rules.clone(),
        dry_run,
        require_all: merged.require_all,
        backup_enabled: merged.backups.enabled,
        backup_suffix: merged.backups.suffix.clone(),
    }
}

fn print_report(report: &ApplyReport, format: ReportFormat) -> anyhow::Result<()> {
    match format {
        ReportFormat::Text => print!("{}", render_report_text(report)),
        ReportFormat::Md => print!("{}", render_report_md(report)),
        ReportFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(report).context("serialize report")?
            );
        }
    }
    Ok(())
}

fn cmd_list_rules(args: ListRulesArgs) -> Result<(), ToolError> {
    let cwd = Utf8Path::new(".");
    let file_config =
        config::load_or_default(args.config.as_deref(), &[cwd]).context("load flowpatch config")?;

    match args.format {
        OutputFormat::Text => {
            println!("Configured rules:\n");
            print!("{}", render_rules_text(&file_config.rules));
        }
        OutputFormat::Json => {
            let rules =
                serde_json::to_string_pretty(&file_config.rules).context("serialize rules")?;
            println!("{rules}");
        }
    }
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "flowpatch".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}
