//! Configuration file loading for flowpatch.
//!
//! Discovers and loads `flowpatch.toml` next to the flows file, falling back to the working
//! directory. Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use flowpatch_core::DEFAULT_BACKUP_SUFFIX;
use flowpatch_types::{DEFAULT_BODY_FIELD, DEFAULT_IDENTIFIER_FIELD, FieldNames, PatchRule};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "flowpatch.toml";

/// Top-level configuration from flowpatch.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowpatchConfig {
    /// Which fields carry the identifier and the script body.
    pub records: RecordsConfig,

    pub policy: PolicyConfig,

    pub backups: BackupsConfig,

    /// Rules, applied in file order.
    pub rules: Vec<PatchRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    pub identifier_field: String,
    pub body_field: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            identifier_field: DEFAULT_IDENTIFIER_FIELD.to_string(),
            body_field: DEFAULT_BODY_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Refuse to write unless every rule applied.
    pub require_all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupsConfig {
    /// Copy the destination aside before replacing it.
    pub enabled: bool,

    /// Suffix for backup files.
    pub suffix: String,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

/// Discover the flowpatch.toml config file.
///
/// Looks in each directory in order and returns the first hit.
pub fn discover_config(dirs: &[&Utf8Path]) -> Option<Utf8PathBuf> {
    for dir in dirs {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            debug!("found config file at {}", config_path);
            return Some(config_path);
        }
        debug!("no config file at {}", config_path);
    }
    None
}

/// Load and parse a config file. The format follows the extension: `.yaml`/`.yml`, `.json`,
/// anything else is TOML.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<FlowpatchConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    let format = ConfigFormat::from_path(path);
    parse_config_as(&contents, format).with_context(|| format!("parse config file {}", path))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("yaml" | "yml") => ConfigFormat::Yaml,
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Parse a TOML config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<FlowpatchConfig> {
    parse_config_as(contents, ConfigFormat::Toml)
}

pub fn parse_config_as(contents: &str, format: ConfigFormat) -> anyhow::Result<FlowpatchConfig> {
    let config: FlowpatchConfig = match format {
        ConfigFormat::Toml => toml::from_str(contents).context("invalid TOML")?,
        ConfigFormat::Yaml => serde_yaml::from_str(contents).context("invalid YAML")?,
        ConfigFormat::Json => serde_json::from_str(contents).context("invalid JSON")?,
    };
    Ok(config)
}

/// Load the explicit config, or discover one in `dirs`, or fall back to defaults.
pub fn load_or_default(
    explicit: Option<&Utf8Path>,
    dirs: &[&Utf8Path],
) -> anyhow::Result<FlowpatchConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dirs) {
        Some(path) => load_config(&path),
        None => Ok(FlowpatchConfig::default()),
    }
}

/// CLI values that can override the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub require_all: bool,
    pub backup: bool,
    pub identifier_field: Option<String>,
    pub body_field: Option<String>,
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub field_names: FieldNames,
    pub require_all: bool,
    pub backups: BackupsConfig,
    pub rules: Vec<PatchRule>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: FlowpatchConfig,
}

impl ConfigMerger {
    pub fn new(config: FlowpatchConfig) -> Self {
        Self { config }
    }

    /// Boolean flags OR with the config value; field-name flags replace it.
    pub fn merge(self, cli: &CliOverrides) -> MergedConfig {
        let FlowpatchConfig {
            records,
            policy,
            mut backups,
            rules,
        } = self.config;

        backups.enabled |= cli.backup;

        MergedConfig {
            field_names: FieldNames {
                identifier: cli
                    .identifier_field
                    .clone()
                    .unwrap_or(records.identifier_field),
                body: cli.body_field.clone().unwrap_or(records.body_field),
            },
            require_all: cli.require_all || policy.require_all,
            backups,
            rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowpatch_types::{AnchorMatch, InsertPolicy};
    use tempfile::TempDir;

    #[test]
    fn test_parse_example_config() {
        let contents = r#"
[records]
identifier_field = "id"
body_field = "func"

[policy]
require_all = true

[backups]
enabled = true
suffix = ".bak"

[[rules]]
name = "controller"
target = "func_controller"
anchor = "// Tick"
insertion = "reset();\n"
policy = "insert-before"

[[rules]]
target = "func_generator"
anchor = "return msg;"
insertion = "log();\n"
policy = "insert_before"
anchor_match = "unique"
"#;

        let config = parse_config(contents).unwrap();
        assert!(config.policy.require_all);
        assert!(config.backups.enabled);
        assert_eq!(config.backups.suffix, ".bak");
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].name.as_deref(), Some("controller"));
        assert_eq!(config.rules[0].insertion, "reset();\n");
        assert_eq!(config.rules[1].policy, InsertPolicy::InsertBefore);
        assert_eq!(config.rules[1].anchor_match, AnchorMatch::Unique);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.rules.is_empty());
        assert!(!config.policy.require_all);
        assert!(!config.backups.enabled);
        assert_eq!(config.backups.suffix, ".flowpatch.bak");
        assert_eq!(config.records.identifier_field, "id");
        assert_eq!(config.records.body_field, "func");
    }

    #[test]
    fn test_parse_rejects_rule_without_anchor() {
        let err = parse_config("[[rules]]\ntarget = \"a\"\ninsertion = \"x\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("anchor"));
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = "rules:\n  - target: a\n    anchor: TAG\n    insertion: X\n    policy: replace\n";
        let config = parse_config_as(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.rules[0].policy, InsertPolicy::Replace);

        let json = r#"{"rules":[{"targetIdentifier":"a","anchor":"TAG","insertion":"X"}]}"#;
        let config = parse_config_as(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.rules[0].target, "a");
        assert_eq!(config.rules[0].policy, InsertPolicy::InsertBefore);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Utf8Path::new("a.toml")),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Utf8Path::new("a.YML")),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Utf8Path::new("a.yaml")),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Utf8Path::new("a.json")),
            ConfigFormat::Json
        );
        assert_eq!(
            ConfigFormat::from_path(Utf8Path::new("rules")),
            ConfigFormat::Toml
        );
    }

    #[test]
    fn test_merge_cli_overrides() {
        let config = FlowpatchConfig::default();
        let merged = ConfigMerger::new(config).merge(&CliOverrides {
            require_all: true,
            backup: true,
            identifier_field: Some("key".to_string()),
            body_field: None,
        });
        assert!(merged.require_all);
        assert!(merged.backups.enabled);
        assert_eq!(merged.field_names.identifier, "key");
        assert_eq!(merged.field_names.body, "func");
    }

    #[test]
    fn test_merge_config_used_when_cli_false() {
        let config = FlowpatchConfig {
            policy: PolicyConfig { require_all: true },
            backups: BackupsConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = ConfigMerger::new(config).merge(&CliOverrides::default());
        assert!(merged.require_all);
        assert!(merged.backups.enabled);
    }

    #[test]
    fn test_discover_config_order() {
        let first_dir = TempDir::new().expect("temp dir");
        let second_dir = TempDir::new().expect("temp dir");
        let first = Utf8PathBuf::from_path_buf(first_dir.path().to_path_buf()).expect("utf8");
        let second = Utf8PathBuf::from_path_buf(second_dir.path().to_path_buf()).expect("utf8");
        let dirs = [first.as_path(), second.as_path()];
        assert!(discover_config(&dirs).is_none());

        std::fs::write(second.join(CONFIG_FILE_NAME), "").expect("write config");
        assert_eq!(discover_config(&dirs), Some(second.join(CONFIG_FILE_NAME)));

        std::fs::write(first.join(CONFIG_FILE_NAME), "").expect("write config");
        assert_eq!(discover_config(&dirs), Some(first.join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_load_or_default_prefers_explicit_path() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let explicit = root.join("custom.yaml");
        std::fs::write(&explicit, "policy:\n  require_all: true\n").expect("write");
        std::fs::write(root.join(CONFIG_FILE_NAME), "").expect("write");

        let cfg = load_or_default(Some(&explicit), &[root.as_path()]).expect("load");
        assert!(cfg.policy.require_all);

        let missing = root.join("missing.toml");
        assert!(load_or_default(Some(&missing), &[root.as_path()]).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_when_missing() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let cfg = load_or_default(None, &[root.as_path()]).expect("load default");
        assert!(cfg.rules.is_empty());
        assert!(!cfg.backups.enabled);
    }
}
