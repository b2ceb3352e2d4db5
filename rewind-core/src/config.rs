//! Configuration loading and resolution.
//!
//! Supports TOML config files, environment variables, and CLI overrides
//! with a defined priority order (CLI > env > TOML > defaults).

use std::path::PathBuf;

use serde::Deserialize;

use crate::batch::BatchConfig;
use crate::error::{Result, RewindError};
use crate::reverse::ReconstructDefaults;
use crate::scan::ScanConfig;

/// Default location of the persisted catalog, relative to the working directory.
pub const DEFAULT_CATALOG_PATH: &str = ".rewind/catalog.json";

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rewind.toml";

/// Helper macro to apply an optional owned value directly to a target field.
macro_rules! apply_option {
    ($opt:expr => $target:expr) => {
        if let Some(v) = $opt {
            $target = v;
        }
    };
}

/// Helper macro to apply an optional owned value, wrapping it in `Some()`.
macro_rules! apply_option_some {
    ($opt:expr => $target:expr) => {
        if let Some(v) = $opt {
            $target = Some(v);
        }
    };
}

/// Helper macro to clone a borrowed optional value directly to a target field.
macro_rules! apply_option_clone {
    ($opt:expr => $target:expr) => {
        if let Some(ref v) = $opt {
            $target = v.clone();
        }
    };
}

/// Top-level configuration for rewind.
#[derive(Debug, Clone, Default)]
pub struct RewindConfig {
    /// Where the schema catalog is persisted.
    pub catalog: CatalogSettings,
    /// Repository scan settings (skipped directories).
    pub scan: ScanConfig,
    /// Batch reversal output settings.
    pub reverse: BatchConfig,
    /// Fallback clauses used when rebuilding a dropped table.
    pub reconstruct: ReconstructDefaults,
}

/// Catalog persistence settings.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// Path of the catalog JSON document.
    pub path: PathBuf,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CATALOG_PATH),
        }
    }
}

// ── TOML deserialization structs ──

#[derive(Deserialize, Default)]
struct TomlConfig {
    catalog: Option<TomlCatalogSettings>,
    scan: Option<TomlScanConfig>,
    reverse: Option<TomlReverseConfig>,
    reconstruct: Option<TomlReconstructConfig>,
}

#[derive(Deserialize, Default)]
struct TomlCatalogSettings {
    path: Option<String>,
}

#[derive(Deserialize, Default)]
struct TomlScanConfig {
    skip_dirs: Option<Vec<String>>,
}

#[derive(Deserialize, Default)]
struct TomlReverseConfig {
    rollback_prefix: Option<String>,
    annotate: Option<bool>,
}

#[derive(Deserialize, Default)]
struct TomlReconstructConfig {
    default_storage_options: Option<String>,
    default_distribution: Option<String>,
    default_placement_group: Option<String>,
}

/// CLI overrides that take highest priority.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the catalog path.
    pub catalog: Option<PathBuf>,
    /// Override the directory names skipped during a scan.
    pub skip_dirs: Option<Vec<String>>,
    /// Override the rollback file name prefix.
    pub rollback_prefix: Option<String>,
    /// Override whether each reversal is annotated with its forward statement.
    pub annotate: Option<bool>,
}

impl RewindConfig {
    /// Load configuration with the following priority (highest wins):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. TOML config file
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&str>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = RewindConfig::default();

        // Layer 3: TOML config file
        let toml_path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);
        if let Ok(content) = std::fs::read_to_string(toml_path) {
            let toml_config: TomlConfig = toml::from_str(&content).map_err(|e| {
                RewindError::ConfigError(format!(
                    "Failed to parse config file '{}': {}",
                    toml_path, e
                ))
            })?;
            config.apply_toml(toml_config);
        } else if config_path.is_some() {
            // If explicitly specified, error if not found
            return Err(RewindError::ConfigError(format!(
                "Config file '{}' not found",
                toml_path
            )));
        }

        // Layer 2: Environment variables
        config.apply_env();

        // Layer 1: CLI overrides
        config.apply_cli(overrides);

        if config.reverse.rollback_prefix.contains(['/', '\\']) {
            return Err(RewindError::ConfigError(format!(
                "rollback_prefix '{}' must not contain path separators",
                config.reverse.rollback_prefix
            )));
        }

        Ok(config)
    }

    fn apply_toml(&mut self, toml: TomlConfig) {
        if let Some(c) = toml.catalog {
            if let Some(v) = c.path {
                self.catalog.path = PathBuf::from(v);
            }
        }

        if let Some(s) = toml.scan {
            apply_option!(s.skip_dirs => self.scan.skip_dirs);
        }

        if let Some(r) = toml.reverse {
            apply_option!(r.rollback_prefix => self.reverse.rollback_prefix);
            apply_option!(r.annotate => self.reverse.annotate);
        }

        if let Some(r) = toml.reconstruct {
            apply_option_some!(r.default_storage_options => self.reconstruct.storage_options);
            if let Some(v) = r.default_distribution {
                match v.parse() {
                    Ok(dist) => self.reconstruct.distribution = Some(dist),
                    Err(_) => log::warn!(
                        "Invalid default_distribution '{}' in config, ignoring. Valid values: hash(col, ...), roundrobin, random",
                        v
                    ),
                }
            }
            apply_option_some!(r.default_placement_group => self.reconstruct.placement_group);
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("REWIND_CATALOG") {
            self.catalog.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("REWIND_SKIP_DIRS") {
            self.scan.skip_dirs = parse_list(&v);
        }
        if let Ok(v) = std::env::var("REWIND_ROLLBACK_PREFIX") {
            self.reverse.rollback_prefix = v;
        }
        if let Ok(v) = std::env::var("REWIND_ANNOTATE") {
            match parse_flag(&v) {
                Some(flag) => self.reverse.annotate = flag,
                None => log::warn!("Ignoring invalid REWIND_ANNOTATE value; value={}", v),
            }
        }
    }

    fn apply_cli(&mut self, overrides: &CliOverrides) {
        apply_option_clone!(overrides.catalog => self.catalog.path);
        apply_option_clone!(overrides.skip_dirs => self.scan.skip_dirs);
        apply_option_clone!(overrides.rollback_prefix => self.reverse.rollback_prefix);
        apply_option!(overrides.annotate => self.reverse.annotate);
    }
}

/// Split a comma-separated list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
