//! Configuration schema for ctxfmt.
//!
//! A config file scopes which declarations may be rewritten and describes the
//! marker parameter that gets threaded through them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file names to search for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["ctxfmt.yaml", ".ctxfmt.yaml"];

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Substrings of function names that are never rewritten
    #[serde(default)]
    pub ignore_funcs: Vec<String>,
    /// Substrings of interface names that may be rewritten (empty: all)
    #[serde(default)]
    pub allow_interfaces: Vec<String>,
    #[serde(default)]
    pub skip_method: bool,
    #[serde(default)]
    pub skip_interface: bool,
    /// Substrings of file names that are never touched (e.g. "mock_")
    #[serde(default = "default_ignore_files")]
    pub ignore_files: Vec<String>,
    /// Glob patterns for paths to exclude (e.g. "**/internal/gen/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Skip files carrying a `// Code generated ... DO NOT EDIT.` header
    #[serde(default = "default_true")]
    pub skip_generated: bool,
    #[serde(default)]
    pub marker: MarkerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_funcs: Vec::new(),
            allow_interfaces: Vec::new(),
            skip_method: false,
            skip_interface: false,
            ignore_files: default_ignore_files(),
            excluded_paths: Vec::new(),
            skip_generated: true,
            marker: MarkerConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ignore_files() -> Vec<String> {
    vec!["mock_".to_string()]
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse a config from YAML text. An empty document yields the defaults.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }
}

/// The well-known leading parameter and the placeholder used at call sites.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarkerConfig {
    /// Package qualifier of the marker type ("context")
    #[serde(default = "MarkerConfig::default_package")]
    pub package: String,
    /// Member name of the marker type ("Context")
    #[serde(default = "MarkerConfig::default_type_name")]
    pub type_name: String,
    /// Conventional parameter name ("ctx")
    #[serde(default = "MarkerConfig::default_param_name")]
    pub param_name: String,
    /// Import path added to rewritten files ("context")
    #[serde(default = "MarkerConfig::default_import_path")]
    pub import_path: String,
    /// Expression inserted at broken call sites ("context.TODO()")
    #[serde(default = "MarkerConfig::default_placeholder")]
    pub placeholder: String,
}

impl MarkerConfig {
    fn default_package() -> String {
        "context".to_string()
    }

    fn default_type_name() -> String {
        "Context".to_string()
    }

    fn default_param_name() -> String {
        "ctx".to_string()
    }

    fn default_import_path() -> String {
        "context".to_string()
    }

    fn default_placeholder() -> String {
        "context.TODO()".to_string()
    }

    /// The marker type as written in source, e.g. `context.Context`.
    pub fn type_expr(&self) -> String {
        format!("{}.{}", self.package, self.type_name)
    }

    /// The full named parameter, e.g. `ctx context.Context`.
    pub fn param_decl(&self) -> String {
        format!("{} {}", self.param_name, self.type_expr())
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            package: Self::default_package(),
            type_name: Self::default_type_name(),
            param_name: Self::default_param_name(),
            import_path: Self::default_import_path(),
            placeholder: Self::default_placeholder(),
        }
    }
}

/// Locate a config file: working directory first, then the user config dir.
///
/// Returns `None` when nothing is found; the caller falls back to defaults.
pub fn discover() -> Option<PathBuf> {
    for name in DEFAULT_CONFIG_NAMES {
        let path = PathBuf::from(name);
        if path.is_file() {
            return Some(path);
        }
    }

    let dirs = directories::ProjectDirs::from("", "", "ctxfmt")?;
    let user_config = dirs.config_dir().join("config.yaml");
    if user_config.is_file() {
        Some(user_config)
    } else {
        None
    }
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    // An empty substring matches every name.
    for (key, values) in [
        ("ignore_funcs", &config.ignore_funcs),
        ("allow_interfaces", &config.allow_interfaces),
        ("ignore_files", &config.ignore_files),
    ] {
        if values.iter().any(|v| v.is_empty()) {
            anyhow::bail!("{} must not contain empty entries", key);
        }
    }

    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    let marker = &config.marker;
    for (key, value) in [
        ("marker.package", &marker.package),
        ("marker.type_name", &marker.type_name),
        ("marker.param_name", &marker.param_name),
        ("marker.import_path", &marker.import_path),
        ("marker.placeholder", &marker.placeholder),
    ] {
        if value.trim().is_empty() {
            anyhow::bail!("{} must not be empty", key);
        }
    }

    Ok(())
}
