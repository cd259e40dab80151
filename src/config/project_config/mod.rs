//! Project-level configuration support
//!
//! Loads per-project configuration from `baseline.toml` in the project root.
//!
//! # Configuration Format
//!
//! ```toml
//! # baseline.toml
//! threshold = 0.95
//! traffic = "analytics/traffic.csv"
//! dataset = "node_modules/@mdn/browser-compat-data/data.json"
//! workers = 8
//!
//! [scan]
//! extensions = ["css", "ts", "tsx"]
//! exclude = ["legacy/**"]
//!
//! [fallback.has]
//! firefox = 121
//! ```

use crate::models::{Browser, FeatureId};
use crate::registry::FeatureRegistry;
use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_FILENAME: &str = "baseline.toml";

/// Built-in exclusion patterns for vendored and generated code.
/// Applied unless `skip_defaults = true` in `[scan]`.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/node_modules/**",
    "**/vendor/**",
    "**/bower_components/**",
    "**/dist/**",
    "**/build/**",
    "**/*.min.js",
    "**/*.min.css",
    "**/*.bundle.js",
];

/// Written by `baseline-gate init`
pub const STARTER_CONFIG: &str = r#"# baseline-gate configuration

# Minimum readiness (0..1) a feature needs to pass
threshold = 0.95

# Traffic file: CSV with header browser,version,share (or a JSON array)
# traffic = "traffic.csv"

# Compatibility dataset (JSON, browser-compat-data layout)
# dataset = "node_modules/@mdn/browser-compat-data/data.json"

# workers = 8

[scan]
# Only scan these extensions (default: all supported)
# extensions = ["css", "scss", "js", "jsx", "ts", "tsx"]

# Extra glob patterns to skip, relative to the project root
exclude = []

# Curated minimum versions used when the dataset has no answer
# [fallback.has]
# firefox = 121
"#;

/// Project-level configuration loaded from baseline.toml
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// Pass threshold (0..1)
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Traffic file, relative to the project root
    #[serde(default)]
    pub traffic: Option<PathBuf>,

    /// Compatibility dataset, relative to the project root
    #[serde(default)]
    pub dataset: Option<PathBuf>,

    /// Default number of workers
    #[serde(default)]
    pub workers: Option<usize>,

    #[serde(default)]
    pub scan: ScanConfig,

    /// Curated fallback overrides: feature -> browser -> major
    #[serde(default)]
    pub fallback: BTreeMap<FeatureId, BTreeMap<String, u32>>,
}

/// File selection for scans
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScanConfig {
    /// Extensions to scan; empty means every supported extension
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// If true, disable built-in default exclusion patterns
    #[serde(default)]
    pub skip_defaults: bool,
}

impl ScanConfig {
    /// Effective exclusion patterns (defaults + user patterns)
    pub fn effective_patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();

        if !self.skip_defaults {
            patterns.extend(DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()));
        }

        for p in &self.exclude {
            if !patterns.contains(p) {
                patterns.push(p.clone());
            }
        }

        patterns
    }

    /// Compile the effective patterns
    pub fn exclude_set(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in self.effective_patterns() {
            let glob = Glob::new(&pattern)
                .with_context(|| format!("Invalid exclude pattern '{}'", pattern))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }

    /// Extension filter, `None` when every supported extension is wanted
    pub fn extension_filter(&self) -> Option<&[String]> {
        if self.extensions.is_empty() {
            None
        } else {
            Some(&self.extensions)
        }
    }
}

impl ProjectConfig {
    /// Fallback overrides with browser names resolved. Unknown browsers
    /// are dropped with a warning.
    pub fn fallback_overrides(&self) -> BTreeMap<FeatureId, BTreeMap<Browser, u32>> {
        let mut out = BTreeMap::new();
        for (feature, majors) in &self.fallback {
            let mut resolved = BTreeMap::new();
            for (name, major) in majors {
                match Browser::from_alias(name) {
                    Some(browser) => {
                        resolved.insert(browser, *major);
                    }
                    None => warn!("Ignoring fallback for unknown browser '{}' ({})", name, feature),
                }
            }
            out.insert(feature.clone(), resolved);
        }
        out
    }

    /// Builtin registry with this config's fallback overrides applied
    pub fn registry(&self) -> FeatureRegistry {
        FeatureRegistry::builtin().with_fallback_overrides(&self.fallback_overrides())
    }

    /// Resolve a configured path against the project root
    pub fn resolve_path(&self, root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

/// Load project configuration from the project root.
///
/// Returns default configuration if no `baseline.toml` is found or if it
/// cannot be parsed.
pub fn load_project_config(root: &Path) -> ProjectConfig {
    let toml_path = root.join(CONFIG_FILENAME);
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

/// Load configuration from a TOML file
fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}
