//! Configuration module for baseline-gate
//!
//! This module handles:
//! - Project-level configuration (baseline.toml)
//! - Curated fallback overrides
//! - Scan include/exclude rules
//! - CLI defaults

mod project_config;

pub use project_config::{
    load_project_config,
    ProjectConfig,
    ScanConfig,
    CONFIG_FILENAME,
    DEFAULT_EXCLUDE_PATTERNS,
    STARTER_CONFIG,
};
