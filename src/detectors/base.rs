//! Base detector trait and types
//!
//! This module defines the core abstractions for feature detection:
//! - `FeatureDetector` trait that both content detectors implement
//! - `ContentKind` for choosing a detector from a file path
//! - `FeatureSet`, the per-file (and merged) detection output

use crate::models::FeatureId;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Invalid pattern for feature '{feature}': {source}")]
    Pattern {
        feature: FeatureId,
        #[source]
        source: regex::Error,
    },
}

/// Set of detected feature ids
///
/// A set, not a count: multiplicity and order of hits are irrelevant.
/// `BTreeSet` keeps iteration deterministic for reports.
pub type FeatureSet = BTreeSet<FeatureId>;

/// Script dialect, selects the grammar used to build the syntax tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptDialect {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
}

/// What kind of source a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Style,
    Script(ScriptDialect),
}

impl ContentKind {
    /// Pick a content kind from a file extension (case-insensitive)
    pub fn for_extension(ext: &str) -> Option<ContentKind> {
        match ext.to_lowercase().as_str() {
            "css" | "scss" | "sass" => Some(ContentKind::Style),
            "js" | "mjs" | "cjs" => Some(ContentKind::Script(ScriptDialect::JavaScript)),
            "jsx" => Some(ContentKind::Script(ScriptDialect::Jsx)),
            "ts" | "mts" | "cts" => Some(ContentKind::Script(ScriptDialect::TypeScript)),
            "tsx" => Some(ContentKind::Script(ScriptDialect::Tsx)),
            _ => None,
        }
    }

    /// Pick a content kind from a path; `None` means "not scanned"
    pub fn for_path(path: &Path) -> Option<ContentKind> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(ContentKind::for_extension)
    }
}

/// All extensions that map to a content kind
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "css", "scss", "sass", "js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx",
];

/// Trait for feature detectors
///
/// A detector looks at the content of one file and returns the tracked
/// features it uses. Detection never fails: malformed input yields fewer
/// hits, not an error.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyDetector;
///
/// impl FeatureDetector for MyDetector {
///     fn name(&self) -> &'static str {
///         "my-detector"
///     }
///
///     fn detect(&self, content: &str) -> FeatureSet {
///         FeatureSet::new()
///     }
/// }
/// ```
pub trait FeatureDetector: Send + Sync {
    /// Unique identifier for this detector
    fn name(&self) -> &'static str;

    /// Run detection over one file's content
    fn detect(&self, content: &str) -> FeatureSet;
}
