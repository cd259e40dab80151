//! Feature detectors
//!
//! This module finds usages of tracked web-platform features in source
//! files. Two concrete detectors sit behind the `FeatureDetector` trait:
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │   FeatureDetector trait      │
//!                 │   detect(content) -> set     │
//!                 └──────────────────────────────┘
//!                        │                │
//!                        ▼                ▼
//!            ┌────────────────┐   ┌──────────────────────────┐
//!            │ StyleDetector  │   │ ScriptDetector           │
//!            │ textual rules  │   │ textual rules in strings │
//!            │ (css/scss/sass)│   │ + tree-sitter call shapes│
//!            └────────────────┘   └──────────────────────────┘
//! ```
//!
//! `DetectorSet` owns one detector per content kind and dispatches on the
//! kind the caller picked from the file path.
//!
//! # Usage
//!
//! ```ignore
//! use baseline_gate::detectors::{ContentKind, DetectorSet};
//! use baseline_gate::registry::FeatureRegistry;
//!
//! let detectors = DetectorSet::new(FeatureRegistry::builtin())?;
//! let hits = detectors.detect(ContentKind::Style, ".a:has(b) {}");
//! assert!(hits.contains("has"));
//! ```

mod base;
mod script;
mod style;

pub use base::{
    ContentKind, DetectorError, FeatureDetector, FeatureSet, ScriptDialect, SUPPORTED_EXTENSIONS,
};
pub use script::ScriptDetector;
pub use style::StyleDetector;

use crate::registry::FeatureRegistry;
use globset::GlobSet;
use std::path::{Path, PathBuf};
use style::PatternSet;
use tracing::trace;

/// Name of the per-repository ignore file, same syntax as `.gitignore`
pub const IGNORE_FILENAME: &str = ".baselineignore";

/// One detector per content kind, built once and shared across workers
pub struct DetectorSet {
    style: StyleDetector,
    javascript: ScriptDetector,
    jsx: ScriptDetector,
    typescript: ScriptDetector,
    tsx: ScriptDetector,
}

impl DetectorSet {
    pub fn new(registry: &FeatureRegistry) -> Result<Self, DetectorError> {
        let text = PatternSet::compile(registry.script_patterns())?;
        let shapes = registry.call_shapes();
        let script = |dialect| ScriptDetector::from_parts(dialect, text.clone(), shapes.to_vec());

        Ok(Self {
            style: StyleDetector::new(registry)?,
            javascript: script(ScriptDialect::JavaScript),
            jsx: script(ScriptDialect::Jsx),
            typescript: script(ScriptDialect::TypeScript),
            tsx: script(ScriptDialect::Tsx),
        })
    }

    /// Detector responsible for a content kind
    pub fn for_kind(&self, kind: ContentKind) -> &dyn FeatureDetector {
        match kind {
            ContentKind::Style => &self.style,
            ContentKind::Script(ScriptDialect::JavaScript) => &self.javascript,
            ContentKind::Script(ScriptDialect::Jsx) => &self.jsx,
            ContentKind::Script(ScriptDialect::TypeScript) => &self.typescript,
            ContentKind::Script(ScriptDialect::Tsx) => &self.tsx,
        }
    }

    pub fn detect(&self, kind: ContentKind, content: &str) -> FeatureSet {
        let detector = self.for_kind(kind);
        let hits = detector.detect(content);
        trace!("{} detector: {} hit(s)", detector.name(), hits.len());
        hits
    }
}

/// Walk source files under `root`, respecting `.gitignore`,
/// `.baselineignore` and the `exclude` glob set.
///
/// Only files with a supported extension (or one listed in `extensions`,
/// when given) are returned. Paths are sorted so runs are reproducible.
pub fn walk_source_files(
    root: &Path,
    extensions: Option<&[String]>,
    exclude: &GlobSet,
) -> Vec<PathBuf> {
    use ignore::WalkBuilder;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .add_custom_ignore_filename(IGNORE_FILENAME);

    let mut files: Vec<PathBuf> = builder
        .build()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();

            if !path.is_file() {
                return None;
            }

            let ext = path.extension()?.to_str()?.to_lowercase();
            let wanted = match extensions {
                Some(exts) => exts.iter().any(|e| e.eq_ignore_ascii_case(&ext)),
                None => SUPPORTED_EXTENSIONS.contains(&ext.as_str()),
            };
            if !wanted || ContentKind::for_extension(&ext).is_none() {
                return None;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            if exclude.is_match(relative) {
                return None;
            }

            Some(path.to_path_buf())
        })
        .collect();

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};

    #[test]
    fn test_detector_set_dispatch() {
        let detectors = DetectorSet::new(FeatureRegistry::builtin()).unwrap();

        let css = detectors.detect(ContentKind::Style, "@container (min-width: 1px) {}");
        assert!(css.contains("container-queries"));

        // Style patterns are not applied to scripts
        let js = detectors.detect(
            ContentKind::Script(ScriptDialect::JavaScript),
            "const css = '@container (min-width: 1px) {}';",
        );
        assert!(js.is_empty());

        let ts = detectors.detect(
            ContentKind::Script(ScriptDialect::TypeScript),
            "const s: AbortSignal = AbortSignal.timeout(10);",
        );
        assert!(ts.contains("abortsignal-timeout"));

        assert_eq!(detectors.for_kind(ContentKind::Style).name(), "style");
        assert_eq!(
            detectors.for_kind(ContentKind::Script(ScriptDialect::Tsx)).name(),
            "script"
        );
    }

    #[test]
    fn test_walk_source_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        std::fs::write(root.join("src/app.ts"), "").unwrap();
        std::fs::write(root.join("src/site.css"), "").unwrap();
        std::fs::write(root.join("src/notes.md"), "").unwrap();
        std::fs::write(root.join("src/skip.js"), "").unwrap();
        std::fs::write(root.join("node_modules/lib/index.js"), "").unwrap();
        std::fs::write(root.join(IGNORE_FILENAME), "skip.js\n").unwrap();

        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("**/node_modules/**").unwrap());
        let exclude = builder.build().unwrap();

        let files = walk_source_files(root, None, &exclude);
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["src/app.ts", "src/site.css"]);

        let only_css = walk_source_files(root, Some(&["css".to_string()]), &exclude);
        assert_eq!(only_css.len(), 1);
    }
}
