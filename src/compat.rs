//! Compatibility resolver
//!
//! Resolves, per browser, the minimal major version supporting a feature.
//! Two sources are merged:
//! - an external compatibility dataset (nested JSON addressed by dotted
//!   paths such as `css.selectors.has`, each node carrying
//!   `__compat.support.<browser>.version_added`)
//! - the curated fallback table from the registry
//!
//! Dataset values win per browser; curated values fill the gaps; anything
//! else stays unknown. Lookups never fail: a missing path segment, an
//! unknown feature or an ambiguous version marker all resolve to "no data".

use crate::models::{Browser, CompatibilityRequirement};
use crate::registry::FeatureRegistry;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

static VERSION_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Plain numeric versions with an optional fractional part: `106`, `15.4`
fn version_pattern() -> &'static Regex {
    VERSION_PATTERN.get_or_init(|| Regex::new(r"^(\d+)(?:\.\d+)?$").unwrap())
}

#[derive(Error, Debug)]
pub enum CompatError {
    #[error("Failed to read compatibility dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Compatibility dataset {path} is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only compatibility dataset
#[derive(Debug, Clone, Default)]
pub struct CompatDataset {
    root: Value,
}

impl CompatDataset {
    /// Dataset with no entries; every lookup yields "no data"
    pub fn empty() -> Self {
        Self { root: Value::Null }
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn from_path(path: &Path) -> Result<Self, CompatError> {
        let content = std::fs::read_to_string(path).map_err(|source| CompatError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let root = serde_json::from_str(&content).map_err(|source| CompatError::Json {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Loaded compatibility dataset from {}", path.display());
        Ok(Self { root })
    }

    pub fn is_empty(&self) -> bool {
        match &self.root {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Walk a dotted key down the dataset; `None` on any missing segment
    pub fn lookup(&self, dotted_key: &str) -> Option<&Value> {
        dotted_key
            .split('.')
            .try_fold(&self.root, |node, segment| node.get(segment))
    }

    /// The per-browser support record for a dotted key
    pub fn support(&self, dotted_key: &str) -> Option<&Map<String, Value>> {
        self.lookup(dotted_key)?
            .get("__compat")?
            .get("support")?
            .as_object()
    }
}

/// Integer major of the first support statement that states one.
///
/// A browser's entry may be a single statement or a list of them. A
/// `version_added: true` ("supported, version unknown") resolves to `None`
/// and stops the search; ranges (`≤37`), `preview` and other markers are
/// skipped.
pub fn version_added_major(support: &Map<String, Value>, browser: Browser) -> Option<u32> {
    let statements: Vec<&Value> = match support.get(browser.as_str())? {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    for statement in statements {
        match statement.get("version_added") {
            Some(Value::Bool(true)) => return None,
            Some(Value::String(v)) => {
                if let Some(major) = parse_major(v) {
                    return Some(major);
                }
            }
            _ => continue,
        }
    }
    None
}

/// Major version from a purely numeric version string
pub fn parse_major(version: &str) -> Option<u32> {
    version_pattern()
        .captures(version.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Merges dataset-resolved and curated requirements
pub struct CompatResolver<'a> {
    dataset: &'a CompatDataset,
    registry: &'a FeatureRegistry,
}

impl<'a> CompatResolver<'a> {
    pub fn new(dataset: &'a CompatDataset, registry: &'a FeatureRegistry) -> Self {
        Self { dataset, registry }
    }

    pub fn registry(&self) -> &'a FeatureRegistry {
        self.registry
    }

    /// Requirement from the dataset alone.
    ///
    /// When a feature maps to several keys, the lowest major across the
    /// keys that resolve wins: any one supporting path makes it usable.
    pub fn dataset_requirement(&self, feature_id: &str) -> CompatibilityRequirement {
        let supports: Vec<&Map<String, Value>> = self
            .registry
            .dataset_keys(feature_id)
            .iter()
            .filter_map(|key| {
                let support = self.dataset.support(key);
                if support.is_none() {
                    debug!("No compatibility data at '{}' for '{}'", key, feature_id);
                }
                support
            })
            .collect();

        Browser::ALL
            .iter()
            .filter_map(|&browser| {
                supports
                    .iter()
                    .filter_map(|support| version_added_major(support, browser))
                    .min()
                    .map(|major| (browser, major))
            })
            .collect()
    }

    /// Final requirement: dataset value, else curated fallback, else unknown
    pub fn resolve(&self, feature_id: &str) -> CompatibilityRequirement {
        let mut required = self
            .registry
            .fallback(feature_id)
            .cloned()
            .unwrap_or_default();
        for (browser, major) in self.dataset_requirement(feature_id).iter() {
            required.set(browser, major);
        }
        required
    }

    /// Whether any browser requirement for the feature comes from the dataset
    pub fn is_dataset_backed(&self, feature_id: &str) -> bool {
        !self.dataset_requirement(feature_id).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset() -> CompatDataset {
        CompatDataset::from_value(json!({
            "css": {
                "selectors": {
                    "has": {
                        "__compat": {
                            "support": {
                                "chrome": { "version_added": "105" },
                                "firefox": { "version_added": "121" },
                                "safari": [
                                    { "version_added": "preview" },
                                    { "version_added": "15.4" }
                                ],
                                "edge": { "version_added": true }
                            }
                        }
                    }
                },
                "at-rules": {
                    "container": {
                        "__compat": {
                            "support": {
                                "chrome": { "version_added": "≤37" },
                                "firefox": { "version_added": false },
                                "safari": { "version_added": "16" }
                            }
                        }
                    }
                }
            }
        }))
    }

    #[test]
    fn test_lookup_missing_segment() {
        let data = dataset();
        assert!(data.lookup("css.selectors.has").is_some());
        assert!(data.lookup("css.selectors.nope").is_none());
        assert!(data.lookup("api.Document.startViewTransition").is_none());
        assert!(data.support("css.selectors").is_none());
        assert!(CompatDataset::empty().support("css.selectors.has").is_none());
    }

    #[test]
    fn test_parse_major() {
        assert_eq!(parse_major("106"), Some(106));
        assert_eq!(parse_major("15.4"), Some(15));
        assert_eq!(parse_major("≤37"), None);
        assert_eq!(parse_major("preview"), None);
        assert_eq!(parse_major("10.1.2"), None);
        assert_eq!(parse_major(""), None);
    }

    #[test]
    fn test_version_added_true_is_unknown() {
        let data = dataset();
        let support = data.support("css.selectors.has").unwrap();
        assert_eq!(version_added_major(support, Browser::Edge), None);
        assert_eq!(version_added_major(support, Browser::Safari), Some(15));
        assert_eq!(version_added_major(support, Browser::Chrome), Some(105));
    }

    #[test]
    fn test_dataset_overrides_curated_and_curated_fills_gaps() {
        let data = dataset();
        let resolver = CompatResolver::new(&data, FeatureRegistry::builtin());

        let has = resolver.resolve("has");
        assert_eq!(has.get(Browser::Chrome), Some(105));
        assert_eq!(has.get(Browser::Firefox), Some(121));
        assert_eq!(has.get(Browser::Safari), Some(15));
        // dataset says `true`: curated value fills in
        assert_eq!(has.get(Browser::Edge), Some(105));

        let container = resolver.resolve("container-queries");
        assert_eq!(container.get(Browser::Chrome), Some(106));
        assert_eq!(container.get(Browser::Firefox), Some(110));
        assert_eq!(container.get(Browser::Safari), Some(16));
        assert!(resolver.is_dataset_backed("container-queries"));
    }

    #[test]
    fn test_dataset_value_wins_over_curated() {
        let data = CompatDataset::from_value(json!({
            "api": { "AbortSignal": { "timeout": { "__compat": { "support": {
                "firefox": { "version_added": "100" }
            }}}}}
        }));
        let resolver = CompatResolver::new(&data, FeatureRegistry::builtin());
        let req = resolver.resolve("abortsignal-timeout");
        assert_eq!(req.get(Browser::Firefox), Some(100));
        assert_eq!(req.get(Browser::Chrome), Some(115));
    }

    #[test]
    fn test_unknown_feature_is_unknown_everywhere() {
        let data = dataset();
        let resolver = CompatResolver::new(&data, FeatureRegistry::builtin());
        assert!(resolver.resolve("not-a-feature").is_empty());
        assert!(!resolver.is_dataset_backed("not-a-feature"));
    }

    #[test]
    fn test_empty_dataset_uses_curated_only() {
        let data = CompatDataset::empty();
        let resolver = CompatResolver::new(&data, FeatureRegistry::builtin());
        assert!(!resolver.is_dataset_backed("has"));
        assert_eq!(
            &resolver.resolve("has"),
            FeatureRegistry::builtin().fallback("has").unwrap()
        );
    }

    #[test]
    fn test_minimum_across_keys() {
        use crate::models::FeatureDescriptor;
        use std::collections::BTreeMap;

        let data = CompatDataset::from_value(json!({
            "a": { "__compat": { "support": { "chrome": { "version_added": "90" } } } },
            "b": { "__compat": { "support": { "chrome": { "version_added": "80" },
                                              "safari": { "version_added": "14" } } } }
        }));
        let registry = FeatureRegistry::from_parts(
            vec![FeatureDescriptor {
                id: "multi".into(),
                title: "Multi".into(),
                mdn: None,
                dataset_keys: vec!["a".into(), "b".into(), "missing.key".into()],
            }],
            BTreeMap::new(),
        );
        let resolver = CompatResolver::new(&data, &registry);
        let req = resolver.resolve("multi");
        assert_eq!(req.get(Browser::Chrome), Some(80));
        assert_eq!(req.get(Browser::Safari), Some(14));
        assert_eq!(req.get(Browser::Firefox), None);
    }
}
