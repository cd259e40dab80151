//! Feature catalogue
//!
//! The closed set of web-platform features baseline-gate knows how to find
//! and gate on. For each feature the registry holds:
//! - catalogue metadata (title, MDN link)
//! - dotted keys into the compatibility dataset
//! - textual patterns for stylesheets and for script string literals
//! - call shapes (`object.member(...)`) recognised in script syntax trees
//! - curated fallback majors used when the dataset is silent
//!
//! The builtin registry is constructed once and shared read-only. Config
//! overrides produce a new owned registry; the builtin one never changes.

use crate::models::{Browser, CompatibilityRequirement, FeatureDescriptor, FeatureId};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

/// A textual pattern that marks a feature as used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPattern {
    pub feature: FeatureId,
    pub pattern: String,
}

/// A qualified call `object.member(...)` that marks a feature as used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallShape {
    pub object: String,
    pub member: String,
    pub feature: FeatureId,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    features: Vec<FeatureDescriptor>,
    style_patterns: Vec<TextPattern>,
    script_patterns: Vec<TextPattern>,
    call_shapes: Vec<CallShape>,
    fallback: BTreeMap<FeatureId, CompatibilityRequirement>,
}

static BUILTIN: OnceLock<FeatureRegistry> = OnceLock::new();

// (id, title, mdn, dataset keys)
const CATALOGUE: &[(&str, &str, &str, &[&str])] = &[
    (
        "has",
        ":has() pseudo-class",
        "https://developer.mozilla.org/docs/Web/CSS/:has",
        &["css.selectors.has"],
    ),
    (
        "container-queries",
        "Container queries",
        "https://developer.mozilla.org/docs/Web/CSS/CSS_containment/Container_queries",
        &["css.at-rules.container"],
    ),
    (
        "color-mix",
        "color-mix()",
        "https://developer.mozilla.org/docs/Web/CSS/color_value/color-mix",
        &["css.types.color-mix"],
    ),
    (
        "view-transitions",
        "View Transitions API",
        "https://developer.mozilla.org/docs/Web/API/View_Transitions_API",
        &["api.Document.startViewTransition"],
    ),
    (
        "abortsignal-timeout",
        "AbortSignal.timeout()",
        "https://developer.mozilla.org/docs/Web/API/AbortSignal/timeout_static",
        &["api.AbortSignal.timeout"],
    ),
];

const STYLE_PATTERNS: &[(&str, &str)] = &[
    // pseudo-class invocation
    ("has", r":has\s*\("),
    // at-rule or its descriptor properties
    ("container-queries", r"@container\b|container-(?:type|name)\s*:"),
    ("view-transitions", r"\bview-transition-name\s*:"),
    // functional notation
    ("color-mix", r"\bcolor-mix\s*\("),
];

// Feature names that show up inside string literals, e.g. querySelector(":has(a)")
const SCRIPT_PATTERNS: &[(&str, &str)] = &[
    ("has", r":has\s*\("),
    ("color-mix", r"\bcolor-mix\s*\("),
];

const CALL_SHAPES: &[(&str, &str, &str)] = &[
    ("document", "startViewTransition", "view-transitions"),
    ("AbortSignal", "timeout", "abortsignal-timeout"),
];

// (id, chrome, firefox, safari, edge)
const FALLBACK: &[(&str, u32, u32, u32, u32)] = &[
    ("has", 105, 121, 15, 105),
    ("container-queries", 106, 110, 16, 106),
    ("color-mix", 110, 110, 16, 110),
    ("view-transitions", 114, 120, 17, 114),
    ("abortsignal-timeout", 115, 120, 17, 115),
];

impl FeatureRegistry {
    /// The shared builtin catalogue
    pub fn builtin() -> &'static FeatureRegistry {
        BUILTIN.get_or_init(Self::build_builtin)
    }

    fn build_builtin() -> FeatureRegistry {
        let features = CATALOGUE
            .iter()
            .map(|(id, title, mdn, keys)| FeatureDescriptor {
                id: id.to_string(),
                title: title.to_string(),
                mdn: Some(mdn.to_string()),
                dataset_keys: keys.iter().map(|k| k.to_string()).collect(),
            })
            .collect();

        let to_patterns = |table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(feature, pattern)| TextPattern {
                    feature: feature.to_string(),
                    pattern: pattern.to_string(),
                })
                .collect()
        };

        let call_shapes = CALL_SHAPES
            .iter()
            .map(|(object, member, feature)| CallShape {
                object: object.to_string(),
                member: member.to_string(),
                feature: feature.to_string(),
            })
            .collect();

        let fallback = FALLBACK
            .iter()
            .map(|(id, chrome, firefox, safari, edge)| {
                let req = CompatibilityRequirement::new()
                    .with(Browser::Chrome, *chrome)
                    .with(Browser::Firefox, *firefox)
                    .with(Browser::Safari, *safari)
                    .with(Browser::Edge, *edge);
                (id.to_string(), req)
            })
            .collect();

        FeatureRegistry {
            features,
            style_patterns: to_patterns(STYLE_PATTERNS),
            script_patterns: to_patterns(SCRIPT_PATTERNS),
            call_shapes,
            fallback,
        }
    }

    /// Registry with the given catalogue and fallback table and no
    /// detection patterns
    pub fn from_parts(
        features: Vec<FeatureDescriptor>,
        fallback: BTreeMap<FeatureId, CompatibilityRequirement>,
    ) -> FeatureRegistry {
        FeatureRegistry {
            features,
            fallback,
            ..Default::default()
        }
    }

    /// Copy of this registry with curated fallback values replaced per
    /// (feature, browser). Overrides for features outside the catalogue
    /// are dropped.
    pub fn with_fallback_overrides(
        &self,
        overrides: &BTreeMap<FeatureId, BTreeMap<Browser, u32>>,
    ) -> FeatureRegistry {
        let mut registry = self.clone();
        for (feature, majors) in overrides {
            if registry.descriptor(feature).is_none() {
                warn!("Ignoring fallback override for unknown feature '{}'", feature);
                continue;
            }
            let entry = registry.fallback.entry(feature.clone()).or_default();
            for (browser, major) in majors {
                entry.set(*browser, *major);
            }
        }
        registry
    }

    pub fn features(&self) -> &[FeatureDescriptor] {
        &self.features
    }

    pub fn descriptor(&self, id: &str) -> Option<&FeatureDescriptor> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Dotted dataset keys for a feature (empty if unmapped)
    pub fn dataset_keys(&self, id: &str) -> &[String] {
        self.descriptor(id)
            .map(|f| f.dataset_keys.as_slice())
            .unwrap_or(&[])
    }

    /// Curated fallback majors for a feature
    pub fn fallback(&self, id: &str) -> Option<&CompatibilityRequirement> {
        self.fallback.get(id)
    }

    /// Whether a feature can be gated at all (dataset keys or curated values)
    pub fn is_mapped(&self, id: &str) -> bool {
        !self.dataset_keys(id).is_empty() || self.fallback.contains_key(id)
    }

    pub fn style_patterns(&self) -> &[TextPattern] {
        &self.style_patterns
    }

    pub fn script_patterns(&self) -> &[TextPattern] {
        &self.script_patterns
    }

    pub fn call_shapes(&self) -> &[CallShape] {
        &self.call_shapes
    }
}
