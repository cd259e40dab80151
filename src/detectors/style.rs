//! Stylesheet feature detector
//!
//! Stylesheet syntax is regular enough that textual patterns suffice:
//! each tracked feature has one pattern recognising a pseudo-class
//! invocation, an at-rule (or its descriptor properties), or a functional
//! notation.

use super::base::{DetectorError, FeatureDetector, FeatureSet};
use crate::models::FeatureId;
use crate::registry::{FeatureRegistry, TextPattern};
use regex::Regex;

/// Compiled `{feature -> pattern}` registry
#[derive(Debug, Clone)]
pub(crate) struct PatternSet {
    patterns: Vec<(FeatureId, Regex)>,
}

impl PatternSet {
    pub(crate) fn compile(patterns: &[TextPattern]) -> Result<Self, DetectorError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(&p.pattern)
                    .map(|re| (p.feature.clone(), re))
                    .map_err(|source| DetectorError::Pattern {
                        feature: p.feature.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub(crate) fn scan_into(&self, content: &str, hits: &mut FeatureSet) {
        for (feature, re) in &self.patterns {
            if !hits.contains(feature) && re.is_match(content) {
                hits.insert(feature.clone());
            }
        }
    }
}

pub struct StyleDetector {
    patterns: PatternSet,
}

impl StyleDetector {
    pub fn new(registry: &FeatureRegistry) -> Result<Self, DetectorError> {
        Ok(Self {
            patterns: PatternSet::compile(registry.style_patterns())?,
        })
    }
}

impl FeatureDetector for StyleDetector {
    fn name(&self) -> &'static str {
        "style"
    }

    fn detect(&self, content: &str) -> FeatureSet {
        let mut hits = FeatureSet::new();
        self.patterns.scan_into(content, &mut hits);
        hits
    }
}
