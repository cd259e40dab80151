//! Core data models for baseline-gate
//!
//! These models flow between the pipeline stages: traffic rows in,
//! compatibility requirements in the middle, readiness results out.
//! All of them are plain values; each stage builds its output fully
//! before handing it on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Key into the feature catalogue (e.g. `"has"`, `"container-queries"`)
pub type FeatureId = String;

/// The four browsers that make up the whole traffic universe
///
/// Declaration order is the canonical order used for per-browser
/// breakdowns and as the tie-break when ranking blockers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl Browser {
    /// All browsers in canonical order
    pub const ALL: [Browser; 4] = [
        Browser::Chrome,
        Browser::Firefox,
        Browser::Safari,
        Browser::Edge,
    ];

    /// Key used by the compatibility dataset for this browser
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
            Browser::Edge => "edge",
        }
    }

    /// Map a free-text browser name onto a canonical browser.
    ///
    /// Case-insensitive, surrounding whitespace ignored. Returns `None`
    /// for anything outside the synonym table (e.g. `"opera"`).
    pub fn from_alias(name: &str) -> Option<Browser> {
        match name.trim().to_lowercase().as_str() {
            "chrome" | "google chrome" => Some(Browser::Chrome),
            "firefox" | "mozilla" | "mozilla firefox" => Some(Browser::Firefox),
            "safari" | "apple safari" => Some(Browser::Safari),
            "edge" | "microsoft edge" => Some(Browser::Edge),
            _ => None,
        }
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Browser::from_alias(s).ok_or_else(|| format!("Unknown browser: {}", s.trim()))
    }
}

/// One data point: `share` of the audience uses `browser` at major `version`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficRow {
    pub browser: Browser,
    pub version: u32,
    pub share: f64,
}

/// Minimal supporting major version per browser
///
/// A browser with no entry is *unknown*, which readiness treats as
/// not supported. It is never read as "supported since version 0".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompatibilityRequirement(BTreeMap<Browser, u32>);

impl CompatibilityRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required major for `browser`, if known
    pub fn get(&self, browser: Browser) -> Option<u32> {
        self.0.get(&browser).copied()
    }

    pub fn set(&mut self, browser: Browser, major: u32) {
        self.0.insert(browser, major);
    }

    /// Builder-style variant of [`set`](Self::set)
    pub fn with(mut self, browser: Browser, major: u32) -> Self {
        self.set(browser, major);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Known requirements in canonical browser order
    pub fn iter(&self) -> impl Iterator<Item = (Browser, u32)> + '_ {
        self.0.iter().map(|(b, v)| (*b, *v))
    }
}

impl FromIterator<(Browser, u32)> for CompatibilityRequirement {
    fn from_iter<I: IntoIterator<Item = (Browser, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Supported vs. missing share for one browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserBreakdown {
    pub browser: Browser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<u32>,
    pub supported_share: f64,
    pub missing_share: f64,
}

/// A browser withholding share from a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    pub browser: Browser,
    pub missing_share: f64,
}

/// Readiness of one feature against one traffic distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResult {
    pub feature_id: FeatureId,
    pub required: CompatibilityRequirement,
    /// Sum of supported shares, rounded to four decimals
    pub readiness: f64,
    pub threshold: f64,
    pub pass: bool,
    /// One entry per browser, canonical order
    pub per_browser: Vec<BrowserBreakdown>,
    /// Largest blocker first
    pub blocked_by: Vec<Blocker>,
    /// True when the traffic set was empty: every share is zero and
    /// `blocked_by` lists the browsers with a known requirement.
    #[serde(default)]
    pub no_traffic: bool,
}

impl ReadinessResult {
    /// Largest blocker, if any
    pub fn top_blocker(&self) -> Option<&Blocker> {
        self.blocked_by.first()
    }
}

/// Catalogue metadata for a tracked feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub id: FeatureId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mdn: Option<String>,
    /// Dotted keys into the compatibility dataset
    pub dataset_keys: Vec<String>,
}

/// Readiness plus catalogue metadata, as shown in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureReport {
    #[serde(flatten)]
    pub result: ReadinessResult,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mdn: Option<String>,
    /// At least one browser requirement came from the compatibility dataset
    pub dataset_backed: bool,
}

/// Features found in a single source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetection {
    pub path: PathBuf,
    pub hits: Vec<FeatureId>,
}

/// Full output of a scan, consumed by the reporters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub threshold: f64,
    /// Where the traffic came from (file path or "inline")
    pub traffic_source: String,
    /// Normalized share per browser
    pub traffic_snapshot: BTreeMap<Browser, f64>,
    pub traffic_issues: Vec<String>,
    pub files_scanned: usize,
    pub files: Vec<FileDetection>,
    /// Detected features the catalogue can gate on
    pub mapped: Vec<FeatureId>,
    /// Detected features with no compatibility mapping
    pub ignored: Vec<FeatureId>,
    pub results: Vec<FeatureReport>,
    /// Whether the gate should fail the build
    pub gated: bool,
}

impl ScanReport {
    /// Failing results, least ready first
    pub fn failing(&self) -> Vec<&FeatureReport> {
        let mut failing: Vec<&FeatureReport> =
            self.results.iter().filter(|r| !r.result.pass).collect();
        failing.sort_by(|a, b| a.result.readiness.total_cmp(&b.result.readiness));
        failing
    }

    /// Whether no usable traffic rows were supplied
    pub fn has_traffic(&self) -> bool {
        !self.traffic_snapshot.is_empty()
    }
}
