//! Readiness pipeline
//!
//! Orchestrates a full scan:
//! 1. Detect features in each source file (parallel, one set per file)
//! 2. Merge the per-file sets by union
//! 3. Split detected ids into gateable (mapped) and ignored
//! 4. Resolve each mapped feature's requirement and score it against
//!    the normalized traffic (parallel, input order kept)
//!
//! Reading files and loading the dataset happen here, at the boundary.
//! The stages themselves never fail; only caller-contract violations
//! (no features, bad threshold) are errors.

use crate::compat::{CompatDataset, CompatResolver};
use crate::detectors::{ContentKind, DetectorError, DetectorSet, FeatureSet};
use crate::models::{FeatureId, FeatureReport, FileDetection, ScanReport};
use crate::readiness::compute_readiness;
use crate::registry::FeatureRegistry;
use crate::traffic::{NormalizedTraffic, TrafficSummary};
use rayon::prelude::*;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default pass threshold
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Default worker count for detection and evaluation
pub const DEFAULT_WORKERS: usize = 8;

/// Upper bound on the worker pool, wherever the count comes from
pub const MAX_WORKERS: usize = 64;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("At least one feature id is required")]
    NoFeatures,

    #[error("Threshold must be a number between 0 and 1, got {0}")]
    InvalidThreshold(f64),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Detector(#[from] DetectorError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Reject thresholds outside [0, 1]
pub fn validate_threshold(threshold: f64) -> PipelineResult<f64> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(PipelineError::InvalidThreshold(threshold))
    }
}

/// Union of per-file hits
pub fn merge(detections: &[FileDetection]) -> FeatureSet {
    detections
        .iter()
        .flat_map(|d| d.hits.iter().cloned())
        .collect()
}

/// Split detected ids into (mapped, ignored), both sorted
pub fn partition(detected: &FeatureSet, registry: &FeatureRegistry) -> (Vec<FeatureId>, Vec<FeatureId>) {
    detected
        .iter()
        .cloned()
        .partition(|id| registry.is_mapped(id))
}

/// Full scan pipeline
pub struct Pipeline<'a> {
    registry: &'a FeatureRegistry,
    dataset: &'a CompatDataset,
    detectors: DetectorSet,
    workers: usize,
    threshold: f64,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over a registry and dataset
    pub fn new(registry: &'a FeatureRegistry, dataset: &'a CompatDataset) -> PipelineResult<Self> {
        Ok(Self {
            registry,
            dataset,
            detectors: DetectorSet::new(registry)?,
            workers: DEFAULT_WORKERS,
            threshold: DEFAULT_THRESHOLD,
        })
    }

    /// Set the number of parallel workers, clamped to 1..=MAX_WORKERS
    pub fn with_workers(mut self, workers: usize) -> Self {
        let clamped = workers.clamp(1, MAX_WORKERS);
        if clamped != workers {
            warn!("Worker count {} out of range; using {}", workers, clamped);
        }
        self.workers = clamped;
        self
    }

    /// Set the pass threshold
    pub fn with_threshold(mut self, threshold: f64) -> PipelineResult<Self> {
        self.threshold = validate_threshold(threshold)?;
        Ok(self)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn pool(&self) -> PipelineResult<rayon::ThreadPool> {
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?)
    }

    /// Detect features in one file's content. Files of unknown kind
    /// yield an empty set.
    pub fn detect_source(&self, path: &std::path::Path, content: &str) -> FeatureSet {
        match ContentKind::for_path(path) {
            Some(kind) => self.detectors.detect(kind, content),
            None => FeatureSet::new(),
        }
    }

    /// Read and scan files in parallel. Unreadable files are skipped.
    ///
    /// Only files with at least one hit are returned, sorted by path.
    pub fn scan_files(&self, paths: &[PathBuf]) -> PipelineResult<Vec<FileDetection>> {
        let pool = self.pool()?;
        let mut detections: Vec<FileDetection> = pool.install(|| {
            paths
                .par_iter()
                .filter_map(|path| {
                    let content = match std::fs::read_to_string(path) {
                        Ok(content) => content,
                        Err(e) => {
                            warn!("Skipping {}: {}", path.display(), e);
                            return None;
                        }
                    };
                    let hits = self.detect_source(path, &content);
                    if hits.is_empty() {
                        return None;
                    }
                    debug!("{}: {:?}", path.display(), hits);
                    Some(FileDetection {
                        path: path.clone(),
                        hits: hits.into_iter().collect(),
                    })
                })
                .collect()
        });
        detections.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(detections)
    }

    /// Resolve and score each feature against the traffic.
    ///
    /// Results keep the order of `features`.
    pub fn evaluate(
        &self,
        features: &[FeatureId],
        traffic: &NormalizedTraffic,
    ) -> PipelineResult<Vec<FeatureReport>> {
        if features.is_empty() {
            return Err(PipelineError::NoFeatures);
        }
        let resolver = CompatResolver::new(self.dataset, self.registry);
        let pool = self.pool()?;
        let reports: Vec<FeatureReport> = pool.install(|| {
            features
                .par_iter()
                .map(|id| self.evaluate_one(&resolver, id, traffic))
                .collect()
        });
        Ok(reports)
    }

    fn evaluate_one(
        &self,
        resolver: &CompatResolver<'_>,
        feature_id: &str,
        traffic: &NormalizedTraffic,
    ) -> FeatureReport {
        let required = resolver.resolve(feature_id);
        let result = compute_readiness(feature_id, &required, traffic, self.threshold);
        let descriptor = self.registry.descriptor(feature_id);
        FeatureReport {
            result,
            title: descriptor
                .map(|d| d.title.clone())
                .unwrap_or_else(|| feature_id.to_string()),
            mdn: descriptor.and_then(|d| d.mdn.clone()),
            dataset_backed: resolver.is_dataset_backed(feature_id),
        }
    }

    /// Scan files and gate every mapped feature found
    pub fn run(
        &self,
        paths: &[PathBuf],
        traffic: &TrafficSummary,
        traffic_source: &str,
    ) -> PipelineResult<ScanReport> {
        let files = self.scan_files(paths)?;
        let detected = merge(&files);
        let (mapped, ignored) = partition(&detected, self.registry);

        info!(
            "Scanned {} files: {} features detected ({} mapped, {} ignored)",
            paths.len(),
            detected.len(),
            mapped.len(),
            ignored.len()
        );
        if !ignored.is_empty() {
            debug!("Ignored (no compatibility mapping): {:?}", ignored);
        }

        let results = if mapped.is_empty() {
            Vec::new()
        } else {
            self.evaluate(&mapped, &traffic.normalized)?
        };

        let no_traffic = traffic.normalized.is_empty();
        if no_traffic {
            warn!("No valid traffic rows; gate fails until traffic is provided");
        }
        let gated = no_traffic || results.iter().any(|r| !r.result.pass);

        Ok(ScanReport {
            threshold: self.threshold,
            traffic_source: traffic_source.to_string(),
            traffic_snapshot: traffic.normalized.browser_totals(),
            traffic_issues: traffic.issues.clone(),
            files_scanned: paths.len(),
            files,
            mapped,
            ignored,
            results,
            gated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Browser;
    use crate::traffic::{normalize, RawTrafficRecord};

    fn summary(rows: &[(&str, &str, &str)]) -> TrafficSummary {
        let records: Vec<RawTrafficRecord> = rows
            .iter()
            .map(|(b, v, s)| RawTrafficRecord::new(*b, *v, *s))
            .collect();
        normalize(&records)
    }

    fn pipeline<'a>(dataset: &'a CompatDataset) -> Pipeline<'a> {
        Pipeline::new(FeatureRegistry::builtin(), dataset)
            .unwrap()
            .with_workers(2)
    }

    #[test]
    fn test_threshold_validation() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(matches!(validate_threshold(1.5), Err(PipelineError::InvalidThreshold(_))));
        assert!(validate_threshold(f64::NAN).is_err());
        assert!(validate_threshold(-0.1).is_err());
    }

    #[test]
    fn test_evaluate_requires_features() {
        let dataset = CompatDataset::empty();
        let traffic = summary(&[("chrome", "124", "1")]);
        let err = pipeline(&dataset).evaluate(&[], &traffic.normalized).unwrap_err();
        assert!(matches!(err, PipelineError::NoFeatures));
    }

    #[test]
    fn test_evaluate_keeps_input_order() {
        let dataset = CompatDataset::empty();
        let traffic = summary(&[("chrome", "124", "0.5"), ("safari", "16", "0.5")]);
        let features: Vec<FeatureId> = vec!["view-transitions".into(), "has".into(), "unknown".into()];
        let reports = pipeline(&dataset).evaluate(&features, &traffic.normalized).unwrap();

        let ids: Vec<&str> = reports.iter().map(|r| r.result.feature_id.as_str()).collect();
        assert_eq!(ids, vec!["view-transitions", "has", "unknown"]);

        // has: chrome 105 ok, safari 15 ok
        assert_eq!(reports[1].result.readiness, 1.0);
        assert_eq!(reports[1].title, ":has() pseudo-class");
        // view-transitions: safari needs 17
        assert_eq!(reports[0].result.readiness, 0.5);
        assert_eq!(reports[0].result.blocked_by[0].browser, Browser::Safari);
        // unknown feature: everything missing, no metadata
        assert_eq!(reports[2].result.readiness, 0.0);
        assert_eq!(reports[2].title, "unknown");
        assert!(!reports[2].dataset_backed);
    }

    #[test]
    fn test_partition() {
        let detected: FeatureSet = ["has", "made-up", "color-mix"].iter().map(|s| s.to_string()).collect();
        let (mapped, ignored) = partition(&detected, FeatureRegistry::builtin());
        assert_eq!(mapped, vec!["color-mix", "has"]);
        assert_eq!(ignored, vec!["made-up"]);
    }

    #[test]
    fn test_run_scans_and_gates() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("site.css");
        let js = dir.path().join("app.js");
        let broken = dir.path().join("broken.ts");
        let other = dir.path().join("notes.txt");
        std::fs::write(&css, ".a:has(b) { color: red; }").unwrap();
        std::fs::write(&js, "const s = AbortSignal.timeout(5);").unwrap();
        std::fs::write(&broken, "const x = ':has(a)'; AbortSignal.timeout(((").unwrap();
        std::fs::write(&other, "document.startViewTransition()").unwrap();
        let missing = dir.path().join("missing.css");

        let dataset = CompatDataset::empty();
        let traffic = summary(&[("chrome", "124", "0.8"), ("firefox", "119", "0.2")]);
        let paths = vec![css.clone(), js.clone(), broken, other, missing];
        let report = pipeline(&dataset).run(&paths, &traffic, "inline").unwrap();

        assert_eq!(report.files_scanned, 5);
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.mapped, vec!["abortsignal-timeout", "has"]);
        assert!(report.ignored.is_empty());

        // abortsignal-timeout: chrome 115 ok, firefox 120 missing
        let timeout = &report.results[0].result;
        assert_eq!(timeout.readiness, 0.8);
        assert!(!timeout.pass);
        assert!(report.gated);
        assert_eq!(report.failing().len(), 2);
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let dataset = CompatDataset::empty();
        assert_eq!(pipeline(&dataset).with_workers(100_000).workers, MAX_WORKERS);
        assert_eq!(pipeline(&dataset).with_workers(0).workers, 1);
        assert_eq!(pipeline(&dataset).with_workers(4).workers, 4);
    }

    #[test]
    fn test_run_with_traffic_but_no_detections_is_not_gated() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("plain.css");
        std::fs::write(&css, "body { margin: 0; }").unwrap();

        let dataset = CompatDataset::empty();
        let traffic = summary(&[("chrome", "124", "1")]);
        let report = pipeline(&dataset).run(&[css], &traffic, "inline").unwrap();
        assert!(report.results.is_empty());
        assert!(!report.gated);
    }

    #[test]
    fn test_run_without_traffic_is_gated() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("a.css");
        std::fs::write(&css, ".a:has(b) {}").unwrap();

        let dataset = CompatDataset::empty();
        let traffic = summary(&[("chrome", "124", "0")]);
        let report = pipeline(&dataset)
            .with_threshold(0.0)
            .unwrap()
            .run(&[css], &traffic, "inline")
            .unwrap();
        assert!(report.results[0].result.no_traffic);
        assert!(report.gated);
        assert!(!report.has_traffic());
    }

    #[test]
    fn test_run_without_traffic_or_detections_is_gated() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("plain.css");
        std::fs::write(&css, "body { margin: 0; }").unwrap();

        let dataset = CompatDataset::empty();
        let traffic = summary(&[("chrome", "124", "0")]);
        let report = pipeline(&dataset).run(&[css], &traffic, "inline").unwrap();
        assert!(report.mapped.is_empty());
        assert!(report.results.is_empty());
        assert!(!report.has_traffic());
        assert!(report.gated);
    }
}
