//! Scan and check commands

use crate::compat::CompatDataset;
use crate::config::{load_project_config, ProjectConfig};
use crate::detectors::walk_source_files;
use crate::models::ScanReport;
use crate::pipeline::{Pipeline, DEFAULT_THRESHOLD, DEFAULT_WORKERS};
use crate::registry::FeatureRegistry;
use crate::reporters;
use crate::traffic::{TrafficInput, TrafficSummary};
use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::EXIT_GATED;

/// Flags shared by `scan` and `check`
#[derive(Debug, Clone)]
pub struct GateOptions {
    pub traffic: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub workers: Option<usize>,
    pub format: String,
}

/// Everything resolved from flags + baseline.toml
struct GateContext {
    config: ProjectConfig,
    registry: FeatureRegistry,
    dataset: CompatDataset,
    traffic: TrafficSummary,
    traffic_source: String,
    threshold: f64,
    workers: usize,
}

impl GateContext {
    fn load(root: &Path, opts: &GateOptions) -> Result<Self> {
        let config = load_project_config(root);
        let registry = config.registry();

        let traffic_path = opts
            .traffic
            .clone()
            .or_else(|| config.traffic.as_ref().map(|p| config.resolve_path(root, p)))
            .context("No traffic file given. Pass --traffic or set `traffic` in baseline.toml")?;
        let traffic = load_traffic(&traffic_path)?;

        let dataset_path = opts
            .dataset
            .clone()
            .or_else(|| config.dataset.as_ref().map(|p| config.resolve_path(root, p)));
        let dataset = match dataset_path {
            Some(path) => CompatDataset::from_path(&path)?,
            None => {
                info!("No compatibility dataset configured; using curated fallback versions");
                CompatDataset::empty()
            }
        };

        Ok(Self {
            threshold: opts.threshold.or(config.threshold).unwrap_or(DEFAULT_THRESHOLD),
            workers: opts.workers.or(config.workers).unwrap_or(DEFAULT_WORKERS),
            traffic_source: traffic_path.display().to_string(),
            config,
            registry,
            dataset,
            traffic,
        })
    }

    fn pipeline(&self) -> Result<Pipeline<'_>> {
        Ok(Pipeline::new(&self.registry, &self.dataset)?
            .with_workers(self.workers)
            .with_threshold(self.threshold)?)
    }
}

/// Read and normalize a traffic file
fn load_traffic(path: &Path) -> Result<TrafficSummary> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read traffic file {}", path.display()))?;
    let summary = TrafficInput::from_text(&text)
        .and_then(|input| input.normalize())
        .with_context(|| format!("Invalid traffic file {}", path.display()))?;
    info!(
        "Loaded {} traffic rows from {} ({} issue(s))",
        summary.normalized.rows().len(),
        path.display(),
        summary.issues.len()
    );
    Ok(summary)
}

fn exit_code(report: &ScanReport) -> i32 {
    if report.gated {
        EXIT_GATED
    } else {
        0
    }
}

/// Run the scan command
pub fn scan(path: &Path, opts: GateOptions, output: Option<&Path>) -> Result<i32> {
    let root = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    let ctx = GateContext::load(&root, &opts)?;
    let exclude = ctx.config.scan.exclude_set()?;
    let files = walk_source_files(&root, ctx.config.scan.extension_filter(), &exclude);
    info!("Found {} source files under {}", files.len(), root.display());

    let mut report = ctx.pipeline()?.run(&files, &ctx.traffic, &ctx.traffic_source)?;
    for detection in &mut report.files {
        if let Ok(relative) = detection.path.strip_prefix(&root) {
            detection.path = relative.to_path_buf();
        }
    }

    let rendered = reporters::report(&report, &opts.format)?;
    match output {
        Some(out) => {
            std::fs::write(out, &rendered)
                .with_context(|| format!("Failed to write report to {}", out.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(out.display()).cyan()
            );
        }
        None => print!("{}", rendered),
    }

    Ok(exit_code(&report))
}

/// Run the check command: readiness for explicit feature ids, no scanning
pub fn check(path: &Path, features: &[String], opts: GateOptions) -> Result<i32> {
    let ctx = GateContext::load(path, &opts)?;
    let pipeline = ctx.pipeline()?;

    let mut ids: Vec<String> = Vec::with_capacity(features.len());
    for id in features {
        let id = id.trim().to_string();
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    let results = pipeline.evaluate(&ids, &ctx.traffic.normalized)?;

    for id in ids.iter().filter(|id| !ctx.registry.is_mapped(id)) {
        warn!("'{}' has no compatibility mapping; every browser counts as missing", id);
    }

    let no_traffic = ctx.traffic.normalized.is_empty();
    let report = ScanReport {
        threshold: pipeline.threshold(),
        traffic_source: ctx.traffic_source.clone(),
        traffic_snapshot: ctx.traffic.normalized.browser_totals(),
        traffic_issues: ctx.traffic.issues.clone(),
        files_scanned: 0,
        files: Vec::new(),
        mapped: ids,
        ignored: Vec::new(),
        gated: no_traffic || results.iter().any(|r| !r.result.pass),
        results,
    };

    print!("{}", reporters::report(&report, &opts.format)?);
    Ok(exit_code(&report))
}
