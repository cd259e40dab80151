//! Text (terminal) reporter with colors and formatting

use super::pct;
use crate::models::{Browser, FeatureReport, ScanReport};
use anyhow::Result;
use console::style;

/// Render report as formatted terminal output
pub fn render(report: &ScanReport) -> Result<String> {
    let mut out = String::new();

    // Header
    out.push_str(&format!("\n{}\n", style("Baseline Readiness").bold()));
    out.push_str(&format!(
        "{}\n",
        style("──────────────────────────────────────").dim()
    ));
    out.push_str(&format!(
        "Threshold: {}  Files: {}  Traffic: {}\n",
        style(format!("{:.0}%", report.threshold * 100.0)).bold(),
        report.files_scanned,
        report.traffic_source
    ));

    let snapshot = Browser::ALL
        .iter()
        .map(|b| format!("{} {}", b, pct(report.traffic_snapshot.get(b).copied())))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(&format!("{} {}\n", style("Snapshot:").dim(), snapshot));

    if !report.traffic_issues.is_empty() {
        out.push_str(&format!("\n{}\n", style("TRAFFIC NOTES").bold()));
        for issue in &report.traffic_issues {
            out.push_str(&format!("  {} {}\n", style("!").yellow(), issue));
        }
    }

    if !report.ignored.is_empty() {
        out.push_str(&format!(
            "\n{} {}\n",
            style("Ignored (no mapping):").dim(),
            report.ignored.join(", ")
        ));
    }

    out.push('\n');
    if !report.has_traffic() {
        out.push_str(&format!(
            "{} no valid traffic rows; readiness cannot be computed\n",
            style("✗").red().bold()
        ));
    }

    if report.results.is_empty() {
        if report.gated {
            out.push_str(&format!(
                "{} GATED: no mapped features detected, but traffic is required\n",
                style("✗").red().bold()
            ));
        } else {
            out.push_str(&format!(
                "{} No mapped features detected\n",
                style("✓").green()
            ));
        }
        return Ok(out);
    }

    out.push_str(&format!("{}\n", style("FEATURES").bold()));
    for r in &report.results {
        out.push_str(&render_feature(r));
    }

    out.push('\n');
    let failing = report.failing();
    if failing.is_empty() {
        out.push_str(&format!(
            "{} All mapped features meet the policy threshold\n",
            style("✓").green().bold()
        ));
    } else {
        out.push_str(&format!(
            "{} GATED: {} of {} feature(s) below {:.0}%\n",
            style("✗").red().bold(),
            failing.len(),
            report.results.len(),
            report.threshold * 100.0
        ));
    }

    Ok(out)
}

fn render_feature(report: &FeatureReport) -> String {
    let result = &report.result;
    let mark = if result.pass {
        style("✓").green().to_string()
    } else {
        style("✗").red().to_string()
    };

    let mut line = format!(
        "  {} {:<22} {:>6.1}%",
        mark,
        result.feature_id,
        result.readiness * 100.0
    );

    if !result.pass {
        if let Some(top) = result.top_blocker() {
            line.push_str(&format!(
                "  {} {}",
                style("blocked by").dim(),
                top.browser
            ));
            if !result.no_traffic {
                line.push_str(&format!(" ~{:.1}%", top.missing_share * 100.0));
            }
            if let Some(required) = result.required.get(top.browser) {
                line.push_str(&format!(" (needs {}+)", required));
            }
        }
    }
    line.push('\n');
    line
}
