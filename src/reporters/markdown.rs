//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Generates a report suitable for pull request comments: a one-line
//! verdict, a feature table, and a collapsible per-browser breakdown for
//! every gated feature.

use super::pct;
use crate::models::{Browser, FeatureReport, ScanReport};
use anyhow::Result;

/// Render report as GitHub-flavored Markdown
pub fn render(report: &ScanReport) -> Result<String> {
    let mut md = String::from("### Baseline Readiness\n\n");

    if !report.has_traffic() {
        md.push_str(&render_no_traffic(report));
        return Ok(md);
    }

    if report.mapped.is_empty() {
        md.push_str(&render_nothing_to_gate(report));
        return Ok(md);
    }

    md.push_str("Detected features (mapped for gating):\n");
    for id in &report.mapped {
        md.push_str(&format!("- `{}`\n", id));
    }
    md.push('\n');

    if !report.ignored.is_empty() {
        md.push_str(&format!("Ignored (no compatibility mapping): {}\n\n", code_list(&report.ignored)));
    }

    md.push_str(&render_policy(report));
    md.push_str(&render_traffic_notes(report));
    md.push('\n');
    md.push_str(&render_summary(report));
    md.push_str("\n\n");
    md.push_str(&render_table(report));
    md.push('\n');

    for result in &report.results {
        md.push_str(&render_details(result));
        md.push_str("\n\n");
    }

    Ok(md.trim_end().to_string() + "\n")
}

fn code_list(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("`{}`", id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_no_traffic(report: &ScanReport) -> String {
    let mut md = format!(
        "**No valid traffic rows parsed from** `{}`.\n\n",
        report.traffic_source
    );
    md.push_str("Expected CSV headers: `browser,version,share` (shares are 0..1).  \n");
    md.push_str("Accepted browsers: `chrome, firefox, safari, edge`.\n");
    md.push_str(&render_traffic_notes(report));
    if report.gated {
        md.push_str("\n> ❌ GATED: Cannot compute readiness without valid traffic data.\n");
    }
    md
}

fn render_nothing_to_gate(report: &ScanReport) -> String {
    let mut md = String::new();
    if report.ignored.is_empty() {
        md.push_str("_No target features detected in the scanned files._\n\n");
    } else {
        md.push_str("Detected features, but none are mapped yet for gating:\n");
        for id in &report.ignored {
            md.push_str(&format!("- `{}`\n", id));
        }
        md.push('\n');
    }
    md.push_str(&render_policy(report));
    md.push_str(&render_traffic_notes(report));
    md
}

fn render_policy(report: &ScanReport) -> String {
    let snapshot = Browser::ALL
        .iter()
        .map(|b| format!("{} {}", b, pct(report.traffic_snapshot.get(b).copied())))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "**Policy threshold:** {:.0}%  \n**Traffic file:** `{}`  \n**Traffic snapshot:** {}\n",
        report.threshold * 100.0,
        report.traffic_source,
        snapshot
    )
}

fn render_traffic_notes(report: &ScanReport) -> String {
    if report.traffic_issues.is_empty() {
        return String::new();
    }
    let mut md = String::from("\n**Traffic notes:**\n");
    for issue in &report.traffic_issues {
        md.push_str(&format!("- {}\n", issue));
    }
    md
}

fn render_summary(report: &ScanReport) -> String {
    let failing = report.failing();
    let Some(worst) = failing.first() else {
        return "> ✅ All mapped features meet the policy threshold.".to_string();
    };

    let result = &worst.result;
    let mut line = format!(
        "> ❌ **GATED**: `{}` readiness {:.1}% is below policy {:.0}%",
        result.feature_id,
        result.readiness * 100.0,
        report.threshold * 100.0
    );
    if let Some(top) = result.top_blocker() {
        line.push_str(&format!(
            " (main blocker: **{}** ~{:.1}%",
            top.browser,
            top.missing_share * 100.0
        ));
        if let Some(required) = result.required.get(top.browser) {
            line.push_str(&format!(" < v{}", required));
        }
        line.push(')');
    }
    line.push('.');
    line
}

fn render_table(report: &ScanReport) -> String {
    let mut md = String::from("| Feature | Readiness | Threshold | Pass | Top blocker |\n");
    md.push_str("|---|---:|---:|:---:|---|\n");
    for r in &report.results {
        let result = &r.result;
        let blocker = match result.top_blocker() {
            Some(top) if !result.no_traffic => {
                format!("{} (~{:.1}%)", top.browser, top.missing_share * 100.0)
            }
            _ => "—".to_string(),
        };
        md.push_str(&format!(
            "| `{}` | {:.1}% | {:.0}% | {} | {} |\n",
            result.feature_id,
            result.readiness * 100.0,
            result.threshold * 100.0,
            if result.pass { "✅" } else { "❌" },
            blocker
        ));
    }
    md
}

fn render_details(report: &FeatureReport) -> String {
    let result = &report.result;
    let required = result
        .required
        .iter()
        .map(|(browser, major)| format!("{} ≥ {}", browser, major))
        .collect::<Vec<_>>()
        .join(", ");
    let required = if required.is_empty() { "n/a".to_string() } else { required };

    let mut md = String::from("<details>\n");
    md.push_str(&format!(
        "<summary><strong><code>{}</code></strong> ({}) required: {}</summary>\n\n",
        result.feature_id, report.title, required
    ));
    if let Some(mdn) = &report.mdn {
        md.push_str(&format!("[MDN]({})", mdn));
        if !report.dataset_backed {
            md.push_str(" · versions from curated fallback");
        }
        md.push_str("\n\n");
    }

    md.push_str("**Per-browser impact**\n\n");
    md.push_str("| Browser | Required | Supported | Missing |\n");
    md.push_str("|---|---:|---:|---:|\n");
    for b in &result.per_browser {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            b.browser,
            b.required.map(|v| v.to_string()).unwrap_or_else(|| "—".into()),
            pct(Some(b.supported_share)),
            pct(Some(b.missing_share))
        ));
    }
    md.push('\n');

    if result.pass {
        md.push_str("_All good for current policy. Consider raising policy later to tighten standards._\n");
    } else {
        md.push_str(&format!(
            "To pass now, set policy ≤ **{:.1}%** or add fallbacks/polyfills for the blocking browser(s).\n",
            result.readiness * 100.0
        ));
    }
    md.push_str("</details>");
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_markdown_sections() {
        let md = render(&test_report()).unwrap();
        assert!(md.starts_with("### Baseline Readiness"));
        assert!(md.contains("- `has`"));
        assert!(md.contains("Ignored (no compatibility mapping): `made-up`"));
        assert!(md.contains("**Policy threshold:** 95%"));
        assert!(md.contains("- Unknown browser: opera"));
        assert!(md.contains("| Feature | Readiness | Threshold | Pass | Top blocker |"));
        assert!(md.contains("| `has` | 100.0% | 95% | ✅ | — |"));
        assert!(md.contains("<details>"));
        assert!(md.contains("safari ≥ 17"));
    }

    #[test]
    fn test_markdown_gated_summary() {
        let md = render(&test_report()).unwrap();
        assert!(md.contains("> ❌ **GATED**: `view-transitions` readiness 77.8%"));
        assert!(md.contains("main blocker: **safari** ~22.2% < v17"));
    }

    #[test]
    fn test_markdown_all_pass() {
        let mut report = test_report();
        report.results.retain(|r| r.result.pass);
        report.gated = false;
        let md = render(&report).unwrap();
        assert!(md.contains("> ✅ All mapped features meet the policy threshold."));
    }

    #[test]
    fn test_markdown_no_traffic() {
        let mut report = test_report();
        report.traffic_snapshot.clear();
        report.gated = true;
        let md = render(&report).unwrap();
        assert!(md.contains("**No valid traffic rows parsed from** `traffic.csv`"));
        assert!(md.contains("GATED"));
        assert!(!md.contains("| Feature |"));
    }

    #[test]
    fn test_markdown_nothing_detected() {
        let mut report = test_report();
        report.mapped.clear();
        report.ignored.clear();
        report.results.clear();
        let md = render(&report).unwrap();
        assert!(md.contains("_No target features detected in the scanned files._"));
    }
}
