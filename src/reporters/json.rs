//! JSON reporter
//!
//! Outputs the full ScanReport as pretty-printed JSON.
//! Useful for machine consumption, piping to jq, or further processing.

use crate::models::ScanReport;
use anyhow::Result;

/// Render report as JSON
pub fn render(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_json_render_valid() {
        let report = test_report();
        let json_str = render(&report).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["gated"], true);
        let results = parsed["results"].as_array().expect("results array");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["featureId"], "has");
        assert_eq!(results[0]["pass"], true);
        assert_eq!(results[1]["blockedBy"][0]["browser"], "safari");
        assert_eq!(results[1]["required"]["safari"], 17);
        assert_eq!(results[1]["datasetBacked"], false);
    }

    #[test]
    fn test_json_round_trips_into_report() {
        let report = test_report();
        let json_str = render(&report).expect("render JSON");
        let back: ScanReport = serde_json::from_str(&json_str).expect("parse report");
        assert_eq!(back, report);
    }
}
