//! Readiness calculator
//!
//! Scores a feature's compatibility requirement against a normalized
//! traffic distribution.
//!
//! # Formula
//!
//! ```text
//! row supported  <=>  required(browser) is known  AND  row.version >= required
//! readiness       =   round4( Σ supported shares )
//! pass            <=>  readiness >= threshold
//! ```
//!
//! Unknown requirements count as missing. Blockers are browsers with a
//! non-zero missing share, largest first, ties in canonical browser order.
//!
//! With an empty traffic set every share is zero; the result is flagged
//! `no_traffic` and `blocked_by` lists each browser that has a known
//! requirement (at missing share 0), so "no data" is distinguishable from
//! "fully blocked".

use crate::models::{Blocker, Browser, BrowserBreakdown, CompatibilityRequirement, ReadinessResult};
use crate::traffic::NormalizedTraffic;

/// Round to four decimal places
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn slot(browser: Browser) -> usize {
    match browser {
        Browser::Chrome => 0,
        Browser::Firefox => 1,
        Browser::Safari => 2,
        Browser::Edge => 3,
    }
}

/// Compute readiness for one feature. Pure; safe to call concurrently.
pub fn compute_readiness(
    feature_id: &str,
    required: &CompatibilityRequirement,
    traffic: &NormalizedTraffic,
    threshold: f64,
) -> ReadinessResult {
    let mut supported = [0.0f64; 4];
    let mut missing = [0.0f64; 4];

    for row in traffic.rows() {
        let ok = required
            .get(row.browser)
            .is_some_and(|min| row.version >= min);
        if ok {
            supported[slot(row.browser)] += row.share;
        } else {
            missing[slot(row.browser)] += row.share;
        }
    }

    let readiness = round4(supported.iter().sum());

    let per_browser: Vec<BrowserBreakdown> = Browser::ALL
        .iter()
        .map(|&browser| BrowserBreakdown {
            browser,
            required: required.get(browser),
            supported_share: supported[slot(browser)],
            missing_share: missing[slot(browser)],
        })
        .collect();

    let no_traffic = traffic.is_empty();
    let mut blocked_by: Vec<Blocker> = per_browser
        .iter()
        .filter(|b| {
            if no_traffic {
                b.required.is_some()
            } else {
                b.missing_share > 0.0
            }
        })
        .map(|b| Blocker {
            browser: b.browser,
            missing_share: b.missing_share,
        })
        .collect();
    // stable sort: equal shares keep canonical order
    blocked_by.sort_by(|a, b| b.missing_share.total_cmp(&a.missing_share));

    ReadinessResult {
        feature_id: feature_id.to_string(),
        required: required.clone(),
        readiness,
        threshold,
        pass: readiness >= threshold,
        per_browser,
        blocked_by,
        no_traffic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::{normalize, RawTrafficRecord};

    fn traffic(rows: &[(&str, u32, f64)]) -> NormalizedTraffic {
        let records: Vec<RawTrafficRecord> = rows
            .iter()
            .map(|(b, v, s)| RawTrafficRecord::new(*b, v.to_string(), s.to_string()))
            .collect();
        normalize(&records).normalized
    }

    fn req(chrome: u32, firefox: u32, safari: u32) -> CompatibilityRequirement {
        CompatibilityRequirement::new()
            .with(Browser::Chrome, chrome)
            .with(Browser::Firefox, firefox)
            .with(Browser::Safari, safari)
    }

    fn sample() -> NormalizedTraffic {
        traffic(&[("chrome", 124, 0.50), ("firefox", 125, 0.30), ("safari", 17, 0.20)])
    }

    #[test]
    fn test_all_rows_supported() {
        let result = compute_readiness("has", &req(105, 121, 16), &sample(), 0.95);
        assert_eq!(result.readiness, 1.0);
        assert!(result.pass);
        assert!(result.blocked_by.is_empty());
        assert!(!result.no_traffic);
    }

    #[test]
    fn test_firefox_blocks() {
        let result = compute_readiness("has", &req(105, 126, 16), &sample(), 0.95);
        assert_eq!(result.readiness, 0.7);
        assert!(!result.pass);
        assert_eq!(result.blocked_by.len(), 1);
        assert_eq!(result.blocked_by[0].browser, Browser::Firefox);
        assert!((result.blocked_by[0].missing_share - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_requirement_counts_as_missing() {
        let required = CompatibilityRequirement::new().with(Browser::Chrome, 105);
        let t = traffic(&[("chrome", 124, 0.6), ("edge", 124, 0.4)]);
        let result = compute_readiness("x", &required, &t, 0.5);
        assert_eq!(result.readiness, 0.6);
        assert_eq!(result.blocked_by, vec![Blocker { browser: Browser::Edge, missing_share: 0.4 }]);
        let edge = &result.per_browser[3];
        assert_eq!(edge.required, None);
    }

    #[test]
    fn test_blockers_sorted_with_canonical_tie_break() {
        let required = req(200, 200, 200).with(Browser::Edge, 200);
        let t = traffic(&[
            ("edge", 100, 0.25),
            ("safari", 16, 0.25),
            ("chrome", 120, 0.10),
            ("firefox", 120, 0.40),
        ]);
        let result = compute_readiness("x", &required, &t, 0.5);
        let order: Vec<Browser> = result.blocked_by.iter().map(|b| b.browser).collect();
        assert_eq!(
            order,
            vec![Browser::Firefox, Browser::Safari, Browser::Edge, Browser::Chrome]
        );
        assert_eq!(result.readiness, 0.0);
    }

    #[test]
    fn test_per_browser_breakdown_is_canonical() {
        let result = compute_readiness("has", &req(105, 126, 16), &sample(), 0.95);
        let browsers: Vec<Browser> = result.per_browser.iter().map(|b| b.browser).collect();
        assert_eq!(browsers, Browser::ALL.to_vec());
        let chrome = &result.per_browser[0];
        assert_eq!(chrome.required, Some(105));
        assert!((chrome.supported_share - 0.5).abs() < 1e-9);
        assert_eq!(chrome.missing_share, 0.0);
    }

    #[test]
    fn test_empty_traffic_is_no_data() {
        let result = compute_readiness("has", &req(105, 121, 16), &NormalizedTraffic::default(), 0.95);
        assert_eq!(result.readiness, 0.0);
        assert!(!result.pass);
        assert!(result.no_traffic);
        let blocked: Vec<Browser> = result.blocked_by.iter().map(|b| b.browser).collect();
        assert_eq!(blocked, vec![Browser::Chrome, Browser::Firefox, Browser::Safari]);
        assert!(result.blocked_by.iter().all(|b| b.missing_share == 0.0));
    }

    #[test]
    fn test_rounding_to_four_decimals() {
        let t = traffic(&[("chrome", 124, 1.0), ("firefox", 1, 2.0)]);
        let required = req(100, 100, 100);
        let result = compute_readiness("x", &required, &t, 0.0);
        assert_eq!(result.readiness, 0.3333);
        assert!(result.pass);
    }
}
