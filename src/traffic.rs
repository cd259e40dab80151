//! Traffic normalizer
//!
//! Turns raw `(browser, version, share)` records into a validated,
//! deduplicated distribution that sums to 1.0, plus a list of
//! data-quality issues. Bad rows are dropped and reported; nothing here
//! aborts normalization.
//!
//! Raw records arrive either as CSV text (`browser,version,share`) or as a
//! JSON array of objects whose `version`/`share` may be numbers or strings.

use crate::models::{Browser, TrafficRow};
use csv::{ReaderBuilder, Trim};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Pre-normalization totals further than this from 1.0 get an issue
const SUM_TOLERANCE: f64 = 0.02;

const REQUIRED_COLUMNS: [&str; 3] = ["browser", "version", "share"];

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("Traffic CSV is missing the '{0}' column (expected header: browser,version,share)")]
    MissingColumn(&'static str),

    #[error("Traffic CSV is empty")]
    Empty,

    #[error("Invalid traffic CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid traffic JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One unvalidated record, fields kept as the text the caller gave
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawTrafficRecord {
    #[serde(default, deserialize_with = "text_like")]
    pub browser: String,
    #[serde(default, deserialize_with = "text_like")]
    pub version: String,
    #[serde(default, deserialize_with = "text_like")]
    pub share: String,
}

impl RawTrafficRecord {
    pub fn new(browser: impl Into<String>, version: impl Into<String>, share: impl Into<String>) -> Self {
        Self {
            browser: browser.into(),
            version: version.into(),
            share: share.into(),
        }
    }
}

/// Accept strings, numbers, or null and keep them as text
fn text_like<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// The two forms traffic can be supplied in
#[derive(Debug, Clone)]
pub enum TrafficInput {
    Csv(String),
    Rows(Vec<RawTrafficRecord>),
}

impl TrafficInput {
    /// Guess the form from content: a leading `[` means a JSON array
    pub fn from_text(text: &str) -> Result<Self, TrafficError> {
        if text.trim_start().starts_with('[') {
            Ok(TrafficInput::Rows(serde_json::from_str(text)?))
        } else {
            Ok(TrafficInput::Csv(text.to_string()))
        }
    }

    /// Parse (if needed) and normalize
    pub fn normalize(&self) -> Result<TrafficSummary, TrafficError> {
        match self {
            TrafficInput::Csv(csv) => {
                let (records, warnings) = parse_csv(csv)?;
                let mut summary = normalize(&records);
                if warnings > 0 {
                    summary
                        .issues
                        .insert(0, format!("CSV parse: {} warning(s).", warnings));
                }
                Ok(summary)
            }
            TrafficInput::Rows(records) => Ok(normalize(records)),
        }
    }
}

/// Validated, deduplicated rows summing to 1.0 (or empty)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedTraffic {
    rows: Vec<TrafficRow>,
}

impl NormalizedTraffic {
    pub fn rows(&self) -> &[TrafficRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.share).sum()
    }

    /// Total share per browser; browsers without rows are absent
    pub fn browser_totals(&self) -> BTreeMap<Browser, f64> {
        let mut totals = BTreeMap::new();
        for row in &self.rows {
            *totals.entry(row.browser).or_insert(0.0) += row.share;
        }
        totals
    }
}

/// Everything the normalizer produced for one input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficSummary {
    /// Aggregated rows before normalization
    pub rows: Vec<TrafficRow>,
    /// Sum of `rows` shares
    pub original_sum: f64,
    pub normalized: NormalizedTraffic,
    pub issues: Vec<String>,
}

/// Parse CSV text with a `browser,version,share` header.
///
/// Header names are matched case-insensitively in any column order, quoted
/// fields may contain commas, and a leading UTF-8 BOM is ignored. Returns
/// the records and the number of rows whose field count did not match the
/// header.
pub fn parse_csv(text: &str) -> Result<(Vec<RawTrafficRecord>, usize), TrafficError> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(TrafficError::Empty);
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|c| c.to_lowercase())
        .collect();

    let mut index = [0usize; 3];
    for (slot, name) in index.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = columns
            .iter()
            .position(|c| c == name)
            .ok_or(TrafficError::MissingColumn(name))?;
    }

    let mut records = Vec::new();
    let mut warnings = 0;
    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        if row.len() != columns.len() {
            warnings += 1;
        }
        let field = |i: usize| row.get(i).unwrap_or_default().to_string();
        records.push(RawTrafficRecord {
            browser: field(index[0]),
            version: field(index[1]),
            share: field(index[2]),
        });
    }

    Ok((records, warnings))
}

/// Validate, aggregate and normalize raw records
pub fn normalize(records: &[RawTrafficRecord]) -> TrafficSummary {
    let mut issues = Vec::new();
    let mut aggregated: IndexMap<(Browser, u32), f64> = IndexMap::new();

    for rec in records {
        let name = rec.browser.trim();
        let Some(browser) = Browser::from_alias(name) else {
            issues.push(format!("Unknown browser: {}", name));
            continue;
        };

        let version = parse_number(&rec.version).map(f64::floor);
        let version = match version {
            Some(v) if v.is_finite() && v >= 0.0 && v <= u32::MAX as f64 => v as u32,
            _ => {
                issues.push(format!("Bad version for {}: \"{}\"", name, rec.version.trim()));
                continue;
            }
        };

        let share = match parse_number(&rec.share) {
            Some(s) if s.is_finite() && s >= 0.0 => s,
            _ => {
                issues.push(format!(
                    "Bad share for {} {}: \"{}\"",
                    name,
                    version,
                    rec.share.trim()
                ));
                continue;
            }
        };

        *aggregated.entry((browser, version)).or_insert(0.0) += share;
    }

    let rows: Vec<TrafficRow> = aggregated
        .into_iter()
        .map(|((browser, version), share)| TrafficRow { browser, version, share })
        .collect();

    let original_sum: f64 = rows.iter().map(|r| r.share).sum();
    let normalized = if original_sum > 0.0 {
        rows.iter()
            .map(|r| TrafficRow {
                share: r.share / original_sum,
                ..*r
            })
            .collect()
    } else {
        Vec::new()
    };

    if (original_sum - 1.0).abs() > SUM_TOLERANCE {
        issues.push(format!(
            "Shares sum to {:.3}; normalized to 1.000.",
            original_sum
        ));
    }

    TrafficSummary {
        rows,
        original_sum,
        normalized: NormalizedTraffic { rows: normalized },
        issues,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn raw_record() -> impl Strategy<Value = RawTrafficRecord> {
        (
            prop::sample::select(vec!["chrome", "firefox", "safari", "edge", "opera"]),
            0u32..200,
            0.0f64..100.0,
        )
            .prop_map(|(b, v, s)| RawTrafficRecord::new(b, v.to_string(), s.to_string()))
    }

    proptest! {
        #[test]
        fn prop_normalized_sums_to_one_or_is_empty(records in prop::collection::vec(raw_record(), 0..40)) {
            let summary = normalize(&records);
            let traffic = &summary.normalized;
            prop_assert!(traffic.is_empty() || (traffic.total() - 1.0).abs() < 1e-6);
        }

        #[test]
        fn prop_aggregation_keys_are_unique(records in prop::collection::vec(raw_record(), 0..40)) {
            let summary = normalize(&records);
            let mut keys: Vec<_> = summary.normalized.rows().iter().map(|r| (r.browser, r.version)).collect();
            let before = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(before, keys.len());
        }
    }
}
