//! Statistical profiling of sampled rows.
//!
//! Computes per-table and per-column statistics over a bounded row
//! sample, plus a best-effort PII tag per column.
//!
//! Column statistics are a tagged variant: numeric columns (at least one
//! non-null value, every non-null value a JSON number) carry a
//! [`NumericSummary`]; every other column carries none. A statistic that
//! cannot be computed for a column's values is recorded as absent and
//! never aborts profiling of the rest of the table.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{PiiRisk, Row};

/// Column-name fragments that mark a column as high PII risk.
pub const PII_NAME_HINTS: &[&str] = &[
    "email", "phone", "mobile", "dob", "ssn", "passport", "pan", "aadhar", "address",
];

/// Number of non-null values inspected by the content check.
const PII_CONTENT_SAMPLE: usize = 50;

/// Number of most frequent values kept per column.
const TOP_VALUES: usize = 3;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+").expect("email pattern is valid"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    pub row_sampled: u64,
    /// Unweighted mean of the column null percentages; absent for an
    /// empty sample.
    #[serde(default)]
    pub avg_null_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopValue {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueStats {
    Numeric(NumericSummary),
    NonNumeric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub null_pct: f64,
    pub distinct_count: Option<u64>,
    pub top_values: Vec<TopValue>,
    #[serde(flatten)]
    pub stats: ValueStats,
}

impl ColumnProfile {
    pub fn numeric(&self) -> Option<&NumericSummary> {
        match &self.stats {
            ValueStats::Numeric(n) => Some(n),
            ValueStats::NonNumeric => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub profile: ColumnProfile,
    pub pii_risk: Option<PiiRisk>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleProfile {
    pub table: TableProfile,
    pub columns: Vec<ColumnSummary>,
}

/// Profile a row sample.
///
/// Columns are taken in first-seen order across the rows; a key missing
/// from a row counts as null for that row.
pub fn profile_sample(rows: &[Row]) -> SampleProfile {
    let row_sampled = rows.len() as u64;
    if rows.is_empty() {
        return SampleProfile {
            table: TableProfile {
                row_sampled,
                avg_null_pct: None,
            },
            columns: Vec::new(),
        };
    }

    let columns = column_names(rows);
    let mut summaries = Vec::with_capacity(columns.len());
    for name in &columns {
        let values: Vec<&Value> = rows
            .iter()
            .map(|r| r.get(name.as_str()).unwrap_or(&Value::Null))
            .collect();
        summaries.push(ColumnSummary {
            name: name.clone(),
            profile: profile_column(&values),
            pii_risk: detect_pii_risk(name, &values),
        });
    }

    let avg_null_pct = if summaries.is_empty() {
        None
    } else {
        let total: f64 = summaries.iter().map(|s| s.profile.null_pct).sum();
        Some(round2(total / summaries.len() as f64))
    };

    SampleProfile {
        table: TableProfile {
            row_sampled,
            avg_null_pct,
        },
        columns: summaries,
    }
}

/// Profile one column's values (nulls included).
pub fn profile_column(values: &[&Value]) -> ColumnProfile {
    let total = values.len();
    let non_null: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();
    let nulls = total - non_null.len();
    let null_pct = if total == 0 {
        0.0
    } else {
        round2(nulls as f64 / total as f64 * 100.0)
    };

    let stats = match numeric_values(&non_null) {
        Some(nums) => ValueStats::Numeric(summarize(nums)),
        None => ValueStats::NonNumeric,
    };

    ColumnProfile {
        null_pct,
        distinct_count: distinct_count(&non_null),
        top_values: top_values(&non_null),
        stats,
    }
}

/// Tag a column `high` by name or email-shaped content, `low` when any
/// non-null value was sampled, otherwise untagged.
pub fn detect_pii_risk(column_name: &str, values: &[&Value]) -> Option<PiiRisk> {
    let lowered = column_name.to_lowercase();
    if PII_NAME_HINTS.iter().any(|hint| lowered.contains(hint)) {
        return Some(PiiRisk::High);
    }

    let sample: Vec<String> = values
        .iter()
        .filter(|v| !v.is_null())
        .take(PII_CONTENT_SAMPLE)
        .map(|v| coerce_to_string(v))
        .collect();

    if sample.iter().any(|s| EMAIL_RE.is_match(s)) {
        Some(PiiRisk::High)
    } else if !sample.is_empty() {
        Some(PiiRisk::Low)
    } else {
        None
    }
}

/// String form used for top values and PII matching.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Linear-interpolation percentile over an ascending slice.
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn column_names(rows: &[Row]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
    }
    names
}

fn numeric_values(non_null: &[&Value]) -> Option<Vec<f64>> {
    if non_null.is_empty() {
        return None;
    }
    non_null.iter().map(|v| v.as_f64()).collect()
}

fn summarize(mut nums: Vec<f64>) -> NumericSummary {
    nums.sort_by(|a, b| a.total_cmp(b));
    let n = nums.len() as f64;
    let mean = nums.iter().sum::<f64>() / n;
    NumericSummary {
        min: nums[0],
        max: nums[nums.len() - 1],
        mean,
        p50: percentile(&nums, 50.0).unwrap_or(mean),
        p95: percentile(&nums, 95.0).unwrap_or(mean),
    }
}

#[derive(Hash, PartialEq, Eq)]
enum DistinctKey<'a> {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(u64),
    Str(&'a str),
}

/// Arrays and objects have no stable identity, so their presence makes
/// the count unavailable.
fn distinct_count(non_null: &[&Value]) -> Option<u64> {
    let mut keys: HashSet<DistinctKey<'_>> = HashSet::new();
    for v in non_null {
        let key = match v {
            Value::Bool(b) => DistinctKey::Bool(*b),
            Value::String(s) => DistinctKey::Str(s.as_str()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DistinctKey::Int(i)
                } else if let Some(u) = n.as_u64() {
                    DistinctKey::UInt(u)
                } else {
                    let f = n.as_f64()?;
                    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                        DistinctKey::Int(f as i64)
                    } else {
                        DistinctKey::Float(f.to_bits())
                    }
                }
            }
            Value::Array(_) | Value::Object(_) | Value::Null => return None,
        };
        keys.insert(key);
    }
    Some(keys.len() as u64)
}

/// Most frequent string-coerced values; ties keep first-seen order.
fn top_values(non_null: &[&Value]) -> Vec<TopValue> {
    let mut order: Vec<(String, u64)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for v in non_null {
        let s = coerce_to_string(v);
        match positions.get(&s) {
            Some(&i) => order[i].1 += 1,
            None => {
                positions.insert(s.clone(), order.len());
                order.push((s, 1));
            }
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
        .into_iter()
        .take(TOP_VALUES)
        .map(|(value, count)| TopValue { value, count })
        .collect()
}

/// Two-decimal rounding with ties to even (`0.125 → 0.12`).
fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}
