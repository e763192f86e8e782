//! Heuristic data-quality scoring.
//!
//! A table starts at 100 and each [`QualityRule`] may subtract a penalty
//! and contribute a reason. The final score is clamped to `[0, 100]`.
//! The default scorer has a single rule, [`NullRateRule`]; new rules
//! plug in without changing the `(score, reasons)` contract.

use serde::Serialize;

use crate::profile::TableProfile;

/// Score and the reasons that lowered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityAssessment {
    pub score: u8,
    pub reasons: Vec<String>,
}

/// Outcome of one rule against one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    pub penalty: u32,
    pub reason: Option<String>,
}

pub trait QualityRule: Send + Sync {
    fn evaluate(&self, table: &TableProfile) -> RuleOutcome;
}

/// Penalizes sampled missing values: `min(cap, floor(avg_null_pct * weight))`.
#[derive(Debug, Clone)]
pub struct NullRateRule {
    pub weight: f64,
    pub max_penalty: u32,
    /// Average null percentage above which a reason is reported.
    pub warn_above_pct: f64,
}

impl Default for NullRateRule {
    fn default() -> Self {
        Self {
            weight: 0.4,
            max_penalty: 40,
            warn_above_pct: 10.0,
        }
    }
}

impl QualityRule for NullRateRule {
    fn evaluate(&self, table: &TableProfile) -> RuleOutcome {
        let Some(avg) = table.avg_null_pct else {
            return RuleOutcome::default();
        };
        let raw = (avg * self.weight).floor().max(0.0);
        let penalty = (raw as u32).min(self.max_penalty);
        let reason = (avg > self.warn_above_pct)
            .then(|| format!("High missing values: avg null {:?}% (sample)", avg));
        RuleOutcome { penalty, reason }
    }
}

pub struct QualityScorer {
    rules: Vec<Box<dyn QualityRule>>,
}

impl QualityScorer {
    pub fn new(rules: Vec<Box<dyn QualityRule>>) -> Self {
        Self { rules }
    }

    pub fn score(&self, table: &TableProfile) -> QualityAssessment {
        let mut score: i64 = 100;
        let mut reasons = Vec::new();
        for rule in &self.rules {
            let outcome = rule.evaluate(table);
            score -= i64::from(outcome.penalty);
            reasons.extend(outcome.reason);
        }
        QualityAssessment {
            score: score.clamp(0, 100) as u8,
            reasons,
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(vec![Box::new(NullRateRule::default())])
    }
}

/// Score a table with the default rule set.
pub fn score_table(table: &TableProfile) -> QualityAssessment {
    QualityScorer::default().score(table)
}
