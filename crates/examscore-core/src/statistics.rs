//! Descriptive statistics and difficulty thresholds.
//!
//! Proportion-scored questions (multiple choice, short answer) are tiered by
//! the share of correct answers; essays by the mean raw score.

use serde::{Deserialize, Serialize};

use crate::model::{DifficultyTier, QuestionGroup, ScoreDetail, ScoreResult};

/// Minimum proportion correct for an easy question.
pub const EASY_PROPORTION: f64 = 0.70;
/// Minimum proportion correct for a medium question.
pub const MEDIUM_PROPORTION: f64 = 0.30;
/// Minimum mean essay score for an easy question.
pub const EASY_MEAN: f64 = 4.0;
/// Minimum mean essay score for a medium question.
pub const MEDIUM_MEAN: f64 = 2.5;

/// Share of correct answers; 0 when nobody answered.
pub fn proportion(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divisor N).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

pub fn difficulty_for_proportion(proportion: f64) -> DifficultyTier {
    if proportion >= EASY_PROPORTION {
        DifficultyTier::Easy
    } else if proportion >= MEDIUM_PROPORTION {
        DifficultyTier::Medium
    } else {
        DifficultyTier::Hard
    }
}

pub fn difficulty_for_mean(mean: f64) -> DifficultyTier {
    if mean >= EASY_MEAN {
        DifficultyTier::Easy
    } else if mean >= MEDIUM_MEAN {
        DifficultyTier::Medium
    } else {
        DifficultyTier::Hard
    }
}

/// One equal-width histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over `[min, max]`.
///
/// Every bin is half-open except the last, which also holds `max`. When all
/// values are equal the range is widened by 0.5 on each side.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for &v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Aggregate statistics across a scoring run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Per-group tier counts, in export order; empty groups omitted.
    pub groups: Vec<GroupStats>,
    /// Total questions scored.
    pub total_questions: usize,
    /// Questions degraded to `Invalid`.
    pub degraded: usize,
}

/// Tier counts for one question group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub group: QuestionGroup,
    pub questions: usize,
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    pub invalid: usize,
    pub unrated: usize,
    /// Mean proportion correct over proportion-scored questions.
    pub mean_proportion: Option<f64>,
    /// Mean of essay means over valid essay questions.
    pub mean_essay_score: Option<f64>,
}

/// Compute aggregate statistics from all results.
pub fn compute_aggregate_stats(results: &[ScoreResult]) -> AggregateStats {
    let groups = QuestionGroup::ALL
        .iter()
        .filter_map(|&group| {
            let members: Vec<&ScoreResult> =
                results.iter().filter(|r| r.group() == group).collect();
            if members.is_empty() {
                return None;
            }
            let count = |tier: DifficultyTier| members.iter().filter(|r| r.tier == tier).count();

            let proportions: Vec<f64> = members
                .iter()
                .filter_map(|r| match r.detail {
                    ScoreDetail::Proportion { proportion, .. } => Some(proportion),
                    _ => None,
                })
                .collect();
            let essay_means: Vec<f64> = members
                .iter()
                .filter_map(|r| match r.detail {
                    ScoreDetail::Essay { mean, .. } => Some(mean),
                    _ => None,
                })
                .collect();

            Some(GroupStats {
                group,
                questions: members.len(),
                easy: count(DifficultyTier::Easy),
                medium: count(DifficultyTier::Medium),
                hard: count(DifficultyTier::Hard),
                invalid: count(DifficultyTier::Invalid),
                unrated: count(DifficultyTier::Unrated),
                mean_proportion: mean(&proportions),
                mean_essay_score: mean(&essay_means),
            })
        })
        .collect();

    AggregateStats {
        groups,
        total_questions: results.len(),
        degraded: results.iter().filter(|r| r.is_degraded()).count(),
    }
}
