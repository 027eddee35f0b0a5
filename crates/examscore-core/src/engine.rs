//! Scoring engine.
//!
//! Each question column is scored on its own according to its assigned
//! [`QuestionType`]. Columns share no state, so a run can score them
//! concurrently; results always come back in column order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesOrdered, StreamExt};
use tokio::sync::Semaphore;

use crate::error::ScoreError;
use crate::model::{
    float_literal, AnswerGrid, Cell, Column, DifficultyTier, QuestionType, ResponseRecord,
    ScoreDetail, ScoreResult, TypeAssignments,
};
use crate::report::{ScoringReport, SessionLabels};
use crate::statistics;

/// Configuration for the scoring engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum columns scored at once.
    pub parallelism: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { parallelism: 4 }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_column_start(&self, question_id: &str, question_type: &QuestionType);
    fn on_column_complete(&self, result: &ScoreResult);
    fn on_column_degraded(&self, result: &ScoreResult);
    fn on_run_complete(&self, total: usize, degraded: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_column_start(&self, _: &str, _: &QuestionType) {}
    fn on_column_complete(&self, _: &ScoreResult) {}
    fn on_column_degraded(&self, _: &ScoreResult) {}
    fn on_run_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// Metric, tier, and note for a successfully scored column.
struct Scored {
    metric: String,
    tier: DifficultyTier,
    note: String,
    detail: ScoreDetail,
}

/// Score one column under the given question type.
///
/// Never fails: a column that cannot be scored comes back as an `Invalid`
/// result whose note says why.
pub fn score(column: &Column, question_type: &QuestionType) -> ScoreResult {
    let outcome = match question_type.resolved() {
        QuestionType::MultipleChoice => Ok(score_multiple_choice(column)),
        QuestionType::ShortAnswer => Ok(score_short_answer(column)),
        QuestionType::Essay => score_essay(column),
        QuestionType::Unclassified | QuestionType::Custom(_) => Ok(Scored {
            metric: "N/A".into(),
            tier: DifficultyTier::Unrated,
            note: "Belum dikategorikan".into(),
            detail: ScoreDetail::Unscored,
        }),
    };

    let scored = outcome.unwrap_or_else(|err| {
        tracing::warn!(question = column.id(), "column degraded to Invalid: {err}");
        Scored {
            metric: "Invalid".into(),
            tier: DifficultyTier::Invalid,
            note: err.note(),
            detail: ScoreDetail::Unscored,
        }
    });

    tracing::debug!(
        question = column.id(),
        question_type = %question_type,
        metric = %scored.metric,
        tier = %scored.tier,
        "scored column"
    );

    ScoreResult {
        question_id: column.id().to_string(),
        question_type: question_type.clone(),
        metric: scored.metric,
        tier: scored.tier,
        note: scored.note,
        detail: scored.detail,
    }
}

/// Score every column of a grid in order.
pub fn score_all(grid: &AnswerGrid, assignments: &TypeAssignments) -> Vec<ScoreResult> {
    grid.columns()
        .iter()
        .map(|column| score(column, assignments.get(column.id())))
        .collect()
}

fn score_multiple_choice(column: &Column) -> Scored {
    let key = column.key();
    let correct = column.responses().iter().filter(|r| r.matches(key)).count();
    proportion_scored(correct, column.responses().len())
}

fn score_short_answer(column: &Column) -> Scored {
    let key = normalize_answer(column.key());
    let correct = column
        .responses()
        .iter()
        .filter(|r| normalize_answer(r) == key)
        .count();
    proportion_scored(correct, column.responses().len())
}

/// Short-answer comparison form: string, trimmed, case-folded.
fn normalize_answer(cell: &Cell) -> String {
    cell.to_string().trim().to_lowercase()
}

fn proportion_scored(correct: usize, total: usize) -> Scored {
    let proportion = statistics::proportion(correct, total);
    let tier = statistics::difficulty_for_proportion(proportion);
    Scored {
        metric: format!("{:.2}%", proportion * 100.0),
        tier,
        note: tier.to_string(),
        detail: ScoreDetail::Proportion {
            correct,
            total,
            proportion,
        },
    }
}

fn score_essay(column: &Column) -> Result<Scored, ScoreError> {
    let max_score = column
        .key()
        .to_score()
        .ok_or_else(|| ScoreError::UnparseableKey {
            value: column.key().to_string(),
        })?;

    let scores: Vec<f64> = column.responses().iter().filter_map(Cell::to_score).collect();
    let excluded = column.responses().len() - scores.len();

    let mean = statistics::mean(&scores).ok_or(ScoreError::NoNumericScores { excluded })?;
    let std_dev = statistics::std_dev(&scores).unwrap_or(0.0);
    let tier = statistics::difficulty_for_mean(mean);

    Ok(Scored {
        metric: format!("{mean:.2} / {}", float_literal(max_score)),
        tier,
        note: format!("STD: {std_dev:.2} - {tier}"),
        detail: ScoreDetail::Essay {
            mean,
            max_score,
            std_dev,
            valid: scores.len(),
            excluded,
        },
    })
}

/// Per-respondent breakdown for short-answer and essay columns.
///
/// Other question types produce no rows.
pub fn response_breakdown(grid: &AnswerGrid, assignments: &TypeAssignments) -> Vec<ResponseRecord> {
    let mut records = Vec::new();
    for column in grid.columns() {
        let question_type = assignments.get(column.id()).resolved();
        let rows: Vec<(String, String)> = match question_type {
            QuestionType::ShortAnswer => {
                let key = normalize_answer(column.key());
                column
                    .responses()
                    .iter()
                    .map(|r| {
                        if normalize_answer(r) == key {
                            ("1".to_string(), "Benar".to_string())
                        } else {
                            ("0".to_string(), "Salah".to_string())
                        }
                    })
                    .collect()
            }
            QuestionType::Essay => {
                let max_score = column.key().to_score();
                column
                    .responses()
                    .iter()
                    .map(|r| match (r.to_score(), max_score) {
                        (Some(v), Some(max)) => (
                            format!("{} / {}", float_literal(v), float_literal(max)),
                            String::new(),
                        ),
                        (Some(v), None) => (float_literal(v), "Format salah".to_string()),
                        (None, _) => (String::new(), "Bukan angka".to_string()),
                    })
                    .collect()
            }
            _ => continue,
        };

        records.extend(column.responses().iter().zip(rows).enumerate().map(
            |(idx, (response, (raw_score, comment)))| ResponseRecord {
                question_id: column.id().to_string(),
                respondent: grid.respondent_label(idx),
                response: response.to_string(),
                raw_score,
                comment,
            },
        ));
    }
    records
}

/// The scoring engine: concurrent, order-preserving scoring runs.
pub struct ScoringEngine {
    config: EngineConfig,
}

impl ScoringEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Score all columns concurrently on the blocking pool.
    ///
    /// At most `parallelism` columns are in flight; output order matches the
    /// grid's column order.
    pub async fn score_columns(
        &self,
        grid: &AnswerGrid,
        assignments: &TypeAssignments,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ScoreResult>> {
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut pending = FuturesOrdered::new();

        for column in grid.columns() {
            let question_type = assignments.get(column.id()).clone();
            progress.on_column_start(column.id(), &question_type);

            let column = column.clone();
            let semaphore = Arc::clone(&semaphore);
            pending.push_back(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                let question_id = column.id().to_string();
                tokio::task::spawn_blocking(move || score(&column, &question_type))
                    .await
                    .map_err(|e| anyhow::anyhow!("scoring task for {question_id} failed: {e}"))
            });
        }

        let mut results = Vec::with_capacity(grid.columns().len());
        while let Some(result) = pending.next().await {
            let result = result?;
            if result.is_degraded() {
                progress.on_column_degraded(&result);
            } else {
                progress.on_column_complete(&result);
            }
            results.push(result);
        }
        Ok(results)
    }

    /// Run a full scoring pass and assemble the report.
    pub async fn run(
        &self,
        grid: &AnswerGrid,
        assignments: &TypeAssignments,
        labels: &SessionLabels,
        progress: &dyn ProgressReporter,
    ) -> Result<ScoringReport> {
        let start = Instant::now();
        let results = self.score_columns(grid, assignments, progress).await?;
        let breakdown = response_breakdown(grid, assignments);
        let elapsed = start.elapsed();

        let degraded = results.iter().filter(|r| r.is_degraded()).count();
        progress.on_run_complete(results.len(), degraded, elapsed);
        tracing::info!(
            source = grid.source(),
            questions = results.len(),
            degraded,
            "scoring run complete"
        );

        Ok(ScoringReport::new(grid, results, breakdown, labels, elapsed))
    }
}
