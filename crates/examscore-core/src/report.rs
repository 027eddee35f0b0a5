//! Scoring report types with JSON persistence.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerGrid, QuestionGroup, ResponseRecord, ScoreResult};
use crate::statistics::{compute_aggregate_stats, AggregateStats};

const NO_OPERATOR: &str = "Tidak ada nama pengguna";
const NO_SUBJECT: &str = "Tidak ada mata pelajaran";

/// Free-text labels identifying who ran the analysis and for which subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLabels {
    pub operator: String,
    pub subject: String,
}

impl SessionLabels {
    /// Blank labels are replaced with placeholder text.
    pub fn new(operator: &str, subject: &str) -> Self {
        let or_placeholder = |value: &str, placeholder: &str| {
            let value = value.trim();
            if value.is_empty() {
                placeholder.to_string()
            } else {
                value.to_string()
            }
        };
        Self {
            operator: or_placeholder(operator, NO_OPERATOR),
            subject: or_placeholder(subject, NO_SUBJECT),
        }
    }
}

impl Default for SessionLabels {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// Summary of the scored answer sheet (without the cell data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub source: String,
    pub question_count: usize,
    pub respondent_count: usize,
}

/// A complete scoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringReport {
    /// Unique run identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub labels: SessionLabels,
    pub sheet: SheetSummary,
    /// One result per question column, in column order.
    pub results: Vec<ScoreResult>,
    /// Per-respondent rows for short-answer and essay questions.
    #[serde(default)]
    pub breakdown: Vec<ResponseRecord>,
    pub aggregate: AggregateStats,
    /// Wall-clock scoring time in milliseconds.
    pub duration_ms: u64,
}

impl ScoringReport {
    pub fn new(
        grid: &AnswerGrid,
        results: Vec<ScoreResult>,
        breakdown: Vec<ResponseRecord>,
        labels: &SessionLabels,
        elapsed: Duration,
    ) -> Self {
        let aggregate = compute_aggregate_stats(&results);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            labels: labels.clone(),
            sheet: SheetSummary {
                source: grid.source().to_string(),
                question_count: grid.columns().len(),
                respondent_count: grid.respondent_count(),
            },
            results,
            breakdown,
            aggregate,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Results belonging to one export group, in column order.
    pub fn group(&self, group: QuestionGroup) -> Vec<&ScoreResult> {
        self.results.iter().filter(|r| r.group() == group).collect()
    }

    /// Non-empty groups in export order.
    pub fn groups(&self) -> Vec<(QuestionGroup, Vec<&ScoreResult>)> {
        QuestionGroup::ALL
            .iter()
            .map(|&g| (g, self.group(g)))
            .filter(|(_, members)| !members.is_empty())
            .collect()
    }

    /// Breakdown rows for the questions of one group.
    pub fn breakdown_for(&self, group: QuestionGroup) -> Vec<&ResponseRecord> {
        let ids: Vec<&str> = self
            .group(group)
            .iter()
            .map(|r| r.question_id.as_str())
            .collect();
        self.breakdown
            .iter()
            .filter(|b| ids.contains(&b.question_id.as_str()))
            .collect()
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ScoringReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}
