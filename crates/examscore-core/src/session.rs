//! Scoring session state.
//!
//! A [`Session`] owns everything one operator works with between uploads: the
//! loaded grid, per-column type assignments, the session labels, and the most
//! recent report. Loading a new grid discards all of it so a stale report can
//! never be exported against a different sheet.

use anyhow::Result;

use crate::engine::{ProgressReporter, ScoringEngine};
use crate::error::SessionError;
use crate::model::{AnswerGrid, QuestionType, TypeAssignments};
use crate::report::{ScoringReport, SessionLabels};

#[derive(Debug, Default)]
pub struct Session {
    grid: Option<AnswerGrid>,
    assignments: TypeAssignments,
    default_type: QuestionType,
    labels: SessionLabels,
    report: Option<ScoringReport>,
}

impl Session {
    /// A session whose unassigned columns take `default_type`.
    pub fn new(default_type: QuestionType, labels: SessionLabels) -> Self {
        Self {
            grid: None,
            assignments: TypeAssignments::new(default_type.clone()),
            default_type,
            labels,
            report: None,
        }
    }

    /// Replace the grid, dropping prior assignments and results.
    pub fn load(&mut self, grid: AnswerGrid) {
        tracing::debug!(source = grid.source(), "session grid replaced");
        self.assignments = TypeAssignments::new(self.default_type.clone());
        self.report = None;
        self.grid = Some(grid);
    }

    /// Discard the grid, assignments, and results.
    pub fn reset(&mut self) {
        self.grid = None;
        self.assignments = TypeAssignments::new(self.default_type.clone());
        self.report = None;
    }

    pub fn grid(&self) -> Option<&AnswerGrid> {
        self.grid.as_ref()
    }

    /// Assign a type to a loaded column. Invalidates the last report.
    pub fn assign(
        &mut self,
        question_id: &str,
        question_type: QuestionType,
    ) -> Result<(), SessionError> {
        let grid = self.grid.as_ref().ok_or(SessionError::NoGrid)?;
        if grid.column(question_id).is_none() {
            return Err(SessionError::UnknownColumn(question_id.to_string()));
        }
        self.assignments.assign(question_id, question_type);
        self.report = None;
        Ok(())
    }

    pub fn assignments(&self) -> &TypeAssignments {
        &self.assignments
    }

    pub fn labels(&self) -> &SessionLabels {
        &self.labels
    }

    /// Update the operator/subject labels. Invalidates the last report.
    pub fn set_labels(&mut self, labels: SessionLabels) {
        self.labels = labels;
        self.report = None;
    }

    /// Score the loaded grid and keep the report for export.
    pub async fn score(
        &mut self,
        engine: &ScoringEngine,
        progress: &dyn ProgressReporter,
    ) -> Result<&ScoringReport> {
        let grid = self.grid.as_ref().ok_or(SessionError::NoGrid)?;
        let report = engine
            .run(grid, &self.assignments, &self.labels, progress)
            .await?;
        Ok(self.report.insert(report))
    }

    /// The latest report, if scoring has run since the last change.
    pub fn report(&self) -> Option<&ScoringReport> {
        self.report.as_ref()
    }
}
