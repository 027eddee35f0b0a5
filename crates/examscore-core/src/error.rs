//! Error types for loading, scoring, and session handling.
//!
//! Only [`LoadError`] and [`SessionError`] ever reach the caller.
//! [`ScoreError`] is absorbed into the `Invalid` result for its column.

use std::path::PathBuf;

use thiserror::Error;

/// Structural failures reading an answer sheet. No partial grid is produced.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unreadable spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("input is not valid UTF-8 text")]
    Encoding,

    #[error("unsupported file format: {0} (expected .csv, .xlsx, .xls, .xlsm or .ods)")]
    UnsupportedFormat(String),

    #[error("no question columns found")]
    NoColumns,

    #[error("no answer key row found below the header")]
    NoAnswerKey,
}

/// Per-column scoring failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("answer key {value:?} is not a numeric maximum score")]
    UnparseableKey { value: String },

    #[error("no numeric responses to average ({excluded} non-numeric excluded)")]
    NoNumericScores { excluded: usize },
}

impl ScoreError {
    /// Note shown in the result row for the degraded column.
    pub fn note(&self) -> String {
        match self {
            ScoreError::UnparseableKey { .. } => "Format salah".to_string(),
            ScoreError::NoNumericScores { .. } => "Format salah: tidak ada skor numerik".to_string(),
        }
    }
}

/// Misuse of a scoring session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no answer sheet loaded")]
    NoGrid,

    #[error("unknown question column: {0}")]
    UnknownColumn(String),
}
