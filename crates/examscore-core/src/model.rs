//! Core data model types for examscore.
//!
//! An [`AnswerGrid`] holds one answer key and the respondent answers for
//! every question column. Scoring turns each column into a [`ScoreResult`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// A single value from the answer sheet, kept as typed by the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Exact comparison against an answer key.
    ///
    /// Blank cells never match. Integers and floats compare by value; text
    /// compares byte for byte.
    pub fn matches(&self, key: &Cell) -> bool {
        match (self, key) {
            (Cell::Empty, _) | (_, Cell::Empty) => false,
            (Cell::Text(a), Cell::Text(b)) => a == b,
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            _ => match (self.as_number(), key.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Coerce to a numeric score. Text is parsed after trimming; blanks,
    /// booleans, and non-finite values yield `None`.
    pub fn to_score(&self) -> Option<f64> {
        let value = match self {
            Cell::Int(i) => *i as f64,
            Cell::Float(f) => *f,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Empty | Cell::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(v) => f.write_str(&float_literal(*v)),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
        }
    }
}

/// Format a float the way it reads as a literal: integral values keep one
/// decimal (`10.0`), everything else uses the shortest round-trip form.
pub fn float_literal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// One question column: its identifier, answer key, and respondent answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    id: String,
    key: Cell,
    responses: Vec<Cell>,
}

impl Column {
    pub fn new(id: impl Into<String>, key: Cell, responses: Vec<Cell>) -> Self {
        Self {
            id: id.into(),
            key,
            responses,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &Cell {
        &self.key
    }

    pub fn responses(&self) -> &[Cell] {
        &self.responses
    }
}

/// A loaded answer sheet.
///
/// Never mutated after construction; loading a new file produces a new grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerGrid {
    source: String,
    columns: Vec<Column>,
    respondents: Option<Vec<String>>,
}

impl AnswerGrid {
    /// Build a grid from question columns. Fails if there are none.
    pub fn new(source: impl Into<String>, columns: Vec<Column>) -> Result<Self, LoadError> {
        if columns.is_empty() {
            return Err(LoadError::NoColumns);
        }
        Ok(Self {
            source: source.into(),
            columns,
            respondents: None,
        })
    }

    /// Attach respondent identifiers (one per response row).
    pub fn with_respondents(mut self, respondents: Vec<String>) -> Self {
        self.respondents = Some(respondents);
        self
    }

    /// Name of the file the grid was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, question_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == question_id)
    }

    pub fn question_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.id.as_str())
    }

    /// Number of respondent rows.
    pub fn respondent_count(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.responses.len())
            .max()
            .unwrap_or(0)
    }

    /// Display label for the respondent at `index` (0-based).
    pub fn respondent_label(&self, index: usize) -> String {
        self.respondents
            .as_ref()
            .and_then(|ids| ids.get(index))
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("#{}", index + 1))
    }
}

/// How a question column is scored. Assigned by the operator, never inferred.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum QuestionType {
    /// Pilihan ganda: exact match against the key.
    MultipleChoice,
    /// Isian: case- and whitespace-insensitive match.
    ShortAnswer,
    /// Esai: numeric scores averaged against the key's maximum.
    Essay,
    #[default]
    Unclassified,
    /// Operator-supplied category with no built-in handler.
    Custom(String),
}

impl QuestionType {
    /// Interpret a manually entered category. Blank input means unclassified.
    pub fn manual(label: &str) -> Self {
        Self::from(label.to_string())
    }

    /// The built-in type a custom label names, if any; otherwise `self`.
    pub fn resolved(&self) -> QuestionType {
        match self {
            QuestionType::Custom(label) => match builtin(label) {
                Some(ty) => ty,
                None => self.clone(),
            },
            other => other.clone(),
        }
    }

    /// Export group this type belongs to.
    pub fn group(&self) -> QuestionGroup {
        match self.resolved() {
            QuestionType::MultipleChoice => QuestionGroup::MultipleChoice,
            QuestionType::ShortAnswer => QuestionGroup::ShortAnswer,
            QuestionType::Essay => QuestionGroup::Essay,
            QuestionType::Unclassified | QuestionType::Custom(_) => QuestionGroup::Other,
        }
    }
}

fn builtin(label: &str) -> Option<QuestionType> {
    match label.trim().to_lowercase().as_str() {
        "pg" | "pilihan ganda" | "multiple_choice" | "multiple-choice" | "mc" => {
            Some(QuestionType::MultipleChoice)
        }
        "isian" | "short_answer" | "short-answer" | "sa" => Some(QuestionType::ShortAnswer),
        "esai" | "essay" => Some(QuestionType::Essay),
        "" | "belum tersedia" | "unclassified" => Some(QuestionType::Unclassified),
        _ => None,
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "PG"),
            QuestionType::ShortAnswer => write!(f, "Isian"),
            QuestionType::Essay => write!(f, "Esai"),
            QuestionType::Unclassified => write!(f, "Belum Tersedia"),
            QuestionType::Custom(label) => write!(f, "{label}"),
        }
    }
}

impl From<String> for QuestionType {
    fn from(label: String) -> Self {
        builtin(&label).unwrap_or_else(|| QuestionType::Custom(label.trim().to_string()))
    }
}

impl From<QuestionType> for String {
    fn from(ty: QuestionType) -> Self {
        ty.to_string()
    }
}

impl FromStr for QuestionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::manual(s))
    }
}

/// Per-column type assignments with a fallback for unassigned columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeAssignments {
    #[serde(default)]
    default: QuestionType,
    #[serde(default)]
    by_question: BTreeMap<String, QuestionType>,
}

impl TypeAssignments {
    pub fn new(default: QuestionType) -> Self {
        Self {
            default,
            by_question: BTreeMap::new(),
        }
    }

    pub fn assign(&mut self, question_id: impl Into<String>, question_type: QuestionType) {
        self.by_question.insert(question_id.into(), question_type);
    }

    /// Type for a question, falling back to the default.
    pub fn get(&self, question_id: &str) -> &QuestionType {
        self.by_question.get(question_id).unwrap_or(&self.default)
    }

    pub fn default_type(&self) -> &QuestionType {
        &self.default
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QuestionType)> {
        self.by_question.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Export partition of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionGroup {
    MultipleChoice,
    ShortAnswer,
    Essay,
    Other,
}

impl QuestionGroup {
    pub const ALL: [QuestionGroup; 4] = [
        QuestionGroup::MultipleChoice,
        QuestionGroup::ShortAnswer,
        QuestionGroup::Essay,
        QuestionGroup::Other,
    ];

    /// Section title used in sheets and documents.
    pub fn title(&self) -> &'static str {
        match self {
            QuestionGroup::MultipleChoice => "Pilihan Ganda",
            QuestionGroup::ShortAnswer => "Isian",
            QuestionGroup::Essay => "Esai",
            QuestionGroup::Other => "Lainnya",
        }
    }
}

/// Difficulty classification of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
    /// The column could not be scored (bad key, no numeric data).
    Invalid,
    /// No scoring rule applies (unclassified or custom type).
    Unrated,
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyTier::Easy => write!(f, "Mudah"),
            DifficultyTier::Medium => write!(f, "Sedang"),
            DifficultyTier::Hard => write!(f, "Sulit"),
            DifficultyTier::Invalid => write!(f, "Invalid"),
            DifficultyTier::Unrated => write!(f, "N/A"),
        }
    }
}

/// Numeric summary behind a formatted metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreDetail {
    Proportion {
        correct: usize,
        total: usize,
        proportion: f64,
    },
    Essay {
        mean: f64,
        max_score: f64,
        std_dev: f64,
        valid: usize,
        excluded: usize,
    },
    Unscored,
}

/// The scoring outcome for one question column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub question_id: String,
    pub question_type: QuestionType,
    /// Formatted summary, e.g. `75.00%`, `7.00 / 10.0`, `Invalid`, `N/A`.
    pub metric: String,
    pub tier: DifficultyTier,
    /// Human-readable detail shown next to the metric.
    pub note: String,
    pub detail: ScoreDetail,
}

impl ScoreResult {
    /// Whether the column failed to score and was degraded to `Invalid`.
    pub fn is_degraded(&self) -> bool {
        self.tier == DifficultyTier::Invalid
    }

    pub fn group(&self) -> QuestionGroup {
        self.question_type.group()
    }
}

/// One respondent's answer to one question, with its raw score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question_id: String,
    pub respondent: String,
    pub response: String,
    pub raw_score: String,
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_labels_round_trip() {
        assert_eq!(QuestionType::MultipleChoice.to_string(), "PG");
        assert_eq!("pg".parse::<QuestionType>().unwrap(), QuestionType::MultipleChoice);
        assert_eq!("Isian".parse::<QuestionType>().unwrap(), QuestionType::ShortAnswer);
        assert_eq!("essay".parse::<QuestionType>().unwrap(), QuestionType::Essay);
        assert_eq!(
            "Belum Tersedia".parse::<QuestionType>().unwrap(),
            QuestionType::Unclassified
        );
        assert_eq!(
            "Praktikum".parse::<QuestionType>().unwrap(),
            QuestionType::Custom("Praktikum".into())
        );
    }

    #[test]
    fn blank_manual_label_is_unclassified() {
        assert_eq!(QuestionType::manual("   "), QuestionType::Unclassified);
    }

    #[test]
    fn custom_label_naming_builtin_resolves() {
        let ty = QuestionType::Custom("esai".into());
        assert_eq!(ty.resolved(), QuestionType::Essay);
        assert_eq!(ty.group(), QuestionGroup::Essay);
        assert_eq!(
            QuestionType::Custom("Lisan".into()).group(),
            QuestionGroup::Other
        );
    }

    #[test]
    fn question_type_serializes_as_label() {
        let json = serde_json::to_string(&QuestionType::Essay).unwrap();
        assert_eq!(json, "\"Esai\"");
        let back: QuestionType = serde_json::from_str("\"Lisan\"").unwrap();
        assert_eq!(back, QuestionType::Custom("Lisan".into()));
    }

    #[test]
    fn cell_matching_is_exact() {
        let key = Cell::Text("A".into());
        assert!(Cell::Text("A".into()).matches(&key));
        assert!(!Cell::Text("a".into()).matches(&key));
        assert!(!Cell::Text("A ".into()).matches(&key));
        assert!(!Cell::Empty.matches(&Cell::Empty));
        assert!(Cell::Int(3).matches(&Cell::Float(3.0)));
        assert!(!Cell::Text("3".into()).matches(&Cell::Int(3)));
    }

    #[test]
    fn cell_score_coercion() {
        assert_eq!(Cell::Text(" 8 ".into()).to_score(), Some(8.0));
        assert_eq!(Cell::Int(6).to_score(), Some(6.0));
        assert_eq!(Cell::Text("x".into()).to_score(), None);
        assert_eq!(Cell::Text("nan".into()).to_score(), None);
        assert_eq!(Cell::Empty.to_score(), None);
    }

    #[test]
    fn float_literal_keeps_one_decimal_for_integers() {
        assert_eq!(float_literal(10.0), "10.0");
        assert_eq!(float_literal(7.5), "7.5");
        assert_eq!(Cell::Float(2.0).to_string(), "2.0");
    }

    #[test]
    fn grid_requires_columns() {
        assert!(matches!(
            AnswerGrid::new("empty.csv", vec![]),
            Err(LoadError::NoColumns)
        ));
    }

    #[test]
    fn respondent_labels_fall_back_to_position() {
        let grid = AnswerGrid::new(
            "a.csv",
            vec![Column::new("Q1", Cell::Text("A".into()), vec![Cell::Empty; 2])],
        )
        .unwrap();
        assert_eq!(grid.respondent_label(0), "#1");

        let named = grid.with_respondents(vec!["Ani".into(), "".into()]);
        assert_eq!(named.respondent_label(0), "Ani");
        assert_eq!(named.respondent_label(1), "#2");
    }

    #[test]
    fn assignments_fall_back_to_default() {
        let mut assignments = TypeAssignments::new(QuestionType::MultipleChoice);
        assignments.assign("Q2", QuestionType::Essay);
        assert_eq!(assignments.get("Q1"), &QuestionType::MultipleChoice);
        assert_eq!(assignments.get("Q2"), &QuestionType::Essay);
    }
}
