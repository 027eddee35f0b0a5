//! The `examscore score` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use examscore_core::config::load_config_from;
use examscore_core::engine::{ProgressReporter, ScoringEngine};
use examscore_core::error::SessionError;
use examscore_core::loader::load_answer_grid;
use examscore_core::model::{QuestionType, ScoreResult};
use examscore_core::report::{ScoringReport, SessionLabels};
use examscore_core::session::Session;
use examscore_report::html::write_html_report;
use examscore_report::xlsx::write_xlsx_report;

/// Base name of every exported file.
const OUTPUT_STEM: &str = "hasil_analisis";

/// Flags for `examscore score`. Unset options fall back to the config file.
pub struct ScoreArgs {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub types: Vec<String>,
    pub default_type: Option<String>,
    pub respondent_column: bool,
    pub operator: Option<String>,
    pub subject: Option<String>,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub parallelism: Option<usize>,
}

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_column_start(&self, question_id: &str, question_type: &QuestionType) {
        eprintln!("  Scoring: {question_id} [{question_type}]");
    }

    fn on_column_complete(&self, result: &ScoreResult) {
        eprintln!(
            "  Done: {} [{}] {} ({})",
            result.question_id, result.question_type, result.metric, result.tier
        );
    }

    fn on_column_degraded(&self, result: &ScoreResult) {
        eprintln!(
            "  INVALID: {} [{}]: {}",
            result.question_id, result.question_type, result.note
        );
    }

    fn on_run_complete(&self, total: usize, degraded: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {total} questions scored, {degraded} invalid ({:.1}ms)",
            elapsed.as_secs_f64() * 1000.0
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Html,
    Xlsx,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Parse a list of format names; `all` expands to every format.
fn parse_formats<S: AsRef<str>>(names: &[S]) -> Result<Vec<OutputFormat>> {
    let mut formats = Vec::new();
    for name in names {
        let name = name.as_ref().trim().to_lowercase();
        let parsed: &[OutputFormat] = match name.as_str() {
            "json" => &[OutputFormat::Json],
            "html" => &[OutputFormat::Html],
            "xlsx" => &[OutputFormat::Xlsx],
            "all" => &[OutputFormat::Json, OutputFormat::Html, OutputFormat::Xlsx],
            "" => &[],
            other => anyhow::bail!("unknown output format '{other}' (expected json, html, xlsx or all)"),
        };
        for format in parsed {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
    }
    anyhow::ensure!(!formats.is_empty(), "at least one output format is required");
    Ok(formats)
}

/// Parse a `COL=TYPE` assignment flag.
fn parse_type_flag(flag: &str) -> Result<(String, QuestionType)> {
    let (column, label) = flag
        .split_once('=')
        .with_context(|| format!("invalid --type '{flag}': expected COL=TYPE"))?;
    let column = column.trim();
    anyhow::ensure!(!column.is_empty(), "invalid --type '{flag}': column is empty");
    Ok((column.to_string(), QuestionType::from(label.to_string())))
}

pub async fn execute(args: ScoreArgs) -> Result<()> {
    let mut config = load_config_from(args.config.as_deref())?;

    // Flags override the config file.
    if let Some(default_type) = args.default_type {
        config.default_type = QuestionType::from(default_type);
    }
    if args.respondent_column {
        config.respondent_column = true;
    }
    if let Some(operator) = args.operator {
        config.operator = operator;
    }
    if let Some(subject) = args.subject {
        config.subject = subject;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(parallelism) = args.parallelism {
        anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
        config.parallelism = parallelism;
    }
    let formats = match &args.format {
        Some(list) => parse_formats(&list.split(',').collect::<Vec<_>>())?,
        None => parse_formats(&config.formats)?,
    };
    let type_flags = args
        .types
        .iter()
        .map(|flag| parse_type_flag(flag))
        .collect::<Result<Vec<_>>>()?;

    let grid = load_answer_grid(&args.input, config.load_options())
        .with_context(|| format!("failed to load answer sheet {}", args.input.display()))?;

    eprintln!(
        "examscore v{} - Scoring {} questions x {} respondents",
        env!("CARGO_PKG_VERSION"),
        grid.columns().len(),
        grid.respondent_count()
    );
    eprintln!();

    let mut session = Session::new(config.default_type.clone(), config.labels());
    session.load(grid);

    for (question_id, question_type) in &config.types {
        match session.assign(question_id, question_type.clone()) {
            Ok(()) => {}
            Err(SessionError::UnknownColumn(id)) => {
                tracing::warn!(question = %id, "config assigns a type to a column not in this sheet");
            }
            Err(e) => return Err(e.into()),
        }
    }
    for (question_id, question_type) in type_flags {
        session
            .assign(&question_id, question_type)
            .with_context(|| format!("cannot apply --type {question_id}"))?;
    }

    let engine = ScoringEngine::new(config.engine_config());
    let report = session.score(&engine, &ConsoleReporter).await?;

    print_summary(report);

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    for format in formats {
        let path = config
            .output_dir
            .join(format!("{OUTPUT_STEM}.{}", format.extension()));
        match format {
            OutputFormat::Json => {
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            OutputFormat::Html => {
                write_html_report(report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            OutputFormat::Xlsx => {
                write_xlsx_report(report, &path)?;
                eprintln!("XLSX workbook: {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_summary(report: &ScoringReport) {
    use comfy_table::{Cell, Table};

    let SessionLabels { operator, subject } = &report.labels;
    println!("Nama Pengguna: {operator}");
    println!("Mata Pelajaran: {subject}");

    let mut table = Table::new();
    table.set_header(vec!["Soal", "Tipe", "Nilai", "Tingkat", "Keterangan"]);

    for r in &report.results {
        table.add_row(vec![
            Cell::new(&r.question_id),
            Cell::new(r.question_type.to_string()),
            Cell::new(&r.metric),
            Cell::new(r.tier.to_string()),
            Cell::new(&r.note),
        ]);
    }

    println!("{table}");
}
