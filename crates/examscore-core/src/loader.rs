//! Answer-sheet loader.
//!
//! Turns CSV or spreadsheet bytes into an [`AnswerGrid`]. The header row names
//! the questions, the first data row is the answer key, and every later row is
//! one respondent. Values keep the type the source format gives them; scoring
//! coerces later, per question type.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::LoadError;
use crate::model::{AnswerGrid, Cell, Column};

/// Options controlling how the sheet is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Treat the first column as respondent identifiers rather than a question.
    pub respondent_column: bool,
}

/// Supported input encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    /// Any workbook calamine can open (xlsx, xlsm, xls, ods).
    Spreadsheet,
}

impl SheetFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SheetFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SheetFormat::Spreadsheet),
            _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Header names plus typed data rows, before the key row is split off.
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Load an answer sheet from disk.
pub fn load_answer_grid(path: &Path, options: LoadOptions) -> Result<AnswerGrid, LoadError> {
    let format = SheetFormat::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    load_answer_grid_bytes(&bytes, format, &source, options)
}

/// Load an answer sheet from in-memory bytes (e.g. an upload).
pub fn load_answer_grid_bytes(
    bytes: &[u8],
    format: SheetFormat,
    source: &str,
    options: LoadOptions,
) -> Result<AnswerGrid, LoadError> {
    let table = match format {
        SheetFormat::Csv => read_csv(bytes)?,
        SheetFormat::Spreadsheet => read_spreadsheet(bytes)?,
    };
    let grid = build_grid(source, table, options)?;
    tracing::debug!(
        source,
        columns = grid.columns().len(),
        respondents = grid.respondent_count(),
        "loaded answer sheet"
    );
    Ok(grid)
}

fn read_csv(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let text = std::str::from_utf8(bytes).map_err(|_| LoadError::Encoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        // A line of bare delimiters is a respondent who answered nothing.
        let record = record?;
        if record.len() > headers.len() {
            tracing::debug!(
                line = record.position().map(|p| p.line()),
                "ignoring {} extra field(s)",
                record.len() - headers.len()
            );
        }
        raw_rows.push(record.iter().map(str::to_string).collect());
    }

    // CSV carries no cell types, so type each column as a whole: integer if
    // every non-blank value is an integer, float if every one is a number,
    // otherwise text.
    let rows = {
        let kinds: Vec<CsvKind> = (0..headers.len())
            .map(|col| {
                infer_kind(
                    raw_rows
                        .iter()
                        .map(|r| r.get(col).map(String::as_str).unwrap_or("")),
                )
            })
            .collect();
        raw_rows
            .iter()
            .map(|r| {
                kinds
                    .iter()
                    .enumerate()
                    .map(|(col, kind)| typed_cell(r.get(col).map(String::as_str).unwrap_or(""), *kind))
                    .collect()
            })
            .collect()
    };

    Ok(RawTable { headers, rows })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CsvKind {
    Int,
    Float,
    Text,
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> CsvKind {
    let mut kind = CsvKind::Int;
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        if kind == CsvKind::Int && value.parse::<i64>().is_err() {
            kind = CsvKind::Float;
        }
        if kind == CsvKind::Float && value.parse::<f64>().is_err() {
            return CsvKind::Text;
        }
    }
    kind
}

fn typed_cell(raw: &str, kind: CsvKind) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match kind {
        CsvKind::Int => trimmed
            .parse()
            .map(Cell::Int)
            .unwrap_or_else(|_| Cell::Text(raw.to_string())),
        CsvKind::Float => trimmed
            .parse()
            .map(Cell::Float)
            .unwrap_or_else(|_| Cell::Text(raw.to_string())),
        CsvKind::Text => Cell::Text(raw.to_string()),
    }
}

fn read_spreadsheet(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LoadError::Spreadsheet("workbook has no worksheets".into()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|r| r.iter().map(|d| d.to_string()).collect())
        .unwrap_or_default();
    let mut rows: Vec<Vec<Cell>> = rows
        .map(|r| r.iter().map(spreadsheet_cell).collect())
        .collect();
    // The used range can extend past the data through formatted cells.
    while rows.last().is_some_and(|r| r.iter().all(Cell::is_empty)) {
        rows.pop();
    }

    Ok(RawTable { headers, rows })
}

fn spreadsheet_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        // Workbooks store whole numbers as floats; read them back as integers.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Cell::Int(*f as i64),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn build_grid(source: &str, table: RawTable, options: LoadOptions) -> Result<AnswerGrid, LoadError> {
    let RawTable { headers, rows } = table;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::NoColumns);
    }

    let first_question = usize::from(options.respondent_column);
    if headers.len() <= first_question {
        return Err(LoadError::NoColumns);
    }

    let (key_row, respondent_rows) = rows.split_first().ok_or(LoadError::NoAnswerKey)?;
    let cell_at = |row: &[Cell], idx: usize| row.get(idx).cloned().unwrap_or(Cell::Empty);

    let columns = headers
        .iter()
        .enumerate()
        .skip(first_question)
        .map(|(idx, name)| {
            let name = name.trim().trim_start_matches('\u{feff}');
            let id = if name.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name.to_string()
            };
            let responses = respondent_rows.iter().map(|r| cell_at(r, idx)).collect();
            Column::new(id, cell_at(key_row, idx), responses)
        })
        .collect();

    let grid = AnswerGrid::new(source, columns)?;
    if options.respondent_column {
        let ids = respondent_rows
            .iter()
            .map(|r| cell_at(r, 0).to_string().trim().to_string())
            .collect();
        Ok(grid.with_respondents(ids))
    } else {
        Ok(grid)
    }
}

/// A warning from answer-sheet validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a loaded grid for issues that will make scoring misleading.
pub fn validate_grid(grid: &AnswerGrid) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if grid.respondent_count() == 0 {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "sheet has an answer key but no respondent rows".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for column in grid.columns() {
        if !seen_ids.insert(column.id()) {
            warnings.push(ValidationWarning {
                question_id: Some(column.id().to_string()),
                message: format!("duplicate question ID: {}", column.id()),
            });
        }
        if column.id().starts_with("Unnamed: ") {
            warnings.push(ValidationWarning {
                question_id: Some(column.id().to_string()),
                message: "column has no header name".into(),
            });
        }
        if column.key().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(column.id().to_string()),
                message: "answer key is blank".into(),
            });
        }
        if !column.responses().is_empty() && column.responses().iter().all(Cell::is_empty) {
            warnings.push(ValidationWarning {
                question_id: Some(column.id().to_string()),
                message: "no respondent answered this question".into(),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
Q1,Q2,Q3
A,Paris,10
A, paris ,8
B,PARIS,x
A,London,6
";

    fn load_csv(text: &str, options: LoadOptions) -> Result<AnswerGrid, LoadError> {
        load_answer_grid_bytes(text.as_bytes(), SheetFormat::Csv, "test.csv", options)
    }

    #[test]
    fn first_row_is_answer_key() {
        let grid = load_csv(SHEET, LoadOptions::default()).unwrap();
        assert_eq!(grid.columns().len(), 3);
        assert_eq!(grid.respondent_count(), 3);

        let q1 = grid.column("Q1").unwrap();
        assert_eq!(q1.key(), &Cell::Text("A".into()));
        assert_eq!(q1.responses()[1], Cell::Text("B".into()));
    }

    #[test]
    fn text_keeps_surrounding_whitespace() {
        let grid = load_csv(SHEET, LoadOptions::default()).unwrap();
        let q2 = grid.column("Q2").unwrap();
        assert_eq!(q2.responses()[0], Cell::Text(" paris ".into()));
    }

    #[test]
    fn numeric_columns_are_typed_per_column() {
        let text = "S1,S2,S3\n10,2.5,10\n8,3,x\n";
        let grid = load_csv(text, LoadOptions::default()).unwrap();
        assert_eq!(grid.column("S1").unwrap().key(), &Cell::Int(10));
        assert_eq!(grid.column("S2").unwrap().responses()[0], Cell::Float(3.0));
        // One non-numeric value makes the whole column text.
        assert_eq!(grid.column("S3").unwrap().key(), &Cell::Text("10".into()));
    }

    #[test]
    fn ragged_rows_are_padded_and_empty_lines_skipped() {
        let text = "Q1,Q2\nA,B\n\nA\n,,\nC,D\n";
        let grid = load_csv(text, LoadOptions::default()).unwrap();
        assert_eq!(grid.respondent_count(), 3);
        assert_eq!(grid.column("Q2").unwrap().responses()[0], Cell::Empty);
        assert_eq!(grid.column("Q1").unwrap().responses()[1], Cell::Empty);
        assert_eq!(grid.column("Q1").unwrap().responses()[2], Cell::Text("C".into()));
    }

    #[test]
    fn all_blank_respondent_counts_in_denominator() {
        let grid = load_csv("Q1,Q2\nA,B\nA,B\n,\n", LoadOptions::default()).unwrap();
        assert_eq!(grid.respondent_count(), 2);

        let result = crate::engine::score(
            grid.column("Q1").unwrap(),
            &crate::model::QuestionType::MultipleChoice,
        );
        assert_eq!(result.metric, "50.00%");
    }

    #[test]
    fn blank_key_row_stays_the_key() {
        let grid = load_csv("Q1,Q2\n,\nA,B\n", LoadOptions::default()).unwrap();
        let q1 = grid.column("Q1").unwrap();
        assert_eq!(q1.key(), &Cell::Empty);
        assert_eq!(q1.responses(), &[Cell::Text("A".into())]);
    }

    #[test]
    fn strips_bom_from_first_header() {
        let text = "\u{feff}Q1,Q2\nA,B\n";
        let grid = load_csv(text, LoadOptions::default()).unwrap();
        assert!(grid.column("Q1").is_some());
    }

    #[test]
    fn respondent_column_supplies_labels() {
        let text = "Nama,Q1\nKunci,A\nAni,A\nBudi,B\n";
        let grid = load_csv(
            text,
            LoadOptions {
                respondent_column: true,
            },
        )
        .unwrap();
        assert_eq!(grid.columns().len(), 1);
        assert_eq!(grid.respondent_label(1), "Budi");
    }

    #[test]
    fn respondent_column_alone_has_no_questions() {
        let err = load_csv(
            "Nama\nKunci\nAni\n",
            LoadOptions {
                respondent_column: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NoColumns));
    }

    #[test]
    fn empty_input_has_no_columns() {
        assert!(matches!(
            load_csv("", LoadOptions::default()),
            Err(LoadError::NoColumns)
        ));
    }

    #[test]
    fn header_only_has_no_answer_key() {
        assert!(matches!(
            load_csv("Q1,Q2\n", LoadOptions::default()),
            Err(LoadError::NoAnswerKey)
        ));
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let bytes = [b'Q', b'1', b'\n', 0xff, 0xfe, b'\n'];
        let err =
            load_answer_grid_bytes(&bytes, SheetFormat::Csv, "bad.csv", LoadOptions::default())
                .unwrap_err();
        assert!(matches!(err, LoadError::Encoding));
    }

    #[test]
    fn garbage_spreadsheet_is_rejected() {
        let err = load_answer_grid_bytes(
            b"not a workbook",
            SheetFormat::Spreadsheet,
            "bad.xlsx",
            LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Spreadsheet(_)));
    }

    #[test]
    fn format_detection() {
        assert_eq!(
            SheetFormat::from_path(Path::new("a.CSV")).unwrap(),
            SheetFormat::Csv
        );
        assert_eq!(
            SheetFormat::from_path(Path::new("a.xlsx")).unwrap(),
            SheetFormat::Spreadsheet
        );
        assert!(SheetFormat::from_path(Path::new("a.pdf")).is_err());
    }

    #[test]
    fn load_xlsx_from_disk() {
        use rust_xlsxwriter::Workbook;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Q1").unwrap();
        sheet.write_string(0, 1, "Q2").unwrap();
        sheet.write_string(1, 0, "A").unwrap();
        sheet.write_number(1, 1, 10.0).unwrap();
        sheet.write_string(2, 0, "A").unwrap();
        sheet.write_number(2, 1, 7.5).unwrap();
        sheet.write_string(3, 0, "C").unwrap();
        sheet.write_string(3, 1, "absen").unwrap();
        workbook.save(&path).unwrap();

        let grid = load_answer_grid(&path, LoadOptions::default()).unwrap();
        assert_eq!(grid.source(), "answers.xlsx");
        assert_eq!(grid.respondent_count(), 2);
        let q2 = grid.column("Q2").unwrap();
        assert_eq!(q2.key(), &Cell::Int(10));
        assert_eq!(q2.responses()[0], Cell::Float(7.5));
        assert_eq!(q2.responses()[1], Cell::Text("absen".into()));
    }

    #[test]
    fn xlsx_keeps_interior_blank_rows_and_trims_trailing() {
        use rust_xlsxwriter::{Format, Workbook};

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Q1").unwrap();
        sheet.write_string(0, 1, "Q2").unwrap();
        sheet.write_string(1, 0, "A").unwrap();
        sheet.write_string(1, 1, "B").unwrap();
        // Row 2 is a respondent who left everything blank.
        sheet.write_string(3, 0, "A").unwrap();
        sheet.write_string(3, 1, "C").unwrap();
        sheet.write_blank(6, 1, &Format::new().set_bold()).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let grid = load_answer_grid_bytes(
            &bytes,
            SheetFormat::Spreadsheet,
            "answers.xlsx",
            LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(grid.respondent_count(), 2);
        let q1 = grid.column("Q1").unwrap();
        assert_eq!(q1.responses()[0], Cell::Empty);
        assert_eq!(q1.responses()[1], Cell::Text("A".into()));

        let result = crate::engine::score(q1, &crate::model::QuestionType::MultipleChoice);
        assert_eq!(result.metric, "50.00%");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_answer_grid(Path::new("no/such/answers.csv"), LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn validate_flags_duplicates_and_blank_keys() {
        let text = "Q1,Q1,\n,A,B\nA,A,B\n";
        let grid = load_csv(text, LoadOptions::default()).unwrap();
        let warnings = validate_grid(&grid);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
        assert!(warnings.iter().any(|w| w.message.contains("answer key is blank")));
        assert!(warnings.iter().any(|w| w.message.contains("no header")));
    }

    #[test]
    fn validate_flags_missing_respondents() {
        let grid = load_csv("Q1\nA\n", LoadOptions::default()).unwrap();
        let warnings = validate_grid(&grid);
        assert!(warnings.iter().any(|w| w.question_id.is_none()));
    }
}
