//! XLSX workbook export.
//!
//! One summary sheet, one sheet per non-empty question group with a native
//! column chart, and one answer sheet per group that has breakdown rows.

use std::path::Path;

use rust_xlsxwriter::{Chart, ChartType, Format, Workbook, Worksheet};

use examscore_core::model::{QuestionGroup, ResponseRecord, ScoreResult};
use examscore_core::report::ScoringReport;

use crate::chart::metric_percentage;
use crate::error::ExportError;

/// Name of the summary sheet.
pub const SUMMARY_SHEET: &str = "Ringkasan";

const RESULT_HEADERS: [&str; 5] = ["Soal", "Tipe", "Nilai", "Keterangan", "Nilai (%)"];
const BREAKDOWN_HEADERS: [&str; 5] = ["Soal", "Responden", "Jawaban", "Skor", "Komentar"];

/// Sheet name for a group's answer breakdown.
pub fn breakdown_sheet_name(group: QuestionGroup) -> String {
    format!("Jawaban {}", group.title())
}

/// Build the full workbook in memory.
pub fn build_workbook(report: &ScoringReport) -> Result<Workbook, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    write_summary_sheet(workbook.add_worksheet(), report, &bold)?;

    for (group, results) in report.groups() {
        write_group_sheet(workbook.add_worksheet(), group, &results, &bold)?;

        let breakdown = report.breakdown_for(group);
        if !breakdown.is_empty() {
            write_breakdown_sheet(workbook.add_worksheet(), group, &breakdown, &bold)?;
        }
    }

    Ok(workbook)
}

/// Serialize the workbook to `.xlsx` bytes.
pub fn workbook_bytes(report: &ScoringReport) -> Result<Vec<u8>, ExportError> {
    let mut workbook = build_workbook(report)?;
    Ok(workbook.save_to_buffer()?)
}

/// Write the workbook to a file.
pub fn write_xlsx_report(report: &ScoringReport, path: &Path) -> Result<(), ExportError> {
    let bytes = workbook_bytes(report)?;
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, bytes).map_err(io_err)?;
    tracing::info!(path = %path.display(), "wrote XLSX report");
    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    report: &ScoringReport,
    bold: &Format,
) -> Result<(), ExportError> {
    sheet.set_name(SUMMARY_SHEET)?;
    sheet.write_string_with_format(0, 0, "Hasil Analisis Lengkap", bold)?;
    sheet.write_string(1, 0, "Nama Pengguna")?;
    sheet.write_string(1, 1, &report.labels.operator)?;
    sheet.write_string(2, 0, "Mata Pelajaran")?;
    sheet.write_string(2, 1, &report.labels.subject)?;
    sheet.write_string(3, 0, "Berkas")?;
    sheet.write_string(3, 1, &report.sheet.source)?;
    sheet.write_string(4, 0, "Responden")?;
    sheet.write_number(4, 1, report.sheet.respondent_count as f64)?;

    let header_row = 6;
    let headers = ["Kelompok", "Soal", "Mudah", "Sedang", "Sulit", "Invalid", "N/A"];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(header_row, col as u16, *header, bold)?;
    }
    for (i, stats) in report.aggregate.groups.iter().enumerate() {
        let row = header_row + 1 + i as u32;
        sheet.write_string(row, 0, stats.group.title())?;
        let counts = [
            stats.questions,
            stats.easy,
            stats.medium,
            stats.hard,
            stats.invalid,
            stats.unrated,
        ];
        for (col, count) in counts.iter().enumerate() {
            sheet.write_number(row, col as u16 + 1, *count as f64)?;
        }
    }
    sheet.set_column_width(0, 18)?;
    sheet.set_column_width(1, 28)?;
    Ok(())
}

fn write_group_sheet(
    sheet: &mut Worksheet,
    group: QuestionGroup,
    results: &[&ScoreResult],
    bold: &Format,
) -> Result<(), ExportError> {
    let name = group.title();
    sheet.set_name(name)?;
    for (col, header) in RESULT_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, bold)?;
    }

    let mut numeric = 0usize;
    for (i, r) in results.iter().enumerate() {
        let row = 1 + i as u32;
        sheet.write_string(row, 0, &r.question_id)?;
        sheet.write_string(row, 1, r.question_type.to_string())?;
        sheet.write_string(row, 2, &r.metric)?;
        sheet.write_string(row, 3, &r.note)?;
        match metric_percentage(&r.metric) {
            Ok(value) => {
                sheet.write_number(row, 4, value)?;
                numeric += 1;
            }
            Err(e) => {
                tracing::warn!(question = %r.question_id, "skipping chart value: {e}");
            }
        }
    }
    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 16)?;
    sheet.set_column_width(2, 14)?;
    sheet.set_column_width(3, 34)?;
    sheet.set_column_width(4, 10)?;

    if numeric > 0 {
        let last_row = results.len() as u32;
        let mut chart = Chart::new(ChartType::Column);
        chart
            .add_series()
            .set_categories((name, 1, 0, last_row, 0))
            .set_values((name, 1, 4, last_row, 4));
        chart.title().set_name(format!("Grafik Nilai {name}").as_str());
        chart.x_axis().set_name("Soal");
        chart.y_axis().set_name("Nilai (%)");
        chart.legend().set_hidden();
        sheet.insert_chart(1, 6, &chart)?;
    }
    Ok(())
}

fn write_breakdown_sheet(
    sheet: &mut Worksheet,
    group: QuestionGroup,
    rows: &[&ResponseRecord],
    bold: &Format,
) -> Result<(), ExportError> {
    sheet.set_name(breakdown_sheet_name(group))?;
    for (col, header) in BREAKDOWN_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, bold)?;
    }
    for (i, b) in rows.iter().enumerate() {
        let row = 1 + i as u32;
        sheet.write_string(row, 0, &b.question_id)?;
        sheet.write_string(row, 1, &b.respondent)?;
        sheet.write_string(row, 2, &b.response)?;
        sheet.write_string(row, 3, &b.raw_score)?;
        sheet.write_string(row, 4, &b.comment)?;
    }
    sheet.set_column_width(2, 24)?;
    sheet.set_column_width(4, 16)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use examscore_core::engine::{response_breakdown, score_all};
    use examscore_core::model::{AnswerGrid, Cell, Column, QuestionType, TypeAssignments};
    use examscore_core::report::SessionLabels;
    use std::io::Cursor;
    use std::time::Duration;

    fn make_test_report(with_unassigned: bool) -> ScoringReport {
        let mut columns = vec![
            Column::new(
                "Q1",
                Cell::Text("A".into()),
                vec![
                    Cell::Text("A".into()),
                    Cell::Text("B".into()),
                    Cell::Text("A".into()),
                    Cell::Text("A".into()),
                ],
            ),
            Column::new(
                "E1",
                Cell::Int(10),
                vec![
                    Cell::Int(8),
                    Cell::Text("x".into()),
                    Cell::Int(6),
                    Cell::Empty,
                ],
            ),
        ];
        if with_unassigned {
            columns.push(Column::new(
                "Q9",
                Cell::Text("C".into()),
                vec![Cell::Empty; 4],
            ));
        }
        let grid = AnswerGrid::new("ujian.xlsx", columns).unwrap();
        let mut assignments = TypeAssignments::new(QuestionType::Unclassified);
        assignments.assign("Q1", QuestionType::MultipleChoice);
        assignments.assign("E1", QuestionType::Essay);

        ScoringReport::new(
            &grid,
            score_all(&grid, &assignments),
            response_breakdown(&grid, &assignments),
            &SessionLabels::new("Pak Budi", "Matematika"),
            Duration::from_millis(1),
        )
    }

    fn read_back(bytes: Vec<u8>) -> calamine::Sheets<Cursor<Vec<u8>>> {
        open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn workbook_has_one_sheet_per_non_empty_group() {
        let bytes = workbook_bytes(&make_test_report(false)).unwrap();
        let workbook = read_back(bytes);
        assert_eq!(
            workbook.sheet_names(),
            vec!["Ringkasan", "Pilihan Ganda", "Esai", "Jawaban Esai"]
        );
    }

    #[test]
    fn group_sheet_rows_and_percentages() {
        let bytes = workbook_bytes(&make_test_report(false)).unwrap();
        let mut workbook = read_back(bytes);

        let mc = workbook.worksheet_range("Pilihan Ganda").unwrap();
        assert_eq!(mc.get_value((0, 0)), Some(&Data::String("Soal".into())));
        assert_eq!(mc.get_value((0, 4)), Some(&Data::String("Nilai (%)".into())));
        assert_eq!(mc.get_value((1, 0)), Some(&Data::String("Q1".into())));
        assert_eq!(mc.get_value((1, 1)), Some(&Data::String("PG".into())));
        assert_eq!(mc.get_value((1, 2)), Some(&Data::String("75.00%".into())));
        assert_eq!(mc.get_value((1, 3)), Some(&Data::String("Mudah".into())));
        assert_eq!(mc.get_value((1, 4)), Some(&Data::Float(75.0)));

        let essay = workbook.worksheet_range("Esai").unwrap();
        assert_eq!(
            essay.get_value((1, 2)),
            Some(&Data::String("7.00 / 10.0".into()))
        );
    }

    #[test]
    fn breakdown_sheet_lists_every_respondent() {
        let bytes = workbook_bytes(&make_test_report(false)).unwrap();
        let mut workbook = read_back(bytes);

        let sheet = workbook.worksheet_range("Jawaban Esai").unwrap();
        assert_eq!(sheet.height(), 5);
        assert_eq!(sheet.get_value((0, 4)), Some(&Data::String("Komentar".into())));
        assert_eq!(sheet.get_value((2, 4)), Some(&Data::String("Bukan angka".into())));
    }

    #[test]
    fn unassigned_questions_land_in_other_sheet() {
        let bytes = workbook_bytes(&make_test_report(true)).unwrap();
        let mut workbook = read_back(bytes);
        assert!(workbook.sheet_names().contains(&"Lainnya".to_string()));

        let other = workbook.worksheet_range("Lainnya").unwrap();
        assert_eq!(other.get_value((1, 0)), Some(&Data::String("Q9".into())));
        assert_eq!(other.get_value((1, 2)), Some(&Data::String("N/A".into())));
        // No numeric value, so the percentage cell is left blank.
        assert!(matches!(other.get_value((1, 4)), None | Some(Data::Empty)));
    }

    #[test]
    fn summary_sheet_carries_labels() {
        let bytes = workbook_bytes(&make_test_report(false)).unwrap();
        let mut workbook = read_back(bytes);

        let summary = workbook.worksheet_range(SUMMARY_SHEET).unwrap();
        assert_eq!(summary.get_value((1, 1)), Some(&Data::String("Pak Budi".into())));
        assert_eq!(
            summary.get_value((2, 1)),
            Some(&Data::String("Matematika".into()))
        );
    }

    #[test]
    fn write_xlsx_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/hasil_analisis.xlsx");
        write_xlsx_report(&make_test_report(false), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
