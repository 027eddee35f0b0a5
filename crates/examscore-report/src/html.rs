//! HTML document generator.
//!
//! Produces a self-contained, print-ready HTML file with all CSS/JS inlined
//! and charts drawn as inline SVG. Each question group starts on a new
//! printed page.

use std::path::Path;

use examscore_core::model::{QuestionGroup, ResponseRecord, ScoreResult};
use examscore_core::report::ScoringReport;
use examscore_core::statistics::{histogram, AggregateStats};

use crate::chart::{chart_points, group_color, svg_bar_chart, svg_histogram};
use crate::error::ExportError;
use crate::html_escape;

const HISTOGRAM_BINS: usize = 10;

/// Generate the HTML document for a scoring report.
pub fn generate_html(report: &ScoringReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"id\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Hasil Analisis Lengkap - {}</title>\n",
        html_escape(&report.labels.subject)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>Hasil Analisis Lengkap</h1>\n");
    html.push_str(&format!(
        "<p class=\"label\">Nama Pengguna: {}</p>\n",
        html_escape(&report.labels.operator)
    ));
    html.push_str(&format!(
        "<p class=\"label\">Mata Pelajaran: {}</p>\n",
        html_escape(&report.labels.subject)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Berkas: <strong>{}</strong> | {} soal | {} responden | {}</p>\n",
        html_escape(&report.sheet.source),
        report.sheet.question_count,
        report.sheet.respondent_count,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    html.push_str(&summary_section(&report.aggregate));

    for (index, (group, results)) in report.groups().into_iter().enumerate() {
        let breakdown = report.breakdown_for(group);
        html.push_str(&group_section(index, group, &results, &breakdown));
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Data JSON</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write the HTML document to a file.
pub fn write_html_report(report: &ScoringReport, path: &Path) -> Result<(), ExportError> {
    let html = generate_html(report);
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, html).map_err(io_err)?;
    tracing::info!(path = %path.display(), "wrote HTML report");
    Ok(())
}

fn summary_section(aggregate: &AggregateStats) -> String {
    let mut html = String::from("<section class=\"dashboard\">\n<h2>Ringkasan</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Kelompok</th><th>Soal</th><th>Mudah</th><th>Sedang</th><th>Sulit</th><th>Invalid</th><th>N/A</th><th>Rata-rata</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for stats in &aggregate.groups {
        let average = match (stats.mean_proportion, stats.mean_essay_score) {
            (Some(p), _) => format!("{:.2}%", p * 100.0),
            (None, Some(mean)) => format!("{mean:.2}"),
            (None, None) => "-".to_string(),
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            stats.group.title(),
            stats.questions,
            stats.easy,
            stats.medium,
            stats.hard,
            stats.invalid,
            stats.unrated,
            average,
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} soal dinilai, {} tidak valid.</p>\n",
        aggregate.total_questions, aggregate.degraded
    ));
    html.push_str("</section>\n");
    html
}

fn group_section(
    index: usize,
    group: QuestionGroup,
    results: &[&ScoreResult],
    breakdown: &[&ResponseRecord],
) -> String {
    let table_id = format!("group-{index}");
    let mut html = String::from("<section class=\"group\">\n");
    html.push_str(&format!("<h2>Analisis {}</h2>\n", group.title()));

    html.push_str(&format!("<table class=\"results-table\" id=\"{table_id}\">\n"));
    html.push_str(&format!(
        "<thead><tr><th onclick=\"sortTable('{table_id}', 0)\">Soal</th><th onclick=\"sortTable('{table_id}', 1)\">Tipe</th><th onclick=\"sortTable('{table_id}', 2)\">Nilai</th><th onclick=\"sortTable('{table_id}', 3)\">Keterangan</th></tr></thead>\n"
    ));
    html.push_str("<tbody>\n");
    for r in results {
        let class = if r.is_degraded() { " class=\"invalid\"" } else { "" };
        html.push_str(&format!(
            "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            html_escape(&r.question_id),
            html_escape(&r.question_type.to_string()),
            html_escape(&r.metric),
            html_escape(&r.note),
        ));
    }
    html.push_str("</tbody></table>\n");

    let points = chart_points(results);
    if !points.is_empty() {
        html.push_str(&format!(
            "<figure>\n<figcaption>Grafik Nilai {}</figcaption>\n",
            group.title()
        ));
        html.push_str(&svg_bar_chart(&points, group_color(group)));
        html.push_str("</figure>\n");
    }

    if !breakdown.is_empty() {
        html.push_str(&format!("<h3>Jawaban {}</h3>\n", group.title()));
        html.push_str("<table class=\"breakdown\">\n");
        html.push_str("<thead><tr><th>Soal</th><th>Responden</th><th>Jawaban</th><th>Skor</th><th>Komentar</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for b in breakdown {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&b.question_id),
                html_escape(&b.respondent),
                html_escape(&b.response),
                html_escape(&b.raw_score),
                html_escape(&b.comment),
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    if group == QuestionGroup::Essay {
        for r in results {
            let scores = essay_scores(&r.question_id, breakdown);
            if scores.is_empty() {
                continue;
            }
            html.push_str(&format!(
                "<figure>\n<figcaption>Sebaran Skor {}</figcaption>\n",
                html_escape(&r.question_id)
            ));
            html.push_str(&svg_histogram(
                &histogram(&scores, HISTOGRAM_BINS),
                group_color(group),
            ));
            html.push_str("</figure>\n");
        }
    }

    html.push_str("</section>\n");
    html
}

/// Raw essay scores for one question, read back from the breakdown rows
/// (`"8 / 10"` or a bare `"8"`).
fn essay_scores(question_id: &str, breakdown: &[&ResponseRecord]) -> Vec<f64> {
    breakdown
        .iter()
        .filter(|b| b.question_id == question_id)
        .filter_map(|b| {
            let numerator = b.raw_score.split('/').next()?.trim();
            numerator.parse::<f64>().ok().filter(|v| v.is_finite())
        })
        .collect()
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --invalid: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --invalid: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.label { margin: 0.25rem 0; font-size: 1.05rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.invalid { background: var(--invalid); }
figure { margin: 1rem 0; }
figcaption { font-weight: bold; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
section.group { break-before: page; page-break-before: always; }
@media print {
  body { padding: 0; }
  .raw-data, script { display: none; }
  th { cursor: default; }
}
"#;

const JS: &str = r#"
function sortTable(id, col) {
  const table = document.getElementById(id);
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, { numeric: true }) : vb.localeCompare(va, undefined, { numeric: true });
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
