//! Chart data extraction and inline SVG rendering.
//!
//! Metrics are stored as formatted strings (`75.00%`, `7.00 / 10.0`); charts
//! need them back as plain percentages.

use examscore_core::model::{QuestionGroup, ScoreResult};
use examscore_core::statistics::HistogramBin;

use crate::error::ExportError;
use crate::html_escape;

/// Parse a formatted metric back into a percentage.
///
/// `"85.00%"` gives 85.0, `"7.50 / 10"` gives 75.0 (ratio × 100), and a bare
/// number is taken as-is.
pub fn metric_percentage(metric: &str) -> Result<f64, ExportError> {
    let malformed = || ExportError::MalformedMetric(metric.to_string());
    let trimmed = metric.trim();

    let value = if let Some(number) = trimmed.strip_suffix('%') {
        number.trim().parse::<f64>().map_err(|_| malformed())?
    } else if let Some((num, denom)) = trimmed.split_once('/') {
        let num: f64 = num.trim().parse().map_err(|_| malformed())?;
        let denom: f64 = denom.trim().parse().map_err(|_| malformed())?;
        if denom == 0.0 {
            return Err(malformed());
        }
        num / denom * 100.0
    } else {
        trimmed.parse::<f64>().map_err(|_| malformed())?
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(malformed())
    }
}

/// One labelled bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Bars for every result whose metric parses; the rest are skipped.
pub fn chart_points(results: &[&ScoreResult]) -> Vec<ChartPoint> {
    results
        .iter()
        .filter_map(|r| match metric_percentage(&r.metric) {
            Ok(value) => Some(ChartPoint {
                label: r.question_id.clone(),
                value,
            }),
            Err(e) => {
                tracing::warn!(question = %r.question_id, "skipping chart value: {e}");
                None
            }
        })
        .collect()
}

/// Bar fill for a question group.
pub fn group_color(group: QuestionGroup) -> &'static str {
    match group {
        QuestionGroup::MultipleChoice => "#87ceeb",
        QuestionGroup::ShortAnswer => "#90ee90",
        QuestionGroup::Essay => "#f08080",
        QuestionGroup::Other => "#d1d5db",
    }
}

/// Horizontal bar chart of percentages.
pub fn svg_bar_chart(points: &[ChartPoint], color: &str) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 160;

    // Essay means can exceed the key's maximum, so widen the scale if needed.
    let scale = points
        .iter()
        .map(|p| p.value)
        .fold(100.0_f64, f64::max);

    let total_height = points.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\" role=\"img\">\n",
        label_width + max_width + 70,
        total_height
    );

    for (i, point) in points.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (point.value.max(0.0) / scale * max_width as f64) as usize;

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&point.label)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"#1f2937\" stroke-width=\"0.5\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}</text>\n",
            label_width + width + 6,
            y + bar_height / 2,
            point.value
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Vertical histogram of raw scores.
pub fn svg_histogram(bins: &[HistogramBin], color: &str) -> String {
    let chart_height = 160;
    let bar_width = 36;
    let gap = 4;
    let margin = 30;

    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let width = margin * 2 + bins.len() * (bar_width + gap);
    let height = chart_height + margin * 2;

    let mut svg = format!(
        "<svg width=\"{width}\" height=\"{height}\" xmlns=\"http://www.w3.org/2000/svg\" role=\"img\">\n"
    );

    for (i, bin) in bins.iter().enumerate() {
        let x = margin + i * (bar_width + gap);
        let bar = bin.count * chart_height / max_count;
        let y = margin + chart_height - bar;

        svg.push_str(&format!(
            "  <rect x=\"{x}\" y=\"{y}\" width=\"{bar_width}\" height=\"{bar}\" fill=\"{color}\" stroke=\"#000\" stroke-width=\"0.5\"><title>{:.2} - {:.2}: {}</title></rect>\n",
            bin.lower, bin.upper, bin.count
        ));
        if bin.count > 0 {
            svg.push_str(&format!(
                "  <text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"currentColor\" text-anchor=\"middle\">{}</text>\n",
                x + bar_width / 2,
                y.saturating_sub(4),
                bin.count
            ));
        }
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"10\" fill=\"currentColor\" text-anchor=\"middle\">{:.1}</text>\n",
            x + bar_width / 2,
            margin + chart_height + 14,
            bin.lower
        ));
    }

    svg.push_str("</svg>\n");
    svg
}
