//! examscore-report: workbook, HTML document and chart output for scoring
//! reports.

pub mod chart;
pub mod error;
pub mod html;
pub mod xlsx;

/// Escape a string for safe HTML insertion.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
