//! Export error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while assembling exported reports.
///
/// A malformed metric only drops that value from its chart; the document or
/// workbook is still produced.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("metric {0:?} is not a percentage or score ratio")]
    MalformedMetric(String),

    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
