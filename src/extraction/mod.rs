//! Text extraction for uploaded documents.
//!
//! The format is chosen from the declared file extension, never sniffed from content. Each
//! extractor returns plain text ready for chunking; tabular formats are rendered one row per
//! line with cells separated by two spaces.

mod delimited;
mod pdf;
mod spreadsheet;
mod xml;

use std::fmt;
use thiserror::Error;

/// Errors raised while turning an uploaded file into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The declared extension is not one of the supported formats.
    #[error("Unsupported file format: '{0}' (expected pdf, xlsx, xml or csv)")]
    UnsupportedFormat(String),
    /// The file claims a supported format but could not be parsed.
    #[error("Failed to read {format} file: {reason}")]
    Corrupt {
        /// Format the file was parsed as.
        format: DocumentFormat,
        /// Parser diagnostic.
        reason: String,
    },
}

impl ExtractionError {
    pub(crate) fn corrupt(format: DocumentFormat, reason: impl fmt::Display) -> Self {
        Self::Corrupt {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Document formats accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML spreadsheet (first worksheet only).
    Xlsx,
    /// Generic XML document.
    Xml,
    /// Comma-separated values.
    Csv,
}

impl DocumentFormat {
    /// Resolve a format from a bare extension such as `"PDF"` or `"csv"`.
    pub fn from_extension(extension: &str) -> Result<Self, ExtractionError> {
        match extension.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "xlsx" => Ok(Self::Xlsx),
            "xml" => Ok(Self::Xml),
            "csv" => Ok(Self::Csv),
            other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Resolve a format from the text after the last `.` of a file name.
    pub fn from_filename(filename: &str) -> Result<Self, ExtractionError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, extension)| extension)
            .unwrap_or(filename);
        Self::from_extension(extension)
    }

    /// Canonical lowercase extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Xml => "xml",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Extract text from `bytes` declared with `extension`.
pub fn extract(bytes: &[u8], extension: &str) -> Result<String, ExtractionError> {
    extract_as(bytes, DocumentFormat::from_extension(extension)?)
}

/// Extract text from `bytes` parsed as `format`.
pub fn extract_as(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
    let text = match format {
        DocumentFormat::Pdf => pdf::extract_text(bytes)?,
        DocumentFormat::Xlsx => spreadsheet::extract_text(bytes)?,
        DocumentFormat::Xml => xml::extract_text(bytes)?,
        DocumentFormat::Csv => delimited::extract_text(bytes)?,
    };
    tracing::debug!(%format, bytes = bytes.len(), chars = text.chars().count(), "Extracted text");
    Ok(text)
}

/// Render table rows one per line, dropping trailing empty cells and blank rows.
pub(crate) fn render_rows<I, R, S>(rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut lines = Vec::new();
    for row in rows {
        let mut cells: Vec<String> = row
            .into_iter()
            .map(|cell| cell.as_ref().trim().to_string())
            .collect();
        while cells.last().is_some_and(|cell| cell.is_empty()) {
            cells.pop();
        }
        if !cells.is_empty() {
            lines.push(cells.join("  "));
        }
    }
    lines.join("\n")
}
