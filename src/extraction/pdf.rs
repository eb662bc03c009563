use super::{DocumentFormat, ExtractionError};
use std::panic;

/// Concatenate the text of every page.
///
/// `pdf-extract` can panic on some malformed inputs; those are reported as corrupt files.
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => Err(ExtractionError::corrupt(DocumentFormat::Pdf, error)),
        Err(_) => Err(ExtractionError::corrupt(
            DocumentFormat::Pdf,
            "parser aborted on malformed content",
        )),
    }
}
