// 📄 Document Text Extractor - Ledger documents to page texts
// The segmenter only ever sees strings; decoding lives behind this trait.

use crate::error::{ExtractError, ExtractResult};

/// Decode a document into one text blob per page.
///
/// Implementations must not panic on garbage input; return an error instead
/// and let the caller degrade to "no records".
pub trait DocumentTextExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractResult<Vec<String>>;

    /// Short name for logs
    fn name(&self) -> &str;
}

// ============================================================================
// PDF
// ============================================================================

/// PDF text via `pdf-extract`.
///
/// Pages come back separated by form feeds, which is where we split.
/// Decoder panics are caught and reported as errors.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        PdfTextExtractor
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractResult<Vec<String>> {
        if !bytes.starts_with(b"%PDF") {
            return Err(ExtractError::Document("missing %PDF header".to_string()));
        }

        // pdf-extract panics on some malformed streams
        let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| ExtractError::Document("PDF decoder panicked".to_string()))?
            .map_err(|e| ExtractError::Document(e.to_string()))?;

        Ok(split_pages(&text))
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// Split extractor output on form feeds, keeping empty pages
pub fn split_pages(text: &str) -> Vec<String> {
    text.split('\u{000C}').map(|s| s.to_string()).collect()
}

// ============================================================================
// PLAIN TEXT
// ============================================================================

/// Already-extracted text (UTF-8), form feeds as page breaks
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        PlainTextExtractor
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTextExtractor for PlainTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractResult<Vec<String>> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractError::Document(format!("not UTF-8 text: {}", e)))?;
        Ok(split_pages(text))
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// Pick an extractor from the file name: `.txt` is plain text, anything
/// else is treated as PDF.
pub fn get_extractor(file_name: &str) -> Box<dyn DocumentTextExtractor> {
    if file_name.to_lowercase().ends_with(".txt") {
        Box::new(PlainTextExtractor::new())
    } else {
        Box::new(PdfTextExtractor::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_rejects_non_pdf_bytes() {
        let result = PdfTextExtractor::new().extract_pages(b"JOSE 01/01/2024 COB");
        assert!(matches!(result, Err(ExtractError::Document(_))));
    }

    #[test]
    fn test_pdf_garbage_after_header_is_an_error() {
        let result = PdfTextExtractor::new().extract_pages(b"%PDF-1.4\nnot really a pdf");
        assert!(result.is_err());
    }

    #[test]
    fn test_plain_text_pages() {
        let pages = PlainTextExtractor::new()
            .extract_pages("JOSE\n\u{000C}ANA 01/01/2024 COB".as_bytes())
            .unwrap();

        assert_eq!(pages, vec!["JOSE\n".to_string(), "ANA 01/01/2024 COB".to_string()]);
    }

    #[test]
    fn test_plain_text_rejects_invalid_utf8() {
        let result = PlainTextExtractor::new().extract_pages(&[0xff, 0xfe, 0x00]);
        assert!(result.is_err());
    }

    #[test]
    fn test_get_extractor() {
        assert_eq!(get_extractor("extrato.TXT").name(), "text");
        assert_eq!(get_extractor("extrato.pdf").name(), "pdf");
        assert_eq!(get_extractor("upload").name(), "pdf");
    }
}
