use thiserror::Error;

/// Failures of the document collaborators.
///
/// None of these abort a comparison: the session logs them and treats the
/// affected source as empty.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document could not be decoded into text
    #[error("document text extraction failed: {0}")]
    Document(String),

    /// The spreadsheet could not be opened or read
    #[error("spreadsheet load failed: {0}")]
    Spreadsheet(String),

    /// No loader handles this file name
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
