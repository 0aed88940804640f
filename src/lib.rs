// Name Reconciliation - Core Library
// Ledger text vs. spreadsheet names: segmentation, canonicalization, matching

pub mod canonical;
pub mod classifier;
pub mod cleanup;
pub mod segmentation;
pub mod tabular;
pub mod reconciliation;
pub mod document;      // Collaborator: document bytes -> page texts
pub mod compare;       // Session glue: collaborators -> core -> report
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use canonical::{canonicalize, canonicalize_value};
pub use classifier::{is_junk, LineClassifier, DEFAULT_JUNK_KEYWORDS};
pub use cleanup::{clean_name, merge_split_letters, NameCleaner};
pub use segmentation::{
    extract_records, repair_text,
    LedgerRecord, LedgerRecords, NameBuffer, SegmentationState, SegmentationStats, Segmenter,
};
pub use tabular::{
    detect_format, extract_names, get_loader,
    Column, Columns, CsvLoader, NameSet, SpreadsheetLoader, TabularFormat, TabularLoader,
};
pub use reconciliation::{
    reconcile, MatchKind, Pairing, ReconciliationResult, Reconciler, RecordSummary,
};
pub use document::{get_extractor, DocumentTextExtractor, PdfTextExtractor, PlainTextExtractor};
pub use compare::{ComparisonReport, ComparisonSession, Upload};
pub use config::AppConfig;
pub use error::{ExtractError, ExtractResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
