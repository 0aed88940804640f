// 🔗 Comparison Session - One document pair in, one reconciliation out
//
// Extraction failures never abort a comparison: the failing source is
// logged and treated as empty, so a garbled upload degrades to
// "nothing recognized" on that side.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::document::{get_extractor, DocumentTextExtractor};
use crate::reconciliation::{ReconciliationResult, Reconciler};
use crate::segmentation::{LedgerRecords, Segmenter};
use crate::tabular::{detect_format, extract_names, get_loader, NameSet, TabularLoader};

// ============================================================================
// UPLOADS
// ============================================================================

/// A named blob handed to the session (HTTP part or file on disk)
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Upload {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Upload { file_name, bytes })
    }

    /// SHA-256 of the content, lowercase hex
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub result: ReconciliationResult,

    /// Everything the segmenter produced, for drill-down
    pub records: LedgerRecords,

    pub tabular_names: usize,
    pub document_name: String,
    pub document_fingerprint: String,
    pub sheet_name: String,
    pub sheet_fingerprint: String,
    pub generated_at: DateTime<Utc>,
}

// ============================================================================
// SESSION
// ============================================================================

/// Owns every piece of per-invocation state; nothing is shared between
/// sessions, so concurrent comparisons need no locking.
#[derive(Debug, Clone, Default)]
pub struct ComparisonSession {
    pub segmenter: Segmenter,
    pub reconciler: Reconciler,
}

impl ComparisonSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        ComparisonSession {
            segmenter: config.segmenter(),
            reconciler: config.reconciler(),
        }
    }

    /// Ledger records from a document; empty when extraction fails
    pub fn records_from(
        &self,
        extractor: &dyn DocumentTextExtractor,
        document: &Upload,
    ) -> LedgerRecords {
        match extractor.extract_pages(&document.bytes) {
            Ok(pages) => self.segmenter.segment_pages(&pages),
            Err(e) => {
                warn!(
                    file = %document.file_name,
                    extractor = extractor.name(),
                    error = %e,
                    "document extraction failed, treating as empty"
                );
                LedgerRecords::new()
            }
        }
    }

    /// Canonical names from a spreadsheet; empty when loading fails
    pub fn names_from(&self, loader: &dyn TabularLoader, sheet: &Upload) -> NameSet {
        match loader.load_columns(&sheet.bytes) {
            Ok(columns) => extract_names(&columns),
            Err(e) => {
                warn!(
                    file = %sheet.file_name,
                    loader = loader.format().name(),
                    error = %e,
                    "spreadsheet load failed, treating as empty"
                );
                NameSet::new()
            }
        }
    }

    /// Compare with collaborators picked from the file names
    pub fn compare(&self, document: &Upload, sheet: &Upload) -> ComparisonReport {
        let extractor = get_extractor(&document.file_name);

        let names = match detect_format(&sheet.file_name) {
            Ok(format) => self.names_from(get_loader(format).as_ref(), sheet),
            Err(e) => {
                warn!(file = %sheet.file_name, error = %e, "no loader for spreadsheet, treating as empty");
                NameSet::new()
            }
        };

        self.compare_with(extractor.as_ref(), document, names, sheet)
    }

    /// Compare with an explicit extractor and already loaded names
    pub fn compare_with(
        &self,
        extractor: &dyn DocumentTextExtractor,
        document: &Upload,
        names: NameSet,
        sheet: &Upload,
    ) -> ComparisonReport {
        let records = self.records_from(extractor, document);
        let result = self.reconciler.reconcile(&records, &names);

        info!(
            document = %document.file_name,
            sheet = %sheet.file_name,
            records = records.len(),
            names = names.len(),
            "{}",
            result.summary()
        );

        ComparisonReport {
            result,
            records,
            tabular_names: names.len(),
            document_name: document.file_name.clone(),
            document_fingerprint: document.fingerprint(),
            sheet_name: sheet.file_name.clone(),
            sheet_fingerprint: sheet.fingerprint(),
            generated_at: Utc::now(),
        }
    }

    /// Read both files from disk and compare them
    pub fn compare_paths(&self, document: &Path, sheet: &Path) -> Result<ComparisonReport> {
        let document = Upload::from_path(document)?;
        let sheet = Upload::from_path(sheet)?;
        Ok(self.compare(&document, &sheet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PlainTextExtractor;
    use crate::error::{ExtractError, ExtractResult};
    use crate::tabular::{Columns, TabularFormat};

    struct FailingExtractor;

    impl DocumentTextExtractor for FailingExtractor {
        fn extract_pages(&self, _bytes: &[u8]) -> ExtractResult<Vec<String>> {
            Err(ExtractError::Document("corrupt".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct FailingLoader;

    impl TabularLoader for FailingLoader {
        fn load_columns(&self, _bytes: &[u8]) -> ExtractResult<Columns> {
            Err(ExtractError::Spreadsheet("corrupt".to_string()))
        }

        fn format(&self) -> TabularFormat {
            TabularFormat::Spreadsheet
        }
    }

    fn ledger() -> Upload {
        Upload::new(
            "extrato.txt",
            b"JOSE\nDA SILVA 12/05/2023 COB\nMARIA SOUZA 13/05/2023 TED\n".to_vec(),
        )
    }

    fn sheet() -> Upload {
        Upload::new("clientes.csv", b"Nome\nSilva Empreendimentos\nPedro Lima\n".to_vec())
    }

    #[test]
    fn test_compare_end_to_end() {
        let report = ComparisonSession::new().compare(&ledger(), &sheet());

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.tabular_names, 2);
        assert_eq!(report.result.matched.len(), 1);
        assert_eq!(report.result.matched[0].raw_name, "JOSE DA SILVA");
        assert_eq!(report.result.only_in_unstructured[0].raw_name, "MARIA SOUZA");
        assert_eq!(report.result.only_in_tabular, vec!["PEDRO LIMA".to_string()]);
    }

    #[test]
    fn test_document_failure_degrades_to_empty() {
        let session = ComparisonSession::new();
        let names = session.names_from(&crate::tabular::CsvLoader::new(), &sheet());
        let report = session.compare_with(&FailingExtractor, &ledger(), names, &sheet());

        assert!(report.records.is_empty());
        assert!(report.result.matched.is_empty());
        assert_eq!(report.result.only_in_tabular.len(), 2);
    }

    #[test]
    fn test_sheet_failure_degrades_to_empty() {
        let session = ComparisonSession::new();
        let names = session.names_from(&FailingLoader, &sheet());
        assert!(names.is_empty());

        let report = session.compare_with(&PlainTextExtractor::new(), &ledger(), names, &sheet());
        assert_eq!(report.result.only_in_unstructured.len(), 2);
    }

    #[test]
    fn test_unsupported_sheet_name_degrades_to_empty() {
        let odd = Upload::new("clientes.docx", b"Nome\nPedro Lima\n".to_vec());
        let report = ComparisonSession::new().compare(&ledger(), &odd);

        assert_eq!(report.tabular_names, 0);
        assert_eq!(report.result.only_in_unstructured.len(), 2);
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let upload = Upload::new("empty.txt", Vec::new());
        assert_eq!(
            upload.fingerprint(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
