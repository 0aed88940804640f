// 📊 Tabular Sources - Spreadsheet cells to a canonical name set
//
// Loaders turn a file into column-major text cells; the extractor treats
// every cell of every column as a candidate name.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io::Cursor;

use crate::canonical::canonicalize;
use crate::error::{ExtractError, ExtractResult};

// ============================================================================
// CORE TYPES
// ============================================================================

/// One column of text cells (header excluded, empty cells dropped)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }
}

/// Columns in sheet order (header names may repeat)
pub type Columns = Vec<Column>;

/// Canonical names from the tabular source; membership only
pub type NameSet = BTreeSet<String>;

/// Which loader handles a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabularFormat {
    /// xlsx / xlsm / xlsb / xls / ods
    Spreadsheet,
    Csv,
}

impl TabularFormat {
    pub fn name(&self) -> &str {
        match self {
            TabularFormat::Spreadsheet => "spreadsheet",
            TabularFormat::Csv => "csv",
        }
    }
}

// ============================================================================
// LOADER TRAIT
// ============================================================================

/// Read a tabular file into text columns.
///
/// The first row is the header and is never returned as a value.
pub trait TabularLoader: Send + Sync {
    fn load_columns(&self, bytes: &[u8]) -> ExtractResult<Columns>;

    fn format(&self) -> TabularFormat;
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Detect the format from a file name.
///
/// A name without an extension is assumed to be a spreadsheet; calamine
/// sniffs the actual container from the bytes.
pub fn detect_format(file_name: &str) -> ExtractResult<TabularFormat> {
    let lower = file_name.to_lowercase();

    let extension = match lower.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => return Ok(TabularFormat::Spreadsheet),
    };

    if extension == "csv" {
        return Ok(TabularFormat::Csv);
    }

    if SPREADSHEET_EXTENSIONS.contains(&extension) {
        return Ok(TabularFormat::Spreadsheet);
    }

    Err(ExtractError::UnsupportedFormat(file_name.to_string()))
}

pub fn get_loader(format: TabularFormat) -> Box<dyn TabularLoader> {
    match format {
        TabularFormat::Spreadsheet => Box::new(SpreadsheetLoader::new()),
        TabularFormat::Csv => Box::new(CsvLoader::new()),
    }
}

// ============================================================================
// SPREADSHEET LOADER
// ============================================================================

/// First worksheet of an Excel/ODS workbook, via calamine
pub struct SpreadsheetLoader;

impl SpreadsheetLoader {
    pub fn new() -> Self {
        SpreadsheetLoader
    }
}

impl Default for SpreadsheetLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Coerce a cell to text; empty and error cells have no text
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.clone(),
        other => other.to_string(),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn default_header(index: usize) -> String {
    format!("column_{}", index + 1)
}

impl TabularLoader for SpreadsheetLoader {
    fn load_columns(&self, bytes: &[u8]) -> ExtractResult<Columns> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ExtractError::Spreadsheet("workbook has no sheets".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ExtractError::Spreadsheet(format!("sheet '{}': {}", sheet_name, e)))?;

        let mut rows = range.rows();
        let header = match rows.next() {
            Some(header) => header,
            None => return Ok(Vec::new()),
        };

        let mut columns: Columns = header
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                Column::new(cell_text(cell).unwrap_or_else(|| default_header(i)), Vec::new())
            })
            .collect();

        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if let (Some(column), Some(text)) = (columns.get_mut(i), cell_text(cell)) {
                    column.values.push(text);
                }
            }
        }

        Ok(columns)
    }

    fn format(&self) -> TabularFormat {
        TabularFormat::Spreadsheet
    }
}

// ============================================================================
// CSV LOADER
// ============================================================================

pub struct CsvLoader {
    pub delimiter: u8,
}

impl CsvLoader {
    pub fn new() -> Self {
        CsvLoader { delimiter: b',' }
    }

    /// Semicolon-separated exports are common from pt-BR spreadsheets
    pub fn with_delimiter(delimiter: u8) -> Self {
        CsvLoader { delimiter }
    }
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularLoader for CsvLoader {
    fn load_columns(&self, bytes: &[u8]) -> ExtractResult<Columns> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(bytes);

        let headers = reader
            .byte_headers()
            .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?
            .clone();

        let mut columns: Columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let decoded = decode_field(h);
                let name = decoded.trim();
                if name.is_empty() {
                    Column::new(default_header(i), Vec::new())
                } else {
                    Column::new(name, Vec::new())
                }
            })
            .collect();

        for (line_num, result) in reader.byte_records().enumerate() {
            let record = result.map_err(|e| {
                ExtractError::Spreadsheet(format!("CSV line {}: {}", line_num + 2, e))
            })?;

            for (i, field) in record.iter().enumerate() {
                let decoded = decode_field(field);
                let text = decoded.trim();
                if text.is_empty() {
                    continue;
                }
                if i >= columns.len() {
                    columns.push(Column::new(default_header(i), Vec::new()));
                }
                columns[i].values.push(text.to_string());
            }
        }

        Ok(columns)
    }

    fn format(&self) -> TabularFormat {
        TabularFormat::Csv
    }
}

/// UTF-8 when valid, Windows-1252 otherwise (the default for pt-BR CSV exports)
fn decode_field(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            Cow::Owned(decoded.into_owned())
        }
    }
}

// ============================================================================
// NAME EXTRACTOR
// ============================================================================

/// Canonicalize every cell of every column into a name set.
///
/// Cells whose canonical form is empty (pure numbers, punctuation) carry no
/// name and are left out.
pub fn extract_names(columns: &[Column]) -> NameSet {
    columns
        .iter()
        .flat_map(|column| column.values.iter())
        .map(|value| canonicalize(value))
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_names_flattens_all_columns() {
        let columns = vec![
            Column::new("Cliente", vec!["José da Silva".to_string(), "ANA LIMA".to_string()]),
            Column::new("Empresa", vec!["Silva Empreendimentos".to_string()]),
        ];

        let names = extract_names(&columns);
        let expected: NameSet = ["ANA LIMA", "JOSE DA SILVA", "SILVA EMPREENDIMENTOS"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_extract_names_deduplicates_and_skips_empty_canonicals() {
        let columns = vec![Column::new(
            "Valores",
            vec![
                "ana lima".to_string(),
                "ANA  LIMA".to_string(),
                "1.234,56".to_string(),
                "---".to_string(),
            ],
        )];

        let names = extract_names(&columns);
        assert_eq!(names.len(), 2, "hyphens survive canonicalization");
        assert!(names.contains("ANA LIMA"));
        assert!(names.contains("---"));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("clientes.xlsx").unwrap(), TabularFormat::Spreadsheet);
        assert_eq!(detect_format("CLIENTES.XLS").unwrap(), TabularFormat::Spreadsheet);
        assert_eq!(detect_format("planilha.ods").unwrap(), TabularFormat::Spreadsheet);
        assert_eq!(detect_format("export.csv").unwrap(), TabularFormat::Csv);
        assert_eq!(detect_format("upload").unwrap(), TabularFormat::Spreadsheet);
        assert!(matches!(
            detect_format("notes.docx"),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_csv_loader_is_column_major_without_header() {
        let csv = "Nome,Cidade\nJosé da Silva,Curitiba\n,Londrina\nAna Lima,\n";
        let columns = CsvLoader::new().load_columns(csv.as_bytes()).unwrap();

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "Nome");
        assert_eq!(columns[0].values, vec!["José da Silva", "Ana Lima"]);
        assert_eq!(columns[1].name, "Cidade");
        assert_eq!(columns[1].values, vec!["Curitiba", "Londrina"]);
    }

    #[test]
    fn test_csv_loader_ragged_rows_and_blank_headers() {
        let csv = "Nome,\nANA,LIMA,EXTRA\n";
        let columns = CsvLoader::new().load_columns(csv.as_bytes()).unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[1].name, "column_2");
        assert_eq!(columns[2].name, "column_3");
        assert_eq!(columns[2].values, vec!["EXTRA"]);
    }

    #[test]
    fn test_csv_semicolon_delimiter() {
        let csv = "Nome;Valor\nANA LIMA;10,00\n";
        let columns = CsvLoader::with_delimiter(b';').load_columns(csv.as_bytes()).unwrap();

        assert_eq!(columns[0].values, vec!["ANA LIMA"]);
        assert_eq!(columns[1].values, vec!["10,00"]);
    }

    #[test]
    fn test_csv_loader_decodes_windows_1252() {
        let columns = CsvLoader::new()
            .load_columns(b"Nome\nJos\xe9 Silva\nAna Lima\n")
            .unwrap();

        assert_eq!(columns[0].values, vec!["José Silva", "Ana Lima"]);

        let names = extract_names(&columns);
        assert!(names.contains("JOSE SILVA"));
        assert!(names.contains("ANA LIMA"));
    }

    #[test]
    fn test_csv_loader_windows_1252_header() {
        let columns = CsvLoader::with_delimiter(b';')
            .load_columns(b"Observa\xe7\xe3o;Nome\nx;ANA\n")
            .unwrap();

        assert_eq!(columns[0].name, "Observação");
        assert_eq!(columns[1].values, vec!["ANA"]);
    }

    #[test]
    fn test_spreadsheet_loader_rejects_garbage() {
        let result = SpreadsheetLoader::new().load_columns(b"definitely not a workbook");
        assert!(matches!(result, Err(ExtractError::Spreadsheet(_))));
    }

    #[test]
    fn test_cell_text_coercion() {
        assert_eq!(cell_text(&Data::String("  ANA ".to_string())), Some("ANA".to_string()));
        assert_eq!(cell_text(&Data::String("   ".to_string())), None);
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::Int(42)), Some("42".to_string()));
    }

    #[test]
    fn test_get_loader() {
        assert_eq!(get_loader(TabularFormat::Csv).format(), TabularFormat::Csv);
        assert_eq!(
            get_loader(TabularFormat::Spreadsheet).format(),
            TabularFormat::Spreadsheet
        );
    }
}
