// ✂️ Segmentation State Machine
// Turns the text of one ledger document into name + operation-code records.
//
// A name is only confirmed once a transaction date anchors it:
//
//   JOSE                      -> buffered
//   DA SILVA 12/05/2023 COB   -> flush: "JOSE DA SILVA", op "COB"
//   MARIA SOUZA               -> buffered, never anchored, discarded at EOF

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

use crate::canonical::canonicalize;
use crate::classifier::LineClassifier;
use crate::cleanup::NameCleaner;

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]{2}/[0-9]{2}/[0-9]{4}").expect("date regex"))
}

fn operation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z]{2,})\b").expect("operation regex"))
}

fn hyphen_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\s*\n\s*").expect("hyphen break regex"))
}

fn line_breaks_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n+").expect("line breaks regex"))
}

// ============================================================================
// CORE TYPES
// ============================================================================

/// One anchored name from the ledger document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Comparison key (never empty)
    pub canonical_name: String,

    /// Reconstructed, human-readable name
    pub raw_name: String,

    /// First 2+ uppercase-letter token after the date ("" if none)
    pub operation_code: String,

    /// The anchoring date, when it is a real calendar date
    pub date: Option<NaiveDate>,

    /// 1-based line in the repaired document text
    pub line_number: usize,
}

/// Records keyed by canonical name; later records overwrite earlier ones
pub type LedgerRecords = BTreeMap<String, LedgerRecord>;

/// Lines accumulated since the last flush
#[derive(Debug, Clone, Default)]
pub struct NameBuffer {
    lines: Vec<String>,
}

impl NameBuffer {
    pub fn push(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Hand the buffered lines over and leave the buffer empty
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

/// Counters for logging a segmentation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentationStats {
    pub lines: usize,
    pub junk_lines: usize,
    pub date_lines: usize,
    pub records: usize,
    pub dropped_empty: usize,
    pub overwritten: usize,
    pub discarded_trailing: usize,
}

/// Everything the machine carries between lines.
///
/// There is a single state (accumulating); what varies is the buffer.
#[derive(Debug, Default)]
pub struct SegmentationState {
    pub buffer: NameBuffer,
    pub records: LedgerRecords,
    pub stats: SegmentationStats,
    line_number: usize,
}

impl SegmentationState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// TEXT REPAIR
// ============================================================================

/// Join page texts and repair extraction artifacts.
///
/// - A hyphen followed by a line break is removed ("MAR-\nQUES" -> "MARQUES")
/// - Runs of line breaks collapse to one
pub fn repair_text<S: AsRef<str>>(pages: &[S]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(page.as_ref());
        text.push('\n');
    }

    let text = hyphen_break_re().replace_all(&text, "");
    line_breaks_re().replace_all(&text, "\n").into_owned()
}

// ============================================================================
// SEGMENTER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    pub classifier: LineClassifier,
    pub cleaner: NameCleaner,
}

impl Segmenter {
    pub fn new() -> Self {
        Segmenter {
            classifier: LineClassifier::new(),
            cleaner: NameCleaner::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: LineClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_cleaner(mut self, cleaner: NameCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Segment a whole document given its page texts
    pub fn segment_pages<S: AsRef<str>>(&self, pages: &[S]) -> LedgerRecords {
        let text = repair_text(pages);
        self.segment_lines(text.split('\n'))
    }

    /// Segment already-repaired lines
    pub fn segment_lines<I, S>(&self, lines: I) -> LedgerRecords
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = SegmentationState::new();
        for line in lines {
            self.step(&mut state, line.as_ref());
        }
        self.finish(state)
    }

    /// Feed one line to the machine
    pub fn step(&self, state: &mut SegmentationState, line: &str) {
        state.line_number += 1;

        let line = line.trim();
        if line.is_empty() {
            return;
        }
        state.stats.lines += 1;

        if self.classifier.is_junk(line) {
            state.stats.junk_lines += 1;
            return;
        }

        match date_re().find(line) {
            Some(date_match) => {
                state.stats.date_lines += 1;

                let mut fragments = state.buffer.take();
                fragments.push(line[..date_match.start()].to_string());

                let raw_name = self.cleaner.clean(&fragments);
                let canonical_name = canonicalize(&raw_name);

                if canonical_name.is_empty() {
                    state.stats.dropped_empty += 1;
                    debug!(line = state.line_number, "date line without a usable name");
                    return;
                }

                let operation_code = operation_re()
                    .captures(&line[date_match.end()..])
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();

                let date = NaiveDate::parse_from_str(date_match.as_str(), "%d/%m/%Y").ok();

                let record = LedgerRecord {
                    canonical_name: canonical_name.clone(),
                    raw_name,
                    operation_code,
                    date,
                    line_number: state.line_number,
                };

                if let Some(previous) = state.records.insert(canonical_name, record) {
                    state.stats.overwritten += 1;
                    debug!(
                        name = %previous.canonical_name,
                        previous_line = previous.line_number,
                        "record overwritten by a later occurrence"
                    );
                } else {
                    state.stats.records += 1;
                }
            }
            None => state.buffer.push(line),
        }
    }

    /// End of input: unanchored buffered lines are discarded
    pub fn finish(&self, mut state: SegmentationState) -> LedgerRecords {
        if !state.buffer.is_empty() {
            state.stats.discarded_trailing = state.buffer.len();
            debug!(
                lines = state.buffer.len(),
                "discarding trailing lines with no anchoring date"
            );
        }

        debug!(stats = ?state.stats, "segmentation finished");
        state.records
    }
}

/// Segment page texts with the default classifier and cleaner
pub fn extract_records<S: AsRef<str>>(pages: &[S]) -> LedgerRecords {
    Segmenter::new().segment_pages(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(lines: &[&str]) -> LedgerRecords {
        Segmenter::new().segment_lines(lines.iter())
    }

    #[test]
    fn test_multiline_name_anchored_by_date() {
        let records = segment(&["JOSE", "DA SILVA 12/05/2023 COB"]);

        assert_eq!(records.len(), 1);
        let record = &records["JOSE DA SILVA"];
        assert_eq!(record.raw_name, "JOSE DA SILVA");
        assert_eq!(record.operation_code, "COB");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2023, 5, 12));
        assert_eq!(record.line_number, 2);
    }

    #[test]
    fn test_trailing_buffer_is_dropped() {
        assert!(segment(&["MARIA SOUZA"]).is_empty());

        let records = segment(&["ANA 01/02/2024 TED", "MARIA SOUZA"]);
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("ANA"));
    }

    #[test]
    fn test_consecutive_date_lines_use_own_prefix() {
        let records = segment(&[
            "JOSE LIMA 01/03/2024 PIX",
            "ANA COSTA 02/03/2024 TED",
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records["JOSE LIMA"].operation_code, "PIX");
        assert_eq!(records["ANA COSTA"].operation_code, "TED");
    }

    #[test]
    fn test_missing_operation_code_is_empty() {
        let records = segment(&["JOSE LIMA 01/03/2024 150,00"]);
        assert_eq!(records["JOSE LIMA"].operation_code, "");
    }

    #[test]
    fn test_operation_code_skips_lowercase_and_single_letters() {
        let records = segment(&["JOSE LIMA 01/03/2024 r$ 10 X LIQ"]);
        assert_eq!(records["JOSE LIMA"].operation_code, "LIQ");
    }

    #[test]
    fn test_empty_name_is_dropped_and_buffer_cleared() {
        let records = segment(&["0001-9", "12345 01/03/2024 COB", "ANA 02/03/2024 TED"]);

        assert_eq!(records.len(), 1);
        assert_eq!(records["ANA"].raw_name, "ANA");
    }

    #[test]
    fn test_junk_lines_never_join_a_name() {
        let records = segment(&[
            "Nosso Nro. 1234",
            "JOSE",
            "22239710000108249-5",
            "javascript:void(0)",
            "SANTOS 05/06/2023 COB",
        ]);

        assert_eq!(records.len(), 1);
        assert_eq!(records["JOSE SANTOS"].raw_name, "JOSE SANTOS");
    }

    #[test]
    fn test_last_write_wins() {
        let records = segment(&[
            "JOSE LIMA 01/03/2024 PIX",
            "José Lima 09/03/2024 TED",
        ]);

        assert_eq!(records.len(), 1);
        let record = &records["JOSE LIMA"];
        assert_eq!(record.raw_name, "José Lima");
        assert_eq!(record.operation_code, "TED");
    }

    #[test]
    fn test_explicit_state_threading() {
        let segmenter = Segmenter::new();
        let mut state = SegmentationState::new();

        segmenter.step(&mut state, "MARIA");
        segmenter.step(&mut state, "APARECIDA");
        assert_eq!(state.buffer.len(), 2);

        segmenter.step(&mut state, "SOUZA 10/10/2022 COB");
        assert!(state.buffer.is_empty());
        assert_eq!(state.stats.records, 1);

        let records = segmenter.finish(state);
        assert!(records.contains_key("MARIA APARECIDA SOUZA"));
    }

    #[test]
    fn test_invalid_calendar_date_still_anchors() {
        let records = segment(&["ANA 31/02/2024 COB"]);
        assert_eq!(records["ANA"].date, None);
        assert_eq!(records["ANA"].operation_code, "COB");
    }

    #[test]
    fn test_repair_text_rejoins_hyphenated_words() {
        let text = repair_text(&["ANTONIO MAR-\nQUES 01/01/2024 COB\n\n\nNEXT"]);
        assert_eq!(text, "ANTONIO MARQUES 01/01/2024 COB\nNEXT\n");
    }

    #[test]
    fn test_segment_pages_across_pages() {
        let pages = ["CARLOS", "ALBERTO 03/04/2024 DOC\nLUIZA"];
        let records = Segmenter::new().segment_pages(&pages);

        assert_eq!(records.len(), 1);
        assert_eq!(records["CARLOS ALBERTO"].operation_code, "DOC");
    }

    #[test]
    fn test_merged_initials_in_records() {
        let records = segment(&["J J L LOPES 01/01/2024 COB", "P ARANA 02/01/2024 TED"]);

        assert!(records.contains_key("JJL LOPES"));
        assert!(records.contains_key("PARANA"));
    }
}
