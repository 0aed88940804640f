// ⚖️ Reconciler - Ledger records vs. spreadsheet names
// Phase 1: exact canonical match
// Phase 2: partial match on shared name tokens
//
// Both working sets are ordered (BTreeMap/BTreeSet), so the first tabular
// candidate found in phase 2 is always the lexicographically smallest one
// and the output never depends on hashing or insertion order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::canonical::tokens;
use crate::segmentation::{LedgerRecord, LedgerRecords};
use crate::tabular::NameSet;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// What the caller sees of a ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    #[serde(rename = "nome")]
    pub raw_name: String,

    #[serde(rename = "op")]
    pub operation_code: String,
}

impl From<&LedgerRecord> for RecordSummary {
    fn from(record: &LedgerRecord) -> Self {
        RecordSummary {
            raw_name: record.raw_name.clone(),
            operation_code: record.operation_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Same canonical name on both sides
    Exact,

    /// Enough shared tokens
    Partial,
}

/// How a ledger record was matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub canonical_name: String,
    pub tabular_name: String,
    pub kind: MatchKind,
    pub shared_tokens: Vec<String>,
}

/// Three-way partition, each list sorted by canonical name.
///
/// Serializes to the wire shape
/// `{ nomes_em_ambos, nomes_apenas_excel, nomes_apenas_pdf }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    #[serde(rename = "nomes_em_ambos")]
    pub matched: Vec<RecordSummary>,

    #[serde(rename = "nomes_apenas_excel")]
    pub only_in_tabular: Vec<String>,

    #[serde(rename = "nomes_apenas_pdf")]
    pub only_in_unstructured: Vec<RecordSummary>,

    /// One entry per matched record, same order as `matched`
    #[serde(skip)]
    pub pairings: Vec<Pairing>,
}

impl ReconciliationResult {
    pub fn summary(&self) -> String {
        let exact = self
            .pairings
            .iter()
            .filter(|p| p.kind == MatchKind::Exact)
            .count();

        format!(
            "{} matched ({} exact, {} partial), {} only in document, {} only in spreadsheet",
            self.matched.len(),
            exact,
            self.matched.len() - exact,
            self.only_in_unstructured.len(),
            self.only_in_tabular.len()
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Shared tokens needed for a partial match (default: 1, minimum 1)
    pub min_shared_tokens: usize,
}

impl Reconciler {
    pub fn new() -> Self {
        Reconciler {
            min_shared_tokens: 1,
        }
    }

    pub fn with_min_shared_tokens(min_shared_tokens: usize) -> Self {
        Reconciler { min_shared_tokens }
    }

    fn threshold(&self) -> usize {
        self.min_shared_tokens.max(1)
    }

    /// Partition ledger records and tabular names
    pub fn reconcile(&self, records: &LedgerRecords, names: &NameSet) -> ReconciliationResult {
        let mut remaining_records: BTreeSet<&str> = records.keys().map(|k| k.as_str()).collect();
        let mut remaining_names: BTreeSet<&str> = names.iter().map(|n| n.as_str()).collect();
        let mut matched: BTreeMap<&str, Pairing> = BTreeMap::new();

        // Phase 1: exact match
        for name in records.keys() {
            if names.contains(name) {
                remaining_records.remove(name.as_str());
                remaining_names.remove(name.as_str());
                matched.insert(
                    name.as_str(),
                    Pairing {
                        canonical_name: name.clone(),
                        tabular_name: name.clone(),
                        kind: MatchKind::Exact,
                        shared_tokens: Vec::new(),
                    },
                );
            }
        }

        // Phase 2: partial match on token intersection, first candidate wins
        let name_tokens: BTreeMap<&str, BTreeSet<&str>> = remaining_names
            .iter()
            .map(|name| (*name, token_set(name)))
            .collect();

        let candidates: Vec<&str> = remaining_records.iter().copied().collect();
        for record_name in candidates {
            let record_tokens = token_set(record_name);
            if record_tokens.is_empty() {
                continue;
            }

            let partner = remaining_names.iter().copied().find_map(|tabular_name| {
                let shared: Vec<String> = name_tokens
                    .get(tabular_name)?
                    .intersection(&record_tokens)
                    .map(|t| t.to_string())
                    .collect();
                if shared.len() >= self.threshold() {
                    Some((tabular_name, shared))
                } else {
                    None
                }
            });

            if let Some((tabular_name, shared_tokens)) = partner {
                debug!(
                    record = record_name,
                    tabular = tabular_name,
                    shared = ?shared_tokens,
                    "partial match"
                );
                remaining_records.remove(record_name);
                remaining_names.remove(tabular_name);
                matched.insert(
                    record_name,
                    Pairing {
                        canonical_name: record_name.to_string(),
                        tabular_name: tabular_name.to_string(),
                        kind: MatchKind::Partial,
                        shared_tokens,
                    },
                );
            }
        }

        let mut result = ReconciliationResult::default();

        for (name, pairing) in matched {
            if let Some(record) = records.get(name) {
                result.matched.push(RecordSummary::from(record));
                result.pairings.push(pairing);
            }
        }

        result.only_in_unstructured = remaining_records
            .iter()
            .filter_map(|name| records.get(*name))
            .map(RecordSummary::from)
            .collect();

        result.only_in_tabular = remaining_names.iter().map(|n| n.to_string()).collect();

        result
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokens usable for partial matching; hyphen-only tokens carry no identity
fn token_set(canonical: &str) -> BTreeSet<&str> {
    tokens(canonical)
        .filter(|t| t.chars().any(|c| c.is_ascii_alphabetic()))
        .collect()
}

/// Reconcile with the default single-shared-token policy
pub fn reconcile(records: &LedgerRecords, names: &NameSet) -> ReconciliationResult {
    Reconciler::new().reconcile(records, names)
}
