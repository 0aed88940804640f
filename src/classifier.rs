// 🧹 Line Classifier - Drop boilerplate before segmentation
// A junk line never reaches the name buffer and is never scanned for a date.

use serde::{Deserialize, Serialize};

// ============================================================================
// DENYLIST
// ============================================================================

/// Boilerplate fragments found in exported bank statements.
///
/// Matched case-insensitively as substrings. Statements come from Brazilian
/// banks, so most entries are Portuguese; the English ones cover exports
/// from the same layouts with translated headers.
pub const DEFAULT_JUNK_KEYWORDS: &[&str] = &[
    // Browser / navigation residue from "print to PDF"
    "javascript:",
    "about:blank",
    "http://",
    "https://",
    "www.",
    "página",
    "page ",
    // Statement headers and footers
    "nosso nro",
    "nosso número",
    "our reference",
    "data do movimento",
    "data movimento",
    "movement date",
    "beneficiário",
    "beneficiary",
    "agência",
    "branch",
    "tarifa",
    "fees",
    "totais",
    "total geral",
    "totals",
    "saldo anterior",
    "extrato",
    "statement of account",
];

// ============================================================================
// LINE CLASSIFIER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineClassifier {
    /// Lowercased denylist entries
    keywords: Vec<String>,
}

impl LineClassifier {
    /// Classifier with the default statement denylist
    pub fn new() -> Self {
        LineClassifier {
            keywords: DEFAULT_JUNK_KEYWORDS
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Builder pattern: extend the denylist
    pub fn with_keywords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in extra {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Is this line structurally irrelevant?
    ///
    /// Junk when any of:
    /// - contains a denylisted keyword (case-insensitive)
    /// - trimmed length below 2 characters
    /// - made only of digits and hyphens (account numbers, ids)
    pub fn is_junk(&self, line: &str) -> bool {
        let trimmed = line.trim();

        if trimmed.chars().count() < 2 {
            return true;
        }

        if trimmed.chars().all(|c| c.is_ascii_digit() || c == '-') {
            return true;
        }

        let lower = trimmed.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Junk check against the default denylist
pub fn is_junk(line: &str) -> bool {
    LineClassifier::new().is_junk(line)
}
