// 🔤 Canonicalizer - Comparison keys for names
// Maps any string to an uppercase, unaccented, letters/space/hyphen-only form.
//
// The canonical form is never shown to a user. It exists only so that
// "João Ramírez", "JOAO  RAMIREZ" and "joão ramírez!" compare equal.

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a name for comparison.
///
/// Steps:
/// 1. Uppercase
/// 2. NFKD decomposition, keep ASCII only (drops combining marks)
/// 3. Keep `A-Z`, whitespace and `-`
/// 4. Collapse whitespace runs to one space, trim
///
/// Total and idempotent: `canonicalize(&canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(input: &str) -> String {
    let folded: String = input
        .to_uppercase()
        .nfkd()
        .filter(|c| c.is_ascii())
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_whitespace() || *c == '-')
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize a value of unknown shape.
///
/// Only strings carry a name; every other JSON value (numbers, booleans,
/// null, arrays, objects) canonicalizes to the empty string.
pub fn canonicalize_value(value: &Value) -> String {
    match value {
        Value::String(s) => canonicalize(s),
        _ => String::new(),
    }
}

/// Split a canonical name into its whitespace-delimited tokens.
pub fn tokens(canonical: &str) -> impl Iterator<Item = &str> {
    canonical.split_whitespace()
}
