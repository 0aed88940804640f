// 🧽 Name Cleanup Pipeline
// Rebuilds a human-readable name from the fragments buffered before a date line.
//
// Order matters:
//   1. strip leading digit/hyphen run per fragment, join with spaces
//   2. remove "*" + digits
//   3. remove remaining digit runs
//   4. remove residual dd/mm/yyyy substrings
//   5. collapse whitespace, trim
//   6. strip leading filler (masked identifiers such as "XXX.XXX")
//   7. merge stray single-letter tokens until a fixed point

use regex::Regex;
use std::sync::OnceLock;

/// Placeholder letter used by statements to mask redacted identifiers
pub const DEFAULT_FILLER: char = 'X';

/// Characters that may appear alongside the filler letter in a mask
const MASK_PUNCTUATION: &[char] = &['.', '-', '*', '/'];

fn leading_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9-]+").expect("leading id regex"))
}

fn starred_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*[0-9]+").expect("starred digits regex"))
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("digits regex"))
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]{2}/[0-9]{2}/[0-9]{4}").expect("date regex"))
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct NameCleaner {
    /// Mask letter stripped from the start of a name (default: 'X')
    pub filler: char,
}

impl NameCleaner {
    pub fn new() -> Self {
        NameCleaner {
            filler: DEFAULT_FILLER,
        }
    }

    pub fn with_filler(mut self, filler: char) -> Self {
        self.filler = filler;
        self
    }

    /// Run the full pipeline over ordered fragments (buffered lines, then
    /// the part of the date line that precedes the date).
    pub fn clean<S: AsRef<str>>(&self, fragments: &[S]) -> String {
        let joined = fragments
            .iter()
            .map(|f| strip_leading_id(f.as_ref().trim()))
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let text = starred_digits_re().replace_all(&joined, "");
        let text = digits_re().replace_all(&text, "");
        let text = date_re().replace_all(&text, "");
        let text = collapse_whitespace(&text);
        let text = self.strip_filler(&text);

        merge_split_letters(&text)
    }

    /// Drop a leading filler mask.
    ///
    /// Whole tokens made only of the filler letter and mask punctuation go
    /// ("XXX", "XXX.XXX-", "X"). A run of two or more filler letters glued
    /// to a name goes too ("XXXJOSE" -> "JOSE"). A single filler letter
    /// starting a word is part of the word ("XAVIER").
    pub fn strip_filler(&self, text: &str) -> String {
        let filler = self.filler.to_ascii_uppercase();
        let is_filler = |c: char| c.to_ascii_uppercase() == filler;

        let is_mask = |token: &str| {
            token.chars().any(is_filler)
                && token
                    .chars()
                    .all(|c| is_filler(c) || MASK_PUNCTUATION.contains(&c))
        };

        let mut tokens: Vec<&str> = text.split_whitespace().collect();
        let start = tokens.iter().take_while(|t| is_mask(t)).count();
        tokens.drain(..start);

        if let Some(first) = tokens.first_mut() {
            let word: &str = *first;
            let prefix_len: usize = word
                .chars()
                .take_while(|&c| is_filler(c) || MASK_PUNCTUATION.contains(&c))
                .map(char::len_utf8)
                .sum();
            let (prefix, rest) = word.split_at(prefix_len);
            let glued_to_letter = rest.chars().next().is_some_and(char::is_alphabetic);

            if glued_to_letter && prefix.chars().filter(|&c| is_filler(c)).count() >= 2 {
                *first = rest;
            }
        }

        tokens.join(" ")
    }
}

impl Default for NameCleaner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PASSES
// ============================================================================

/// Remove a leading run of digits and hyphens ("0012-3 JOSE" -> " JOSE")
pub fn strip_leading_id(line: &str) -> &str {
    match leading_id_re().find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_single_letter(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
}

fn is_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphabetic)
}

/// One merge pass over the tokens.
///
/// A run of two or more single-letter tokens fuses into one token
/// ("J J L" -> "JJL"). A lone single letter fuses with the word after it
/// ("P ARANA" -> "PARANA").
fn merge_pass(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        let next = tokens.get(i + 1).copied();

        match next {
            Some(next) if is_single_letter(token) && is_word(next) => {
                if is_single_letter(next) {
                    let mut fused = String::from(token);
                    let mut j = i + 1;
                    while j < tokens.len() && is_single_letter(tokens[j]) {
                        fused.push_str(tokens[j]);
                        j += 1;
                    }
                    out.push(fused);
                    i = j;
                } else {
                    out.push(format!("{}{}", token, next));
                    i += 2;
                }
            }
            _ => {
                out.push(token.to_string());
                i += 1;
            }
        }
    }

    out.join(" ")
}

/// Repeat the merge pass until it stops changing the text
pub fn merge_split_letters(text: &str) -> String {
    let mut current = collapse_whitespace(text);
    loop {
        let next = merge_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Name cleanup with the default filler letter
pub fn clean_name<S: AsRef<str>>(fragments: &[S]) -> String {
    NameCleaner::new().clean(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_id() {
        assert_eq!(strip_leading_id("0012-3 JOSE"), " JOSE");
        assert_eq!(strip_leading_id("JOSE 12"), "JOSE 12");
        assert_eq!(strip_leading_id("--"), "");
    }

    #[test]
    fn test_merge_single_letter_into_word() {
        assert_eq!(merge_split_letters("P ARANA"), "PARANA");
        assert_eq!(merge_split_letters("COMERCIO P ARANA LTDA"), "COMERCIO PARANA LTDA");
    }

    #[test]
    fn test_merge_initial_chain_reaches_fixed_point() {
        let merged = merge_split_letters("J J L LOPES");
        assert_eq!(merged, "JJL LOPES");
        assert_eq!(merge_pass(&merged), merged, "further pass must not change it");
    }

    #[test]
    fn test_merge_leaves_words_alone() {
        assert_eq!(merge_split_letters("JOSE DA SILVA"), "JOSE DA SILVA");
        // A trailing single letter has nothing to fuse with
        assert_eq!(merge_split_letters("SILVA A"), "SILVA A");
    }

    #[test]
    fn test_removes_starred_and_plain_digits() {
        assert_eq!(clean_name(&["JOSE *4521 SILVA 77"]), "JOSE SILVA");
    }

    #[test]
    fn test_strips_leading_ids_per_fragment() {
        let fragments = ["000123-4 MARIA", "998-1 APARECIDA", "SOUZA"];
        assert_eq!(clean_name(&fragments), "MARIA APARECIDA SOUZA");
    }

    #[test]
    fn test_strips_filler_mask() {
        assert_eq!(clean_name(&["XXX.XXX.XXX- JOSE SANTOS"]), "JOSE SANTOS");
        assert_eq!(clean_name(&["XXXXX", "ANA LIMA"]), "ANA LIMA");
        assert_eq!(clean_name(&["XAVIER LIMA"]), "XAVIER LIMA");
    }

    #[test]
    fn test_strips_filler_glued_to_name() {
        assert_eq!(clean_name(&["XXXJOSE SILVA"]), "JOSE SILVA");
        assert_eq!(clean_name(&["XXX.XXXJOSE SILVA"]), "JOSE SILVA");
        assert_eq!(clean_name(&["XXX.XXX.XXX-ANTONIO MARQUES"]), "ANTONIO MARQUES");
        assert_eq!(clean_name(&["XAVIER LIMA"]), "XAVIER LIMA");
        assert_eq!(clean_name(&["X.ANA LIMA"]), "X.ANA LIMA");
    }

    #[test]
    fn test_custom_filler() {
        let cleaner = NameCleaner::new().with_filler('*');
        // "*" is also mask punctuation, but the token must contain the filler
        assert_eq!(cleaner.strip_filler("*** ANA"), "ANA");
        assert_eq!(cleaner.strip_filler("XXX ANA"), "XXX ANA");
    }

    #[test]
    fn test_empty_fragments() {
        let empty: [&str; 0] = [];
        assert_eq!(clean_name(&empty), "");
        assert_eq!(clean_name(&["12345", "  "]), "");
    }
}
