//! Punctuation stripping and whitespace tokenization for claim text.

use once_cell::sync::Lazy;
use regex::Regex;

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.,?!():;\[\]]").expect("valid regex"));

/// Delete `. , ? ! ( ) : ; [ ]` and turn `/` into a single space.
pub fn strip_punctuation(text: &str) -> String {
    PUNCTUATION.replace_all(text, "").replace('/', " ")
}

/// Strip punctuation and split on whitespace runs.
///
/// Accepts either a `&str` or an `Option<&str>`; a missing fragment produces no
/// tokens rather than an error.
pub fn tokenize<'a>(text: impl Into<Option<&'a str>>) -> Vec<String> {
    match text.into() {
        Some(text) => strip_punctuation(text)
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Tokenize every fragment in order and concatenate the results.
pub fn tokenize_all(fragments: &[Option<String>]) -> Vec<String> {
    fragments
        .iter()
        .flat_map(|fragment| tokenize(fragment.as_deref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_each_listed_character() {
        for ch in ['.', ',', '?', '!', '(', ')', ':', ';', '[', ']'] {
            let input = format!("a{ch}b");
            assert_eq!(strip_punctuation(&input), "ab", "character {ch:?}");
        }
    }

    #[test]
    fn slash_separates_tokens() {
        assert_eq!(strip_punctuation("and/or"), "and or");
        assert_eq!(tokenize("input/output"), vec!["input", "output"]);
    }

    #[test]
    fn missing_text_has_no_tokens() {
        assert!(tokenize(None).is_empty());
        assert!(tokenize("  .,;  ").is_empty());
    }

    #[test]
    fn fragments_concatenate_in_order() {
        let fragments = vec![
            Some("first claim.".to_string()),
            None,
            Some("second (claim)".to_string()),
        ];
        assert_eq!(
            tokenize_all(&fragments),
            vec!["first", "claim", "second", "claim"]
        );
    }
}
