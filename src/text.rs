//! Text cleanup and tokenization shared by embedding preparation and naming.

use std::collections::HashSet;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::lexicon::Lexicon;

/// Two-letter words kept in category names despite the length filter.
const SHORT_NAME_WORDS: &[&str] = &[
    "an", "on", "in", "to", "at", "by", "of", "or", "go", "no", "up", "us", "my", "me", "he",
    "we", "is", "as", "if", "it", "do",
];

/// Name used when a column name is empty after cleanup.
pub const GENERIC_COLUMN_NAME: &str = "Generic Category";

/// Trim and collapse every whitespace run to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and collapse whitespace.
pub fn normalize(text: &str) -> String {
    collapse_whitespace(&text.to_lowercase())
}

/// Lowercased word tokens of at least two characters that contain a letter.
///
/// Pure numbers and punctuation are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .filter(|w| w.chars().count() >= 2 && w.chars().any(char::is_alphabetic))
        .map(str::to_lowercase)
        .collect()
}

/// Contiguous `n`-word windows joined by single spaces.
pub fn ngrams(tokens: &[String], n: usize) -> impl Iterator<Item = String> + '_ {
    let windows = if n == 0 { None } else { Some(tokens.windows(n)) };
    windows.into_iter().flatten().map(|w| w.join(" "))
}

/// Turn a candidate phrase into a presentable category name.
///
/// Lowercases, drops blocklisted and repeated words, strips non-letters, drops
/// words of two letters or fewer (except a small allowlist), then title-cases.
/// Returns an empty string when nothing survives.
pub fn clean_category_name(raw: &str, lexicon: &Lexicon) -> String {
    let lowered = raw.to_lowercase();
    let mut seen = HashSet::new();
    let mut words = Vec::new();
    for word in lowered.split_whitespace() {
        if lexicon.is_blocked_in_name(word) || !seen.insert(word) {
            continue;
        }
        let letters: String = word.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.is_empty() {
            continue;
        }
        if letters.chars().count() <= 2 && !SHORT_NAME_WORDS.contains(&letters.as_str()) {
            continue;
        }
        words.push(title_case(&letters));
    }
    words.join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Keep letters, digits and spaces, collapse whitespace, fall back to a generic label.
pub fn column_base_name(name: &str) -> String {
    let letters: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let base = collapse_whitespace(&letters);
    if base.is_empty() {
        GENERIC_COLUMN_NAME.to_string()
    } else {
        base
    }
}

/// Removes a fixed set of word phrases from text.
///
/// Phrases are matched case-insensitively at word boundaries; the words of a
/// phrase may be separated by any run of non-word characters in the text.
#[derive(Debug, Clone)]
pub struct PhraseStripper {
    pattern: Option<Regex>,
}

impl PhraseStripper {
    /// Longer phrases are tried first so they win over their own sub-phrases.
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Result<Self, regex::Error> {
        let mut sorted: Vec<Vec<&str>> = phrases
            .iter()
            .map(|p| p.as_ref().split_whitespace().collect::<Vec<_>>())
            .filter(|words| !words.is_empty())
            .collect();
        if sorted.is_empty() {
            return Ok(Self { pattern: None });
        }
        sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        sorted.dedup();
        let alternatives: Vec<String> = sorted
            .iter()
            .map(|words| {
                words
                    .iter()
                    .map(|w| regex::escape(w))
                    .collect::<Vec<_>>()
                    .join(r"\W+")
            })
            .collect();
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    /// Text with every phrase occurrence removed and whitespace collapsed.
    pub fn strip(&self, text: &str) -> String {
        match &self.pattern {
            Some(re) => collapse_whitespace(&re.replace_all(text, " ")),
            None => collapse_whitespace(text),
        }
    }
}
