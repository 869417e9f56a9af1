//! Stopword and name-blocklist lexicon.
//!
//! Built once per run and handed to the naming stages by reference; nothing here is
//! global or mutable after construction.

use std::collections::HashSet;

use stop_words::{get, LANGUAGE};

/// Words that carry no topical signal in support and incident remarks.
const REMARK_STOPWORDS: &[&str] = &[
    "yesterday", "today", "tomorrow", "morning", "evening", "night", "day", "days", "hr", "hrs",
    "hour", "hours", "time", "date", "week", "month", "year", "ago", "one", "two", "three",
    "four", "five", "six", "seven", "eight", "nine", "zero", "consumer", "customer", "number",
    "no", "code", "id", "location", "address", "phone", "mobile", "call", "report",
    "registered", "ok", "yes", "not", "hi", "hello", "sir", "madam", "pls", "please",
    "regards", "type", "urban", "complaint", "detail", "general", "kv", "tf", "na", "service",
    "request", "feedback", "query", "regarding", "about", "given", "whether",
];

/// Words that may appear in remarks but never in a category name.
const NAME_BLOCKLIST: &[&str] = &[
    "problem", "issue", "fault", "category", "item", "uncategorized", "detail", "general",
    "line", "complaint", "output", "summary", "generated", "concise", "text", "description",
    "call", "remark", "remarks", "request", "due", "status", "action", "info", "data", "type",
    "current", "specific", "check", "point", "followup", "case", "system", "management",
    "update", "customer", "account", "last", "coming", "failed", "resolution", "resolved",
    "solving", "fixing", "solution", "inquiry", "query", "asking", "asked", "related",
    "concerning",
];

/// Immutable word lists consulted during boilerplate detection and naming.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    stopwords: HashSet<String>,
    name_blocklist: HashSet<String>,
}

impl Lexicon {
    /// Empty lexicon: nothing is a stopword, nothing is blocked.
    pub fn empty() -> Self {
        Self::default()
    }

    /// NLTK English stopwords plus the remark-specific vocabulary.
    ///
    /// Every stopword is also blocked from category names.
    pub fn english() -> Self {
        Self::empty()
            .with_stopwords(get(LANGUAGE::English))
            .with_stopwords(REMARK_STOPWORDS.iter().copied())
            .with_blocked_name_words(NAME_BLOCKLIST.iter().copied())
    }

    /// Add stopwords (lowercased). Stopwords are implicitly blocked from names.
    pub fn with_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for w in words {
            let w = w.as_ref().trim().to_lowercase();
            if !w.is_empty() {
                self.stopwords.insert(w);
            }
        }
        self
    }

    /// Add words that may not appear in a category name (lowercased).
    pub fn with_blocked_name_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for w in words {
            let w = w.as_ref().trim().to_lowercase();
            if !w.is_empty() {
                self.name_blocklist.insert(w);
            }
        }
        self
    }

    /// `word` must already be lowercase.
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// `word` must already be lowercase.
    pub fn is_blocked_in_name(&self, word: &str) -> bool {
        self.stopwords.contains(word) || self.name_blocklist.contains(word)
    }

    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }

    /// Stopwords in sorted order, for extractors that take a word list.
    pub fn stopword_list(&self) -> Vec<String> {
        let mut words: Vec<String> = self.stopwords.iter().cloned().collect();
        words.sort_unstable();
        words
    }
}
