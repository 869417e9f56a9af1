//! Corpus-wide boilerplate detection.
//!
//! A term is boilerplate when it occurs in at least `min_df` of all documents. The
//! statistic is always computed over the whole corpus, never per cluster, so a phrase
//! shared by every remark cannot dominate every category name.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::RangeInclusive;

use crate::lexicon::Lexicon;
use crate::text::{ngrams, tokenize};

/// Set of n-gram terms whose document frequency reached the threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boilerplate {
    terms: BTreeSet<String>,
}

impl Boilerplate {
    /// No boilerplate at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Find every n-gram (word counts in `sizes`) present in at least `min_df` of `docs`.
    ///
    /// N-grams made only of stopwords are ignored. With fewer than two documents a
    /// frequency carries no information and nothing is flagged.
    pub fn detect<S: AsRef<str>>(
        docs: &[S],
        min_df: f32,
        sizes: RangeInclusive<usize>,
        lexicon: &Lexicon,
    ) -> Self {
        if docs.len() < 2 {
            return Self::none();
        }
        let mut df: HashMap<String, usize> = HashMap::new();
        for doc in docs {
            let tokens = tokenize(doc.as_ref());
            let mut seen = HashSet::new();
            for n in sizes.clone() {
                for gram in ngrams(&tokens, n) {
                    if gram.split(' ').all(|w| lexicon.is_stopword(w)) {
                        continue;
                    }
                    if seen.insert(gram.clone()) {
                        *df.entry(gram).or_insert(0) += 1;
                    }
                }
            }
        }
        let total = docs.len() as f32;
        let terms = df
            .into_iter()
            .filter(|(_, count)| *count as f32 / total >= min_df)
            .map(|(term, _)| term)
            .collect();
        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    /// `true` when `term` is boilerplate or contains a boilerplate word.
    pub fn blocks(&self, term: &str) -> bool {
        self.contains(term) || term.split(' ').any(|w| self.contains(w))
    }

    /// Flagged terms in lexicographic order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }
}
