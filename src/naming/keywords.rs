//! TF-IDF scoring of word n-grams within one cluster's documents.
//!
//! Scores come from `keyword_extraction`; this module only decides which terms the
//! scorer sees. Each document is tokenized, stopwords are dropped, and every
//! 1..=n word n-gram becomes one whitespace-free token, so the scorer weighs
//! phrases and single words side by side.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use keyword_extraction::tf_idf::{TfIdf, TfIdfParams};

use crate::lexicon::Lexicon;
use crate::text::{ngrams, tokenize};

/// Joins the words of an n-gram into a single scorer token. Never produced by
/// [`tokenize`].
const GRAM_JOINER: char = '+';

/// A term and its TF-IDF weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTerm {
    pub term: String,
    pub score: f64,
}

impl ScoredTerm {
    pub fn word_count(&self) -> usize {
        self.term.split(' ').count()
    }
}

/// Score every 1..=`max_ngram` word n-gram across `docs`.
///
/// Stopwords are removed before n-grams are formed. Results are ordered by
/// descending score, longer terms first among equals, then by term.
pub fn tfidf_terms<S: AsRef<str>>(docs: &[S], lexicon: &Lexicon, max_ngram: usize) -> Vec<ScoredTerm> {
    let mut vocabulary = BTreeSet::new();
    let processed: Vec<String> = docs
        .iter()
        .map(|doc| {
            let tokens: Vec<String> = tokenize(doc.as_ref())
                .into_iter()
                .filter(|t| !lexicon.is_stopword(t))
                .collect();
            let grams: Vec<String> = (1..=max_ngram)
                .flat_map(|n| ngrams(&tokens, n))
                .map(|g| g.replace(' ', &GRAM_JOINER.to_string()))
                .collect();
            vocabulary.extend(grams.iter().cloned());
            grams.join(" ")
        })
        .filter(|doc| !doc.is_empty())
        .collect();
    if vocabulary.is_empty() {
        return Vec::new();
    }

    let tfidf = TfIdf::new(TfIdfParams::ProcessedDocuments(&processed));
    let mut scored: Vec<ScoredTerm> = tfidf
        .get_ranked_word_scores(vocabulary.len())
        .into_iter()
        .filter(|(_, score)| score.is_finite())
        .map(|(term, score)| ScoredTerm {
            term: term.replace(GRAM_JOINER, " "),
            score: f64::from(score),
        })
        .collect();
    // Re-rank with a total order; the scorer leaves ties in hash order.
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.word_count().cmp(&a.word_count()))
            .then_with(|| a.term.cmp(&b.term))
    });
    scored
}

/// Greedily pick top terms until `target_words` words are covered.
///
/// A term is skipped when it shares a word with an already selected term, or when
/// `reject` returns `true` for it.
pub fn select_terms<'a>(
    scored: &'a [ScoredTerm],
    target_words: usize,
    mut reject: impl FnMut(&str) -> bool,
) -> Vec<&'a str> {
    let mut selected = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut words = 0usize;
    for candidate in scored {
        if words >= target_words {
            break;
        }
        let term = candidate.term.as_str();
        if reject(term) || term.split(' ').any(|w| seen.contains(w)) {
            continue;
        }
        seen.extend(term.split(' '));
        words += candidate.word_count();
        selected.push(term);
    }
    selected
}
